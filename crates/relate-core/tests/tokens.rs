use relate_core::{app_launch_url, ErrorKind};
use serde_json::json;

mod common;

use common::{bootstrapped_system, write_environment};

#[tokio::test]
async fn launch_token_round_trips_for_same_app() {
    let (_temp, system) = bootstrapped_system().await;
    let token = system
        .create_app_launch_token("default", "browser", "1234", "neo4j", "opaque-token")
        .expect("create");

    let parsed = system
        .parse_app_launch_token("browser", &token)
        .expect("parse");
    assert_eq!(parsed.environment_id, "default");
    assert_eq!(parsed.app_id, "browser");
    assert_eq!(parsed.dbms_id, "1234");
    assert_eq!(parsed.principal, "neo4j");
    assert_eq!(parsed.access_token, "opaque-token");

    let err = system
        .parse_app_launch_token("bloom", &token)
        .expect_err("other app");
    assert_eq!(err.kind(), ErrorKind::ValidationFailure);

    let url = app_launch_url("http://localhost:3000/browser/", Some(&token));
    assert!(url.ends_with(&format!("?_appLaunchToken={token}")));
}

#[tokio::test]
async fn garbage_launch_token_fails_validation() {
    let (_temp, system) = bootstrapped_system().await;
    for token in ["", "abc", "a.b.c", "a.b.c.d"] {
        let err = system
            .parse_app_launch_token("browser", token)
            .expect_err("garbage");
        assert_eq!(err.kind(), ErrorKind::ValidationFailure, "{token:?}");
    }
}

#[tokio::test]
async fn access_tokens_resolve_environment_and_dbms() {
    let (_temp, system) = bootstrapped_system().await;
    write_environment(
        &system,
        "default",
        &json!({
            "id": "default",
            "type": "LOCAL",
            "user": "local",
            "dbmss": { "1234": { "name": "movies" } }
        }),
    );

    system
        .register_access_token("default", "1234", "neo4j", "secret-token")
        .await
        .expect("register");
    assert_eq!(
        system
            .get_access_token("default", "1234", "neo4j")
            .await
            .expect("by id"),
        "secret-token"
    );
    assert_eq!(
        system
            .get_access_token("default", "movies", "neo4j")
            .await
            .expect("by name"),
        "secret-token"
    );

    let unregistered = system
        .get_access_token("default", "1234", "admin")
        .await
        .expect_err("other user");
    assert_eq!(unregistered.kind(), ErrorKind::NotFound);
    let no_env = system
        .get_access_token("missing", "1234", "neo4j")
        .await
        .expect_err("missing env");
    assert_eq!(no_env.kind(), ErrorKind::NotFound);
    let no_dbms = system
        .get_access_token("default", "5678", "neo4j")
        .await
        .expect_err("missing dbms");
    assert_eq!(no_dbms.kind(), ErrorKind::NotFound);

    system
        .remove_access_token("default", "movies", "neo4j")
        .await
        .expect("remove");
    assert_eq!(
        system
            .get_access_token("default", "1234", "neo4j")
            .await
            .expect_err("removed")
            .kind(),
        ErrorKind::NotFound
    );
}
