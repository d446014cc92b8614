use std::sync::Arc;

use relate_core::{
    ControlFuture, DbmsControl, EnvironmentType, ErrorKind, System, SystemPaths,
};
use serde_json::json;

mod common;

use common::{bootstrapped_system, write_environment};

#[tokio::test]
async fn fresh_install_bootstraps_default_once() {
    relate_core::logging::init_test_tracing();
    let temp = tempfile::tempdir().expect("tempdir");
    let system = System::init(SystemPaths::under(temp.path()))
        .await
        .expect("init");
    assert_eq!(
        system
            .get_environment(None)
            .await
            .expect_err("empty")
            .kind(),
        ErrorKind::NotFound
    );

    let env = system.bootstrap().await.expect("bootstrap");
    assert_eq!(env.id(), "default");
    assert_eq!(env.kind(), EnvironmentType::Local);
    assert_eq!(env.neo4j_data_path(), system.paths().data());

    let err = system.bootstrap().await.expect_err("again");
    assert_eq!(err.kind(), ErrorKind::TargetExists);
}

#[tokio::test]
async fn disk_is_authoritative_between_calls() {
    let (_temp, system) = bootstrapped_system().await;
    write_environment(
        &system,
        "remote",
        &json!({
            "id": "remote",
            "type": "REMOTE",
            "user": "alice",
            "neo4jDataPath": "/srv/neo4j"
        }),
    );
    let remote = system
        .get_environment(Some("remote"))
        .await
        .expect("remote");
    assert_eq!(remote.kind(), EnvironmentType::Remote);
    assert_eq!(remote.neo4j_data_path(), std::path::Path::new("/srv/neo4j"));

    let mut ids: Vec<String> = system
        .environments()
        .list()
        .await
        .expect("list")
        .iter()
        .map(|env| env.id().to_string())
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["default".to_string(), "remote".to_string()]);

    std::fs::remove_file(remote.config_path()).expect("remove");
    assert_eq!(
        system
            .get_environment(Some("remote"))
            .await
            .expect_err("gone")
            .kind(),
        ErrorKind::NotFound
    );
}

/// Records calls instead of spawning anything.
struct Recording(std::sync::Mutex<Vec<String>>);

impl DbmsControl for Recording {
    fn start<'a>(&'a self, dbms_id: &'a str) -> ControlFuture<'a> {
        Box::pin(async move {
            self.0.lock().expect("calls").push(format!("start {dbms_id}"));
            Ok(true)
        })
    }

    fn stop<'a>(&'a self, dbms_id: &'a str) -> ControlFuture<'a> {
        Box::pin(async move {
            self.0.lock().expect("calls").push(format!("stop {dbms_id}"));
            Ok(true)
        })
    }

    fn status<'a>(&'a self, dbms_id: &'a str) -> ControlFuture<'a> {
        Box::pin(async move {
            self.0.lock().expect("calls").push(format!("status {dbms_id}"));
            Ok(false)
        })
    }
}

#[tokio::test]
async fn dbms_commands_go_through_control_by_resolved_id() {
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
    let control = Arc::new(Recording(std::sync::Mutex::new(Vec::new())));
    let system = system.with_dbms_control(control.clone());

    assert!(system.start_dbms(None, "movies").await.expect("start"));
    assert!(!system.dbms_status(None, "1234").await.expect("status"));
    assert!(system
        .stop_dbms(Some("default"), "movies")
        .await
        .expect("stop"));
    assert_eq!(
        system
            .start_dbms(None, "unknown")
            .await
            .expect_err("unknown")
            .kind(),
        ErrorKind::NotFound
    );
    assert_eq!(
        *control.0.lock().expect("calls"),
        vec!["start 1234", "status 1234", "stop 1234"]
    );
}
