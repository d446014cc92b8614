use std::fs;

use relate_core::{ErrorKind, ExtensionType};

mod common;

use common::{
    bootstrapped_system, cache_distribution, manifest_json, write_extension_tgz,
    write_extension_zip,
};

#[tokio::test]
async fn wildcard_install_succeeds_once() {
    let (_temp, system) = bootstrapped_system().await;
    cache_distribution(
        &system,
        "browser@wildcard",
        &manifest_json("browser", "*", "STATIC"),
    );

    let installed = system
        .install_extension("browser", Some("*"))
        .await
        .expect("install");
    assert_eq!(installed.version, "*");
    assert_eq!(installed.kind, ExtensionType::Static);
    assert!(installed.dist.join("dist/index.html").is_file());

    let err = system
        .install_extension("browser", Some("*"))
        .await
        .expect_err("second install");
    assert_eq!(err.kind(), ErrorKind::ExtensionExists);
    assert_eq!(
        system
            .list_installed_extensions()
            .await
            .expect("installed")
            .len(),
        1
    );
}

#[tokio::test]
async fn url_spec_is_not_supported_and_touches_nothing() {
    let (_temp, system) = bootstrapped_system().await;
    let extensions_dir = system.paths().extensions_dir();
    let cache_dir = system.paths().extensions_cache_dir();

    let err = system
        .install_extension("browser", Some("https://example.com/x"))
        .await
        .expect_err("url");
    assert_eq!(err.kind(), ErrorKind::NotSupported);
    assert_eq!(fs::read_dir(&extensions_dir).expect("data").count(), 0);
    assert_eq!(fs::read_dir(&cache_dir).expect("cache").count(), 0);
}

#[tokio::test]
async fn archive_path_is_extracted_then_installed() {
    let (temp, system) = bootstrapped_system().await;
    let archive = temp.path().join("daemon-1.4.2.tgz");
    write_extension_tgz(&archive, &manifest_json("daemon", "1.4.2", "NODE"));

    let archive_spec = archive.to_string_lossy().into_owned();
    let installed = system
        .install_extension("daemon", Some(&archive_spec))
        .await
        .expect("install from archive");
    assert_eq!(installed.version, "1.4.2");
    assert_eq!(
        installed.dist,
        system.paths().extensions_dir().join("NODE").join("daemon")
    );
    assert!(installed.dist.join("relate.manifest.json").is_file());

    let cached = system.extensions().list_cached().await.expect("cached");
    assert_eq!(cached.len(), 1);
    assert_eq!(
        cached[0].dist,
        system.paths().extensions_cache_dir().join("daemon@1.4.2")
    );
}

#[tokio::test]
async fn zip_archives_install_too() {
    let (temp, system) = bootstrapped_system().await;
    let archive = temp.path().join("graph-app.zip");
    write_extension_zip(&archive, &manifest_json("graph-app", "2.0.0", "STATIC"));

    let installed = system
        .install_extension("graph-app", Some(&archive.to_string_lossy()))
        .await
        .expect("install zip");
    assert!(installed.dist.join("dist/index.js").is_file());
}

#[tokio::test]
async fn archive_without_manifest_is_invalid() {
    let (temp, system) = bootstrapped_system().await;
    let archive = temp.path().join("junk.tgz");
    write_extension_tgz(&archive, "{ not json");
    let err = system
        .install_extension("junk", Some(&archive.to_string_lossy()))
        .await
        .expect_err("bad archive");
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert!(system
        .list_installed_extensions()
        .await
        .expect("installed")
        .is_empty());
}

#[tokio::test]
async fn uninstall_then_reinstall() {
    let (_temp, system) = bootstrapped_system().await;
    cache_distribution(
        &system,
        "browser@1.0.0",
        &manifest_json("browser", "1.0.0", "STATIC"),
    );
    system
        .install_extension("browser", Some("1.0.0"))
        .await
        .expect("install");

    let removed = system
        .uninstall_extension("browser")
        .await
        .expect("uninstall");
    assert_eq!(removed.len(), 1);
    assert!(system
        .list_installed_extensions()
        .await
        .expect("installed")
        .is_empty());

    system
        .install_extension("browser", Some("1.0.0"))
        .await
        .expect("reinstall");
}
