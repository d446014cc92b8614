#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use flate2::{write::GzEncoder, Compression};
use relate_core::{System, SystemPaths};
use serde_json::Value;
use tempfile::TempDir;

/// A bootstrapped installation rooted in a fresh temp dir.
pub async fn bootstrapped_system() -> (TempDir, System) {
    relate_core::logging::init_test_tracing();
    let temp = tempfile::Builder::new()
        .prefix("relate-test")
        .tempdir()
        .expect("tempdir");
    let system = System::init(SystemPaths::under(temp.path()))
        .await
        .expect("init");
    system.bootstrap().await.expect("bootstrap");
    (temp, system)
}

pub fn write_environment(system: &System, id: &str, value: &Value) {
    let path = system.paths().environments_dir().join(format!("{id}.json"));
    fs::write(path, serde_json::to_vec_pretty(value).expect("encode")).expect("write env");
}

pub fn manifest_json(name: &str, version: &str, kind: &str) -> String {
    format!(r#"{{"name":"{name}","version":"{version}","type":"{kind}"}}"#)
}

/// Writes a `.tgz` whose entries sit under `package/`, the way npm packs them.
pub fn write_extension_tgz(path: &Path, manifest: &str) {
    let file = File::create(path).expect("archive");
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    let entries: [(&str, &[u8]); 2] = [
        ("package/relate.manifest.json", manifest.as_bytes()),
        ("package/dist/index.html", b"<html></html>"),
    ];
    for (name, contents) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, name, contents)
            .expect("append");
    }
    builder
        .into_inner()
        .expect("finish tar")
        .finish()
        .expect("finish gz");
}

pub fn write_extension_zip(path: &Path, manifest: &str) {
    let file = File::create(path).expect("archive");
    let mut writer = zip::ZipWriter::new(file);
    let options = zip::write::FileOptions::default();
    writer
        .start_file("relate.manifest.json", options)
        .expect("manifest entry");
    writer.write_all(manifest.as_bytes()).expect("manifest");
    writer
        .start_file("dist/index.js", options)
        .expect("main entry");
    writer.write_all(b"console.log('hi')").expect("main");
    writer.finish().expect("finish zip");
}

/// Places an unpacked distribution straight into the extension cache.
pub fn cache_distribution(system: &System, dir_name: &str, manifest: &str) {
    let dist = system.paths().extensions_cache_dir().join(dir_name);
    fs::create_dir_all(dist.join("dist")).expect("dist");
    fs::write(dist.join("relate.manifest.json"), manifest).expect("manifest");
    fs::write(dist.join("dist/index.html"), "<html></html>").expect("index");
}
