use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};
use relate_domain::{ExtensionManifest, ExtensionMeta, ManifestIssue, EXTENSION_MANIFEST_FILE};
use tracing::debug;

use crate::fs::read_json;

/// Why a directory was not accepted as an extension distribution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub(crate) enum DistributionSkip {
    #[error("no relate.manifest.json")]
    MissingManifest,
    #[error("unreadable manifest: {0}")]
    Unreadable(String),
    #[error(transparent)]
    Invalid(#[from] ManifestIssue),
}

/// Reads the manifest at the root of a distribution directory.
pub(crate) fn load_distribution(dir: &Path) -> Result<ExtensionMeta, DistributionSkip> {
    let manifest_path = dir.join(EXTENSION_MANIFEST_FILE);
    if !manifest_path.is_file() {
        return Err(DistributionSkip::MissingManifest);
    }
    let manifest: ExtensionManifest = read_json(&manifest_path)
        .map_err(|err| DistributionSkip::Unreadable(format!("{err:#}")))?;
    manifest.validate()?;
    Ok(ExtensionMeta::from_manifest(manifest, dir.to_path_buf()))
}

/// Valid distributions directly below `dir`, sorted by directory name.
///
/// Hidden entries are staging areas and never distributions.
pub(crate) fn discover_distributions(dir: &Path) -> Result<Vec<ExtensionMeta>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err).with_context(|| format!("failed to read {}", dir.display())),
    };
    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to read {}", dir.display()))?;
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        let path = entry.path();
        if !hidden && path.is_dir() {
            paths.push(path);
        }
    }
    paths.sort();

    let mut found = Vec::with_capacity(paths.len());
    for path in paths {
        match load_distribution(&path) {
            Ok(meta) => found.push(meta),
            Err(reason) => {
                debug!(path = %path.display(), %reason, "skipping extension directory");
            }
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use relate_domain::ExtensionType;

    fn write_manifest(dir: &Path, body: &str) {
        fs::create_dir_all(dir).expect("dir");
        fs::write(dir.join(EXTENSION_MANIFEST_FILE), body).expect("manifest");
    }

    #[test]
    fn discovers_valid_distributions_only() {
        let temp = tempfile::tempdir().expect("tempdir");
        write_manifest(
            &temp.path().join("browser"),
            r#"{"name":"browser","version":"1.2.0","type":"STATIC"}"#,
        );
        write_manifest(
            &temp.path().join("daemon"),
            r#"{"name":"daemon","version":"*","type":"NODE","main":"index.js"}"#,
        );
        write_manifest(&temp.path().join("broken"), "{");
        write_manifest(
            &temp.path().join("bad-version"),
            r#"{"name":"x","version":"one"}"#,
        );
        write_manifest(
            &temp.path().join(".install-123"),
            r#"{"name":"hidden","version":"*"}"#,
        );
        fs::create_dir_all(temp.path().join("empty")).expect("empty");

        let found = discover_distributions(temp.path()).expect("discover");
        let names: Vec<_> = found.iter().map(|meta| meta.name.as_str()).collect();
        assert_eq!(names, vec!["browser", "daemon"]);
        assert_eq!(found[1].kind, ExtensionType::Node);
        assert_eq!(found[1].main.as_deref(), Some("index.js"));
        assert_eq!(found[0].dist, temp.path().join("browser"));
    }

    #[test]
    fn missing_directory_is_empty() {
        let temp = tempfile::tempdir().expect("tempdir");
        assert!(discover_distributions(&temp.path().join("nope"))
            .expect("discover")
            .is_empty());
    }

    #[test]
    fn skip_reasons_are_typed() {
        let temp = tempfile::tempdir().expect("tempdir");
        assert_eq!(
            load_distribution(temp.path()),
            Err(DistributionSkip::MissingManifest)
        );
        write_manifest(temp.path(), r#"{"name":"","version":"*"}"#);
        assert_eq!(
            load_distribution(temp.path()),
            Err(DistributionSkip::Invalid(ManifestIssue::EmptyName))
        );
    }
}
