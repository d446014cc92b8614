use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use relate_domain::{
    ExtensionMeta, RegistryError, RegistryResult, RequestedVersion, EXTENSION_MANIFEST_FILE,
    WILDCARD_VERSION,
};
use tracing::{debug, info, warn};

use super::discover::load_distribution;
use super::ExtensionRegistry;
use crate::archive::{extract_archive, locate_content_root};
use crate::config::absolutize;
use crate::error::IntoRegistry;
use crate::fs::{copy_dir_all, remove_dir_all_writable, run_blocking};

fn is_http_url(spec: &str) -> bool {
    match url::Url::parse(spec) {
        Ok(url) => matches!(url.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

impl ExtensionRegistry {
    /// Installs `name` at `version` (defaults to `*`).
    ///
    /// The version is resolved in order: URL (unsupported), `*` or a version
    /// matched against the distribution cache, then a local archive path.
    pub async fn install(
        &self,
        name: &str,
        version: Option<&str>,
    ) -> RegistryResult<ExtensionMeta> {
        let spec = version.unwrap_or(WILDCARD_VERSION).trim();
        if spec.is_empty() {
            return Err(RegistryError::invalid_argument("Version must be specified"));
        }
        if is_http_url(spec) {
            return Err(RegistryError::not_supported(format!(
                "fetch and install extension {name}@{spec}"
            )));
        }

        let spec_path = absolutize(PathBuf::from(spec))
            .or_invalid(|| format!("cannot resolve {spec}"))?;
        let on_disk = tokio::fs::metadata(&spec_path).await.ok();

        if let Some(requested) = RequestedVersion::parse(spec).filter(|_| on_disk.is_none()) {
            let dist = self.find_cached(name, &requested).await?;
            return self.install_distribution(dist).await;
        }
        if on_disk.is_some_and(|meta| meta.is_file()) {
            let dist = self.extract_to_cache(&spec_path).await?;
            if dist.name != name {
                warn!(
                    requested = %name,
                    found = %dist.name,
                    "archive contains a different extension"
                );
            }
            return self.install_distribution(dist).await;
        }
        Err(RegistryError::invalid_argument(
            "Provided version argument is not valid semver, url or path.",
        ))
    }

    async fn find_cached(
        &self,
        name: &str,
        requested: &RequestedVersion,
    ) -> RegistryResult<ExtensionMeta> {
        let same_name: Vec<ExtensionMeta> = self
            .list_cached()
            .await?
            .into_iter()
            .filter(|dist| dist.name == name)
            .collect();
        if same_name.is_empty() {
            return Err(RegistryError::not_supported(format!(
                "no cached distribution of {name}; fetch and install {name}@{requested}"
            )));
        }
        same_name
            .into_iter()
            .find(|dist| dist.satisfies(name, requested))
            .ok_or_else(|| {
                RegistryError::not_supported(format!(
                    "{name}@{requested} is not cached; fetch and install {name}@{requested}"
                ))
            })
    }

    async fn extract_to_cache(&self, archive: &Path) -> RegistryResult<ExtensionMeta> {
        let cache = self.paths.extensions_cache_dir();
        let archive_path = archive.to_path_buf();
        let meta = run_blocking(move || unpack_distribution(&archive_path, &cache))
            .await
            .or_invalid(|| format!("failed to extract {}", archive.display()))?;
        debug!(extension = %meta.name, dist = %meta.dist.display(), "cached extension archive");
        Ok(meta)
    }

    async fn install_distribution(&self, dist: ExtensionMeta) -> RegistryResult<ExtensionMeta> {
        let target = self
            .paths
            .extensions_dir()
            .join(dist.kind.dir_name())
            .join(&dist.name);
        let _guard = self
            .locks
            .acquire(&target)
            .await
            .or_invalid(|| format!("failed to lock {}", target.display()))?;

        if !tokio::fs::try_exists(&dist.dist).await.unwrap_or(false) {
            return Err(RegistryError::ambiguous_target(format!(
                "Path to extension does not exist \"{}\"",
                dist.dist.display()
            )));
        }
        if tokio::fs::try_exists(&target).await.unwrap_or(false) {
            return Err(RegistryError::extension_exists(format!(
                "{} is already installed",
                dist.name
            )));
        }

        let (source, dest) = (dist.dist.clone(), target.clone());
        run_blocking(move || copy_into_place(&source, &dest))
            .await
            .or_invalid(|| format!("failed to install {}", dist.name))?;
        info!(
            extension = %dist.name,
            kind = %dist.kind,
            version = %dist.version,
            "installed extension"
        );
        Ok(ExtensionMeta {
            dist: target,
            ..dist
        })
    }
}

fn cache_dir_name(meta: &ExtensionMeta) -> String {
    if meta.is_wildcard() {
        format!("{}@wildcard", meta.name)
    } else {
        format!("{}@{}", meta.name, meta.version)
    }
}

/// Unpacks an archive into the cache as `<name>@<version>`, replacing an older copy.
fn unpack_distribution(archive: &Path, cache: &Path) -> Result<ExtensionMeta> {
    fs::create_dir_all(cache).with_context(|| format!("failed to create {}", cache.display()))?;
    let staging = tempfile::Builder::new()
        .prefix(".extract-")
        .tempdir_in(cache)
        .with_context(|| format!("failed to stage extraction under {}", cache.display()))?;
    extract_archive(archive, staging.path())?;

    let root = locate_content_root(staging.path(), EXTENSION_MANIFEST_FILE)?
        .ok_or_else(|| {
            RegistryError::invalid_argument(format!(
                "{} does not contain {EXTENSION_MANIFEST_FILE}",
                archive.display()
            ))
        })?;
    let meta = load_distribution(&root).map_err(|reason| {
        RegistryError::invalid_argument(format!(
            "invalid extension archive {}: {reason}",
            archive.display()
        ))
    })?;

    let dest = cache.join(cache_dir_name(&meta));
    remove_dir_all_writable(&dest)?;
    fs::rename(&root, &dest)
        .with_context(|| format!("failed to move extracted files to {}", dest.display()))?;
    Ok(ExtensionMeta { dist: dest, ..meta })
}

/// Copies into a hidden sibling first so `dest` appears complete or not at all.
fn copy_into_place(source: &Path, dest: &Path) -> Result<()> {
    let parent = dest
        .parent()
        .with_context(|| format!("{} has no parent directory", dest.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
    let staging = tempfile::Builder::new()
        .prefix(".install-")
        .tempdir_in(parent)
        .with_context(|| format!("failed to stage install under {}", parent.display()))?;
    copy_dir_all(source, staging.path())?;
    fs::rename(staging.path(), dest)
        .with_context(|| format!("failed to move install into {}", dest.display()))?;
    Ok(())
}
