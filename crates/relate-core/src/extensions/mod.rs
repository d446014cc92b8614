use relate_domain::{ExtensionMeta, ExtensionType, RegistryError, RegistryResult};
use tracing::info;

use crate::config::SystemPaths;
use crate::error::IntoRegistry;
use crate::fs::{remove_dir_all_writable, run_blocking};
use crate::lock::ResourceLocks;

mod discover;
mod install;

use discover::discover_distributions;

/// Installed extensions under `<data>/extensions/<TYPE>/<name>` plus the distribution cache.
#[derive(Debug, Clone)]
pub struct ExtensionRegistry {
    paths: SystemPaths,
    locks: ResourceLocks,
}

impl ExtensionRegistry {
    pub fn new(paths: SystemPaths, locks: ResourceLocks) -> Self {
        Self { paths, locks }
    }

    pub async fn list_installed(&self) -> RegistryResult<Vec<ExtensionMeta>> {
        let root = self.paths.extensions_dir();
        run_blocking(move || {
            let mut all = Vec::new();
            for kind in ExtensionType::ALL {
                all.extend(discover_distributions(&root.join(kind.dir_name()))?);
            }
            Ok(all)
        })
        .await
        .or_invalid(|| "failed to list installed extensions".to_string())
    }

    /// Distributions unpacked into the cache, available to `install`.
    pub async fn list_cached(&self) -> RegistryResult<Vec<ExtensionMeta>> {
        let cache = self.paths.extensions_cache_dir();
        run_blocking(move || discover_distributions(&cache))
            .await
            .or_invalid(|| "failed to list cached extensions".to_string())
    }

    /// Removes every installed distribution called `name`.
    pub async fn uninstall(&self, name: &str) -> RegistryResult<Vec<ExtensionMeta>> {
        let targets: Vec<ExtensionMeta> = self
            .list_installed()
            .await?
            .into_iter()
            .filter(|ext| ext.name == name)
            .collect();
        if targets.is_empty() {
            return Err(RegistryError::invalid_argument(format!(
                "Extension {name} is not installed"
            )));
        }

        for ext in &targets {
            let _guard = self
                .locks
                .acquire(&ext.dist)
                .await
                .or_invalid(|| format!("failed to lock {}", ext.dist.display()))?;
            let dist = ext.dist.clone();
            run_blocking(move || remove_dir_all_writable(&dist))
                .await
                .or_invalid(|| format!("failed to remove {}", ext.dist.display()))?;
            info!(
                extension = %ext.name,
                kind = %ext.kind,
                version = %ext.version,
                "uninstalled extension"
            );
        }
        Ok(targets)
    }
}
