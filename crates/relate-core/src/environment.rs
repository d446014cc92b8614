use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use relate_domain::{
    DbmsConfig, EnvironmentConfig, EnvironmentType, RegistryError, RegistryResult,
    DEFAULT_ENVIRONMENT_NAME,
};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::SystemPaths;
use crate::error::IntoRegistry;
use crate::fs::{create_json_exclusive, read_json, run_blocking};
use crate::lock::ResourceLocks;
use crate::projects::ProjectRegistry;

const JSON_FILE_EXTENSION: &str = "json";

/// A loaded environment config plus the paths its registries operate on.
#[derive(Debug, Clone)]
pub struct Environment {
    config: EnvironmentConfig,
    config_path: PathBuf,
    paths: SystemPaths,
    locks: ResourceLocks,
}

impl Environment {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.config.id
    }

    #[must_use]
    pub fn kind(&self) -> EnvironmentType {
        self.config.kind
    }

    #[must_use]
    pub fn user(&self) -> &str {
        &self.config.user
    }

    #[must_use]
    pub fn config(&self) -> &EnvironmentConfig {
        &self.config
    }

    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    #[must_use]
    pub fn neo4j_data_path(&self) -> &Path {
        self.config
            .neo4j_data_path
            .as_deref()
            .unwrap_or_else(|| self.paths.data())
    }

    /// Looks a database instance up by id, then by name.
    pub fn dbms(&self, id_or_name: &str) -> RegistryResult<&DbmsConfig> {
        self.config.find_dbms(id_or_name).ok_or_else(|| {
            RegistryError::not_found(format!(
                "DBMS \"{id_or_name}\" not found in environment \"{}\"",
                self.config.id
            ))
        })
    }

    #[must_use]
    pub fn list_dbmss(&self) -> Vec<&DbmsConfig> {
        self.config.dbmss.values().collect()
    }

    #[must_use]
    pub fn projects(&self) -> ProjectRegistry {
        ProjectRegistry::new(self.paths.projects_dir(), self.locks.clone())
    }
}

/// Read-through view of the environments directory, keyed by environment id.
#[derive(Debug)]
pub struct EnvironmentRegistry {
    paths: SystemPaths,
    locks: ResourceLocks,
    cache: RwLock<BTreeMap<String, Environment>>,
}

impl EnvironmentRegistry {
    pub fn new(paths: SystemPaths, locks: ResourceLocks) -> Self {
        Self {
            paths,
            locks,
            cache: RwLock::new(BTreeMap::new()),
        }
    }

    fn default_config_path(&self) -> PathBuf {
        self.paths
            .environments_dir()
            .join(format!("{DEFAULT_ENVIRONMENT_NAME}.{JSON_FILE_EXTENSION}"))
    }

    fn instance(&self, config: EnvironmentConfig, config_path: PathBuf) -> Environment {
        Environment {
            config,
            config_path,
            paths: self.paths.clone(),
            locks: self.locks.clone(),
        }
    }

    /// Rebuilds the cache from disk; returns the discovered ids.
    pub async fn discover(&self) -> RegistryResult<Vec<String>> {
        let dir = self.paths.environments_dir();
        let mut cache = self.cache.write().await;
        cache.clear();

        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(dir = %dir.display(), "environments directory missing");
                return Ok(Vec::new());
            }
            Err(err) => {
                return Err(RegistryError::invalid_argument(format!(
                    "failed to read {}: {err}",
                    dir.display()
                )))
            }
        };

        let mut config_files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .or_invalid(|| format!("failed to read {}", dir.display()))?
        {
            let path = entry.path();
            let is_json = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(JSON_FILE_EXTENSION));
            if is_json && path.is_file() {
                config_files.push(path);
            }
        }
        config_files.sort();

        for path in config_files {
            let read_path = path.clone();
            let mut config: EnvironmentConfig = run_blocking(move || read_json(&read_path))
                .await
                .or_invalid(|| format!("invalid environment config {}", path.display()))?;
            config.apply_defaults(self.paths.data());
            let stem = path.file_stem().and_then(|stem| stem.to_str());
            if stem != Some(config.id.as_str()) {
                warn!(
                    file = %path.display(),
                    id = %config.id,
                    "environment id does not match its file name"
                );
            }
            let id = config.id.clone();
            let previous = cache.insert(id.clone(), self.instance(config, path));
            if previous.is_some() {
                warn!(id = %id, "duplicate environment id; last file wins");
            }
        }

        let ids: Vec<String> = cache.keys().cloned().collect();
        debug!(count = ids.len(), "discovered environments");
        Ok(ids)
    }

    /// Rediscovers, then returns the named environment or the default one.
    pub async fn get(&self, id: Option<&str>) -> RegistryResult<Environment> {
        self.discover().await?;
        let id = id.unwrap_or(DEFAULT_ENVIRONMENT_NAME);
        self.cache
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::not_found(format!("Environment \"{id}\" not found")))
    }

    pub async fn list(&self) -> RegistryResult<Vec<Environment>> {
        self.discover().await?;
        Ok(self.cache.read().await.values().cloned().collect())
    }

    /// Writes the default LOCAL environment, refusing to overwrite one.
    pub async fn bootstrap(&self) -> RegistryResult<Environment> {
        let config_path = self.default_config_path();
        let _guard = self
            .locks
            .acquire(&config_path)
            .await
            .or_invalid(|| "failed to lock default environment".to_string())?;

        let exists_error = || {
            RegistryError::target_exists(format!(
                "Environment \"{DEFAULT_ENVIRONMENT_NAME}\" exists, will not overwrite"
            ))
        };
        let cached = self
            .cache
            .read()
            .await
            .contains_key(DEFAULT_ENVIRONMENT_NAME);
        if cached || tokio::fs::try_exists(&config_path).await.unwrap_or(false) {
            return Err(exists_error());
        }

        let config = EnvironmentConfig::local_default(self.paths.data().to_path_buf());
        let (write_path, write_config) = (config_path.clone(), config.clone());
        let created = run_blocking(move || create_json_exclusive(&write_path, &write_config))
            .await
            .or_invalid(|| format!("failed to write {}", config_path.display()))?;
        if !created {
            return Err(exists_error());
        }

        let environment = self.instance(config, config_path);
        self.cache
            .write()
            .await
            .insert(DEFAULT_ENVIRONMENT_NAME.to_string(), environment.clone());
        info!(path = %environment.config_path.display(), "bootstrapped default environment");
        Ok(environment)
    }
}
