use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use relate_domain::{EXTENSION_DIR_NAME, PROJECTS_DIR_NAME};
use tracing::debug;

pub const DATA_HOME_ENV: &str = "RELATE_DATA_HOME";
pub const CONFIG_HOME_ENV: &str = "RELATE_CONFIG_HOME";
pub const CACHE_HOME_ENV: &str = "RELATE_CACHE_HOME";

const APP_DIR_NAME: &str = "relate";
const ENVIRONMENTS_DIR_NAME: &str = "environments";
const DBMS_DIR_NAME: &str = "dbmss";
const LOCKS_DIR_NAME: &str = "locks";
const KNOWN_CONNECTIONS_FILE: &str = "known_connections.json";

#[derive(Debug, Clone)]
pub(crate) struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    pub(crate) fn capture() -> Self {
        Self {
            vars: env::vars().collect(),
        }
    }

    pub(crate) fn var(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    #[cfg(test)]
    pub(crate) fn testing(pairs: &[(&str, &str)]) -> Self {
        let vars = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Self { vars }
    }
}

/// The three per-user roots everything else is derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemPaths {
    data: PathBuf,
    config: PathBuf,
    cache: PathBuf,
}

impl SystemPaths {
    /// Resolves roots from `RELATE_*_HOME` overrides, falling back to the platform dirs.
    ///
    /// # Errors
    /// Returns an error when no override is set and the platform directory is unknown.
    pub fn from_env() -> Result<Self> {
        Self::from_snapshot(&EnvSnapshot::capture())
    }

    pub(crate) fn from_snapshot(snapshot: &EnvSnapshot) -> Result<Self> {
        let resolve = |key: &str, platform: Option<PathBuf>, label: &str| -> Result<PathBuf> {
            if let Some(value) = snapshot.var(key) {
                return absolutize(PathBuf::from(value));
            }
            platform
                .map(|base| base.join(APP_DIR_NAME))
                .ok_or_else(|| anyhow!("unable to determine {label} directory"))
        };
        Ok(Self {
            data: resolve(DATA_HOME_ENV, dirs_next::data_dir(), "data")?,
            config: resolve(CONFIG_HOME_ENV, dirs_next::config_dir(), "config")?,
            cache: resolve(CACHE_HOME_ENV, dirs_next::cache_dir(), "cache")?,
        })
    }

    pub fn with_roots(
        data: impl Into<PathBuf>,
        config: impl Into<PathBuf>,
        cache: impl Into<PathBuf>,
    ) -> Self {
        Self {
            data: data.into(),
            config: config.into(),
            cache: cache.into(),
        }
    }

    /// Lays out `data/`, `config/` and `cache/` under one directory.
    pub fn under(root: &Path) -> Self {
        Self::with_roots(root.join("data"), root.join("config"), root.join("cache"))
    }

    #[must_use]
    pub fn data(&self) -> &Path {
        &self.data
    }

    #[must_use]
    pub fn config(&self) -> &Path {
        &self.config
    }

    #[must_use]
    pub fn cache(&self) -> &Path {
        &self.cache
    }

    #[must_use]
    pub fn environments_dir(&self) -> PathBuf {
        self.config.join(ENVIRONMENTS_DIR_NAME)
    }

    #[must_use]
    pub fn dbmss_dir(&self) -> PathBuf {
        self.data.join(DBMS_DIR_NAME)
    }

    #[must_use]
    pub fn dbmss_cache_dir(&self) -> PathBuf {
        self.cache.join(DBMS_DIR_NAME)
    }

    #[must_use]
    pub fn extensions_dir(&self) -> PathBuf {
        self.data.join(EXTENSION_DIR_NAME)
    }

    #[must_use]
    pub fn extensions_cache_dir(&self) -> PathBuf {
        self.cache.join(EXTENSION_DIR_NAME)
    }

    #[must_use]
    pub fn projects_dir(&self) -> PathBuf {
        self.data.join(PROJECTS_DIR_NAME)
    }

    #[must_use]
    pub fn locks_dir(&self) -> PathBuf {
        self.data.join(LOCKS_DIR_NAME)
    }

    #[must_use]
    pub fn known_connections_file(&self) -> PathBuf {
        self.data.join(KNOWN_CONNECTIONS_FILE)
    }

    /// Creates every directory and seeds the known-connections store.
    ///
    /// # Errors
    /// Returns an error if a directory or the store file cannot be created.
    pub async fn ensure(&self) -> Result<()> {
        let dirs = [
            self.data.clone(),
            self.config.clone(),
            self.cache.clone(),
            self.environments_dir(),
            self.dbmss_dir(),
            self.dbmss_cache_dir(),
            self.extensions_dir(),
            self.extensions_cache_dir(),
            self.projects_dir(),
            self.locks_dir(),
        ];
        for dir in &dirs {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        let known = self.known_connections_file();
        if !tokio::fs::try_exists(&known).await.unwrap_or(false) {
            tokio::fs::write(&known, b"{}\n")
                .await
                .with_context(|| format!("failed to create {}", known.display()))?;
            debug!(path = %known.display(), "seeded known connections store");
        }
        Ok(())
    }
}

pub(crate) fn absolutize(path: PathBuf) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(env::current_dir()?.join(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_take_precedence() {
        let snapshot = EnvSnapshot::testing(&[
            (DATA_HOME_ENV, "/srv/relate/data"),
            (CONFIG_HOME_ENV, "/srv/relate/config"),
            (CACHE_HOME_ENV, "/srv/relate/cache"),
        ]);
        let paths = SystemPaths::from_snapshot(&snapshot).expect("paths");
        assert_eq!(paths.data(), Path::new("/srv/relate/data"));
        assert_eq!(
            paths.environments_dir(),
            Path::new("/srv/relate/config/environments")
        );
        assert_eq!(
            paths.extensions_cache_dir(),
            Path::new("/srv/relate/cache/extensions")
        );
        assert_eq!(
            paths.known_connections_file(),
            Path::new("/srv/relate/data/known_connections.json")
        );
    }

    #[test]
    fn blank_override_is_ignored() {
        let snapshot = EnvSnapshot::testing(&[(DATA_HOME_ENV, "  ")]);
        assert_eq!(snapshot.var(DATA_HOME_ENV), None);
    }

    #[test]
    fn relative_override_is_absolutized() {
        let snapshot = EnvSnapshot::testing(&[
            (DATA_HOME_ENV, "rel/data"),
            (CONFIG_HOME_ENV, "/abs/config"),
            (CACHE_HOME_ENV, "/abs/cache"),
        ]);
        let paths = SystemPaths::from_snapshot(&snapshot).expect("paths");
        assert!(paths.data().is_absolute());
        assert!(paths.data().ends_with("rel/data"));
    }

    #[tokio::test]
    async fn ensure_creates_layout_and_store() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = SystemPaths::under(temp.path());
        paths.ensure().await.expect("ensure");
        assert!(paths.environments_dir().is_dir());
        assert!(paths.projects_dir().is_dir());
        assert_eq!(
            std::fs::read_to_string(paths.known_connections_file()).expect("store"),
            "{}\n"
        );

        std::fs::write(paths.known_connections_file(), "{\"a\":{}}").expect("write");
        paths.ensure().await.expect("ensure again");
        assert_eq!(
            std::fs::read_to_string(paths.known_connections_file()).expect("store"),
            "{\"a\":{}}"
        );
    }
}
