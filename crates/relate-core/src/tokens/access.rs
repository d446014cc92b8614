use std::collections::BTreeMap;
use std::path::PathBuf;

use relate_domain::{RegistryError, RegistryResult};
use tracing::info;

use crate::error::IntoRegistry;
use crate::fs::{read_json, run_blocking, write_json_atomic};
use crate::lock::ResourceLocks;

/// `environment id -> dbms id -> dbms user -> token`
type KnownConnections = BTreeMap<String, BTreeMap<String, BTreeMap<String, String>>>;

/// Long-lived access tokens kept in the known-connections document.
#[derive(Debug, Clone)]
pub struct AccessTokenRegistry {
    store: PathBuf,
    locks: ResourceLocks,
}

impl AccessTokenRegistry {
    pub fn new(store: impl Into<PathBuf>, locks: ResourceLocks) -> Self {
        Self {
            store: store.into(),
            locks,
        }
    }

    async fn load(&self) -> RegistryResult<KnownConnections> {
        if !tokio::fs::try_exists(&self.store).await.unwrap_or(false) {
            return Ok(KnownConnections::new());
        }
        let path = self.store.clone();
        run_blocking(move || read_json(&path))
            .await
            .or_invalid(|| format!("invalid token store {}", self.store.display()))
    }

    async fn save(&self, connections: KnownConnections) -> RegistryResult<()> {
        let path = self.store.clone();
        run_blocking(move || write_json_atomic(&path, &connections))
            .await
            .or_invalid(|| format!("failed to write {}", self.store.display()))
    }

    /// Stores `token` for the triple, replacing any previous one.
    pub async fn register(
        &self,
        environment_id: &str,
        dbms_id: &str,
        dbms_user: &str,
        token: &str,
    ) -> RegistryResult<String> {
        let _guard = self
            .locks
            .acquire(&self.store)
            .await
            .or_invalid(|| "failed to lock token store".to_string())?;
        let mut connections = self.load().await?;
        connections
            .entry(environment_id.to_string())
            .or_default()
            .entry(dbms_id.to_string())
            .or_default()
            .insert(dbms_user.to_string(), token.to_string());
        self.save(connections).await?;
        info!(
            environment = %environment_id,
            dbms = %dbms_id,
            user = %dbms_user,
            "registered access token"
        );
        Ok(token.to_string())
    }

    pub async fn lookup(
        &self,
        environment_id: &str,
        dbms_id: &str,
        dbms_user: &str,
    ) -> RegistryResult<String> {
        self.load()
            .await?
            .get(environment_id)
            .and_then(|dbmss| dbmss.get(dbms_id))
            .and_then(|users| users.get(dbms_user))
            .cloned()
            .ok_or_else(|| not_registered(environment_id, dbms_id, dbms_user))
    }

    /// Drops the token for the triple along with any parent left empty.
    pub async fn remove(
        &self,
        environment_id: &str,
        dbms_id: &str,
        dbms_user: &str,
    ) -> RegistryResult<String> {
        let _guard = self
            .locks
            .acquire(&self.store)
            .await
            .or_invalid(|| "failed to lock token store".to_string())?;
        let mut connections = self.load().await?;
        let dbmss = connections
            .get_mut(environment_id)
            .ok_or_else(|| not_registered(environment_id, dbms_id, dbms_user))?;
        let users = dbmss
            .get_mut(dbms_id)
            .ok_or_else(|| not_registered(environment_id, dbms_id, dbms_user))?;
        let token = users
            .remove(dbms_user)
            .ok_or_else(|| not_registered(environment_id, dbms_id, dbms_user))?;
        if users.is_empty() {
            dbmss.remove(dbms_id);
        }
        if dbmss.is_empty() {
            connections.remove(environment_id);
        }
        self.save(connections).await?;
        info!(
            environment = %environment_id,
            dbms = %dbms_id,
            user = %dbms_user,
            "removed access token"
        );
        Ok(token)
    }
}

fn not_registered(environment_id: &str, dbms_id: &str, dbms_user: &str) -> RegistryError {
    RegistryError::not_found(format!(
        "No access token registered for {dbms_user} on DBMS \"{dbms_id}\" in environment \"{environment_id}\""
    ))
}
