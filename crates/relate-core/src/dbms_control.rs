use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use relate_domain::{escapes_root, RegistryError, RegistryResult};
use tokio::process::Command;
use tracing::debug;

use crate::error::IntoRegistry;

pub type ControlFuture<'a> = Pin<Box<dyn Future<Output = RegistryResult<bool>> + Send + 'a>>;

/// Process control for a database instance, by DBMS id.
pub trait DbmsControl: Send + Sync {
    fn start<'a>(&'a self, dbms_id: &'a str) -> ControlFuture<'a>;
    fn stop<'a>(&'a self, dbms_id: &'a str) -> ControlFuture<'a>;
    /// `true` while the instance is running.
    fn status<'a>(&'a self, dbms_id: &'a str) -> ControlFuture<'a>;
}

#[cfg(windows)]
const NEO4J_BIN: &str = "neo4j.bat";
#[cfg(not(windows))]
const NEO4J_BIN: &str = "neo4j";

/// Drives `<dbmss>/<id>/bin/neo4j <command>`.
#[derive(Debug, Clone)]
pub struct LocalDbmsControl {
    dbmss_dir: PathBuf,
}

impl LocalDbmsControl {
    pub fn new(dbmss_dir: impl Into<PathBuf>) -> Self {
        Self {
            dbmss_dir: dbmss_dir.into(),
        }
    }

    fn install_dir(&self, dbms_id: &str) -> RegistryResult<PathBuf> {
        if dbms_id.trim().is_empty() || escapes_root(Path::new(dbms_id)) {
            return Err(RegistryError::invalid_argument(format!(
                "\"{dbms_id}\" is not a valid DBMS id"
            )));
        }
        Ok(self.dbmss_dir.join(dbms_id))
    }

    async fn run(&self, dbms_id: &str, command: &str) -> RegistryResult<bool> {
        let install_dir = self.install_dir(dbms_id)?;
        let binary = install_dir.join("bin").join(NEO4J_BIN);
        let meta = tokio::fs::metadata(&binary).await.map_err(|_| {
            RegistryError::not_found(format!("No DBMS binary found at {}", binary.display()))
        })?;
        if !is_executable(&meta) {
            return Err(RegistryError::invalid_argument(format!(
                "{} is not executable",
                binary.display()
            )));
        }

        let output = Command::new(&binary)
            .arg(command)
            .current_dir(&install_dir)
            .kill_on_drop(true)
            .output()
            .await
            .or_invalid(|| format!("failed to run {} {command}", binary.display()))?;
        debug!(
            dbms = %dbms_id,
            command,
            status = ?output.status.code(),
            stdout = %String::from_utf8_lossy(&output.stdout).trim(),
            "dbms command finished"
        );
        match output.status.code() {
            Some(code) => Ok(code == 0),
            None => Err(RegistryError::invalid_argument(format!(
                "{} {command} exited abnormally",
                binary.display()
            ))),
        }
    }
}

#[cfg(unix)]
fn is_executable(meta: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.is_file() && meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(meta: &std::fs::Metadata) -> bool {
    meta.is_file()
}

impl DbmsControl for LocalDbmsControl {
    fn start<'a>(&'a self, dbms_id: &'a str) -> ControlFuture<'a> {
        Box::pin(self.run(dbms_id, "start"))
    }

    fn stop<'a>(&'a self, dbms_id: &'a str) -> ControlFuture<'a> {
        Box::pin(self.run(dbms_id, "stop"))
    }

    fn status<'a>(&'a self, dbms_id: &'a str) -> ControlFuture<'a> {
        Box::pin(self.run(dbms_id, "status"))
    }
}
