use std::sync::Arc;

use relate_domain::{AppLaunchToken, ExtensionMeta, RegistryResult};
use tracing::debug;

use crate::config::SystemPaths;
use crate::dbms_control::{DbmsControl, LocalDbmsControl};
use crate::environment::{Environment, EnvironmentRegistry};
use crate::error::IntoRegistry;
use crate::extensions::ExtensionRegistry;
use crate::lock::ResourceLocks;
use crate::tokens::{AccessTokenRegistry, AppLaunchTokenService};

/// Owns every registry for one installation.
///
/// Constructed once by the caller; nothing here is process-global.
pub struct System {
    paths: SystemPaths,
    environments: EnvironmentRegistry,
    extensions: ExtensionRegistry,
    access_tokens: AccessTokenRegistry,
    launch_tokens: AppLaunchTokenService,
    dbms_control: Arc<dyn DbmsControl>,
}

impl std::fmt::Debug for System {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("System")
            .field("paths", &self.paths)
            .finish_non_exhaustive()
    }
}

impl System {
    /// Ensures the directory layout, then runs a first discovery pass.
    pub async fn init(paths: SystemPaths) -> RegistryResult<Self> {
        paths
            .ensure()
            .await
            .or_invalid(|| "failed to prepare relate directories".to_string())?;
        let locks = ResourceLocks::new(paths.locks_dir());
        let system = Self {
            environments: EnvironmentRegistry::new(paths.clone(), locks.clone()),
            extensions: ExtensionRegistry::new(paths.clone(), locks.clone()),
            access_tokens: AccessTokenRegistry::new(paths.known_connections_file(), locks),
            launch_tokens: AppLaunchTokenService::default(),
            dbms_control: Arc::new(LocalDbmsControl::new(paths.dbmss_dir())),
            paths,
        };
        let discovered = system.environments.discover().await?;
        debug!(
            environments = discovered.len(),
            data = %system.paths.data().display(),
            "system ready"
        );
        Ok(system)
    }

    #[must_use]
    pub fn with_dbms_control(mut self, control: Arc<dyn DbmsControl>) -> Self {
        self.dbms_control = control;
        self
    }

    #[must_use]
    pub fn with_launch_tokens(mut self, service: AppLaunchTokenService) -> Self {
        self.launch_tokens = service;
        self
    }

    #[must_use]
    pub fn paths(&self) -> &SystemPaths {
        &self.paths
    }

    #[must_use]
    pub fn environments(&self) -> &EnvironmentRegistry {
        &self.environments
    }

    #[must_use]
    pub fn extensions(&self) -> &ExtensionRegistry {
        &self.extensions
    }

    #[must_use]
    pub fn access_tokens(&self) -> &AccessTokenRegistry {
        &self.access_tokens
    }

    /// Creates the default environment of a fresh installation.
    pub async fn bootstrap(&self) -> RegistryResult<Environment> {
        self.paths
            .ensure()
            .await
            .or_invalid(|| "failed to prepare relate directories".to_string())?;
        self.environments.bootstrap().await
    }

    pub async fn get_environment(&self, id: Option<&str>) -> RegistryResult<Environment> {
        self.environments.get(id).await
    }

    pub async fn register_access_token(
        &self,
        environment_id: &str,
        dbms_id: &str,
        dbms_user: &str,
        token: &str,
    ) -> RegistryResult<String> {
        self.access_tokens
            .register(environment_id, dbms_id, dbms_user, token)
            .await
    }

    /// Resolves environment and DBMS (id or name) before looking the token up.
    pub async fn get_access_token(
        &self,
        environment_id: &str,
        dbms: &str,
        dbms_user: &str,
    ) -> RegistryResult<String> {
        let environment = self.get_environment(Some(environment_id)).await?;
        let dbms = environment.dbms(dbms)?;
        self.access_tokens
            .lookup(environment.id(), &dbms.id, dbms_user)
            .await
    }

    pub async fn remove_access_token(
        &self,
        environment_id: &str,
        dbms: &str,
        dbms_user: &str,
    ) -> RegistryResult<String> {
        let environment = self.get_environment(Some(environment_id)).await?;
        let dbms = environment.dbms(dbms)?;
        self.access_tokens
            .remove(environment.id(), &dbms.id, dbms_user)
            .await
    }

    pub fn create_app_launch_token(
        &self,
        environment_id: &str,
        app_id: &str,
        dbms_id: &str,
        principal: &str,
        access_token: &str,
    ) -> RegistryResult<String> {
        self.launch_tokens.create(&AppLaunchToken {
            access_token: access_token.to_string(),
            environment_id: environment_id.to_string(),
            app_id: app_id.to_string(),
            dbms_id: dbms_id.to_string(),
            principal: principal.to_string(),
        })
    }

    pub fn parse_app_launch_token(
        &self,
        app_id: &str,
        launch_token: &str,
    ) -> RegistryResult<AppLaunchToken> {
        self.launch_tokens.parse(app_id, launch_token)
    }

    pub async fn list_installed_extensions(&self) -> RegistryResult<Vec<ExtensionMeta>> {
        self.extensions.list_installed().await
    }

    pub async fn install_extension(
        &self,
        name: &str,
        version: Option<&str>,
    ) -> RegistryResult<ExtensionMeta> {
        self.extensions.install(name, version).await
    }

    pub async fn uninstall_extension(&self, name: &str) -> RegistryResult<Vec<ExtensionMeta>> {
        self.extensions.uninstall(name).await
    }

    async fn resolve_dbms_id(
        &self,
        environment_id: Option<&str>,
        dbms: &str,
    ) -> RegistryResult<String> {
        let environment = self.get_environment(environment_id).await?;
        Ok(environment.dbms(dbms)?.id.clone())
    }

    pub async fn start_dbms(
        &self,
        environment_id: Option<&str>,
        dbms: &str,
    ) -> RegistryResult<bool> {
        let id = self.resolve_dbms_id(environment_id, dbms).await?;
        self.dbms_control.start(&id).await
    }

    pub async fn stop_dbms(
        &self,
        environment_id: Option<&str>,
        dbms: &str,
    ) -> RegistryResult<bool> {
        let id = self.resolve_dbms_id(environment_id, dbms).await?;
        self.dbms_control.stop(&id).await
    }

    pub async fn dbms_status(
        &self,
        environment_id: Option<&str>,
        dbms: &str,
    ) -> RegistryResult<bool> {
        let id = self.resolve_dbms_id(environment_id, dbms).await?;
        self.dbms_control.status(&id).await
    }
}
