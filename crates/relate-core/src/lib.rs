#![deny(clippy::all)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

mod archive;
mod config;
mod dbms_control;
mod environment;
mod error;
mod extensions;
mod fs;
mod lock;
pub mod logging;
mod projects;
mod system;
mod tokens;

pub use crate::config::{SystemPaths, CACHE_HOME_ENV, CONFIG_HOME_ENV, DATA_HOME_ENV};
pub use crate::dbms_control::{ControlFuture, DbmsControl, LocalDbmsControl};
pub use crate::environment::{Environment, EnvironmentRegistry};
pub use crate::extensions::ExtensionRegistry;
pub use crate::lock::{ResourceGuard, ResourceLocks};
pub use crate::projects::{ProjectRegistry, ProjectScan, SkipReason};
pub use crate::system::System;
pub use crate::tokens::{
    AccessTokenRegistry, AppLaunchTokenService, Claims, Hs256Signer, TokenSigner, VerifyError,
    LAUNCH_TOKEN_TTL,
};

pub use relate_domain::{
    app_launch_url, AppLaunchToken, DbmsConfig, EntityFilter, EnvironmentConfig, EnvironmentType,
    ErrorKind, ExtensionMeta, ExtensionType, FilterComparator, Project, ProjectDbms, ProjectFile,
    ProjectManifest, RegistryError, RegistryResult,
};
