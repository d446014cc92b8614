#![deny(clippy::all)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

pub mod environment;
pub mod error;
pub mod extension;
pub mod filter;
pub mod project;
pub mod token;

pub use environment::{
    DbmsConfig, EnvironmentConfig, EnvironmentType, DEFAULT_ENVIRONMENT_NAME,
    DEFAULT_ENVIRONMENT_USER,
};
pub use error::{codes, ErrorKind, RegistryError, RegistryResult};
pub use extension::{
    coerce_version, ExtensionManifest, ExtensionMeta, ExtensionType, ManifestIssue,
    RequestedVersion, EXTENSION_DIR_NAME, EXTENSION_MANIFEST_FILE, WILDCARD_VERSION,
};
pub use filter::{apply_entity_filters, EntityFilter, FilterComparator};
pub use project::{
    escapes_root, normalize_project_dir, Project, ProjectDbms, ProjectFile, ProjectManifest,
    PROJECTS_DIR_NAME, PROJECTS_MANIFEST_FILE, ROOT_DIRECTORY,
};
pub use token::{app_launch_url, AppLaunchToken, LAUNCH_TOKEN_PARAMETER};
