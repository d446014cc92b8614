use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{RegistryError, RegistryResult};

pub const PROJECTS_MANIFEST_FILE: &str = "relate.project.json";
pub const PROJECTS_DIR_NAME: &str = "projects";
/// Directory value used for files that sit directly in the project root.
pub const ROOT_DIRECTORY: &str = ".";

/// A database instance linked into a project.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDbms {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub connection_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

impl ProjectDbms {
    /// Two links collide when either their name or their connection URI matches.
    #[must_use]
    pub fn collides_with(&self, other: &ProjectDbms) -> bool {
        self.name == other.name || self.connection_uri == other.connection_uri
    }
}

/// The whole-document JSON record stored at `<root>/relate.project.json`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectManifest {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub dbmss: Vec<ProjectDbms>,
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<ProjectDbms>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let dbmss = Option::<Vec<ProjectDbms>>::deserialize(deserializer)?;
    Ok(dbmss.unwrap_or_default())
}

impl ProjectManifest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dbmss: Vec::new(),
            metadata: Map::new(),
        }
    }

    /// Project names double as directory names inside the storage area.
    pub fn validate(&self) -> RegistryResult<()> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(RegistryError::invalid_argument("Project name must not be empty"));
        }
        if name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(RegistryError::invalid_argument(format!(
                "Project name \"{}\" is not a valid directory name",
                self.name
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub root: PathBuf,
    #[serde(flatten)]
    pub manifest: ProjectManifest,
}

impl Project {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    #[must_use]
    pub fn dbmss(&self) -> &[ProjectDbms] {
        &self.manifest.dbmss
    }

    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(PROJECTS_MANIFEST_FILE)
    }
}

/// A regular file inside a project, addressed by `(name, directory)`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectFile {
    pub name: String,
    pub directory: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    pub size: u64,
}

impl ProjectFile {
    #[must_use]
    pub fn matches(&self, name: &str, directory: &str) -> bool {
        self.name == name && self.directory == directory
    }

    /// Path relative to the project root.
    #[must_use]
    pub fn relative_path(&self) -> PathBuf {
        if self.directory == ROOT_DIRECTORY {
            PathBuf::from(&self.name)
        } else {
            Path::new(&self.directory).join(&self.name)
        }
    }
}

/// True when `path` would resolve outside the directory it is joined onto.
#[must_use]
pub fn escapes_root(path: &Path) -> bool {
    path.components().any(|component| {
        matches!(
            component,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}

/// Canonical `directory` value for a root-relative directory path.
#[must_use]
pub fn normalize_project_dir(relative: &Path) -> String {
    let parts: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        ROOT_DIRECTORY.to_string()
    } else {
        parts.join("/")
    }
}
