use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_ENVIRONMENT_NAME: &str = "default";
pub const DEFAULT_ENVIRONMENT_USER: &str = "local";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnvironmentType {
    Local,
    Remote,
}

impl EnvironmentType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EnvironmentType::Local => "LOCAL",
            EnvironmentType::Remote => "REMOTE",
        }
    }
}

/// A database instance entry inside an environment config.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbmsConfig {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_uri: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Contents of `<environments dir>/<id>.json`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentConfig {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: EnvironmentType,
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neo4j_data_path: Option<PathBuf>,
    #[serde(default)]
    pub dbmss: BTreeMap<String, DbmsConfig>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EnvironmentConfig {
    #[must_use]
    pub fn local_default(neo4j_data_path: PathBuf) -> Self {
        Self {
            id: DEFAULT_ENVIRONMENT_NAME.to_string(),
            kind: EnvironmentType::Local,
            user: DEFAULT_ENVIRONMENT_USER.to_string(),
            neo4j_data_path: Some(neo4j_data_path),
            dbmss: BTreeMap::new(),
            extra: Map::new(),
        }
    }

    /// Fills fields the file may omit: the data path and dbms ids keyed by map entry.
    pub fn apply_defaults(&mut self, data_root: &std::path::Path) {
        if self.neo4j_data_path.is_none() {
            self.neo4j_data_path = Some(data_root.to_path_buf());
        }
        for (key, dbms) in &mut self.dbmss {
            if dbms.id.is_empty() {
                dbms.id.clone_from(key);
            }
        }
    }

    /// Finds a dbms by id first, then by display name.
    #[must_use]
    pub fn find_dbms(&self, id_or_name: &str) -> Option<&DbmsConfig> {
        self.dbmss.get(id_or_name).or_else(|| {
            self.dbmss
                .values()
                .find(|dbms| dbms.id == id_or_name || dbms.name.as_deref() == Some(id_or_name))
        })
    }
}
