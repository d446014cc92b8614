use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use pep440_rs::Version;
use serde::{Deserialize, Serialize};

pub const EXTENSION_DIR_NAME: &str = "extensions";
pub const EXTENSION_MANIFEST_FILE: &str = "relate.manifest.json";
pub const WILDCARD_VERSION: &str = "*";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExtensionType {
    Static,
    Node,
}

impl ExtensionType {
    pub const ALL: [ExtensionType; 2] = [ExtensionType::Static, ExtensionType::Node];

    /// Directory name under `<extensions>/`.
    #[must_use]
    pub fn dir_name(self) -> &'static str {
        match self {
            ExtensionType::Static => "STATIC",
            ExtensionType::Node => "NODE",
        }
    }
}

impl fmt::Display for ExtensionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// `relate.manifest.json` shipped at the root of every distribution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionManifest {
    pub name: String,
    pub version: String,
    #[serde(rename = "type", default = "default_extension_type")]
    pub kind: ExtensionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,
}

fn default_extension_type() -> ExtensionType {
    ExtensionType::Static
}

/// Why a distribution manifest was refused.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ManifestIssue {
    #[error("extension name is empty")]
    EmptyName,
    #[error("extension name \"{0}\" is not a valid directory name")]
    InvalidName(String),
    #[error("version \"{0}\" is neither \"*\" nor a valid version")]
    InvalidVersion(String),
}

impl ExtensionManifest {
    pub fn validate(&self) -> Result<(), ManifestIssue> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ManifestIssue::EmptyName);
        }
        if name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(ManifestIssue::InvalidName(self.name.clone()));
        }
        if self.version != WILDCARD_VERSION && Version::from_str(&self.version).is_err() {
            return Err(ManifestIssue::InvalidVersion(self.version.clone()));
        }
        Ok(())
    }
}

/// A distribution discovered on disk, either cached or installed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionMeta {
    pub name: String,
    pub version: String,
    #[serde(rename = "type")]
    pub kind: ExtensionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,
    pub dist: PathBuf,
}

impl ExtensionMeta {
    #[must_use]
    pub fn from_manifest(manifest: ExtensionManifest, dist: PathBuf) -> Self {
        Self {
            name: manifest.name,
            version: manifest.version,
            kind: manifest.kind,
            main: manifest.main,
            dist,
        }
    }

    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.version == WILDCARD_VERSION
    }

    /// Whether this distribution satisfies a resolved request.
    ///
    /// Exact requests match the recorded version string verbatim, so a
    /// distribution published as `1.0` is not picked for `1.0.0`.
    #[must_use]
    pub fn satisfies(&self, name: &str, requested: &RequestedVersion) -> bool {
        if self.name != name {
            return false;
        }
        match requested {
            RequestedVersion::Wildcard => self.is_wildcard(),
            RequestedVersion::Exact(version) => self.version == version.to_string(),
        }
    }
}

/// A version specifier that resolved to something matchable against the cache.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestedVersion {
    Wildcard,
    Exact(Version),
}

impl RequestedVersion {
    /// `*`, or anything [`coerce_version`] can pull a version out of.
    #[must_use]
    pub fn parse(spec: &str) -> Option<Self> {
        if spec.trim() == WILDCARD_VERSION {
            return Some(RequestedVersion::Wildcard);
        }
        coerce_version(spec).map(RequestedVersion::Exact)
    }
}

impl fmt::Display for RequestedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestedVersion::Wildcard => f.write_str(WILDCARD_VERSION),
            RequestedVersion::Exact(version) => write!(f, "{version}"),
        }
    }
}

/// Extracts the first `major[.minor[.patch]]` run from `raw`, padding missing parts with zero.
#[must_use]
pub fn coerce_version(raw: &str) -> Option<Version> {
    let bytes = raw.as_bytes();
    let start = bytes.iter().position(u8::is_ascii_digit)?;
    let mut parts: Vec<u64> = Vec::with_capacity(3);
    let mut idx = start;
    while parts.len() < 3 {
        let run_start = idx;
        while idx < bytes.len() && bytes[idx].is_ascii_digit() {
            idx += 1;
        }
        if idx == run_start {
            break;
        }
        let part = raw[run_start..idx].parse::<u64>().ok()?;
        parts.push(part);
        if idx + 1 < bytes.len() && bytes[idx] == b'.' && bytes[idx + 1].is_ascii_digit() {
            idx += 1;
        } else {
            break;
        }
    }
    parts.resize(3, 0);
    Version::from_str(&format!("{}.{}.{}", parts[0], parts[1], parts[2])).ok()
}
