use std::path::{Path, PathBuf};

use relate_domain::{
    apply_entity_filters, EntityFilter, Project, ProjectManifest, RegistryError, RegistryResult,
    PROJECTS_MANIFEST_FILE,
};
use tracing::{debug, info};

use crate::error::IntoRegistry;
use crate::fs::{create_json_exclusive, link_dir, read_json, run_blocking, write_json_atomic};
use crate::lock::ResourceLocks;

mod dbmss;
mod files;

/// Why a directory in the storage area was not treated as a project.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SkipReason {
    #[error("not a directory")]
    NotADirectory,
    #[error("no relate.project.json manifest")]
    MissingManifest,
    #[error("unreadable manifest: {0}")]
    UnreadableManifest(String),
}

#[derive(Debug, Default)]
pub struct ProjectScan {
    pub projects: Vec<Project>,
    pub skipped: Vec<(PathBuf, SkipReason)>,
}

/// Project manifests stored (or linked) under one storage directory.
#[derive(Debug, Clone)]
pub struct ProjectRegistry {
    storage: PathBuf,
    locks: ResourceLocks,
}

impl ProjectRegistry {
    pub fn new(storage: impl Into<PathBuf>, locks: ResourceLocks) -> Self {
        Self {
            storage: storage.into(),
            locks,
        }
    }

    #[must_use]
    pub fn storage_dir(&self) -> &Path {
        &self.storage
    }

    /// Loads every entry of the storage area, keeping the reason for each one skipped.
    pub async fn scan(&self) -> RegistryResult<ProjectScan> {
        let storage = self.storage.clone();
        run_blocking(move || scan_storage(&storage))
            .await
            .or_invalid(|| format!("failed to scan {}", self.storage.display()))
    }

    pub async fn list(&self, filters: &[EntityFilter]) -> RegistryResult<Vec<Project>> {
        let scan = self.scan().await?;
        for (path, reason) in &scan.skipped {
            debug!(path = %path.display(), %reason, "skipping project directory");
        }
        Ok(apply_entity_filters(scan.projects, filters))
    }

    pub async fn get(&self, name: &str) -> RegistryResult<Project> {
        self.resolve(name)
            .await?
            .ok_or_else(|| RegistryError::not_found(format!("Could not find project {name}")))
    }

    async fn resolve(&self, name: &str) -> RegistryResult<Option<Project>> {
        Ok(self
            .scan()
            .await?
            .projects
            .into_iter()
            .find(|project| project.name() == name))
    }

    async fn ensure_unclaimed(&self, name: &str) -> RegistryResult<()> {
        if self.resolve(name).await?.is_some() {
            return Err(RegistryError::invalid_argument(format!(
                "Project {name} already exists"
            )));
        }
        Ok(())
    }

    /// Writes a new manifest into `target_dir`, or into the storage area when omitted.
    ///
    /// A project created outside the storage area is registered through a link.
    pub async fn create(
        &self,
        manifest: ProjectManifest,
        target_dir: Option<&Path>,
    ) -> RegistryResult<Project> {
        manifest.validate()?;
        let default_dir = self.storage.join(&manifest.name);
        let _guard = self
            .locks
            .acquire(&default_dir)
            .await
            .or_invalid(|| format!("failed to lock project {}", manifest.name))?;
        self.ensure_unclaimed(&manifest.name).await?;

        let project_dir = target_dir.map_or_else(|| default_dir.clone(), Path::to_path_buf);
        tokio::fs::create_dir_all(&project_dir)
            .await
            .or_invalid(|| format!("failed to create {}", project_dir.display()))?;
        let (manifest_path, doc) = (project_dir.join(PROJECTS_MANIFEST_FILE), manifest.clone());
        let created = run_blocking(move || create_json_exclusive(&manifest_path, &doc))
            .await
            .or_invalid(|| format!("failed to write manifest in {}", project_dir.display()))?;
        if !created {
            return Err(RegistryError::invalid_argument(format!(
                "{} already contains a project manifest",
                project_dir.display()
            )));
        }

        if project_dir == default_dir {
            info!(project = %manifest.name, "created project");
            return Ok(Project {
                root: default_dir,
                manifest,
            });
        }
        let root = tokio::fs::canonicalize(&project_dir)
            .await
            .or_invalid(|| format!("Failed to link {}", project_dir.display()))?;
        self.link_unlocked(&root, manifest).await
    }

    /// Adopts an existing project directory by linking it into the storage area.
    pub async fn link(&self, path: &Path) -> RegistryResult<Project> {
        let root = tokio::fs::canonicalize(path)
            .await
            .or_invalid(|| format!("Failed to link {}", path.display()))?;
        let manifest = load_manifest(&root).await?;
        manifest.validate()?;
        let _guard = self
            .locks
            .acquire(&self.storage.join(&manifest.name))
            .await
            .or_invalid(|| format!("failed to lock project {}", manifest.name))?;
        self.ensure_unclaimed(&manifest.name).await?;
        self.link_unlocked(&root, manifest).await
    }

    async fn link_unlocked(
        &self,
        root: &Path,
        manifest: ProjectManifest,
    ) -> RegistryResult<Project> {
        let link = self.storage.join(&manifest.name);
        let (target, link_path) = (root.to_path_buf(), link.clone());
        let created = run_blocking(move || link_dir(&target, &link_path))
            .await
            .or_invalid(|| format!("Failed to link {}", root.display()))?;
        if !created {
            return Err(RegistryError::invalid_argument(format!(
                "Project {} already exists",
                manifest.name
            )));
        }
        info!(project = %manifest.name, target = %root.display(), "linked project");
        Ok(Project {
            root: link,
            manifest,
        })
    }

    /// Read-modify-write of a project manifest under its resource lock.
    async fn update_manifest<R>(
        &self,
        project: &Project,
        update: impl FnOnce(&mut ProjectManifest) -> RegistryResult<R>,
    ) -> RegistryResult<R> {
        let path = project.manifest_path();
        let _guard = self
            .locks
            .acquire(&path)
            .await
            .or_invalid(|| format!("failed to lock {}", path.display()))?;
        let mut manifest = load_manifest(&project.root).await?;
        let result = update(&mut manifest)?;
        let write_path = path.clone();
        run_blocking(move || write_json_atomic(&write_path, &manifest))
            .await
            .or_invalid(|| format!("failed to write {}", path.display()))?;
        Ok(result)
    }
}

async fn ensure_manifest(root: &Path) -> RegistryResult<PathBuf> {
    let path = root.join(PROJECTS_MANIFEST_FILE);
    if tokio::fs::try_exists(&path).await.unwrap_or(false) {
        Ok(path)
    } else {
        Err(RegistryError::invalid_argument(format!(
            "{} does not contain a project manifest",
            root.display()
        )))
    }
}

async fn load_manifest(root: &Path) -> RegistryResult<ProjectManifest> {
    let path = ensure_manifest(root).await?;
    let read_path = path.clone();
    run_blocking(move || read_json(&read_path))
        .await
        .or_invalid(|| format!("invalid project manifest {}", path.display()))
}

fn scan_storage(storage: &Path) -> anyhow::Result<ProjectScan> {
    let mut scan = ProjectScan::default();
    let entries = match std::fs::read_dir(storage) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(scan),
        Err(err) => return Err(err.into()),
    };
    let mut paths = entries
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<Result<Vec<_>, _>>()?;
    paths.sort();

    for root in paths {
        if !root.is_dir() {
            scan.skipped.push((root, SkipReason::NotADirectory));
            continue;
        }
        let manifest_path = root.join(PROJECTS_MANIFEST_FILE);
        if !manifest_path.is_file() {
            scan.skipped.push((root, SkipReason::MissingManifest));
            continue;
        }
        match read_json::<ProjectManifest>(&manifest_path) {
            Ok(manifest) => scan.projects.push(Project { root, manifest }),
            Err(err) => scan
                .skipped
                .push((root, SkipReason::UnreadableManifest(format!("{err:#}")))),
        }
    }
    Ok(scan)
}
