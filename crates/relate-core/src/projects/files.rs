use std::path::{Path, PathBuf};

use relate_domain::{
    apply_entity_filters, escapes_root, normalize_project_dir, EntityFilter, ProjectFile,
    RegistryError, RegistryResult, PROJECTS_MANIFEST_FILE, ROOT_DIRECTORY,
};
use tracing::info;

use super::{ensure_manifest, ProjectRegistry};
use crate::error::IntoRegistry;
use crate::fs::{run_blocking, walk_regular_files};

impl ProjectRegistry {
    /// Every regular file below the project root, manifest included.
    pub async fn list_files(
        &self,
        project: &str,
        filters: &[EntityFilter],
    ) -> RegistryResult<Vec<ProjectFile>> {
        let project = self.get(project).await?;
        let files = project_files(&project.root).await?;
        Ok(apply_entity_filters(files, filters))
    }

    /// Copies `source` into the project at `destination` (defaults to the source file name).
    pub async fn add_file(
        &self,
        project: &str,
        source: &Path,
        destination: Option<&Path>,
    ) -> RegistryResult<ProjectFile> {
        if destination.is_some_and(escapes_root) {
            return Err(RegistryError::invalid_argument(
                "Project files cannot be added outside of project",
            ));
        }
        let project = self.get(project).await?;
        let relative = match destination {
            Some(destination) => destination.to_path_buf(),
            None => source
                .file_name()
                .map(PathBuf::from)
                .ok_or_else(|| {
                    RegistryError::invalid_argument(format!(
                        "{} does not name a file",
                        source.display()
                    ))
                })?,
        };
        let (file_name, directory) = address(&relative)?;
        let target = project.root.join(&relative);

        let manifest_path = project.manifest_path();
        let _guard = self
            .locks
            .acquire(&manifest_path)
            .await
            .or_invalid(|| format!("failed to lock {}", manifest_path.display()))?;
        ensure_manifest(&project.root).await?;
        let existing = project_files(&project.root).await?;
        if existing
            .iter()
            .any(|file| file.matches(&file_name, &directory))
        {
            return Err(RegistryError::invalid_argument(format!(
                "File {file_name} already exists at that destination"
            )));
        }

        let source_meta = tokio::fs::metadata(source)
            .await
            .or_invalid(|| format!("cannot read {}", source.display()))?;
        if !source_meta.is_file() {
            return Err(RegistryError::invalid_argument(format!(
                "{} is not a file",
                source.display()
            )));
        }
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .or_invalid(|| format!("failed to create {}", parent.display()))?;
        }
        tokio::fs::copy(source, &target)
            .await
            .or_invalid(|| format!("failed to copy {}", source.display()))?;

        let added = project_files(&project.root)
            .await?
            .into_iter()
            .find(|file| file.matches(&file_name, &directory))
            .ok_or_else(|| {
                RegistryError::not_found(format!("Unable to add {file_name} to project"))
            })?;
        info!(project = %project.name(), file = %relative.display(), "added project file");
        Ok(added)
    }

    /// Deletes the file at `relative_path` and returns its record.
    pub async fn remove_file(
        &self,
        project: &str,
        relative_path: &Path,
    ) -> RegistryResult<ProjectFile> {
        if escapes_root(relative_path) {
            return Err(RegistryError::invalid_argument(
                "Project files cannot be removed outside of project",
            ));
        }
        let project = self.get(project).await?;
        let (file_name, directory) = address(relative_path)?;
        if file_name == PROJECTS_MANIFEST_FILE && directory == ROOT_DIRECTORY {
            return Err(RegistryError::invalid_argument(
                "The project manifest cannot be removed",
            ));
        }

        let manifest_path = project.manifest_path();
        let _guard = self
            .locks
            .acquire(&manifest_path)
            .await
            .or_invalid(|| format!("failed to lock {}", manifest_path.display()))?;
        ensure_manifest(&project.root).await?;
        let found = project_files(&project.root)
            .await?
            .into_iter()
            .find(|file| file.matches(&file_name, &directory))
            .ok_or_else(|| {
                RegistryError::invalid_argument(format!(
                    "File {} does not exist",
                    relative_path.display()
                ))
            })?;

        let path = project.root.join(found.relative_path());
        tokio::fs::remove_file(&path)
            .await
            .or_invalid(|| format!("failed to remove {}", path.display()))?;
        info!(project = %project.name(), file = %relative_path.display(), "removed project file");
        Ok(found)
    }
}

/// `(name, directory)` pair a root-relative path is addressed by.
fn address(path: &Path) -> RegistryResult<(String, String)> {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            RegistryError::invalid_argument(format!("{} does not name a file", path.display()))
        })?;
    let directory = normalize_project_dir(path.parent().unwrap_or_else(|| Path::new("")));
    Ok((name, directory))
}

async fn project_files(root: &Path) -> RegistryResult<Vec<ProjectFile>> {
    let walk_root = root.to_path_buf();
    let entries = run_blocking(move || walk_regular_files(&walk_root))
        .await
        .or_invalid(|| format!("failed to list files in {}", root.display()))?;
    Ok(entries
        .into_iter()
        .filter_map(|(path, size)| file_record(root, &path, size))
        .collect())
}

fn file_record(root: &Path, path: &Path, size: u64) -> Option<ProjectFile> {
    let relative = path.strip_prefix(root).ok()?;
    let (name, directory) = address(relative).ok()?;
    let extension = relative
        .extension()
        .map(|ext| ext.to_string_lossy().into_owned());
    Some(ProjectFile {
        name,
        directory,
        extension,
        size,
    })
}
