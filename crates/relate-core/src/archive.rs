use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use tar::Archive;
use zip::ZipArchive;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ArchiveKind {
    TarGz,
    Zip,
}

pub(crate) fn archive_kind(path: &Path) -> Result<ArchiveKind> {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        Ok(ArchiveKind::TarGz)
    } else if name.ends_with(".zip") {
        Ok(ArchiveKind::Zip)
    } else {
        bail!("unsupported archive format for {}", path.display())
    }
}

/// Unpacks `archive` into `dest`; entries that would land outside `dest` are refused.
pub(crate) fn extract_archive(archive: &Path, dest: &Path) -> Result<()> {
    let kind = archive_kind(archive)?;
    fs::create_dir_all(dest).with_context(|| format!("failed to create {}", dest.display()))?;
    let file =
        File::open(archive).with_context(|| format!("opening archive {}", archive.display()))?;
    match kind {
        ArchiveKind::TarGz => {
            let mut tar = Archive::new(GzDecoder::new(file));
            tar.unpack(dest)
                .with_context(|| format!("extracting archive into {}", dest.display()))?;
        }
        ArchiveKind::Zip => {
            let mut zip = ZipArchive::new(file)
                .with_context(|| format!("reading zip archive {}", archive.display()))?;
            zip.extract(dest)
                .with_context(|| format!("extracting zip archive into {}", dest.display()))?;
        }
    }
    Ok(())
}

/// Directory holding `marker` inside an unpacked archive.
///
/// Archives are commonly wrapped in a single top-level folder (`package/`),
/// which is descended into once.
pub(crate) fn locate_content_root(extracted: &Path, marker: &str) -> Result<Option<PathBuf>> {
    if extracted.join(marker).is_file() {
        return Ok(Some(extracted.to_path_buf()));
    }
    let mut dirs = Vec::new();
    for entry in fs::read_dir(extracted)
        .with_context(|| format!("failed to read {}", extracted.display()))?
    {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        } else {
            return Ok(None);
        }
    }
    match dirs.as_slice() {
        [only] if only.join(marker).is_file() => Ok(Some(only.clone())),
        _ => Ok(None),
    }
}
