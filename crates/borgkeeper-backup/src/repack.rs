//! Rebuilding platform snapshots from restored archives

use crate::manifest::{UnpackManifest, MANIFEST_FILENAME};
use crate::unpack::nested_target;
use borgkeeper_core::{Error, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tar::Builder;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Restorable content found in an extracted archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotSource {
    /// An unpacked snapshot root holding an [`UnpackManifest`]
    Unpacked(PathBuf),
    /// A platform snapshot tar stored as is
    Packed(PathBuf),
}

/// Find what to restore below `dir`
///
/// An unpacked snapshot wins over loose `*.tar` files, which may just be user
/// data inside the snapshot.
pub fn locate_snapshot(dir: &Path) -> Option<SnapshotSource> {
    let mut manifests = Vec::new();
    let mut tars = Vec::new();

    for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if name == MANIFEST_FILENAME {
            if let Some(parent) = entry.path().parent() {
                manifests.push(parent.to_path_buf());
            }
        } else if name.ends_with(".tar") {
            tars.push(entry.path().to_path_buf());
        }
    }

    // shallowest first
    manifests.sort_by_key(|p| (p.components().count(), p.clone()));
    tars.sort_by_key(|p| (p.components().count(), p.clone()));

    manifests
        .into_iter()
        .next()
        .map(SnapshotSource::Unpacked)
        .or_else(|| tars.into_iter().next().map(SnapshotSource::Packed))
}

/// Turn an unpacked snapshot back into a platform snapshot at `output`
///
/// Every nested directory listed in the manifest is compressed back into its
/// `*.tar.gz`, then the whole root except the manifest is written as a plain
/// tar. Returns the manifest, whose slug names the snapshot.
pub fn repack(root: &Path, output: &Path) -> Result<UnpackManifest> {
    let manifest = UnpackManifest::read(root)?;
    info!(
        "Repacking snapshot {} ({} nested archives)",
        manifest.slug,
        manifest.nested.len()
    );

    for relative in &manifest.nested {
        let archive = root.join(relative);
        let directory = nested_target(&archive);
        if !directory.is_dir() {
            return Err(Error::extraction(
                relative.clone(),
                "unpacked directory missing from restored archive",
            ));
        }

        debug!("Compressing {}", directory.display());
        compress_dir(&directory, &archive)?;
        fs::remove_dir_all(&directory)?;
    }

    write_outer_tar(root, output)?;
    info!("Snapshot written to {}", output.display());
    Ok(manifest)
}

fn compress_dir(source: &Path, destination: &Path) -> Result<()> {
    let file = File::create(destination)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut archive = Builder::new(encoder);

    archive.append_dir_all(".", source)?;
    archive.into_inner()?.finish()?;
    Ok(())
}

fn write_outer_tar(root: &Path, output: &Path) -> Result<()> {
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut entries: Vec<_> = fs::read_dir(root)?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name() != MANIFEST_FILENAME)
        .collect();
    entries.sort_by_key(|e| e.file_name());

    let mut archive = Builder::new(File::create(output)?);
    for entry in entries {
        let path = entry.path();
        let name = entry.file_name();
        if path.is_dir() {
            archive.append_dir_all(&name, &path)?;
        } else {
            archive.append_path_with_name(&path, &name)?;
        }
    }
    archive.finish()?;
    Ok(())
}
