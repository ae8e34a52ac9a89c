//! Expansion of platform snapshots before archiving
//!
//! A platform snapshot is a tar file holding one gzip-compressed tar per
//! add-on and folder. Archiving those compressed blobs defeats borg's
//! deduplication, so both levels are expanded into plain directories first.

use crate::manifest::UnpackManifest;
use borgkeeper_core::{Error, Result, SystemCapabilities};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Suffix of nested archives inside a platform snapshot
pub const NESTED_SUFFIX: &str = ".tar.gz";

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Runs the system `tar`, with `pigz` when the host can afford it
#[derive(Debug, Clone)]
pub struct ArchiveUnpacker {
    capabilities: SystemCapabilities,
    tar: PathBuf,
    pigz: Option<PathBuf>,
}

impl ArchiveUnpacker {
    pub fn new(capabilities: SystemCapabilities) -> Self {
        let pigz = if capabilities.use_parallel() {
            let found = which::which("pigz").ok();
            if found.is_none() {
                info!("pigz not found, using single-threaded decompression");
            }
            found
        } else {
            None
        };

        Self {
            capabilities,
            tar: PathBuf::from("tar"),
            pigz,
        }
    }

    /// Override the parallel decompressor; ignored unless parallelism is allowed
    pub fn with_parallel_helper(mut self, pigz: Option<PathBuf>) -> Self {
        self.pigz = pigz.filter(|_| self.capabilities.use_parallel());
        self
    }

    /// Decompressor used for gzip streams, if any
    pub fn parallel_helper(&self) -> Option<&Path> {
        self.pigz.as_deref()
    }

    /// Expand `snapshot` and its nested archives into `root`
    pub async fn unpack(&self, snapshot: &Path, root: &Path, slug: &str) -> Result<UnpackManifest> {
        if !snapshot.is_file() {
            return Err(Error::extraction(
                snapshot.display().to_string(),
                "snapshot file not found",
            ));
        }

        match self.parallel_helper() {
            Some(_) => info!(
                "Unpacking {} using {} threads",
                snapshot.display(),
                self.capabilities.compression_threads()
            ),
            None => info!("Unpacking {} (single-threaded)", snapshot.display()),
        }
        self.extract(snapshot, root).await?;

        let mut manifest = UnpackManifest::new(slug);
        for archive in find_nested_archives(root) {
            let target = nested_target(&archive);
            debug!("Extracting nested archive {}", archive.display());
            fs::create_dir_all(&target)?;
            self.extract(&archive, &target).await?;
            fs::remove_file(&archive)?;

            if let Ok(relative) = archive.strip_prefix(root) {
                manifest.nested.push(relative.to_string_lossy().into_owned());
            }
        }

        manifest.write(root)?;
        info!(
            "Unpacked snapshot {} ({} nested archives)",
            slug,
            manifest.nested.len()
        );
        Ok(manifest)
    }

    async fn extract(&self, archive: &Path, destination: &Path) -> Result<()> {
        let gzip = is_gzip(archive)?;
        let args = self.tar_args(archive, destination, gzip);

        let output = Command::new(&self.tar)
            .args(&args)
            .output()
            .await
            .map_err(|e| Error::extraction(archive.display().to_string(), e.to_string()))?;

        if !output.status.success() {
            return Err(Error::extraction(
                archive.display().to_string(),
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(())
    }

    fn tar_args(&self, archive: &Path, destination: &Path, gzip: bool) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        match (&self.pigz, gzip) {
            (Some(pigz), true) => {
                args.push(
                    format!(
                        "--use-compress-program={} -p {}",
                        pigz.display(),
                        self.capabilities.compression_threads()
                    )
                    .into(),
                );
                args.push("-xf".into());
            }
            (None, true) => args.push("-xzf".into()),
            (_, false) => args.push("-xf".into()),
        }
        args.push(archive.into());
        args.push("-C".into());
        args.push(destination.into());
        args
    }
}

/// Whether the file starts with the gzip magic bytes
pub fn is_gzip(path: &Path) -> Result<bool> {
    let mut magic = [0u8; 2];
    let mut file = File::open(path)?;
    let read = file.read(&mut magic)?;
    Ok(read == 2 && magic == GZIP_MAGIC)
}

/// Nested `*.tar.gz` files below `root`, in a stable order
pub fn find_nested_archives(root: &Path) -> Vec<PathBuf> {
    let mut archives: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(NESTED_SUFFIX))
        .map(|entry| entry.into_path())
        .collect();
    archives.sort();
    archives
}

/// Sibling directory a nested archive expands into (`homeassistant.tar.gz` -> `homeassistant`)
pub fn nested_target(archive: &Path) -> PathBuf {
    let name = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = name.strip_suffix(NESTED_SUFFIX).unwrap_or(&name);
    archive.with_file_name(stem)
}
