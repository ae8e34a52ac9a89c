//! Filesystem layout used by a run

use std::fs;
use std::io;
use std::path::PathBuf;

/// Directories and files shared by borg, ssh and the workflows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathsConfig {
    /// `BORG_BASE_DIR`
    pub base_dir: PathBuf,
    /// `BORG_CACHE_DIR`
    pub cache_dir: PathBuf,
    /// Per-run scratch area for unpacked snapshots (removed after every run)
    pub scratch_dir: PathBuf,
    /// Where the platform stores snapshot tar files
    pub snapshot_dir: PathBuf,
    /// SSH known hosts file for the repository transport
    pub ssh_known_hosts: PathBuf,
    /// SSH private key for the repository transport
    pub ssh_key: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("/homeassistant/borg"),
            cache_dir: PathBuf::from("/homeassistant/borg/cache"),
            scratch_dir: PathBuf::from("/backup/borg_unpacked"),
            snapshot_dir: PathBuf::from("/backup"),
            ssh_known_hosts: PathBuf::from("/homeassistant/borg/known_hosts"),
            ssh_key: PathBuf::from("/homeassistant/borg/keys/borg_backup"),
        }
    }
}

impl PathsConfig {
    /// Override the scratch directory
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    /// Override the snapshot directory
    pub fn with_snapshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.snapshot_dir = dir.into();
        self
    }

    /// Override the borg base and cache directories
    pub fn with_borg_dirs(mut self, base: impl Into<PathBuf>, cache: impl Into<PathBuf>) -> Self {
        self.base_dir = base.into();
        self.cache_dir = cache.into();
        self
    }

    /// Platform snapshot file for a slug
    pub fn snapshot_file(&self, slug: &str) -> PathBuf {
        self.snapshot_dir.join(format!("{}.tar", slug))
    }

    /// Working directory a snapshot is unpacked into
    pub fn unpack_dir(&self, slug: &str) -> PathBuf {
        self.scratch_dir.join(slug)
    }

    /// Working directory a borg archive is extracted into
    pub fn restore_dir(&self) -> PathBuf {
        self.scratch_dir.join("restore")
    }

    /// Create the borg and scratch directories
    pub fn ensure_dirs(&self) -> io::Result<()> {
        for dir in [&self.base_dir, &self.cache_dir, &self.scratch_dir] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}
