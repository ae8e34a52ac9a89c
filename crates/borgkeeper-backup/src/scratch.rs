//! Per-run working directories

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Working directory removed when the guard goes out of scope
///
/// Creation clears leftovers from an interrupted run first.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    pub fn create(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        if path.exists() {
            debug!("Removing stale working directory {}", path.display());
            fs::remove_dir_all(&path)?;
        }
        fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Remove whatever earlier runs left under `root` without reaching cleanup
///
/// Returns the number of entries removed. Failures are logged and skipped.
pub fn sweep_stale(root: &Path) -> usize {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return 0,
        Err(e) => {
            warn!("Cannot read {}: {}", root.display(), e);
            return 0;
        }
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        let result = match entry.file_type() {
            Ok(kind) if kind.is_dir() => fs::remove_dir_all(&path),
            _ => fs::remove_file(&path),
        };
        match result {
            Ok(()) => {
                info!("Removed leftover {}", path.display());
                removed += 1;
            }
            Err(e) => warn!("Failed to remove leftover {}: {}", path.display(), e),
        }
    }
    removed
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        match fs::remove_dir_all(&self.path) {
            Ok(()) => debug!("Removed working directory {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {}", self.path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_removed_on_drop() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("unpacked/abc");
        {
            let scratch = ScratchDir::create(&dir).unwrap();
            fs::write(scratch.path().join("file"), "data").unwrap();
            assert!(dir.exists());
        }
        assert!(!dir.exists());
    }

    #[test]
    fn test_removed_on_error_path() {
        fn failing(dir: &Path) -> io::Result<()> {
            let _scratch = ScratchDir::create(dir)?;
            Err(io::Error::other("boom"))
        }

        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("work");
        assert!(failing(&dir).is_err());
        assert!(!dir.exists());
    }

    #[test]
    fn test_stale_contents_are_cleared() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("work");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("leftover"), "old").unwrap();

        let scratch = ScratchDir::create(&dir).unwrap();
        assert!(!scratch.path().join("leftover").exists());
    }

    #[test]
    fn test_sweep_removes_every_leftover() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("unpacked");
        fs::create_dir_all(root.join("killed_slug/homeassistant")).unwrap();
        fs::write(root.join("killed_slug/homeassistant/big.bin"), "data").unwrap();
        fs::create_dir_all(root.join("restore")).unwrap();
        fs::write(root.join("stray.tar"), "tar").unwrap();

        assert_eq!(sweep_stale(&root), 3);
        assert!(root.is_dir());
        assert_eq!(fs::read_dir(&root).unwrap().count(), 0);
    }

    #[test]
    fn test_sweep_missing_root() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(sweep_stale(&tmp.path().join("absent")), 0);
    }

    #[test]
    fn test_already_removed_is_fine() {
        let tmp = TempDir::new().unwrap();
        let scratch = ScratchDir::create(tmp.path().join("work")).unwrap();
        fs::remove_dir_all(scratch.path()).unwrap();
        drop(scratch);
    }
}
