//! Host capability detection
//!
//! Decides whether decompressing platform snapshots with several threads is
//! worth it. Parallel decompression needs spare cores, spare memory and
//! storage that can keep up with it; SD cards and spinning disks cannot, so
//! anything we fail to classify is treated as slow storage.

use std::fs;
use std::path::{Path, PathBuf};
use sysinfo::System;
use tracing::{debug, warn};

/// Available memory (MB) that must be exceeded before going parallel
pub const PARALLEL_MIN_MEMORY_MB: u64 = 1024;

/// Detected host capabilities, computed once per run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemCapabilities {
    cpu_cores: usize,
    available_memory_mb: u64,
    is_slow_storage: bool,
    use_parallel: bool,
    compression_threads: usize,
}

impl SystemCapabilities {
    /// Derive capabilities from raw measurements
    ///
    /// `rotational` is `None` when the storage type could not be determined,
    /// which counts as slow storage.
    pub fn from_measurements(
        cpu_cores: usize,
        available_memory_mb: u64,
        rotational: Option<bool>,
    ) -> Self {
        let is_slow_storage = rotational.unwrap_or(true);
        let use_parallel =
            cpu_cores > 1 && available_memory_mb > PARALLEL_MIN_MEMORY_MB && !is_slow_storage;
        let compression_threads = if use_parallel { cpu_cores - 1 } else { 1 };

        Self {
            cpu_cores,
            available_memory_mb,
            is_slow_storage,
            use_parallel,
            compression_threads,
        }
    }

    /// Probe the current host
    pub fn detect() -> Self {
        CapabilityProbe::new().probe()
    }

    /// Logical CPU count
    pub fn cpu_cores(&self) -> usize {
        self.cpu_cores
    }

    /// Available memory in MB at probe time
    pub fn available_memory_mb(&self) -> u64 {
        self.available_memory_mb
    }

    /// Rotational, flash card or unknown storage
    pub fn is_slow_storage(&self) -> bool {
        self.is_slow_storage
    }

    /// Whether parallel decompression is safe
    pub fn use_parallel(&self) -> bool {
        self.use_parallel
    }

    /// Threads handed to the parallel decompressor
    pub fn compression_threads(&self) -> usize {
        self.compression_threads
    }
}

/// Reads CPU, memory and root storage information from the host
#[derive(Debug, Clone)]
pub struct CapabilityProbe {
    mounts_file: PathBuf,
    sys_block_dir: PathBuf,
}

impl CapabilityProbe {
    /// Probe using the real `/proc` and `/sys`
    pub fn new() -> Self {
        Self {
            mounts_file: PathBuf::from("/proc/mounts"),
            sys_block_dir: PathBuf::from("/sys/block"),
        }
    }

    /// Probe using alternative mount table and sysfs block directory
    pub fn with_roots(mounts_file: impl Into<PathBuf>, sys_block_dir: impl Into<PathBuf>) -> Self {
        Self {
            mounts_file: mounts_file.into(),
            sys_block_dir: sys_block_dir.into(),
        }
    }

    /// Measure the host and derive its capabilities
    pub fn probe(&self) -> SystemCapabilities {
        let cpu_cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        let mut system = System::new();
        system.refresh_memory();
        let available_memory_mb = system.available_memory() / (1024 * 1024);

        let rotational = self.classify_root_storage();
        if rotational.is_none() {
            warn!("Could not determine storage type, assuming slow storage");
        }

        let capabilities =
            SystemCapabilities::from_measurements(cpu_cores, available_memory_mb, rotational);
        debug!("Detected system capabilities: {:?}", capabilities);
        capabilities
    }

    /// Resolve the block device mounted at `/`
    pub fn root_storage(&self) -> Option<StorageKind> {
        let mounts = fs::read_to_string(&self.mounts_file).ok()?;
        let device = root_device(&mounts)?;

        // /dev/root and /dev/disk/by-* are symlinks to the real node
        let resolved = fs::canonicalize(&device).unwrap_or_else(|_| PathBuf::from(&device));
        let name = resolved.file_name()?.to_str()?.to_string();

        Some(StorageKind {
            flash_card: name.starts_with("mmcblk"),
            disk: parent_disk(&name),
            device: name,
        })
    }

    /// Classify the device backing `/`
    ///
    /// Returns `Some(true)` for rotational or flash card storage, `Some(false)`
    /// for solid state storage and `None` when the device cannot be resolved.
    pub fn classify_root_storage(&self) -> Option<bool> {
        let storage = self.root_storage()?;
        if storage.flash_card {
            return Some(true);
        }

        read_rotational(&self.sys_block_dir, &storage.device)
            .or_else(|| read_rotational(&self.sys_block_dir, &storage.disk))
    }
}

/// Block device backing the root filesystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKind {
    /// Kernel name of the mounted device (`sda2`, `nvme0n1p2`)
    pub device: String,
    /// Whole disk holding the device (`sda`, `nvme0n1`)
    pub disk: String,
    /// SD/eMMC card
    pub flash_card: bool,
}

impl Default for CapabilityProbe {
    fn default() -> Self {
        Self::new()
    }
}

/// Device mounted at `/`; later mounts shadow earlier ones.
fn root_device(mounts: &str) -> Option<String> {
    mounts
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let device = fields.next()?;
            let mount_point = fields.next()?;
            (mount_point == "/").then_some(device)
        })
        .last()
        .filter(|device| device.starts_with("/dev/"))
        .map(str::to_string)
}

/// Strip the partition suffix from a kernel block device name.
fn parent_disk(name: &str) -> String {
    let trimmed = name.trim_end_matches(|c: char| c.is_ascii_digit());
    if trimmed.len() == name.len() {
        return name.to_string();
    }

    // nvme0n1p2 / mmcblk0p1 / loop0p1 use a 'p' separator after a digit
    if let Some(base) = trimmed.strip_suffix('p') {
        if base.ends_with(|c: char| c.is_ascii_digit()) {
            return base.to_string();
        }
    }

    // nvme0n1 and loop0 are whole disks already
    if name.starts_with("nvme") || name.starts_with("loop") {
        return name.to_string();
    }

    trimmed.to_string()
}

fn read_rotational(sys_block_dir: &Path, disk: &str) -> Option<bool> {
    let flag = fs::read_to_string(sys_block_dir.join(disk).join("queue/rotational")).ok()?;
    match flag.trim() {
        "1" => Some(true),
        "0" => Some(false),
        _ => None,
    }
}
