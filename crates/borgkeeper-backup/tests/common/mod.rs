//! Common test helpers for borgkeeper-backup integration tests
//!
//! Recording fakes stand in for borg, the supervisor and the status sink.
//! The fake archive tool stores a copy of every archived tree so a later
//! restore extracts exactly what was backed up.

#![allow(dead_code)]

use async_trait::async_trait;
use borgkeeper_backup::{ArchiveUnpacker, RunContext};
use borgkeeper_core::status::STATUS_ENTITY;
use borgkeeper_core::{
    AddonOptions, Error, PathsConfig, RepositoryConfig, Result, StatusPublisher, StatusUpdate,
    SystemCapabilities,
};
use borgkeeper_repo::{ArchiveEntry, ArchiveTool, CreateRequest, RepositoryStats, ToolOutput};
use borgkeeper_supervisor::{BackupRecord, SnapshotApi};
use chrono::{TimeZone, Utc};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::{BTreeMap, VecDeque};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tar::{Builder, Header};
use tempfile::TempDir;
use walkdir::WalkDir;

pub const HA_CONFIG: &str = "homeassistant:\n  name: Home\n";

/// Publisher that keeps every update
#[derive(Default)]
pub struct RecordingPublisher {
    updates: Mutex<Vec<StatusUpdate>>,
}

impl RecordingPublisher {
    pub fn updates(&self) -> Vec<StatusUpdate> {
        self.updates.lock().unwrap().clone()
    }

    /// States of the main status sensor, in order
    pub fn run_states(&self) -> Vec<String> {
        self.updates()
            .into_iter()
            .filter(|u| u.entity_id == STATUS_ENTITY)
            .map(|u| u.state)
            .collect()
    }

    pub fn last_for(&self, entity_id: &str) -> Option<StatusUpdate> {
        self.updates()
            .into_iter()
            .rev()
            .find(|u| u.entity_id == entity_id)
    }
}

#[async_trait]
impl StatusPublisher for RecordingPublisher {
    async fn publish(&self, update: StatusUpdate) -> bool {
        self.updates.lock().unwrap().push(update);
        true
    }
}

/// In-memory stand-in for a borg repository
#[derive(Default)]
pub struct FakeArchiveTool {
    pub calls: Mutex<Vec<String>>,
    probes: Mutex<VecDeque<ToolOutput>>,
    archives: Mutex<BTreeMap<String, PathBuf>>,
    listing: Mutex<Option<Vec<ArchiveEntry>>>,
    stash: Mutex<Option<PathBuf>>,
    pub create_error: Mutex<Option<String>>,
    pub last_create: Mutex<Option<CreateRequest>>,
}

impl FakeArchiveTool {
    /// Archived trees are copied below `stash`
    pub fn new(stash: &Path) -> Self {
        let tool = Self::default();
        *tool.stash.lock().unwrap() = Some(stash.to_path_buf());
        tool
    }

    /// Queue probe results; an empty queue answers "ready"
    pub fn with_probes(self, probes: Vec<ToolOutput>) -> Self {
        *self.probes.lock().unwrap() = probes.into();
        self
    }

    /// Serve this listing instead of the stored archives
    pub fn with_listing(self, listing: Vec<ArchiveEntry>) -> Self {
        *self.listing.lock().unwrap() = Some(listing);
        self
    }

    /// Register an archive whose content is the tree at `content`
    pub fn with_archive(self, name: &str, content: &Path) -> Self {
        self.archives
            .lock()
            .unwrap()
            .insert(name.to_string(), content.to_path_buf());
        self
    }

    pub fn fail_create(self, message: &str) -> Self {
        *self.create_error.lock().unwrap() = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn archive_names(&self) -> Vec<String> {
        self.archives.lock().unwrap().keys().cloned().collect()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ArchiveTool for FakeArchiveTool {
    async fn probe(&self) -> Result<ToolOutput> {
        self.record("probe".to_string());
        let next = self.probes.lock().unwrap().pop_front();
        Ok(next.unwrap_or(ToolOutput {
            exit_code: Some(0),
            ..Default::default()
        }))
    }

    async fn info_json(&self) -> Result<RepositoryStats> {
        self.record("info".to_string());
        Ok(RepositoryStats {
            size_gb: 1.5,
            archives: self.archives.lock().unwrap().len(),
            last_modified: Some("2024-05-01T02:00:00.000000".to_string()),
            compression_ratio: 2.0,
        })
    }

    async fn init(&self, encrypted: bool) -> Result<()> {
        self.record(format!("init encrypted={}", encrypted));
        Ok(())
    }

    async fn check_repair(&self) -> Result<()> {
        self.record("check --repair".to_string());
        Ok(())
    }

    async fn create(&self, request: &CreateRequest) -> Result<ToolOutput> {
        self.record(format!("create {}", request.archive_name));
        *self.last_create.lock().unwrap() = Some(request.clone());
        if let Some(message) = self.create_error.lock().unwrap().clone() {
            return Err(Error::command("borg create", message));
        }

        let stash = self.stash.lock().unwrap().clone().unwrap();
        let copy = stash.join(&request.archive_name);
        copy_tree(&request.source, &copy);
        self.archives
            .lock()
            .unwrap()
            .insert(request.archive_name.clone(), copy);

        Ok(ToolOutput {
            exit_code: Some(0),
            stdout: String::new(),
            stderr: "Number of files: 3\n".to_string(),
        })
    }

    async fn list(&self) -> Result<Vec<ArchiveEntry>> {
        self.record("list".to_string());
        if let Some(listing) = self.listing.lock().unwrap().clone() {
            return Ok(listing);
        }
        let mut entries: Vec<ArchiveEntry> = self
            .archives
            .lock()
            .unwrap()
            .keys()
            .map(|name| ArchiveEntry::new(name.clone(), "2024-05-01T02:00:00.000000", 1024))
            .collect();
        entries.reverse();
        Ok(entries)
    }

    async fn extract(&self, archive: &str, destination: &Path) -> Result<()> {
        self.record(format!("extract {}", archive));
        let source = self
            .archives
            .lock()
            .unwrap()
            .get(archive)
            .cloned()
            .ok_or_else(|| Error::extraction(archive, "archive not in repository"))?;
        copy_tree(&source, destination);
        Ok(())
    }
}

/// What `create_full` leaves in the snapshot directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFile {
    Valid,
    Missing,
    TruncatedNested,
}

/// Supervisor stand-in that writes real snapshot files
pub struct FakePlatform {
    snapshot_dir: PathBuf,
    snapshot_file: SnapshotFile,
    pub records: Mutex<Vec<BackupRecord>>,
    pub created: Mutex<Vec<String>>,
    pub deleted: Mutex<Vec<String>>,
    pub restored: Mutex<Vec<String>>,
    pub failing_deletes: Mutex<Vec<String>>,
}

impl FakePlatform {
    pub fn new(snapshot_dir: &Path) -> Self {
        Self {
            snapshot_dir: snapshot_dir.to_path_buf(),
            snapshot_file: SnapshotFile::Valid,
            records: Mutex::new(Vec::new()),
            created: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            restored: Mutex::new(Vec::new()),
            failing_deletes: Mutex::new(Vec::new()),
        }
    }

    /// Pretend these snapshots already exist (day of May 2024 per slug)
    pub fn with_records(self, slugs: &[(&str, u32)]) -> Self {
        {
            let mut records = self.records.lock().unwrap();
            for (slug, day) in slugs {
                records.push(record(slug, *day));
            }
        }
        self
    }

    pub fn with_snapshot_file(mut self, kind: SnapshotFile) -> Self {
        self.snapshot_file = kind;
        self
    }

    pub fn fail_delete(self, slug: &str) -> Self {
        self.failing_deletes.lock().unwrap().push(slug.to_string());
        self
    }

    pub fn restored(&self) -> Vec<String> {
        self.restored.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

pub fn record(slug: &str, day: u32) -> BackupRecord {
    BackupRecord {
        slug: slug.to_string(),
        name: format!("borg-{}", slug),
        date: Utc.with_ymd_and_hms(2024, 5, day, 2, 0, 0).unwrap(),
        size: Some(1.0),
    }
}

#[async_trait]
impl SnapshotApi for FakePlatform {
    async fn create_full(&self, name: &str) -> Result<String> {
        let slug = format!("snap{}", self.created.lock().unwrap().len() + 1);
        let path = self.snapshot_dir.join(format!("{}.tar", slug));
        match self.snapshot_file {
            SnapshotFile::Valid => write_platform_snapshot(&path, &slug),
            SnapshotFile::TruncatedNested => write_truncated_snapshot(&path, &slug),
            SnapshotFile::Missing => {}
        }
        self.created.lock().unwrap().push(name.to_string());
        self.records.lock().unwrap().push(record(&slug, 28));
        Ok(slug)
    }

    async fn list(&self) -> Result<Vec<BackupRecord>> {
        Ok(self.records.lock().unwrap().clone())
    }

    async fn delete(&self, slug: &str) -> Result<()> {
        if self.failing_deletes.lock().unwrap().iter().any(|s| s == slug) {
            return Err(Error::api_call("delete backup", "HTTP 500"));
        }
        self.deleted.lock().unwrap().push(slug.to_string());
        self.records.lock().unwrap().retain(|r| r.slug != slug);
        Ok(())
    }

    async fn restore_full(&self, slug: &str) -> Result<()> {
        let file = self.snapshot_dir.join(format!("{}.tar", slug));
        if !file.is_file() {
            return Err(Error::api_call("restore backup", format!("{} missing", slug)));
        }
        self.restored.lock().unwrap().push(slug.to_string());
        Ok(())
    }
}

/// Everything a workflow test needs, rooted in one temporary directory
pub struct Harness {
    pub tmp: TempDir,
    pub paths: PathsConfig,
    pub tool: Arc<FakeArchiveTool>,
    pub platform: Arc<FakePlatform>,
    pub publisher: Arc<RecordingPublisher>,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(|tool| tool, |platform| platform)
    }

    pub fn build(
        tool: impl FnOnce(FakeArchiveTool) -> FakeArchiveTool,
        platform: impl FnOnce(FakePlatform) -> FakePlatform,
    ) -> Self {
        let tmp = TempDir::new().unwrap();
        let paths = test_paths(tmp.path());
        fs::create_dir_all(&paths.snapshot_dir).unwrap();
        fs::create_dir_all(tmp.path().join("stash")).unwrap();

        Self {
            tool: Arc::new(tool(FakeArchiveTool::new(&tmp.path().join("stash")))),
            platform: Arc::new(platform(FakePlatform::new(&paths.snapshot_dir))),
            publisher: Arc::new(RecordingPublisher::default()),
            paths,
            tmp,
        }
    }

    pub fn context(&self, options: &str) -> RunContext {
        let capabilities = SystemCapabilities::from_measurements(2, 1024, None);
        RunContext::new(
            test_config(options),
            self.paths.clone(),
            capabilities,
            self.tool.clone(),
            self.platform.clone(),
            self.publisher.clone(),
        )
        .with_unpacker(ArchiveUnpacker::new(capabilities).with_parallel_helper(None))
    }

    /// Entries left in the scratch area
    pub fn scratch_entries(&self) -> Vec<String> {
        match fs::read_dir(&self.paths.scratch_dir) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

pub fn test_paths(root: &Path) -> PathsConfig {
    PathsConfig::default()
        .with_borg_dirs(root.join("borg"), root.join("borg/cache"))
        .with_scratch_dir(root.join("backup/borg_unpacked"))
        .with_snapshot_dir(root.join("backup"))
}

/// Repository config from an options JSON fragment merged over a local URL
pub fn test_config(extra: &str) -> RepositoryConfig {
    let json = if extra.trim().is_empty() {
        r#"{"borg_repo_url":"/tmp/repo","borg_passphrase":"secret"}"#.to_string()
    } else {
        format!(
            r#"{{"borg_repo_url":"/tmp/repo","borg_passphrase":"secret",{}}}"#,
            extra
        )
    };
    RepositoryConfig::validate(&AddonOptions::from_json(&json).unwrap()).unwrap()
}

fn append_file<W: std::io::Write>(builder: &mut Builder<W>, name: &str, data: &[u8]) {
    let mut header = Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append_data(&mut header, name, data).unwrap();
}

fn nested_folder_archive() -> Vec<u8> {
    let mut nested = Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    append_file(&mut nested, "data/configuration.yaml", HA_CONFIG.as_bytes());
    append_file(&mut nested, "data/home-assistant.log", b"log line\n");
    nested.into_inner().unwrap().finish().unwrap()
}

/// Platform snapshot: plain outer tar with metadata and one gzipped folder archive
pub fn write_platform_snapshot(path: &Path, slug: &str) {
    write_outer_snapshot(path, slug, &nested_folder_archive());
}

/// Platform snapshot whose nested folder archive is cut off halfway
pub fn write_truncated_snapshot(path: &Path, slug: &str) {
    let nested = nested_folder_archive();
    write_outer_snapshot(path, slug, &nested[..nested.len() / 2]);
}

fn write_outer_snapshot(path: &Path, slug: &str, nested: &[u8]) {
    let mut outer = Builder::new(File::create(path).unwrap());
    let metadata = format!(r#"{{"slug":"{}","type":"full"}}"#, slug);
    append_file(&mut outer, "backup.json", metadata.as_bytes());
    append_file(&mut outer, "homeassistant.tar.gz", nested);
    outer.finish().unwrap();
}

/// Names of the entries in a plain tar
pub fn tar_entries(path: &Path) -> Vec<String> {
    let mut archive = tar::Archive::new(File::open(path).unwrap());
    archive
        .entries()
        .unwrap()
        .map(|e| e.unwrap().path().unwrap().display().to_string())
        .collect()
}

pub fn copy_tree(source: &Path, destination: &Path) {
    for entry in WalkDir::new(source).into_iter().filter_map(|e| e.ok()) {
        let relative = entry.path().strip_prefix(source).unwrap();
        let target = destination.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).unwrap();
        } else {
            fs::copy(entry.path(), &target).unwrap();
        }
    }
}
