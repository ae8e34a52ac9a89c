//! `borg` subprocess wrapper

use crate::env::BorgEnvironment;
use async_trait::async_trait;
use borgkeeper_core::utils::format_size;
use borgkeeper_core::{Compression, Error, RepositoryConfig, Result};
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Timestamp format of archive times in `borg list --json`
const ARCHIVE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Lets `borg check --repair` run without an interactive confirmation
const REPAIR_CONFIRMATION: (&str, &str) = ("BORG_CHECK_I_KNOW_WHAT_I_AM_DOING", "YES");

/// Captured result of one `borg` invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Most useful description of a failure
    pub fn error_text(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        match self.exit_code {
            Some(code) => format!("exit status {}", code),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Parameters of `borg create`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRequest {
    pub archive_name: String,
    pub source: PathBuf,
    pub compression: Compression,
    pub excludes: Vec<String>,
}

/// Repository summary from `borg info --json`
#[derive(Debug, Clone, PartialEq)]
pub struct RepositoryStats {
    pub size_gb: f64,
    pub archives: usize,
    pub last_modified: Option<String>,
    pub compression_ratio: f64,
}

#[derive(Debug, Default, Deserialize)]
struct InfoJson {
    #[serde(default)]
    cache: CacheInfo,
    #[serde(default)]
    archives: Vec<serde_json::Value>,
    #[serde(default)]
    repository: RepositoryInfo,
}

#[derive(Debug, Default, Deserialize)]
struct CacheInfo {
    #[serde(default)]
    stats: CacheStats,
}

#[derive(Debug, Default, Deserialize)]
struct CacheStats {
    total_size: Option<u64>,
    total_csize: Option<u64>,
    original_size: Option<u64>,
    compressed_size: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RepositoryInfo {
    last_modified: Option<String>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl RepositoryStats {
    /// Parse `borg info --json` output
    pub fn from_info_json(json: &str) -> Result<Self> {
        let info: InfoJson = serde_json::from_str(json)?;
        let stats = info.cache.stats;

        let total_size = stats.total_size.unwrap_or(0);
        let original = stats.original_size.or(stats.total_size).unwrap_or(0);
        let compressed = stats.compressed_size.or(stats.total_csize).unwrap_or(0);
        let compression_ratio = if compressed > 0 {
            round2(original as f64 / compressed as f64)
        } else {
            1.0
        };

        Ok(Self {
            size_gb: round2(total_size as f64 / (1024.0 * 1024.0 * 1024.0)),
            archives: info.archives.len(),
            last_modified: info.repository.last_modified,
            compression_ratio,
        })
    }
}

/// One archive in the repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    /// Parsed creation time, `None` if borg used an unexpected format
    pub time: Option<NaiveDateTime>,
    /// Creation time exactly as borg reported it
    pub raw_time: String,
    pub original_size: u64,
}

impl ArchiveEntry {
    pub fn new(name: impl Into<String>, raw_time: impl Into<String>, original_size: u64) -> Self {
        let raw_time = raw_time.into();
        Self {
            name: name.into(),
            time: NaiveDateTime::parse_from_str(&raw_time, ARCHIVE_TIME_FORMAT).ok(),
            raw_time,
            original_size,
        }
    }

    pub fn human_size(&self) -> String {
        format_size(self.original_size)
    }

    /// `%Y-%m-%d %H:%M:%S`, or the raw time when it could not be parsed
    pub fn display_time(&self) -> String {
        match self.time {
            Some(time) => time.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => self.raw_time.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListJson {
    #[serde(default)]
    archives: Vec<ListedArchive>,
}

#[derive(Debug, Deserialize)]
struct ListedArchive {
    name: String,
    time: String,
    #[serde(default)]
    stats: Option<ListedStats>,
}

#[derive(Debug, Deserialize)]
struct ListedStats {
    #[serde(default)]
    original_size: u64,
}

/// Parse `borg list --json` output, newest archive first
pub fn parse_archive_list(json: &str) -> Result<Vec<ArchiveEntry>> {
    let listing: ListJson = serde_json::from_str(json)?;
    let mut entries: Vec<ArchiveEntry> = listing
        .archives
        .into_iter()
        .map(|a| {
            let size = a.stats.map(|s| s.original_size).unwrap_or(0);
            ArchiveEntry::new(a.name, a.time, size)
        })
        .collect();

    entries.sort_by(|a, b| b.raw_time.cmp(&a.raw_time));
    Ok(entries)
}

/// Operations the workflows need from the archive tool
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ArchiveTool: Send + Sync {
    /// `info` against the repository; a failing probe is not an error
    async fn probe(&self) -> Result<ToolOutput>;

    /// Repository statistics
    async fn info_json(&self) -> Result<RepositoryStats>;

    /// Create the repository, encrypted with `repokey-blake2` or unencrypted
    async fn init(&self, encrypted: bool) -> Result<()>;

    /// `check --repair`
    async fn check_repair(&self) -> Result<()>;

    /// Create an archive; the output carries borg's `--stats` report
    async fn create(&self, request: &CreateRequest) -> Result<ToolOutput>;

    /// Archives, newest first
    async fn list(&self) -> Result<Vec<ArchiveEntry>>;

    /// Extract an archive into `destination`
    async fn extract(&self, archive: &str, destination: &Path) -> Result<()>;
}

/// [`ArchiveTool`] backed by the `borg` executable
#[derive(Debug, Clone)]
pub struct BorgCli {
    program: PathBuf,
    repo_url: String,
    env: BorgEnvironment,
    debug: bool,
}

impl BorgCli {
    pub fn new(config: &RepositoryConfig, env: BorgEnvironment) -> Self {
        Self {
            program: PathBuf::from("borg"),
            repo_url: config.repo_url().to_string(),
            env,
            debug: config.debug(),
        }
    }

    /// Use a different executable
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn repo_url(&self) -> &str {
        &self.repo_url
    }

    fn archive_ref(&self, archive: &str) -> String {
        format!("{}::{}", self.repo_url, archive)
    }

    /// Run `borg <options> [--debug] <positionals>`
    async fn run(
        &self,
        options: Vec<String>,
        positionals: Vec<String>,
        cwd: Option<&Path>,
        extra_env: Option<(&str, &str)>,
    ) -> Result<ToolOutput> {
        let mut args = options;
        if self.debug {
            args.push("--debug".to_string());
        }
        args.extend(positionals);

        let subcommand = args.first().cloned().unwrap_or_default();
        debug!("Running: {} {}", self.program.display(), args.join(" "));

        let mut command = Command::new(&self.program);
        command.args(&args).stdin(Stdio::null());
        self.env.apply(&mut command);
        if let Some((name, value)) = extra_env {
            command.env(name, value);
        }
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }

        let output = command.output().await.map_err(|e| {
            Error::command(format!("{} {}", self.program.display(), subcommand), e.to_string())
        })?;

        Ok(ToolOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| a.to_string()).collect()
}

#[async_trait]
impl ArchiveTool for BorgCli {
    async fn probe(&self) -> Result<ToolOutput> {
        self.run(strings(&["info"]), vec![self.repo_url.clone()], None, None)
            .await
    }

    async fn info_json(&self) -> Result<RepositoryStats> {
        let output = self
            .run(strings(&["info", "--json"]), vec![self.repo_url.clone()], None, None)
            .await?;
        if !output.success() {
            return Err(Error::command("borg info", output.error_text()));
        }
        RepositoryStats::from_info_json(&output.stdout)
    }

    async fn init(&self, encrypted: bool) -> Result<()> {
        let mode = if encrypted { "repokey-blake2" } else { "none" };
        let output = self
            .run(
                vec!["init".to_string(), format!("--encryption={}", mode)],
                vec![self.repo_url.clone()],
                None,
                None,
            )
            .await?;
        if !output.success() {
            return Err(Error::repository_init(output.error_text()));
        }
        Ok(())
    }

    async fn check_repair(&self) -> Result<()> {
        let output = self
            .run(
                strings(&["check", "--repair"]),
                vec![self.repo_url.clone()],
                None,
                Some(REPAIR_CONFIRMATION),
            )
            .await?;
        if !output.success() {
            return Err(Error::repository_corruption(output.error_text()));
        }
        Ok(())
    }

    async fn create(&self, request: &CreateRequest) -> Result<ToolOutput> {
        let mut options = vec![
            "create".to_string(),
            "--compression".to_string(),
            request.compression.borg_spec(),
            "--stats".to_string(),
        ];
        for pattern in &request.excludes {
            options.push("--exclude".to_string());
            options.push(pattern.clone());
        }

        info!("Creating archive {}", request.archive_name);
        let output = self
            .run(
                options,
                vec![
                    self.archive_ref(&request.archive_name),
                    request.source.display().to_string(),
                ],
                None,
                None,
            )
            .await?;
        if !output.success() {
            return Err(Error::command("borg create", output.error_text()));
        }
        Ok(output)
    }

    async fn list(&self) -> Result<Vec<ArchiveEntry>> {
        let output = self
            .run(strings(&["list", "--json"]), vec![self.repo_url.clone()], None, None)
            .await?;
        if !output.success() {
            return Err(Error::command("borg list", output.error_text()));
        }
        parse_archive_list(&output.stdout)
    }

    async fn extract(&self, archive: &str, destination: &Path) -> Result<()> {
        info!("Extracting archive {} to {}", archive, destination.display());
        let output = self
            .run(
                strings(&["extract"]),
                vec![self.archive_ref(archive)],
                Some(destination),
                None,
            )
            .await?;
        if !output.success() {
            return Err(Error::extraction(archive, output.error_text()));
        }
        Ok(())
    }
}
