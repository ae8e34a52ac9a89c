//! Repository configuration validation
//!
//! Turns raw [`AddonOptions`] into a [`RepositoryConfig`]. Structural problems
//! (no repository, two repositories, host without a name) are fatal; policy
//! values that are merely out of range are corrected with a warning so that a
//! typo in the UI never blocks a scheduled backup.

use super::options::AddonOptions;
use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Default number of platform snapshots to keep
pub const DEFAULT_KEEP_SNAPSHOTS: u32 = 5;

/// Compression algorithms accepted by `borg create --compression`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Compression {
    /// No compression
    None,
    /// LZ4 (fast, low ratio)
    Lz4,
    /// Zstandard
    #[default]
    Zstd,
    /// zlib
    Zlib,
    /// LZMA (slow, high ratio)
    Lzma,
}

impl Compression {
    /// All supported algorithms, in display order
    pub const ALL: [Compression; 5] = [
        Compression::None,
        Compression::Lz4,
        Compression::Zstd,
        Compression::Zlib,
        Compression::Lzma,
    ];

    /// Name as understood by borg
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Lz4 => "lz4",
            Self::Zstd => "zstd",
            Self::Zlib => "zlib",
            Self::Lzma => "lzma",
        }
    }

    /// Argument for `--compression`, always at level 9
    pub fn borg_spec(&self) -> String {
        format!("{},9", self.as_str())
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Compression {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| Error::config(format!("Invalid compression algorithm '{}'", s)))
    }
}

/// Where the repository lives, as the user expressed it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryLocation {
    /// Explicit borg repository URL
    Url(String),
    /// Remote host triple, turned into `[user@]host:name`
    Host {
        user: Option<String>,
        host: String,
        name: String,
    },
}

impl RepositoryLocation {
    /// Effective borg repository URL
    pub fn url(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::Host { user, host, name } => match user {
                Some(user) => format!("{}@{}:{}", user, host, name),
                None => format!("{}:{}", host, name),
            },
        }
    }
}

/// Validated repository and retention policy
#[derive(Clone)]
pub struct RepositoryConfig {
    location: RepositoryLocation,
    repo_url: String,
    passphrase: Option<String>,
    compression: Compression,
    keep_snapshots: u32,
    exclude_logs: bool,
    custom_excludes: String,
    ssh_params: String,
    debug: bool,
}

impl RepositoryConfig {
    /// Validate and normalize raw add-on options
    pub fn validate(options: &AddonOptions) -> Result<Self> {
        let repo_url = non_empty(&options.borg_repo_url);
        let host = non_empty(&options.borg_host);
        let reponame = non_empty(&options.borg_reponame);
        let user = non_empty(&options.borg_user);

        let location = match (repo_url, host) {
            (None, None) => {
                return Err(Error::config(
                    "Either 'borg_repo_url' or 'borg_host' must be defined",
                ))
            }
            (Some(_), Some(_)) => {
                return Err(Error::config(
                    "Cannot define both 'borg_repo_url' and 'borg_host'",
                ))
            }
            (Some(url), None) => RepositoryLocation::Url(url),
            (None, Some(host)) => {
                let name = reponame.ok_or_else(|| {
                    Error::config("When using borg_host, borg_reponame must be defined")
                })?;
                RepositoryLocation::Host { user, host, name }
            }
        };

        let compression = match options.borg_compression.as_deref().map(str::trim) {
            None | Some("") => Compression::default(),
            Some(name) => name.parse::<Compression>().unwrap_or_else(|_| {
                let valid: Vec<&str> = Compression::ALL.iter().map(|c| c.as_str()).collect();
                warn!(
                    "Invalid compression algorithm '{}'. Using default 'zstd'. Valid options are: {}",
                    name,
                    valid.join(", ")
                );
                Compression::default()
            }),
        };

        let requested_keep = options
            .borg_backup_keep_snapshots
            .unwrap_or(i64::from(DEFAULT_KEEP_SNAPSHOTS));
        let keep_snapshots = if requested_keep < 1 {
            warn!(
                "Invalid keep_snapshots value: {}. Setting to minimum value of 1.",
                requested_keep
            );
            1
        } else {
            u32::try_from(requested_keep).unwrap_or(u32::MAX)
        };

        let passphrase = non_empty(&options.borg_passphrase);
        if passphrase.is_none() {
            warn!(
                "No passphrase configured! Your backups will NOT be encrypted. \
                 This is a security risk. Please set 'borg_passphrase' in your configuration."
            );
        }

        Ok(Self {
            repo_url: location.url(),
            location,
            passphrase,
            compression,
            keep_snapshots,
            exclude_logs: options.borg_exclude_logs.unwrap_or(true),
            custom_excludes: options.borg_custom_excludes.clone().unwrap_or_default(),
            ssh_params: options.borg_ssh_params.clone().unwrap_or_default(),
            debug: options.borg_backup_debug.unwrap_or(false),
        })
    }

    /// How the repository was configured
    pub fn location(&self) -> &RepositoryLocation {
        &self.location
    }

    /// Effective repository URL passed to borg
    pub fn repo_url(&self) -> &str {
        &self.repo_url
    }

    /// Repository passphrase, if any
    pub fn passphrase(&self) -> Option<&str> {
        self.passphrase.as_deref()
    }

    /// Whether new repositories are created encrypted
    pub fn is_encrypted(&self) -> bool {
        self.passphrase.is_some()
    }

    /// Compression used for archive creation
    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Number of platform snapshots kept after pruning (always >= 1)
    pub fn keep_snapshots(&self) -> u32 {
        self.keep_snapshots
    }

    /// Whether log files are excluded from archives
    pub fn exclude_logs(&self) -> bool {
        self.exclude_logs
    }

    /// User supplied exclusion patterns, trimmed, empties dropped
    pub fn custom_exclude_patterns(&self) -> Vec<String> {
        self.custom_excludes
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Extra arguments appended to the SSH transport command
    pub fn ssh_params(&self) -> &str {
        &self.ssh_params
    }

    /// Whether borg runs with `--debug`
    pub fn debug(&self) -> bool {
        self.debug
    }
}

// Hand-written so the passphrase never ends up in logs.
impl fmt::Debug for RepositoryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryConfig")
            .field("repo_url", &self.repo_url)
            .field("passphrase", &self.passphrase.as_ref().map(|_| "<redacted>"))
            .field("compression", &self.compression)
            .field("keep_snapshots", &self.keep_snapshots)
            .field("exclude_logs", &self.exclude_logs)
            .field("custom_excludes", &self.custom_excludes)
            .field("ssh_params", &self.ssh_params)
            .field("debug", &self.debug)
            .finish()
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
