//! Add-on options file parsing
//!
//! The platform hands the add-on its user configuration as a flat JSON object.
//! Keys that are unset in the UI usually arrive as `null`, so every field is
//! optional here and defaults are applied during validation.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer};
use std::fs;
use std::path::Path;

/// Location of the options file inside the add-on container
pub const DEFAULT_OPTIONS_PATH: &str = "/data/options.json";

/// Raw add-on options, exactly as supplied by the platform
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddonOptions {
    /// Explicit repository URL (mutually exclusive with `borg_host`)
    #[serde(default)]
    pub borg_repo_url: Option<String>,

    /// Remote repository host
    #[serde(default)]
    pub borg_host: Option<String>,

    /// Remote repository user
    #[serde(default)]
    pub borg_user: Option<String>,

    /// Repository path on the remote host
    #[serde(default)]
    pub borg_reponame: Option<String>,

    /// Repository passphrase
    #[serde(default)]
    pub borg_passphrase: Option<String>,

    /// Compression algorithm name
    #[serde(default)]
    pub borg_compression: Option<String>,

    /// Number of platform snapshots to keep
    #[serde(default, deserialize_with = "deserialize_count")]
    pub borg_backup_keep_snapshots: Option<i64>,

    /// Pass `--debug` to borg
    #[serde(default)]
    pub borg_backup_debug: Option<bool>,

    /// Extra SSH arguments for the repository transport
    #[serde(default)]
    pub borg_ssh_params: Option<String>,

    /// Exclude log files from archives
    #[serde(default)]
    pub borg_exclude_logs: Option<bool>,

    /// Comma-separated extra exclusion patterns
    #[serde(default)]
    pub borg_custom_excludes: Option<String>,
}

impl AddonOptions {
    /// Load options from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::config(format!("Configuration file {} not found", path.display()))
            } else {
                Error::config(format!("Failed to read {}: {}", path.display(), e))
            }
        })?;

        Self::from_json(&content)
    }

    /// Parse options from a JSON document
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| Error::config(format!("Failed to parse configuration JSON: {}", e)))
    }
}

/// The UI may store numbers as strings; accept both.
fn deserialize_count<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Number(i64),
        Text(String),
    }

    match Option::<Count>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Count::Number(n)) => Ok(Some(n)),
        Some(Count::Text(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid snapshot count '{}'", s))),
    }
}
