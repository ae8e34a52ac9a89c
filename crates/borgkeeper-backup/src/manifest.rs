//! Record of how a platform snapshot was unpacked
//!
//! Written to the root of every unpacked snapshot and archived with it, so a
//! restore can rebuild a snapshot the platform accepts.

use borgkeeper_core::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Version of the manifest format
pub const MANIFEST_VERSION: u32 = 1;

/// Name of the manifest file in an unpacked snapshot
pub const MANIFEST_FILENAME: &str = ".borgkeeper-unpack.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnpackManifest {
    pub version: u32,

    /// Platform slug of the snapshot
    pub slug: String,

    pub unpacked_at: DateTime<Utc>,

    /// Nested archives that were expanded, relative to the snapshot root
    #[serde(default)]
    pub nested: Vec<String>,
}

impl UnpackManifest {
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            version: MANIFEST_VERSION,
            slug: slug.into(),
            unpacked_at: Utc::now(),
            nested: Vec::new(),
        }
    }

    pub fn write(&self, root: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(root.join(MANIFEST_FILENAME), json)?;
        Ok(())
    }

    pub fn read(root: &Path) -> Result<Self> {
        let content = fs::read_to_string(root.join(MANIFEST_FILENAME))?;
        Ok(serde_json::from_str(&content)?)
    }
}
