//! Run status entities
//!
//! Progress is reported to the platform as entity states. Publishing is a
//! one-way side channel: the workflows never read these values back and a
//! failed publication never changes the outcome of a run.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt;

/// Main workflow status sensor
pub const STATUS_ENTITY: &str = "sensor.borg_backup_status";

/// Timestamp of the last successful backup
pub const LAST_BACKUP_ENTITY: &str = "sensor.borg_backup_last";

/// Repository size and statistics
pub const REPOSITORY_ENTITY: &str = "sensor.borg_backup_repository";

/// Whether the repository is reachable
pub const AVAILABLE_ENTITY: &str = "binary_sensor.borg_backup_available";

/// Archives available for restore
pub const AVAILABLE_BACKUPS_ENTITY: &str = "sensor.borg_available_backups";

/// States of the backup and restore workflows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    Idle,
    Running,
    Repairing,
    CreatingPlatformSnapshot,
    Unpacking,
    CreatingArchive,
    Pruning,
    Completed,
    Error,
    RestoreMode,
    Restoring,
    ListingArchives,
    Selecting,
    Extracting,
    RestoringToPlatform,
}

impl RunState {
    /// State string published to the platform
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Repairing => "repairing",
            Self::CreatingPlatformSnapshot => "creating_platform_snapshot",
            Self::Unpacking => "unpacking",
            Self::CreatingArchive => "creating_archive",
            Self::Pruning => "pruning",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::RestoreMode => "restore_mode",
            Self::Restoring => "restoring",
            Self::ListingArchives => "listing_archives",
            Self::Selecting => "selecting",
            Self::Extracting => "extracting",
            Self::RestoringToPlatform => "restoring_to_platform",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entity state change
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub entity_id: String,
    pub state: String,
    pub attributes: Map<String, Value>,
}

impl StatusUpdate {
    /// Update for an arbitrary entity
    pub fn new(entity_id: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            state: state.into(),
            attributes: Map::new(),
        }
    }

    /// Update for the main status sensor
    pub fn run_state(state: RunState) -> Self {
        Self::new(STATUS_ENTITY, state.as_str())
    }

    /// Add an attribute
    pub fn attr(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }
}

/// Sink for status updates
///
/// Implementations log and swallow their own failures; the return value only
/// tells whether the update was delivered.
#[async_trait]
pub trait StatusPublisher: Send + Sync {
    /// Publish one update
    async fn publish(&self, update: StatusUpdate) -> bool;
}

/// Publisher that drops every update
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPublisher;

#[async_trait]
impl StatusPublisher for NoopPublisher {
    async fn publish(&self, _update: StatusUpdate) -> bool {
        false
    }
}
