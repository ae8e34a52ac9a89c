//! Everything a workflow run needs, assembled once at startup

use crate::reporter::StatusReporter;
use crate::unpack::ArchiveUnpacker;
use borgkeeper_core::{PathsConfig, RepositoryConfig, StatusPublisher, SystemCapabilities};
use borgkeeper_repo::{ArchiveTool, RepositoryHealthController};
use borgkeeper_supervisor::SnapshotApi;
use std::sync::Arc;

pub struct RunContext {
    pub config: RepositoryConfig,
    pub paths: PathsConfig,
    pub capabilities: SystemCapabilities,
    pub tool: Arc<dyn ArchiveTool>,
    pub platform: Arc<dyn SnapshotApi>,
    pub reporter: StatusReporter,
    pub unpacker: ArchiveUnpacker,
}

impl RunContext {
    pub fn new(
        config: RepositoryConfig,
        paths: PathsConfig,
        capabilities: SystemCapabilities,
        tool: Arc<dyn ArchiveTool>,
        platform: Arc<dyn SnapshotApi>,
        publisher: Arc<dyn StatusPublisher>,
    ) -> Self {
        Self {
            config,
            paths,
            capabilities,
            tool,
            platform,
            reporter: StatusReporter::new(publisher),
            unpacker: ArchiveUnpacker::new(capabilities),
        }
    }

    /// Replace the snapshot unpacker
    pub fn with_unpacker(mut self, unpacker: ArchiveUnpacker) -> Self {
        self.unpacker = unpacker;
        self
    }

    /// Health controller bound to this run's tool and publisher
    pub fn health_controller(&self) -> RepositoryHealthController {
        RepositoryHealthController::new(
            self.tool.clone(),
            self.reporter.publisher(),
            self.config.is_encrypted(),
        )
    }
}
