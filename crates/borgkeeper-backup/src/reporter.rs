//! Entity updates published by the workflows

use borgkeeper_core::status::{
    AVAILABLE_BACKUPS_ENTITY, AVAILABLE_ENTITY, LAST_BACKUP_ENTITY, REPOSITORY_ENTITY,
    STATUS_ENTITY,
};
use borgkeeper_core::{RunState, StatusPublisher, StatusUpdate};
use borgkeeper_repo::{ArchiveEntry, RepositoryStats};
use chrono::Local;
use serde_json::Value;
use std::sync::Arc;

fn now() -> String {
    Local::now().to_rfc3339()
}

/// Thin layer over a [`StatusPublisher`] that knows the entity layout
#[derive(Clone)]
pub struct StatusReporter {
    publisher: Arc<dyn StatusPublisher>,
}

impl StatusReporter {
    pub fn new(publisher: Arc<dyn StatusPublisher>) -> Self {
        Self { publisher }
    }

    pub fn publisher(&self) -> Arc<dyn StatusPublisher> {
        self.publisher.clone()
    }

    async fn send(&self, update: StatusUpdate) {
        self.publisher.publish(update).await;
    }

    /// Register every entity with its default state
    pub async fn initial_entities(&self, initial: RunState) {
        let mut status = StatusUpdate::run_state(initial)
            .attr("friendly_name", "Borg Backup Status")
            .attr("icon", "mdi:backup-restore")
            .attr("device_class", "enum");
        if initial == RunState::RestoreMode {
            status = status.attr("mode", "restore");
        }
        self.send(status).await;

        self.send(
            StatusUpdate::new(LAST_BACKUP_ENTITY, "unknown")
                .attr("friendly_name", "Last Borg Backup")
                .attr("icon", "mdi:clock-outline")
                .attr("device_class", "timestamp"),
        )
        .await;
        self.send(
            StatusUpdate::new(REPOSITORY_ENTITY, "unknown")
                .attr("friendly_name", "Borg Repository Info")
                .attr("icon", "mdi:database")
                .attr("unit_of_measurement", "GB"),
        )
        .await;
        self.send(
            StatusUpdate::new(AVAILABLE_ENTITY, "off")
                .attr("friendly_name", "Borg Backup Available")
                .attr("icon", "mdi:check-circle")
                .attr("device_class", "connectivity"),
        )
        .await;
    }

    /// Workflow entered `state`; `progress` is shown next to it
    pub async fn state(&self, state: RunState, progress: &str) {
        self.send(StatusUpdate::run_state(state).attr("progress", progress))
            .await;
    }

    /// Workflow started
    pub async fn started(&self, state: RunState) {
        self.send(StatusUpdate::run_state(state).attr("last_started", now()))
            .await;
    }

    /// Repository passed the health check
    pub async fn available(&self) {
        self.send(StatusUpdate::new(AVAILABLE_ENTITY, "on").attr("last_checked", now()))
            .await;
    }

    /// Backup finished
    pub async fn backup_completed(&self, archive_name: &str, stats: Option<&RepositoryStats>) {
        let finished = now();
        self.send(
            StatusUpdate::run_state(RunState::Completed)
                .attr("last_completed", finished.clone())
                .attr("last_backup_name", archive_name),
        )
        .await;
        self.send(
            StatusUpdate::new(LAST_BACKUP_ENTITY, finished)
                .attr("backup_name", archive_name)
                .attr("status", "success"),
        )
        .await;

        if let Some(stats) = stats {
            self.send(
                StatusUpdate::new(REPOSITORY_ENTITY, stats.size_gb.to_string())
                    .attr("total_archives", stats.archives)
                    .attr("last_modified", stats.last_modified.clone())
                    .attr("compression_ratio", stats.compression_ratio),
            )
            .await;
        }
    }

    /// Restore finished
    pub async fn restore_completed(&self, archive_name: &str) {
        self.send(
            StatusUpdate::run_state(RunState::Completed)
                .attr("last_completed", now())
                .attr("restored_backup", archive_name),
        )
        .await;
    }

    /// Archives in the repository, newest first
    pub async fn available_backups(&self, archives: &[ArchiveEntry]) {
        let names: Vec<Value> = archives.iter().map(|a| Value::from(a.name.as_str())).collect();
        let latest = archives.first().map(|a| a.name.clone());

        self.send(
            StatusUpdate::new(AVAILABLE_BACKUPS_ENTITY, archives.len().to_string())
                .attr("friendly_name", "Available Borg Backups")
                .attr("icon", "mdi:backup-restore")
                .attr("backup_list", names)
                .attr("latest_backup", latest),
        )
        .await;
    }

    /// Run failed
    pub async fn error(&self, message: &str) {
        self.send(
            StatusUpdate::new(STATUS_ENTITY, RunState::Error.as_str())
                .attr("error_message", message)
                .attr("last_error", now()),
        )
        .await;
        self.send(StatusUpdate::new(AVAILABLE_ENTITY, "off").attr("last_error", message))
            .await;
    }
}
