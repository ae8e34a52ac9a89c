//! Restore workflow
//!
//! `restore_mode → restoring → (repository health) → listing_archives →
//! selecting → extracting → restoring_to_platform → completed`, or `error`
//! from any step. The extraction directory is removed on every exit path.

use crate::context::RunContext;
use crate::manifest::UnpackManifest;
use crate::repack::{locate_snapshot, repack, SnapshotSource};
use crate::scratch::{sweep_stale, ScratchDir};
use crate::selection::Selection;
use borgkeeper_core::{Error, Result, RunState};
use borgkeeper_repo::{ArchiveEntry, HealthReport};
use std::path::Path;
use tracing::{error, info};

/// Result of a successful restore
#[derive(Debug)]
pub struct RestoreSummary {
    pub archive: ArchiveEntry,
    pub slug: String,
    pub health: HealthReport,
}

pub struct RestoreOrchestrator {
    ctx: RunContext,
    selection: Selection,
}

impl RestoreOrchestrator {
    pub fn new(ctx: RunContext, selection: Selection) -> Self {
        Self { ctx, selection }
    }

    /// Run the workflow, publishing an error status on failure
    pub async fn run(&self) -> Result<RestoreSummary> {
        self.ctx.reporter.initial_entities(RunState::RestoreMode).await;

        match self.execute().await {
            Ok(summary) => {
                info!("Restore of {} completed", summary.archive.name);
                Ok(summary)
            }
            Err(e) => {
                error!("Restore failed: {}", e);
                self.ctx.reporter.error(&e.to_string()).await;
                Err(e)
            }
        }
    }

    async fn execute(&self) -> Result<RestoreSummary> {
        let ctx = &self.ctx;
        ctx.reporter.started(RunState::Restoring).await;
        sweep_stale(&ctx.paths.scratch_dir);

        let health = ctx.health_controller().ensure_ready().await?;
        ctx.reporter.available().await;

        ctx.reporter
            .state(RunState::ListingArchives, "Listing available backups...")
            .await;
        let archives = ctx.tool.list().await?;
        ctx.reporter.available_backups(&archives).await;
        if archives.is_empty() {
            return Err(Error::NoArchives);
        }

        info!("Available backups:");
        for (i, archive) in archives.iter().enumerate() {
            info!(
                "{}. {} ({}, {})",
                i + 1,
                archive.name,
                archive.display_time(),
                archive.human_size()
            );
        }

        ctx.reporter
            .state(RunState::Selecting, "Selecting backup...")
            .await;
        let archive = self.selection.resolve(&archives)?.clone();
        info!("Selected backup {} by {}", archive.name, self.selection);

        ctx.reporter
            .state(
                RunState::Extracting,
                &format!("Extracting backup {}...", archive.name),
            )
            .await;
        let scratch = ScratchDir::create(ctx.paths.restore_dir())?;
        ctx.tool.extract(&archive.name, scratch.path()).await?;
        let slug = self.prepare_snapshot(&archive, scratch.path()).await?;
        drop(scratch);

        ctx.reporter
            .state(
                RunState::RestoringToPlatform,
                "Restoring platform snapshot...",
            )
            .await;
        ctx.platform.restore_full(&slug).await?;
        ctx.reporter.restore_completed(&archive.name).await;

        Ok(RestoreSummary {
            archive,
            slug,
            health,
        })
    }

    /// Place a platform snapshot for the extracted archive in the snapshot directory
    async fn prepare_snapshot(&self, archive: &ArchiveEntry, extracted: &Path) -> Result<String> {
        let snapshot_dir = &self.ctx.paths.snapshot_dir;

        match locate_snapshot(extracted) {
            Some(SnapshotSource::Packed(tar)) => {
                let slug = tar
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let destination = self.ctx.paths.snapshot_file(&slug);
                info!("Copying {} to {}", tar.display(), snapshot_dir.display());
                tokio::fs::create_dir_all(snapshot_dir).await?;
                tokio::fs::copy(&tar, &destination).await?;
                Ok(slug)
            }
            Some(SnapshotSource::Unpacked(root)) => {
                let slug = UnpackManifest::read(&root)?.slug;
                let output = self.ctx.paths.snapshot_file(&slug);
                let label = root.display().to_string();
                tokio::task::spawn_blocking(move || repack(&root, &output))
                    .await
                    .map_err(|e| Error::extraction(label, e.to_string()))??;
                Ok(slug)
            }
            None => Err(Error::extraction(
                archive.name.clone(),
                "no platform snapshot found in archive",
            )),
        }
    }
}
