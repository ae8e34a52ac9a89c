//! Backup workflow
//!
//! `idle → running → (repository health) → creating_platform_snapshot →
//! unpacking → creating_archive → pruning → completed`, or `error` from any
//! step. The unpacked snapshot is removed on every exit path.

use crate::context::RunContext;
use crate::prune::{PruneReport, RetentionPruner};
use crate::scratch::{sweep_stale, ScratchDir};
use borgkeeper_core::{Result, RunState};
use borgkeeper_repo::excludes::exclusion_patterns;
use borgkeeper_repo::{CreateRequest, HealthReport};
use chrono::Local;
use tracing::{error, info, warn};

/// Archive names are the local start time in this format
pub const ARCHIVE_NAME_FORMAT: &str = "%Y-%m-%d-%H:%M";

/// Result of a successful backup
#[derive(Debug)]
pub struct BackupSummary {
    pub archive_name: String,
    pub slug: String,
    pub health: HealthReport,
    pub pruned: PruneReport,
}

pub struct BackupOrchestrator {
    ctx: RunContext,
}

impl BackupOrchestrator {
    pub fn new(ctx: RunContext) -> Self {
        Self { ctx }
    }

    /// Run the workflow, publishing an error status on failure
    pub async fn run(&self) -> Result<BackupSummary> {
        self.ctx.reporter.initial_entities(RunState::Idle).await;

        match self.execute().await {
            Ok(summary) => {
                info!("Backup {} completed", summary.archive_name);
                Ok(summary)
            }
            Err(e) => {
                error!("Backup failed: {}", e);
                self.ctx.reporter.error(&e.to_string()).await;
                Err(e)
            }
        }
    }

    async fn execute(&self) -> Result<BackupSummary> {
        let ctx = &self.ctx;
        ctx.reporter.started(RunState::Running).await;
        sweep_stale(&ctx.paths.scratch_dir);

        let health = ctx.health_controller().ensure_ready().await?;
        ctx.reporter.available().await;

        let archive_name = Local::now().format(ARCHIVE_NAME_FORMAT).to_string();
        ctx.reporter
            .state(
                RunState::CreatingPlatformSnapshot,
                "Creating platform snapshot...",
            )
            .await;
        let slug = ctx
            .platform
            .create_full(&format!("borg-{}", archive_name))
            .await?;

        let scratch = ScratchDir::create(ctx.paths.unpack_dir(&slug))?;
        ctx.reporter
            .state(RunState::Unpacking, "Unpacking backup...")
            .await;
        ctx.unpacker
            .unpack(&ctx.paths.snapshot_file(&slug), scratch.path(), &slug)
            .await?;

        ctx.reporter
            .state(RunState::CreatingArchive, "Creating Borg archive...")
            .await;
        let output = ctx
            .tool
            .create(&CreateRequest {
                archive_name: archive_name.clone(),
                source: scratch.path().to_path_buf(),
                compression: ctx.config.compression(),
                excludes: exclusion_patterns(&ctx.config),
            })
            .await?;
        let report = output.stderr.trim();
        if !report.is_empty() {
            info!("Archive statistics:\n{}", report);
        }
        drop(scratch);

        ctx.reporter
            .state(RunState::Pruning, "Pruning old backups...")
            .await;
        let pruned = RetentionPruner::new(ctx.platform.clone(), ctx.config.keep_snapshots())
            .prune()
            .await?;

        let stats = match ctx.tool.info_json().await {
            Ok(stats) => Some(stats),
            Err(e) => {
                warn!("Could not get repository info: {}", e);
                None
            }
        };
        ctx.reporter
            .backup_completed(&archive_name, stats.as_ref())
            .await;

        Ok(BackupSummary {
            archive_name,
            slug,
            health,
            pruned,
        })
    }
}
