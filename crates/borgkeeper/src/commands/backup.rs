//! Backup command

use anyhow::Result;
use borgkeeper_backup::BackupOrchestrator;

use crate::cli::GlobalArgs;
use crate::output;

pub async fn run(global: &GlobalArgs) -> Result<()> {
    output::header("Borg Backup");

    let ctx = super::prepare(global).await?;
    let summary = BackupOrchestrator::new(ctx).run().await?;

    output::kv("Archive", &summary.archive_name);
    output::kv("Snapshot", &summary.slug);
    if summary.health.initialized() {
        output::kv("Repository", "initialized");
    }
    if !summary.pruned.removed.is_empty() {
        output::kv("Pruned", &summary.pruned.removed.join(", "));
    }
    for failure in &summary.pruned.failures {
        output::warning(&failure.to_string());
    }
    output::success("Backup completed");
    Ok(())
}
