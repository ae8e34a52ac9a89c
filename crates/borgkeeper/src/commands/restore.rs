//! Restore command

use anyhow::Result;
use borgkeeper_backup::RestoreOrchestrator;

use crate::cli::GlobalArgs;
use crate::output;

pub async fn run(global: &GlobalArgs) -> Result<()> {
    output::header("Borg Restore");

    let selection = global.selection();
    output::kv("Selection", &selection.to_string());

    let ctx = super::prepare(global).await?;
    let summary = RestoreOrchestrator::new(ctx, selection).run().await?;

    output::kv("Archive", &summary.archive.name);
    output::kv("Snapshot", &summary.slug);
    output::success("Restore completed");
    Ok(())
}
