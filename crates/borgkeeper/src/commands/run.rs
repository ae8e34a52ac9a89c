//! Default command: backup or restore depending on RESTORE_MODE

use anyhow::Result;
use tracing::info;

use crate::cli::GlobalArgs;

pub async fn run(global: &GlobalArgs) -> Result<()> {
    if global.restore_requested() {
        info!("Restore mode enabled");
        super::restore::run(global).await
    } else {
        super::backup::run(global).await
    }
}
