//! CLI command implementations

pub mod backup;
pub mod check;
pub mod restore;
pub mod run;

use crate::cli::GlobalArgs;
use anyhow::{Context, Result};
use borgkeeper_backup::{RunContext, StatusReporter};
use borgkeeper_core::{
    AddonOptions, PathsConfig, RepositoryConfig, StatusPublisher, SystemCapabilities,
};
use borgkeeper_repo::{BorgCli, BorgEnvironment, SshKeyProvisioner};
use borgkeeper_supervisor::{CredentialChain, SupervisorClient, SupervisorPublisher};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Read and validate the add-on options
pub(crate) fn load_config(global: &GlobalArgs) -> Result<RepositoryConfig> {
    let options = AddonOptions::load(&global.options)?;
    let config = RepositoryConfig::validate(&options)?;
    info!("Using repository {}", config.repo_url());
    Ok(config)
}

/// Filesystem layout from the CLI overrides
pub(crate) fn paths(global: &GlobalArgs) -> PathsConfig {
    PathsConfig::default()
        .with_snapshot_dir(&global.snapshot_dir)
        .with_scratch_dir(&global.scratch_dir)
}

/// `borg` wrapper for this configuration
pub(crate) fn borg(config: &RepositoryConfig, paths: &PathsConfig) -> Arc<BorgCli> {
    Arc::new(BorgCli::new(config, BorgEnvironment::new(config, paths)))
}

/// Everything a backup or restore needs, with directories and SSH key in place
///
/// The status publisher is built first so a failing setup step still ends in
/// a published `error` state.
pub(crate) async fn prepare(global: &GlobalArgs) -> Result<RunContext> {
    let credentials = CredentialChain::from_env();
    if credentials.is_empty() {
        warn!("No Supervisor token available, platform calls will fail");
    }
    let publisher: Arc<dyn StatusPublisher> = Arc::new(SupervisorPublisher::from_env(
        &global.supervisor_url,
        credentials.clone(),
    )?);

    prepare_with(global, credentials, publisher).await
}

async fn prepare_with(
    global: &GlobalArgs,
    credentials: CredentialChain,
    publisher: Arc<dyn StatusPublisher>,
) -> Result<RunContext> {
    let reporter = StatusReporter::new(publisher.clone());
    match setup(global, credentials).await {
        Ok((config, paths, capabilities, platform)) => {
            let tool = borg(&config, &paths);
            Ok(RunContext::new(
                config,
                paths,
                capabilities,
                tool,
                Arc::new(platform),
                publisher,
            ))
        }
        Err(e) => {
            error!("Setup failed: {:#}", e);
            reporter.error(&format!("{:#}", e)).await;
            Err(e)
        }
    }
}

async fn setup(
    global: &GlobalArgs,
    credentials: CredentialChain,
) -> Result<(RepositoryConfig, PathsConfig, SystemCapabilities, SupervisorClient)> {
    let config = load_config(global)?;
    let paths = paths(global);

    paths
        .ensure_dirs()
        .context("Failed to create working directories")?;
    SshKeyProvisioner::new(&paths.ssh_key).ensure_key().await?;

    let capabilities = SystemCapabilities::detect();
    info!(
        "System: {} cores, {} MB available, {} storage, parallel decompression {}",
        capabilities.cpu_cores(),
        capabilities.available_memory_mb(),
        if capabilities.is_slow_storage() { "slow" } else { "fast" },
        if capabilities.use_parallel() { "enabled" } else { "disabled" }
    );

    let platform = SupervisorClient::new(&global.supervisor_url, credentials)?;
    Ok((config, paths, capabilities, platform))
}
