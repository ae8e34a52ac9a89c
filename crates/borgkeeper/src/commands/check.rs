//! Check command: read-only diagnostics

use anyhow::Result;
use borgkeeper_core::config::RepositoryLocation;
use borgkeeper_core::{CapabilityProbe, NoopPublisher};
use borgkeeper_repo::{ArchiveTool, RepositoryHealthController, RepositoryProbeOutcome};
use std::sync::Arc;

use crate::cli::GlobalArgs;
use crate::output;

pub async fn run(global: &GlobalArgs) -> Result<()> {
    output::header("Configuration");
    let config = super::load_config(global)?;
    output::kv("Repository", config.repo_url());
    if let RepositoryLocation::Host { user, host, .. } = config.location() {
        output::kv("Remote host", host);
        output::kv("Remote user", user.as_deref().unwrap_or("(ssh default)"));
    }
    output::kv(
        "Encryption",
        if config.is_encrypted() { "repokey-blake2" } else { "none" },
    );
    output::kv("Compression", &config.compression().borg_spec());
    output::kv("Keep snapshots", &config.keep_snapshots().to_string());
    output::kv("Exclude logs", &config.exclude_logs().to_string());
    let custom = config.custom_exclude_patterns();
    if !custom.is_empty() {
        output::kv("Custom excludes", &custom.join(", "));
    }

    output::header("System");
    let probe = CapabilityProbe::new();
    let capabilities = probe.probe();
    output::kv("CPU cores", &capabilities.cpu_cores().to_string());
    output::kv(
        "Available memory",
        &format!("{} MB", capabilities.available_memory_mb()),
    );
    match probe.root_storage() {
        Some(storage) => output::kv("Root device", &storage.device),
        None => output::kv("Root device", "unknown"),
    }
    output::kv("Slow storage", &capabilities.is_slow_storage().to_string());
    output::kv(
        "Decompression threads",
        &capabilities.compression_threads().to_string(),
    );

    output::header("Repository");
    let paths = super::paths(global);
    output::kv(
        "SSH key",
        if paths.ssh_key.exists() { "present" } else { "missing" },
    );

    let tool = super::borg(&config, &paths);
    let controller =
        RepositoryHealthController::new(tool.clone(), Arc::new(NoopPublisher), config.is_encrypted());
    let outcome = controller.probe().await?;
    output::kv("Status", &outcome.to_string());

    if outcome != RepositoryProbeOutcome::Ready {
        output::warning("Repository is not ready; the next backup will try to fix this");
        return Ok(());
    }

    let stats = tool.info_json().await?;
    output::kv("Size", &format!("{} GB", stats.size_gb));
    output::kv("Compression ratio", &stats.compression_ratio.to_string());
    if let Some(modified) = &stats.last_modified {
        output::kv("Last modified", modified);
    }

    let archives = tool.list().await?;
    output::kv("Archives", &archives.len().to_string());
    if let Some(latest) = archives.first() {
        output::kv(
            "Latest",
            &format!("{} ({})", latest.name, latest.display_time()),
        );
    }
    output::success("Check completed");
    Ok(())
}
