//! # borgkeeper-repo
//!
//! Everything that talks to the `borg` repository:
//! - Per-command environment (passphrase, cache dirs, SSH transport)
//! - The `borg` subprocess wrapper behind the [`ArchiveTool`] trait
//! - Probe classification and the repository health state machine
//! - SSH key provisioning for remote repositories

pub mod borg;
pub mod classifier;
pub mod env;
pub mod excludes;
pub mod health;
pub mod ssh;

pub use borg::{ArchiveEntry, ArchiveTool, BorgCli, CreateRequest, RepositoryStats, ToolOutput};
pub use classifier::{PatternClassifier, ProbeClassifier, RepositoryProbeOutcome};
pub use env::BorgEnvironment;
pub use health::{HealthReport, HealthState, RepositoryHealthController};
pub use ssh::{SshKeyProvisioner, SshKeyStatus};
