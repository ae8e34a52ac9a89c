//! Repository health checks run before any data is moved
//!
//! ```text
//! Probe ─ready──────────────────────────────▶ Ready
//!   ├─ missing/unknown ─▶ Uninitialized ─▶ Initialize ─▶ Ready | FatalInit
//!   ├─ auth failure ───▶ FatalAuth
//!   └─ corrupt ────────▶ Repairing ─▶ Probe (once) | FatalRepair
//! ```

use crate::borg::ArchiveTool;
use crate::classifier::{PatternClassifier, ProbeClassifier, RepositoryProbeOutcome};
use borgkeeper_core::{Error, Result, RunState, StatusPublisher, StatusUpdate};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// States visited by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HealthState {
    Probe,
    Ready,
    Uninitialized,
    Initialize,
    Repairing,
    FatalAuth,
    FatalInit,
    FatalRepair,
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Path taken through the state machine
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealthReport {
    pub states: Vec<HealthState>,
}

impl HealthReport {
    fn enter(&mut self, state: HealthState) {
        debug!("Repository health: {}", state);
        self.states.push(state);
    }

    /// Whether the repository was created during this run
    pub fn initialized(&self) -> bool {
        self.states.contains(&HealthState::Initialize)
    }

    /// Whether a repair was attempted during this run
    pub fn repaired(&self) -> bool {
        self.states.contains(&HealthState::Repairing)
    }
}

/// Brings the repository into a usable state or fails with a fatal error
pub struct RepositoryHealthController {
    tool: Arc<dyn ArchiveTool>,
    publisher: Arc<dyn StatusPublisher>,
    classifier: Box<dyn ProbeClassifier>,
    encrypted: bool,
}

impl RepositoryHealthController {
    /// `encrypted` selects the init mode and the wording of auth errors
    pub fn new(
        tool: Arc<dyn ArchiveTool>,
        publisher: Arc<dyn StatusPublisher>,
        encrypted: bool,
    ) -> Self {
        Self {
            tool,
            publisher,
            classifier: Box::new(PatternClassifier),
            encrypted,
        }
    }

    /// Replace the probe classifier
    pub fn with_classifier(mut self, classifier: impl ProbeClassifier + 'static) -> Self {
        self.classifier = Box::new(classifier);
        self
    }

    /// Classify the repository without changing it
    pub async fn probe(&self) -> Result<RepositoryProbeOutcome> {
        let output = self.tool.probe().await?;
        let outcome = self.classifier.classify(&output);
        if outcome != RepositoryProbeOutcome::Ready {
            debug!("Probe returned {}: {}", outcome, output.error_text());
        }
        Ok(outcome)
    }

    /// Run the state machine until the repository is ready or a fatal state is hit
    pub async fn ensure_ready(&self) -> Result<HealthReport> {
        let mut report = HealthReport::default();
        let mut repair_attempted = false;

        loop {
            report.enter(HealthState::Probe);
            match self.probe().await? {
                RepositoryProbeOutcome::Ready => {
                    info!("Repository is accessible");
                    report.enter(HealthState::Ready);
                    return Ok(report);
                }
                RepositoryProbeOutcome::AuthFailure => {
                    report.enter(HealthState::FatalAuth);
                    let message = if self.encrypted {
                        "Repository exists but passphrase authentication failed. \
                         Please check your 'borg_passphrase' configuration."
                    } else {
                        "Repository exists but requires a passphrase. \
                         Please set 'borg_passphrase' in your add-on configuration."
                    };
                    error!("{}", message);
                    return Err(Error::repository_auth(message));
                }
                RepositoryProbeOutcome::Corrupt if repair_attempted => {
                    report.enter(HealthState::FatalRepair);
                    error!("Repository is still corrupted after repair");
                    return Err(Error::repository_corruption(
                        "repository still reports corruption after repair",
                    ));
                }
                RepositoryProbeOutcome::Corrupt => {
                    report.enter(HealthState::Repairing);
                    repair_attempted = true;
                    self.repair(&mut report).await?;
                }
                outcome @ (RepositoryProbeOutcome::Missing | RepositoryProbeOutcome::Unknown) => {
                    if outcome == RepositoryProbeOutcome::Unknown {
                        warn!("Repository check failed for an unknown reason, trying to initialize");
                    } else {
                        info!("Repository does not exist, will initialize");
                    }
                    report.enter(HealthState::Uninitialized);
                    self.initialize(&mut report).await?;
                    report.enter(HealthState::Ready);
                    return Ok(report);
                }
            }
        }
    }

    async fn repair(&self, report: &mut HealthReport) -> Result<()> {
        warn!("Repository corruption detected, attempting repair");
        self.publisher
            .publish(
                StatusUpdate::run_state(RunState::Repairing)
                    .attr("progress", "Repairing repository..."),
            )
            .await;

        match self.tool.check_repair().await {
            Ok(()) => {
                info!("Repository repair completed");
                Ok(())
            }
            Err(e) => {
                report.enter(HealthState::FatalRepair);
                error!("Repository repair failed: {}", e);
                Err(match e {
                    Error::RepositoryCorruption { .. } => e,
                    other => Error::repository_corruption(other.to_string()),
                })
            }
        }
    }

    async fn initialize(&self, report: &mut HealthReport) -> Result<()> {
        report.enter(HealthState::Initialize);
        if self.encrypted {
            info!("Initializing repository with encryption");
        } else {
            warn!("Initializing repository WITHOUT encryption (not recommended)");
        }

        match self.tool.init(self.encrypted).await {
            Ok(()) => {
                info!("Repository initialized");
                Ok(())
            }
            Err(e) => {
                report.enter(HealthState::FatalInit);
                error!("Failed to initialize repository: {}", e);
                Err(match e {
                    Error::RepositoryInit { .. } => e,
                    other => Error::repository_init(other.to_string()),
                })
            }
        }
    }
}
