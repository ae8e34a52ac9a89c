//! Classification of repository probe results
//!
//! `borg info` does not report *why* it failed in a machine readable way, so
//! the outcome is read from the exit status and the error text. Matching is a
//! best-effort heuristic kept behind [`ProbeClassifier`] so it can be replaced.

use crate::borg::ToolOutput;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static AUTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)passphrase|authentication").expect("auth regex is valid"));

static MISSING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)does not exist").expect("missing regex is valid"));

static CORRUPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)integrity|corrupt").expect("corrupt regex is valid"));

/// `borg` exit status for errors such as a missing repository
const BORG_EXIT_ERROR: i32 = 2;

/// What a repository probe revealed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryProbeOutcome {
    Ready,
    Missing,
    AuthFailure,
    Corrupt,
    Unknown,
}

impl fmt::Display for RepositoryProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ready => "ready",
            Self::Missing => "missing",
            Self::AuthFailure => "auth failure",
            Self::Corrupt => "corrupt",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Turns raw probe output into an outcome
pub trait ProbeClassifier: Send + Sync {
    fn classify(&self, output: &ToolOutput) -> RepositoryProbeOutcome;
}

/// Default classifier matching well-known `borg` error messages
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternClassifier;

impl ProbeClassifier for PatternClassifier {
    fn classify(&self, output: &ToolOutput) -> RepositoryProbeOutcome {
        if output.success() {
            return RepositoryProbeOutcome::Ready;
        }

        let stderr = &output.stderr;
        if AUTH_RE.is_match(stderr) {
            RepositoryProbeOutcome::AuthFailure
        } else if MISSING_RE.is_match(stderr) {
            RepositoryProbeOutcome::Missing
        } else if CORRUPT_RE.is_match(stderr) {
            RepositoryProbeOutcome::Corrupt
        } else if output.exit_code == Some(BORG_EXIT_ERROR) {
            RepositoryProbeOutcome::Missing
        } else {
            RepositoryProbeOutcome::Unknown
        }
    }
}
