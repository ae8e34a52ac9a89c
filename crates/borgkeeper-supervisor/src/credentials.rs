//! Ordered credential fallback
//!
//! The Supervisor exposes the same API under two token schemes and, depending
//! on the platform version, only one of them is accepted. Every call is
//! attempted with each available token in priority order and the first success
//! wins.

use borgkeeper_core::{Error, Result};
use std::fmt;
use std::future::Future;
use tracing::{debug, warn};

/// Token environment variables, highest priority first
pub const TOKEN_VARIABLES: [&str; 2] = ["SUPERVISOR_TOKEN", "HASSIO_TOKEN"];

/// One named bearer token
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    name: String,
    token: String,
}

impl Credential {
    /// Create a credential
    pub fn new(name: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            token: token.into(),
        }
    }

    /// Name used in logs (never the token itself)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `Authorization` header value
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("name", &self.name)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Credentials tried in order for every API call
#[derive(Debug, Clone, Default)]
pub struct CredentialChain {
    credentials: Vec<Credential>,
}

impl CredentialChain {
    /// Chain from explicit credentials
    pub fn new(credentials: Vec<Credential>) -> Self {
        Self { credentials }
    }

    /// Chain from `SUPERVISOR_TOKEN` then `HASSIO_TOKEN`, skipping unset or empty ones
    pub fn from_env() -> Self {
        let credentials: Vec<Credential> = TOKEN_VARIABLES
            .iter()
            .filter_map(|name| {
                let token = std::env::var(name).ok().filter(|t| !t.is_empty());
                debug!("{} available: {}", name, token.is_some());
                token.map(|t| Credential::new(*name, t))
            })
            .collect();

        if credentials.is_empty() {
            warn!("No authentication tokens available");
        }

        Self { credentials }
    }

    /// Number of usable credentials
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    /// Whether there is nothing to try
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    /// Run `attempt` with each credential until one succeeds
    ///
    /// `attempt` returns a human readable reason on failure. When every
    /// credential fails the reasons are combined into one [`Error::ApiCall`].
    pub async fn call<T, F, Fut>(&self, operation: &str, mut attempt: F) -> Result<T>
    where
        F: FnMut(Credential) -> Fut,
        Fut: Future<Output = std::result::Result<T, String>>,
    {
        if self.credentials.is_empty() {
            return Err(Error::api_call(
                operation,
                "no authentication tokens available",
            ));
        }

        let mut failures = Vec::with_capacity(self.credentials.len());
        for credential in &self.credentials {
            debug!("Trying {} with {}", operation, credential.name());
            match attempt(credential.clone()).await {
                Ok(value) => {
                    debug!("{} succeeded using {}", operation, credential.name());
                    return Ok(value);
                }
                Err(reason) => {
                    warn!("{} failed with {}: {}", operation, credential.name(), reason);
                    failures.push(format!("{}: {}", credential.name(), reason));
                }
            }
        }

        Err(Error::api_call(
            operation,
            format!(
                "all authentication methods failed ({})",
                failures.join("; ")
            ),
        ))
    }
}
