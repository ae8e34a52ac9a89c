//! Status entity publication through the Supervisor core proxy

use crate::client::build_http_client;
use crate::credentials::CredentialChain;
use crate::types::EntityState;
use async_trait::async_trait;
use borgkeeper_core::{Result, StatusPublisher, StatusUpdate};
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, warn};

/// Per request timeout for entity updates
pub const PUBLISH_TIMEOUT: Duration = Duration::from_secs(10);

/// Environment switch for entity publication
pub const PUBLISH_ENTITIES_VAR: &str = "PUBLISH_ENTITIES";

/// Publishes entity states via `POST /core/api/states/{entity}`
#[derive(Debug, Clone)]
pub struct SupervisorPublisher {
    http: reqwest::Client,
    base_url: String,
    credentials: CredentialChain,
    enabled: bool,
}

impl SupervisorPublisher {
    /// Enabled publisher for `base_url`
    pub fn new(base_url: impl Into<String>, credentials: CredentialChain) -> Result<Self> {
        Ok(Self {
            http: build_http_client()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            enabled: true,
        })
    }

    /// Publisher honouring `PUBLISH_ENTITIES` (enabled unless set to something other than "true")
    pub fn from_env(base_url: impl Into<String>, credentials: CredentialChain) -> Result<Self> {
        let enabled = std::env::var(PUBLISH_ENTITIES_VAR)
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(true);
        if !enabled {
            debug!("Entity publication disabled");
        }
        Ok(Self::new(base_url, credentials)?.with_enabled(enabled))
    }

    /// Turn publication on or off
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Whether updates are sent at all
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[async_trait]
impl StatusPublisher for SupervisorPublisher {
    async fn publish(&self, update: StatusUpdate) -> bool {
        if !self.enabled {
            return false;
        }

        let url = format!("{}/core/api/states/{}", self.base_url, update.entity_id);
        let body = EntityState {
            state: &update.state,
            attributes: &update.attributes,
        };

        let result = self
            .credentials
            .call("publish entity", |credential| {
                let request = self
                    .http
                    .post(&url)
                    .header(AUTHORIZATION, credential.bearer())
                    .timeout(PUBLISH_TIMEOUT)
                    .json(&body);

                async move {
                    let response = request.send().await.map_err(|e| e.to_string())?;
                    match response.status() {
                        StatusCode::OK | StatusCode::CREATED => Ok(()),
                        status => Err(format!("status {}", status)),
                    }
                }
            })
            .await;

        match result {
            Ok(()) => {
                debug!("Published entity {}: {}", update.entity_id, update.state);
                true
            }
            Err(e) => {
                warn!("Failed to publish {}: {}", update.entity_id, e);
                false
            }
        }
    }
}
