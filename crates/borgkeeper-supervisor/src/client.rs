//! Platform snapshot API

use crate::credentials::CredentialChain;
use crate::types::{ApiEnvelope, BackupList, BackupRecord, NewBackupData, NewBackupRequest};
use async_trait::async_trait;
use borgkeeper_core::{Error, Result};
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};

/// Supervisor base URL inside an add-on container
pub const DEFAULT_SUPERVISOR_URL: &str = "http://supervisor";

/// Full snapshot creation
pub const CREATE_TIMEOUT: Duration = Duration::from_secs(300);

/// Full snapshot restore
pub const RESTORE_TIMEOUT: Duration = Duration::from_secs(300);

/// Listing and deletion
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(60);

/// Operations on platform snapshots
#[async_trait]
pub trait SnapshotApi: Send + Sync {
    /// Create a compressed full snapshot and return its slug
    async fn create_full(&self, name: &str) -> Result<String>;

    /// List every snapshot known to the platform
    async fn list(&self) -> Result<Vec<BackupRecord>>;

    /// Delete one snapshot
    async fn delete(&self, slug: &str) -> Result<()>;

    /// Restore a full snapshot that is present in the snapshot directory
    async fn restore_full(&self, slug: &str) -> Result<()>;
}

/// HTTP client for the Supervisor snapshot endpoints
#[derive(Debug, Clone)]
pub struct SupervisorClient {
    http: reqwest::Client,
    base_url: String,
    credentials: CredentialChain,
}

impl SupervisorClient {
    /// Create a client for `base_url` authenticating with `credentials`
    pub fn new(base_url: impl Into<String>, credentials: CredentialChain) -> Result<Self> {
        Ok(Self {
            http: build_http_client()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        })
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send one request through the credential chain and decode the envelope
    ///
    /// A credential succeeds only with HTTP 200 and `result: "ok"`.
    async fn request<T: DeserializeOwned>(
        &self,
        operation: &str,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
        timeout: Duration,
    ) -> Result<Option<T>> {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);

        self.credentials
            .call(operation, |credential| {
                let mut request = self
                    .http
                    .request(method.clone(), &url)
                    .header(AUTHORIZATION, credential.bearer())
                    .timeout(timeout);
                if let Some(body) = &body {
                    request = request.json(body);
                }

                async move {
                    let response = request.send().await.map_err(|e| e.to_string())?;
                    let status = response.status();
                    if status != StatusCode::OK {
                        return Err(format!("status {}", status));
                    }

                    let bytes = response.bytes().await.map_err(|e| e.to_string())?;
                    if bytes.iter().all(u8::is_ascii_whitespace) {
                        return Err("empty response".to_string());
                    }

                    let envelope: ApiEnvelope<T> = serde_json::from_slice(&bytes)
                        .map_err(|e| format!("invalid response: {}", e))?;
                    if !envelope.is_ok() {
                        return Err(envelope.failure_reason());
                    }
                    Ok(envelope.data)
                }
            })
            .await
    }
}

#[async_trait]
impl SnapshotApi for SupervisorClient {
    async fn create_full(&self, name: &str) -> Result<String> {
        info!("Creating platform snapshot: {}", name);
        let body = serde_json::to_value(NewBackupRequest {
            name,
            compressed: true,
        })?;

        let data: Option<NewBackupData> = self
            .request(
                "create snapshot",
                Method::POST,
                "/backups/new/full",
                Some(body),
                CREATE_TIMEOUT,
            )
            .await?;

        let slug = data
            .map(|d| d.slug)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::api_call("create snapshot", "response carried no slug"))?;
        info!("Platform snapshot created: {}", slug);
        Ok(slug)
    }

    async fn list(&self) -> Result<Vec<BackupRecord>> {
        let data: Option<BackupList> = self
            .request(
                "list snapshots",
                Method::GET,
                "/backups",
                None,
                QUERY_TIMEOUT,
            )
            .await?;

        let backups = data.unwrap_or_default().backups;
        debug!("Platform reports {} snapshots", backups.len());
        Ok(backups)
    }

    async fn delete(&self, slug: &str) -> Result<()> {
        let _: Option<serde_json::Value> = self
            .request(
                "delete snapshot",
                Method::DELETE,
                &format!("/backups/{}", slug),
                None,
                QUERY_TIMEOUT,
            )
            .await?;
        debug!("Deleted platform snapshot {}", slug);
        Ok(())
    }

    async fn restore_full(&self, slug: &str) -> Result<()> {
        info!("Restoring platform snapshot: {}", slug);
        let _: Option<serde_json::Value> = self
            .request(
                "restore snapshot",
                Method::POST,
                &format!("/backups/{}/restore/full", slug),
                None,
                RESTORE_TIMEOUT,
            )
            .await?;
        Ok(())
    }
}

pub(crate) fn build_http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("borgkeeper/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| Error::api_call("build http client", e.to_string()))
}
