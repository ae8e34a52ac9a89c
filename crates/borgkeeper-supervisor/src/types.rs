//! Supervisor API payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Standard Supervisor response envelope
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    /// `"ok"` or `"error"`
    #[serde(default)]
    pub result: Option<String>,

    /// Payload
    pub data: Option<T>,

    /// Error message when `result` is `"error"`
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> ApiEnvelope<T> {
    /// Whether the Supervisor reported success
    pub fn is_ok(&self) -> bool {
        self.result.as_deref() == Some("ok")
    }

    /// Human readable failure reason
    pub fn failure_reason(&self) -> String {
        match (&self.result, &self.message) {
            (_, Some(message)) => message.clone(),
            (Some(result), None) => format!("result '{}'", result),
            (None, None) => "missing result".to_string(),
        }
    }
}

/// Body of a full snapshot request
#[derive(Debug, Clone, Serialize)]
pub struct NewBackupRequest<'a> {
    pub name: &'a str,
    pub compressed: bool,
}

/// Payload returned for a new snapshot
#[derive(Debug, Clone, Deserialize)]
pub struct NewBackupData {
    pub slug: String,
}

/// Payload of the snapshot listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackupList {
    #[serde(default)]
    pub backups: Vec<BackupRecord>,
}

/// One platform snapshot
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BackupRecord {
    /// Snapshot identifier
    pub slug: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Creation timestamp
    pub date: DateTime<Utc>,

    /// Size in MB as reported by the Supervisor
    #[serde(default)]
    pub size: Option<f64>,
}

/// Body of an entity state update
#[derive(Debug, Clone, Serialize)]
pub struct EntityState<'a> {
    pub state: &'a str,
    pub attributes: &'a serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_results() {
        let ok: ApiEnvelope<NewBackupData> =
            serde_json::from_str(r#"{"result":"ok","data":{"slug":"abc123"}}"#).unwrap();
        assert!(ok.is_ok());
        assert_eq!(ok.data.unwrap().slug, "abc123");

        let err: ApiEnvelope<NewBackupData> =
            serde_json::from_str(r#"{"result":"error","message":"Backup in progress"}"#).unwrap();
        assert!(!err.is_ok());
        assert_eq!(err.failure_reason(), "Backup in progress");

        let bare: ApiEnvelope<BackupList> = serde_json::from_str("{}").unwrap();
        assert!(!bare.is_ok());
        assert_eq!(bare.failure_reason(), "missing result");
    }

    #[test]
    fn test_backup_record_parses_supervisor_dates() {
        let record: BackupRecord = serde_json::from_str(
            r#"{"slug":"a1","name":"borg-2024-05-01-02:00","date":"2024-05-01T02:00:03.123456+00:00","size":12.5,"type":"full"}"#,
        )
        .unwrap();

        assert_eq!(record.slug, "a1");
        assert_eq!(record.date.to_rfc3339(), "2024-05-01T02:00:03.123456+00:00");
        assert_eq!(record.size, Some(12.5));
    }
}
