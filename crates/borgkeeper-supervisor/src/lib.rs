//! # borgkeeper-supervisor
//!
//! Client for the platform's Supervisor API:
//! - Full snapshot creation, listing, deletion and restore
//! - Status entity publication
//! - Transparent fallback across the two Supervisor tokens

pub mod client;
pub mod credentials;
pub mod publisher;
pub mod types;

pub use client::{SnapshotApi, SupervisorClient, DEFAULT_SUPERVISOR_URL};
pub use credentials::{Credential, CredentialChain};
pub use publisher::SupervisorPublisher;
pub use types::BackupRecord;
