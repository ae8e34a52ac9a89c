//! # borgkeeper-core
//!
//! Core library for borgkeeper providing:
//! - Add-on options loading (`/data/options.json`)
//! - Repository configuration validation and normalization
//! - Host capability detection for decompression tuning
//! - Status entity types shared by the backup and restore workflows

pub mod capabilities;
pub mod config;
pub mod error;
pub mod status;
pub mod utils;

pub use capabilities::{CapabilityProbe, StorageKind, SystemCapabilities};
pub use config::{AddonOptions, Compression, PathsConfig, RepositoryConfig};
pub use error::{Error, Result};
pub use status::{NoopPublisher, RunState, StatusPublisher, StatusUpdate};
