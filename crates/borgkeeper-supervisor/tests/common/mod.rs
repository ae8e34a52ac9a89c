//! Common test infrastructure for borgkeeper-supervisor tests
//!
//! ```ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod mock_server;

pub use mock_server::*;

use borgkeeper_supervisor::{Credential, CredentialChain};

/// Token accepted by the modern Supervisor
pub const PRIMARY_TOKEN: &str = "primary-token";

/// Token accepted by legacy Supervisors
pub const LEGACY_TOKEN: &str = "legacy-token";

/// Chain with both tokens in production order
pub fn both_tokens() -> CredentialChain {
    CredentialChain::new(vec![
        Credential::new("SUPERVISOR_TOKEN", PRIMARY_TOKEN),
        Credential::new("HASSIO_TOKEN", LEGACY_TOKEN),
    ])
}

/// Chain with only the modern token
pub fn primary_only() -> CredentialChain {
    CredentialChain::new(vec![Credential::new("SUPERVISOR_TOKEN", PRIMARY_TOKEN)])
}
