//! Environment handed to every `borg` subprocess
//!
//! Built once from the validated configuration and applied to each command
//! individually. The process environment of borgkeeper itself is never touched.

use borgkeeper_core::{PathsConfig, RepositoryConfig};
use std::collections::BTreeMap;
use std::fmt;
use tokio::process::Command;

pub const BORG_BASE_DIR: &str = "BORG_BASE_DIR";
pub const BORG_CACHE_DIR: &str = "BORG_CACHE_DIR";
pub const BORG_PASSPHRASE: &str = "BORG_PASSPHRASE";
pub const BORG_UNENCRYPTED_OK: &str = "BORG_UNKNOWN_UNENCRYPTED_REPO_ACCESS_IS_OK";
pub const BORG_RSH: &str = "BORG_RSH";

/// Immutable set of variables to set and remove on `borg` invocations
#[derive(Clone, PartialEq, Eq)]
pub struct BorgEnvironment {
    vars: BTreeMap<&'static str, String>,
    removed: Vec<&'static str>,
}

impl BorgEnvironment {
    /// Derive the environment from configuration
    pub fn new(config: &RepositoryConfig, paths: &PathsConfig) -> Self {
        let mut vars = BTreeMap::new();
        let mut removed = Vec::new();

        vars.insert(BORG_BASE_DIR, paths.base_dir.display().to_string());
        vars.insert(BORG_CACHE_DIR, paths.cache_dir.display().to_string());

        match config.passphrase() {
            Some(passphrase) => {
                vars.insert(BORG_PASSPHRASE, passphrase.to_string());
                removed.push(BORG_UNENCRYPTED_OK);
            }
            None => {
                vars.insert(BORG_UNENCRYPTED_OK, "yes".to_string());
                removed.push(BORG_PASSPHRASE);
            }
        }

        let mut rsh = format!(
            "ssh -o UserKnownHostsFile={} -i {}",
            paths.ssh_known_hosts.display(),
            paths.ssh_key.display()
        );
        let params = config.ssh_params().trim();
        if !params.is_empty() {
            rsh.push(' ');
            rsh.push_str(params);
        }
        vars.insert(BORG_RSH, rsh);

        Self { vars, removed }
    }

    /// Value of one variable
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Variables explicitly cleared from the inherited environment
    pub fn removed(&self) -> &[&'static str] {
        &self.removed
    }

    /// Materialize the record onto a command
    pub fn apply(&self, command: &mut Command) {
        for name in &self.removed {
            command.env_remove(name);
        }
        command.envs(self.vars.iter().map(|(k, v)| (*k, v.as_str())));
    }
}

impl fmt::Debug for BorgEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let visible: BTreeMap<&str, &str> = self
            .vars
            .iter()
            .map(|(k, v)| {
                let shown = if *k == BORG_PASSPHRASE { "<redacted>" } else { v.as_str() };
                (*k, shown)
            })
            .collect();

        f.debug_struct("BorgEnvironment")
            .field("vars", &visible)
            .field("removed", &self.removed)
            .finish()
    }
}
