//! SSH key used by the `borg` transport for remote repositories

use borgkeeper_core::{Error, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{info, warn};

/// Comment embedded in generated keys
pub const KEY_COMMENT: &str = "root@local-borg-backup";

/// What [`SshKeyProvisioner::ensure_key`] found or did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SshKeyStatus {
    /// A new key pair was created
    Generated { public_key: String },
    /// The key already existed; fingerprint is `None` when it could not be read
    Existing { fingerprint: Option<String> },
}

/// Generates the SSH key on first use and reports its fingerprint afterwards
#[derive(Debug, Clone)]
pub struct SshKeyProvisioner {
    key_path: PathBuf,
    program: PathBuf,
}

impl SshKeyProvisioner {
    pub fn new(key_path: impl Into<PathBuf>) -> Self {
        Self {
            key_path: key_path.into(),
            program: PathBuf::from("ssh-keygen"),
        }
    }

    /// Use a different `ssh-keygen` executable
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// `<key>.pub`
    pub fn public_key_path(&self) -> PathBuf {
        let mut path = OsString::from(self.key_path.as_os_str());
        path.push(".pub");
        PathBuf::from(path)
    }

    /// Make sure the key pair exists
    pub async fn ensure_key(&self) -> Result<SshKeyStatus> {
        if self.key_path.exists() {
            let fingerprint = self.fingerprint().await;
            return Ok(SshKeyStatus::Existing { fingerprint });
        }

        if let Some(dir) = self.key_path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        self.generate().await?;

        let public_key = std::fs::read_to_string(self.public_key_path())?
            .trim()
            .to_string();
        info!("Your ssh key to use for borg backup host");
        info!("************ SNIP **********************");
        info!("{}", public_key);
        info!("************ SNIP **********************");

        Ok(SshKeyStatus::Generated { public_key })
    }

    async fn generate(&self) -> Result<()> {
        info!("Generating SSH key {}", self.key_path.display());
        let output = Command::new(&self.program)
            .args(["-t", "rsa", "-b", "4096", "-f"])
            .arg(&self.key_path)
            .args(["-N", "", "-C", KEY_COMMENT, "-q"])
            .output()
            .await
            .map_err(|e| Error::command("ssh-keygen", e.to_string()))?;

        if !output.status.success() {
            return Err(Error::command(
                "ssh-keygen",
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(())
    }

    async fn fingerprint(&self) -> Option<String> {
        let public_key = self.public_key_path();
        match run_fingerprint(&self.program, &public_key).await {
            Ok(fingerprint) => {
                info!("Using existing SSH key with fingerprint: {}", fingerprint);
                Some(fingerprint)
            }
            Err(reason) => {
                warn!("Could not read fingerprint of existing key: {}", reason);
                None
            }
        }
    }
}

async fn run_fingerprint(program: &Path, public_key: &Path) -> std::result::Result<String, String> {
    let output = Command::new(program)
        .arg("-lf")
        .arg(public_key)
        .output()
        .await
        .map_err(|e| e.to_string())?;

    if !output.status.success() {
        return Err(String::from_utf8_lossy(&output.stderr).trim().to_string());
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
