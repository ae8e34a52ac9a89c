//! Error types for borgkeeper-core

use thiserror::Error;

/// Result type alias using borgkeeper-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Process exit status for a successful run
pub const EXIT_SUCCESS: u8 = 0;

/// Process exit status for a generic run failure
pub const EXIT_RUN_FAILURE: u8 = 1;

/// Process exit status for an invalid or unreadable configuration
pub const EXIT_CONFIG_ERROR: u8 = 2;

/// Process exit status for a repository that cannot be used (auth, init, repair)
pub const EXIT_REPOSITORY_FATAL: u8 = 3;

/// Core error types for borgkeeper
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or missing configuration
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Repository rejected our credentials
    #[error("{message}")]
    RepositoryAuth { message: String },

    /// Repository is corrupted and the repair attempt did not fix it
    #[error("Repository repair failed: {message}")]
    RepositoryCorruption { message: String },

    /// Repository could not be created
    #[error("Failed to initialize repository: {message}")]
    RepositoryInit { message: String },

    /// A tar extraction or borg extract failed
    #[error("Failed to extract {path}: {message}")]
    Extraction { path: String, message: String },

    /// Every credential failed for one Supervisor API call
    #[error("Supervisor API call '{operation}' failed: {message}")]
    ApiCall { operation: String, message: String },

    /// A single snapshot could not be deleted during pruning
    #[error("Failed to remove snapshot {slug}: {message}")]
    PruneEntry { slug: String, message: String },

    /// Explicitly requested archive is not in the listing
    #[error("Specified backup '{name}' not found in repository")]
    NotFound { name: String },

    /// Explicit archive index outside `[1, count]`
    #[error("Backup index {index} out of range (1-{count})")]
    Range { index: usize, count: usize },

    /// Archive index that is not a positive number
    #[error("Invalid backup index: {value}")]
    InvalidIndex { value: String },

    /// Restore requested but the repository holds no archives
    #[error("No backups found in the repository")]
    NoArchives,

    /// An external command exited unsuccessfully
    #[error("Command `{command}` failed: {message}")]
    Command { command: String, message: String },

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a repository authentication error
    pub fn repository_auth(message: impl Into<String>) -> Self {
        Self::RepositoryAuth {
            message: message.into(),
        }
    }

    /// Create a repository corruption error
    pub fn repository_corruption(message: impl Into<String>) -> Self {
        Self::RepositoryCorruption {
            message: message.into(),
        }
    }

    /// Create a repository initialization error
    pub fn repository_init(message: impl Into<String>) -> Self {
        Self::RepositoryInit {
            message: message.into(),
        }
    }

    /// Create an extraction error
    pub fn extraction(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Extraction {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an API call error
    pub fn api_call(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ApiCall {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a prune entry error
    pub fn prune_entry(slug: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PruneEntry {
            slug: slug.into(),
            message: message.into(),
        }
    }

    /// Create a not-found error for an archive name
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Create a range error for an archive index
    pub fn range(index: usize, count: usize) -> Self {
        Self::Range { index, count }
    }

    /// Create an error for an index that does not parse
    pub fn invalid_index(value: impl Into<String>) -> Self {
        Self::InvalidIndex {
            value: value.into(),
        }
    }

    /// Create a command failure error
    pub fn command(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Command {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Whether this error means the repository itself is unusable
    pub fn is_repository_fatal(&self) -> bool {
        matches!(
            self,
            Self::RepositoryAuth { .. }
                | Self::RepositoryCorruption { .. }
                | Self::RepositoryInit { .. }
        )
    }

    /// Exit status the process should terminate with for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config { .. } => EXIT_CONFIG_ERROR,
            e if e.is_repository_fatal() => EXIT_REPOSITORY_FATAL,
            _ => EXIT_RUN_FAILURE,
        }
    }
}
