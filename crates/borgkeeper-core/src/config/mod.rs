//! Configuration loading and validation

mod options;
mod paths;
mod repository;

pub use options::{AddonOptions, DEFAULT_OPTIONS_PATH};
pub use paths::PathsConfig;
pub use repository::{Compression, RepositoryConfig, RepositoryLocation};
