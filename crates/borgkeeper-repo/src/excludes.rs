//! Exclusion patterns passed to `borg create`

use borgkeeper_core::RepositoryConfig;

/// Temporary and cache files never worth archiving
pub const STANDARD_EXCLUDES: [&str; 6] = ["*.pyc", "__pycache__", "*.tmp", ".*.swp", ".*.swo", ".*.swn"];

/// Log files, skipped unless log archiving is requested
pub const LOG_EXCLUDES: [&str; 9] = [
    "*/home-assistant.log*",
    "*/homeassistant.log*",
    "*/.homeassistant/home-assistant.log*",
    "*/logs/*",
    "*/log/*",
    "*/*.log",
    "*/*.log.*",
    "*/supervisor/logs/*",
    "*/addons/*/logs/*",
];

/// Full exclusion list in the order borg receives it
pub fn exclusion_patterns(config: &RepositoryConfig) -> Vec<String> {
    let mut patterns: Vec<String> = STANDARD_EXCLUDES.iter().map(|p| p.to_string()).collect();
    if config.exclude_logs() {
        patterns.extend(LOG_EXCLUDES.iter().map(|p| p.to_string()));
    }
    patterns.extend(config.custom_exclude_patterns());
    patterns
}
