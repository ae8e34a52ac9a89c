//! # borgkeeper-backup
//!
//! Backup and restore workflows:
//! - Platform snapshot unpacking (with optional parallel decompression)
//! - Archive creation and retention of platform snapshots
//! - Archive selection, extraction and snapshot repacking on restore
//! - Progress publication and guaranteed cleanup of working directories

pub mod backup;
pub mod context;
pub mod manifest;
pub mod prune;
pub mod repack;
pub mod reporter;
pub mod restore;
pub mod scratch;
pub mod selection;
pub mod unpack;

pub use backup::{BackupOrchestrator, BackupSummary};
pub use context::RunContext;
pub use manifest::UnpackManifest;
pub use prune::{PruneReport, RetentionPruner};
pub use reporter::StatusReporter;
pub use restore::{RestoreOrchestrator, RestoreSummary};
pub use scratch::ScratchDir;
pub use selection::Selection;
pub use unpack::ArchiveUnpacker;
