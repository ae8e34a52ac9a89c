//! CLI argument parsing with clap

use borgkeeper_backup::Selection;
use borgkeeper_core::config::DEFAULT_OPTIONS_PATH;
use borgkeeper_supervisor::DEFAULT_SUPERVISOR_URL;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// borgkeeper - Borg backups of Home Assistant platform snapshots
#[derive(Parser, Debug)]
#[command(name = "borgkeeper")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(flatten)]
    pub global: GlobalArgs,

    /// Command to run (defaults to `run`)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Back up or restore, as selected by RESTORE_MODE
    Run,

    /// Snapshot the platform and archive it into the repository
    Backup,

    /// Restore an archive back onto the platform
    Restore,

    /// Validate the configuration and inspect the repository without changing it
    Check,
}

/// Settings shared by every command
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Add-on options file
    #[arg(long, global = true, env = "BORGKEEPER_OPTIONS", default_value = DEFAULT_OPTIONS_PATH)]
    pub options: PathBuf,

    /// Supervisor API base URL
    #[arg(long, global = true, env = "SUPERVISOR_URL", default_value = DEFAULT_SUPERVISOR_URL)]
    pub supervisor_url: String,

    /// Directory holding platform snapshot files
    #[arg(long, global = true, env = "BORGKEEPER_SNAPSHOT_DIR", default_value = "/backup")]
    pub snapshot_dir: PathBuf,

    /// Working directory for unpacked snapshots
    #[arg(
        long,
        global = true,
        env = "BORGKEEPER_SCRATCH_DIR",
        default_value = "/backup/borg_unpacked"
    )]
    pub scratch_dir: PathBuf,

    /// Restore instead of backing up when `true` (run command only)
    #[arg(long, global = true, env = "RESTORE_MODE")]
    pub restore_mode: Option<String>,

    /// Archive to restore by name
    #[arg(long, global = true, env = "BACKUP_NAME")]
    pub name: Option<String>,

    /// Archive to restore by 1-based position, newest first (checked on restore)
    #[arg(long, global = true, env = "BACKUP_INDEX")]
    pub index: Option<String>,
}

impl GlobalArgs {
    /// Whether the run command should restore
    pub fn restore_requested(&self) -> bool {
        self.restore_mode
            .as_deref()
            .is_some_and(|mode| mode.trim().eq_ignore_ascii_case("true"))
    }

    /// Archive selection from `--name` / `--index`
    pub fn selection(&self) -> Selection {
        Selection::from_overrides(self.name.clone(), self.index.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const SELECTION_VARS: [&str; 3] = ["RESTORE_MODE", "BACKUP_NAME", "BACKUP_INDEX"];

    fn clear_env() {
        for var in SELECTION_VARS {
            std::env::remove_var(var);
        }
    }

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    #[serial]
    fn test_defaults_to_run() {
        clear_env();
        let cli = parse(&["borgkeeper"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.global.options, PathBuf::from("/data/options.json"));
        assert_eq!(cli.global.supervisor_url, "http://supervisor");
        assert!(!cli.global.restore_requested());
        assert_eq!(cli.global.selection(), Selection::Latest);
    }

    #[test]
    #[serial]
    fn test_restore_mode_from_environment() {
        clear_env();
        std::env::set_var("RESTORE_MODE", "TRUE");
        std::env::set_var("BACKUP_INDEX", "2");

        let cli = parse(&["borgkeeper"]);
        assert!(cli.global.restore_requested());
        assert_eq!(cli.global.selection(), Selection::Index(2));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_restore_mode_requires_true() {
        clear_env();
        std::env::set_var("RESTORE_MODE", "yes");

        assert!(!parse(&["borgkeeper", "run"]).global.restore_requested());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_name_wins_over_index() {
        clear_env();
        let cli = parse(&[
            "borgkeeper",
            "restore",
            "--name",
            "2024-05-01-02:00",
            "--index",
            "3",
        ]);
        assert_eq!(cli.command, Some(Commands::Restore));
        assert_eq!(
            cli.global.selection(),
            Selection::Name("2024-05-01-02:00".to_string())
        );
    }

    #[test]
    #[serial]
    fn test_invalid_index_deferred_to_restore() {
        clear_env();
        let cli = parse(&["borgkeeper", "restore", "--index", "two"]);
        assert_eq!(cli.global.selection(), Selection::InvalidIndex("two".to_string()));
    }

    #[test]
    #[serial]
    fn test_invalid_index_does_not_break_backup() {
        clear_env();
        std::env::set_var("BACKUP_INDEX", "latest");

        let backup = Cli::try_parse_from(["borgkeeper", "backup"]);
        let run = Cli::try_parse_from(["borgkeeper"]);
        clear_env();

        assert_eq!(backup.unwrap().command, Some(Commands::Backup));
        assert!(!run.unwrap().global.restore_requested());
    }
}
