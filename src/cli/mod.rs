//! CLI definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

/// Things Logbook - sync completed Things 3 tasks into daily notes
#[derive(Parser, Debug)]
#[command(name = "logbook", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Settings file (default: ~/.things-logbook/config.json)
    #[arg(long, global = true, env = "LOGBOOK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Things database (default: the Things 3 group container)
    #[arg(long, global = true, env = "THINGS_DB")]
    pub things_db: Option<PathBuf>,

    /// Notes vault to write daily notes into
    #[arg(long, global = true, env = "LOGBOOK_VAULT")]
    pub vault: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write tasks completed since the last sync into daily notes
    Sync {
        /// Keep running and sync every `syncInterval` seconds
        #[arg(long, conflicts_with = "dry_run")]
        watch: bool,

        /// Print the sections that would be written without touching notes
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the sync watermark, locations, and pending tasks
    Status,

    /// Read or change settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Print version information
    Version,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print all settings
    Show,

    /// Print one setting
    Get {
        /// Setting name (camelCase, e.g. tagPrefix)
        key: String,
    },

    /// Change one setting
    Set {
        /// Setting name (camelCase, e.g. tagPrefix)
        key: String,

        /// New value; "" clears thingsDbPath and vaultPath
        value: String,
    },

    /// Print the settings file location
    Path,
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "logbook",
            "sync",
            "--dry-run",
            "--things-db",
            "/tmp/main.sqlite",
            "-vv",
        ]);

        assert!(matches!(
            cli.command,
            Commands::Sync {
                watch: false,
                dry_run: true
            }
        ));
        assert_eq!(cli.things_db, Some(PathBuf::from("/tmp/main.sqlite")));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_watch_conflicts_with_dry_run() {
        assert!(Cli::try_parse_from(["logbook", "sync", "--watch", "--dry-run"]).is_err());
    }
}
