//! Sync status display.
//!
//! Reports the stored watermark, where the database and notes are expected,
//! and how many completed tasks the next pass would pick up.

use std::path::{Path, PathBuf};

use chrono::Local;
use colored::Colorize;
use serde::Serialize;

use crate::config::{self, Settings};
use crate::things::{ThingsDb, Watermark};

/// Snapshot of the sync configuration and backlog.
#[derive(Debug, Clone, Serialize)]
pub struct SyncStatus {
    pub config_path: PathBuf,
    pub watermark: Watermark,
    /// Watermark as a local RFC 3339 time, if it has ever been set.
    pub last_synced_at: Option<String>,
    pub is_sync_enabled: bool,
    pub sync_interval: u64,
    pub things_db: Option<PathBuf>,
    pub vault: Option<PathBuf>,
    /// Tasks completed after the watermark, when the database is readable.
    pub pending_tasks: Option<usize>,
    /// Why the database or vault could not be resolved.
    pub problems: Vec<String>,
}

/// Collect the status for `settings`.
///
/// Resolution problems are reported in [`SyncStatus::problems`] rather than
/// as errors, so status can be shown for a half-configured setup.
#[must_use]
pub fn get_sync_status(
    config_path: &Path,
    settings: &Settings,
    things_db: Option<&Path>,
    vault: Option<&Path>,
) -> SyncStatus {
    let mut problems = Vec::new();
    let watermark = settings.latest_sync_time;

    let last_synced_at = (watermark > Watermark::ZERO)
        .then(|| watermark.to_datetime(&Local))
        .flatten()
        .map(|dt| dt.to_rfc3339());

    let db_path = match config::resolve_things_db(things_db, settings) {
        Ok(path) => Some(path),
        Err(e) => {
            problems.push(e.to_string());
            None
        }
    };

    let pending_tasks = match db_path.as_deref().map(ThingsDb::open) {
        Some(Ok(db)) => match db.count_pending(watermark) {
            Ok(count) => Some(count),
            Err(e) => {
                problems.push(format!("Could not count pending tasks: {e}"));
                None
            }
        },
        Some(Err(e)) => {
            problems.push(format!("Could not open Things database: {e}"));
            None
        }
        None => None,
    };

    let vault = match config::resolve_vault(vault, settings) {
        Ok(path) => Some(path),
        Err(e) => {
            problems.push(e.to_string());
            None
        }
    };

    SyncStatus {
        config_path: config_path.to_path_buf(),
        watermark,
        last_synced_at,
        is_sync_enabled: settings.is_sync_enabled,
        sync_interval: settings.sync_interval,
        things_db: db_path,
        vault,
        pending_tasks,
        problems,
    }
}

/// Print sync status to stdout in a human-readable format.
pub fn print_status(status: &SyncStatus) {
    println!("{}", "Logbook Sync Status".bold().underline());
    println!();

    println!("  Config:        {}", status.config_path.display());
    match &status.things_db {
        Some(path) => println!("  Things DB:     {}", path.display()),
        None => println!("  Things DB:     {}", "not found".red()),
    }
    match &status.vault {
        Some(path) => println!("  Vault:         {}", path.display()),
        None => println!("  Vault:         {}", "not configured".red()),
    }
    println!();

    match &status.last_synced_at {
        Some(at) => println!("  Last synced:   {at}"),
        None => println!("  Last synced:   {}", "never".dimmed()),
    }
    let periodic = if status.is_sync_enabled {
        format!("every {}s", status.sync_interval).green()
    } else {
        "disabled".yellow()
    };
    println!("  Periodic sync: {periodic}");

    if let Some(pending) = status.pending_tasks {
        if pending > 0 {
            println!("  {}: {pending}", "Pending tasks".yellow().bold());
            println!();
            println!("{}", "Run 'logbook sync' to write them to your daily notes.".dimmed());
        } else {
            println!("  Pending tasks: {}", "none".green());
        }
    }

    if !status.problems.is_empty() {
        println!();
        println!("{}", "Problems:".red().bold());
        for problem in &status.problems {
            println!("  - {problem}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::things::testing::{insert_task, SCHEMA};
    use rusqlite::Connection;
    use tempfile::TempDir;

    #[test]
    fn test_status_counts_pending_tasks() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("main.sqlite");
        {
            let conn = Connection::open(&db_path).unwrap();
            conn.execute_batch(SCHEMA).unwrap();
            insert_task(&conn, "old", "Old", 500.0, 3, &[]);
            insert_task(&conn, "new", "New", 5000.0, 3, &[]);
        }
        let mut settings = Settings::default();
        settings.latest_sync_time = Watermark::from_secs(1000.0);
        settings.vault_path = Some(dir.path().join("vault"));

        let status =
            get_sync_status(&dir.path().join("config.json"), &settings, Some(db_path.as_path()), None);

        assert_eq!(status.pending_tasks, Some(1));
        assert_eq!(status.things_db.as_deref(), Some(db_path.as_path()));
        assert!(status.last_synced_at.is_some());
        assert!(status.problems.is_empty());
    }

    #[test]
    fn test_status_reports_problems() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.sqlite");

        let status =
            get_sync_status(&dir.path().join("config.json"), &Settings::default(), Some(missing.as_path()), None);

        assert_eq!(status.pending_tasks, None);
        assert_eq!(status.last_synced_at, None);
        assert_eq!(status.problems.len(), 2);
    }
}
