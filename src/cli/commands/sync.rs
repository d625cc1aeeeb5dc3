//! Sync command implementation.
//!
//! `logbook sync` runs one pass and persists the new watermark.
//! `--dry-run` prints the sections instead of writing them, and `--watch`
//! keeps syncing on the `syncInterval` timer until interrupted.

use colored::Colorize;
use serde::Serialize;

use crate::cli::Cli;
use crate::config::{resolve_config_path, SettingsStore};
use crate::error::{Error, Result};
use crate::sync::{self, PassOutcome, SyncJob};

#[derive(Serialize)]
struct PreviewSection<'a> {
    day: String,
    body: &'a str,
}

/// Execute the sync command.
///
/// # Errors
///
/// Returns an error if the pass fails. In watch mode, failed passes are
/// reported and retried; only startup errors are returned.
pub fn execute(cli: &Cli, watch: bool, dry_run: bool, json: bool) -> Result<()> {
    let store = SettingsStore::new(resolve_config_path(cli.config.as_deref())?);
    let job = SyncJob::new(store, cli.things_db.clone(), cli.vault.clone());

    if dry_run {
        return preview(&job, json);
    }

    if watch {
        let rt = tokio::runtime::Runtime::new()
            .map_err(|e| Error::Other(format!("Failed to start async runtime: {e}")))?;
        let quiet = cli.quiet;
        return rt.block_on(sync::watch(job, move |result| match result {
            Ok(outcome) => report(outcome, json, quiet),
            Err(e) if json => eprintln!("{}", e.to_structured_json()),
            Err(e) if !quiet => eprintln!("{} {e}", "Sync failed:".red()),
            Err(_) => {}
        }));
    }

    let outcome = job.run()?;
    report(&outcome, json, cli.quiet);
    Ok(())
}

fn preview(job: &SyncJob, json: bool) -> Result<()> {
    let (outcome, preview) = job.preview()?;

    if json {
        let sections: Vec<PreviewSection<'_>> = preview
            .sections
            .iter()
            .map(|(day, body)| PreviewSection {
                day: day.to_string(),
                body,
            })
            .collect();
        let output = serde_json::json!({
            "dry_run": true,
            "outcome": outcome,
            "sections": sections,
        });
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    if preview.sections.is_empty() {
        println!("{}", "Nothing new in the Things logbook.".dimmed());
        return Ok(());
    }

    for (day, body) in &preview.sections {
        println!("{}", format!("── {day} ──").bold());
        print!("{body}");
        println!();
    }
    println!(
        "{}",
        format!(
            "Dry run: {} tasks on {} days would be written; watermark not changed.",
            outcome.tasks,
            outcome.days.len()
        )
        .dimmed()
    );
    Ok(())
}

fn report(outcome: &PassOutcome, json: bool, quiet: bool) {
    if json {
        match serde_json::to_string(outcome) {
            Ok(payload) => println!("{payload}"),
            Err(e) => eprintln!("Failed to serialize sync result: {e}"),
        }
        return;
    }
    if quiet {
        return;
    }

    if outcome.tasks == 0 {
        println!("{}", "Nothing new in the Things logbook.".dimmed());
        return;
    }

    println!(
        "{} {} tasks ({} checklist items) into {} daily notes",
        "Synced".green().bold(),
        outcome.tasks,
        outcome.subtasks,
        outcome.days.len()
    );
    for day in &outcome.days {
        println!("  {day}");
    }
}
