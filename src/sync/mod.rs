//! Logbook sync passes.
//!
//! One pass reads everything completed after the watermark, merges it into
//! tasks, renders one section per completion day, and hands each section to a
//! [`NoteSink`]:
//!
//! ```text
//! watermark ─▶ fetch_tasks ─┐
//!             fetch_checklist_items ─▶ build_tasks ─▶ group_by_day ─▶ render_day ─▶ NoteSink
//! ```
//!
//! [`run_pass`] is the pure core: it never touches the settings file. The
//! caller persists [`PassOutcome::next_watermark`] only when the pass
//! succeeded. [`SyncJob`] wires the pass to the real Things database, the
//! daily notes folder, and the settings file, and [`watch`] repeats it on a
//! timer.
//!
//! # Example
//!
//! ```ignore
//! use logbook::sync::SyncJob;
//!
//! let job = SyncJob::new(store, None, None);
//! let outcome = job.run()?;
//! println!("synced {} tasks", outcome.tasks);
//! ```

mod status;

pub use status::{get_sync_status, print_status, SyncStatus};

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDate, TimeZone};
use serde::Serialize;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::{self, Settings, SettingsStore};
use crate::error::{Error, Result};
use crate::notes::{DailyNotes, NotePreview, NoteSink};
use crate::render::{group_by_day, render_day};
use crate::things::{
    build_tasks, fetch_checklist_items, fetch_tasks, FetchReporter, RowSource, ThingsDb,
    TracingReporter, Watermark,
};

/// Shortest interval the watch loop will honor.
const MIN_SYNC_INTERVAL_SECONDS: u64 = 10;

/// Result of a successful pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassOutcome {
    /// Distinct tasks merged.
    pub tasks: usize,
    /// Checklist items attached to those tasks.
    pub subtasks: usize,
    /// Days whose section was written, ascending.
    pub days: Vec<NaiveDate>,
    /// Watermark the pass started from.
    pub watermark: Watermark,
    /// Watermark to persist for the next pass.
    pub next_watermark: Watermark,
}

/// Run one fetch, merge, render, and write pass.
///
/// Both tables are read with the same `watermark`. If either fetch fails,
/// nothing is written. If a note write fails, sections already written are
/// kept and the error is returned, so the watermark must not be advanced.
///
/// # Errors
///
/// Returns [`Error::Fetch`] if a table could not be read, or the sink's error
/// if a section could not be written.
pub fn run_pass<S, N, Tz>(
    source: &S,
    sink: &mut N,
    settings: &Settings,
    watermark: Watermark,
    reporter: &dyn FetchReporter,
    now: &DateTime<Tz>,
) -> Result<PassOutcome>
where
    S: RowSource + ?Sized,
    N: NoteSink + ?Sized,
    Tz: TimeZone,
{
    let task_rows = fetch_tasks(source, watermark, reporter)?;
    let checklist_rows = fetch_checklist_items(source, watermark, reporter)?;
    let tasks = build_tasks(&task_rows, &checklist_rows);

    let subtasks = tasks.iter().map(|t| t.subtasks.len()).sum();
    let by_day = group_by_day(&tasks, &now.timezone());
    let mut days = Vec::with_capacity(by_day.len());

    for (day, day_tasks) in &by_day {
        let body = render_day(day_tasks, settings);
        sink.write_section(*day, &settings.section_heading, &body)?;
        debug!(%day, tasks = day_tasks.len(), "Wrote logbook section");
        days.push(*day);
    }

    let next_watermark = watermark.advanced_to_day_start(now);
    info!(
        tasks = tasks.len(),
        subtasks,
        days = days.len(),
        %watermark,
        %next_watermark,
        "Sync pass complete"
    );

    Ok(PassOutcome {
        tasks: tasks.len(),
        subtasks,
        days,
        watermark,
        next_watermark,
    })
}

/// A pass bound to the settings file and the command-line overrides.
#[derive(Debug, Clone)]
pub struct SyncJob {
    store: SettingsStore,
    things_db: Option<PathBuf>,
    vault: Option<PathBuf>,
}

impl SyncJob {
    /// `things_db` and `vault` override the settings when set.
    #[must_use]
    pub fn new(store: SettingsStore, things_db: Option<PathBuf>, vault: Option<PathBuf>) -> Self {
        Self {
            store,
            things_db,
            vault,
        }
    }

    #[must_use]
    pub fn store(&self) -> &SettingsStore {
        &self.store
    }

    /// Run a pass against the real notes and persist the new watermark.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings, database, or vault cannot be
    /// resolved, or if the pass fails. The watermark is left untouched on
    /// error.
    pub fn run(&self) -> Result<PassOutcome> {
        let settings = self.store.load()?;
        let vault = config::resolve_vault(self.vault.as_deref(), &settings)?;
        let db = self.open_db(&settings)?;

        let mut notes = DailyNotes::new(
            &vault,
            &settings.daily_note_folder,
            &settings.daily_note_format,
        );
        let outcome = run_pass(
            &db,
            &mut notes,
            &settings,
            settings.latest_sync_time,
            &TracingReporter,
            &Local::now(),
        )?;

        self.store.record_watermark(outcome.next_watermark)?;
        Ok(outcome)
    }

    /// Run a pass that collects sections instead of writing them.
    ///
    /// Nothing is written and the watermark is not persisted.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings or database cannot be resolved, or
    /// if a fetch fails.
    pub fn preview(&self) -> Result<(PassOutcome, NotePreview)> {
        let settings = self.store.load()?;
        let db = self.open_db(&settings)?;

        let mut preview = NotePreview::default();
        let outcome = run_pass(
            &db,
            &mut preview,
            &settings,
            settings.latest_sync_time,
            &TracingReporter,
            &Local::now(),
        )?;
        Ok((outcome, preview))
    }

    fn open_db(&self, settings: &Settings) -> Result<ThingsDb> {
        let path = config::resolve_things_db(self.things_db.as_deref(), settings)?;
        Ok(ThingsDb::open(&path)?)
    }
}

/// Run passes every `syncInterval` seconds until Ctrl-C.
///
/// Settings are re-read before every tick, so toggling `isSyncEnabled` or
/// changing `syncInterval` takes effect without a restart. Each pass runs on
/// the blocking pool and finishes before the next tick; a failed pass is
/// reported through `on_pass` and retried on the next tick from the same
/// watermark.
///
/// # Errors
///
/// Returns an error if the settings cannot be read at startup or a pass
/// panics.
pub async fn watch<F>(job: SyncJob, mut on_pass: F) -> Result<()>
where
    F: FnMut(&Result<PassOutcome>),
{
    let mut interval_secs = job.store.load()?.sync_interval;
    let mut ticker = new_ticker(interval_secs);
    info!(interval_secs, "Watching Things logbook");

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl-C, stopping watch");
                return Ok(());
            }
        }

        let settings = match job.store.load() {
            Ok(settings) => settings,
            Err(e) => {
                warn!(error = %e, "Could not read settings, skipping pass");
                continue;
            }
        };

        if settings.sync_interval != interval_secs {
            interval_secs = settings.sync_interval;
            ticker = new_ticker(interval_secs);
            ticker.tick().await;
            info!(interval_secs, "Sync interval changed");
        }

        if !settings.is_sync_enabled {
            warn!("Periodic sync is disabled (isSyncEnabled = false), skipping pass");
            continue;
        }

        let pass_job = job.clone();
        let result = tokio::task::spawn_blocking(move || pass_job.run())
            .await
            .map_err(|e| Error::Other(format!("Sync pass aborted: {e}")))?;

        if let Err(e) = &result {
            warn!(error = %e, "Sync pass failed, will retry");
        }
        on_pass(&result);
    }
}

fn new_ticker(interval_secs: u64) -> tokio::time::Interval {
    let period = Duration::from_secs(interval_secs.max(MIN_SYNC_INTERVAL_SECONDS));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}
