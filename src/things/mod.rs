//! Things 3 logbook import.
//!
//! This module reads completed to-dos from the Things SQLite database and
//! folds them into nested [`Task`] records:
//!
//! - [`query`] - Read-only SQL against `TMTask`, `TMTag`, `TMChecklistItem`
//! - [`paginate`] - Drains a query page by page for one watermark
//! - [`merge`] - Groups task/tag rows per task and attaches checklist items
//!
//! # Example
//!
//! ```ignore
//! use logbook::things::{build_tasks, fetch_checklist_items, fetch_tasks, ThingsDb, TracingReporter};
//!
//! let db = ThingsDb::open(&path)?;
//! let rows = fetch_tasks(&db, watermark, &TracingReporter)?;
//! let items = fetch_checklist_items(&db, watermark, &TracingReporter)?;
//! let tasks = build_tasks(&rows, &items);
//! ```

pub mod merge;
pub mod paginate;
pub mod query;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use merge::build_tasks;
pub use paginate::{
    fetch_checklist_items, fetch_tasks, FetchReporter, TracingReporter, TASK_FETCH_LIMIT,
};
pub use query::{RowSource, ThingsDb};
pub use types::{
    ChecklistCursor, ChecklistRow, Keyed, Subtask, Task, TaskCursor, TaskRow, Watermark,
    STATUS_CANCELLED,
};

/// The logical table a fetch reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    /// Completed to-dos joined with their tags, area, and project.
    Tasks,
    /// Checked checklist items joined with their parent to-do.
    ChecklistItems,
}

impl Table {
    /// Name used in fetch error messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Tasks => "Tasks",
            Self::ChecklistItems => "Subtasks",
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tasks => write!(f, "tasks"),
            Self::ChecklistItems => write!(f, "checklist_items"),
        }
    }
}

/// Why a fetch was abandoned.
#[derive(Debug, thiserror::Error)]
pub enum FetchCause {
    /// The SQL query failed (missing table, locked database, bad row).
    #[error(transparent)]
    Query(#[from] rusqlite::Error),

    /// A full page ended on the same row as the previous page.
    #[error("page cursor did not advance past {0}")]
    Stalled(String),
}

/// Fetching one table failed. No rows from that fetch are kept.
#[derive(Debug, thiserror::Error)]
#[error("fetch {} failed", .table.label())]
pub struct FetchError {
    pub table: Table,
    #[source]
    cause: FetchCause,
}

impl FetchError {
    /// Wrap a query failure for `table`.
    #[must_use]
    pub fn new(table: Table, err: rusqlite::Error) -> Self {
        Self {
            table,
            cause: FetchCause::Query(err),
        }
    }

    pub(crate) fn stalled(table: Table, position: String) -> Self {
        Self {
            table,
            cause: FetchCause::Stalled(position),
        }
    }

    /// The underlying failure.
    #[must_use]
    pub fn cause(&self) -> &FetchCause {
        &self.cause
    }
}
