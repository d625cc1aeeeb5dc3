//! Pagination driver for the logbook queries.
//!
//! A single query returns at most [`TASK_FETCH_LIMIT`] rows. The driver keeps
//! asking for the next page, resuming after the last row it saw, until a page
//! comes back short. All pages of a pass use the same watermark.

use std::time::{Duration, Instant};
use tracing::{debug, error};

use super::query::RowSource;
use super::types::{ChecklistRow, Keyed, TaskRow, Watermark};
use super::{FetchError, Table};

/// Maximum number of rows requested per page.
pub const TASK_FETCH_LIMIT: usize = 1000;

/// Receives fetch progress events.
pub trait FetchReporter {
    /// A page of `rows` rows was read from `table`.
    fn page_fetched(&self, table: Table, page: usize, rows: usize, elapsed: Duration);

    /// Reading `table` failed; the whole fetch is abandoned.
    fn fetch_failed(&self, table: Table, error: &FetchError);
}

/// Reports fetch progress as `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl FetchReporter for TracingReporter {
    fn page_fetched(&self, table: Table, page: usize, rows: usize, elapsed: Duration) {
        debug!(
            %table,
            page,
            rows,
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "Fetched page from Things database"
        );
    }

    fn fetch_failed(&self, table: Table, error: &FetchError) {
        error!(%table, cause = %error.cause(), "Failed to query the Things database");
    }
}

/// Fetch every task row completed after `watermark`.
///
/// # Errors
///
/// Returns a [`FetchError`] for [`Table::Tasks`] if any page fails. Rows from
/// earlier pages are discarded.
pub fn fetch_tasks<S: RowSource + ?Sized>(
    source: &S,
    watermark: Watermark,
    reporter: &dyn FetchReporter,
) -> Result<Vec<TaskRow>, FetchError> {
    drain(Table::Tasks, TASK_FETCH_LIMIT, reporter, |after, limit| {
        source.task_page(watermark, after, limit)
    })
}

/// Fetch every checked checklist item whose task completed after `watermark`.
///
/// # Errors
///
/// Returns a [`FetchError`] for [`Table::ChecklistItems`] if any page fails.
pub fn fetch_checklist_items<S: RowSource + ?Sized>(
    source: &S,
    watermark: Watermark,
    reporter: &dyn FetchReporter,
) -> Result<Vec<ChecklistRow>, FetchError> {
    drain(Table::ChecklistItems, TASK_FETCH_LIMIT, reporter, |after, limit| {
        source.checklist_page(watermark, after, limit)
    })
}

fn drain<R, F>(
    table: Table,
    limit: usize,
    reporter: &dyn FetchReporter,
    mut fetch_page: F,
) -> Result<Vec<R>, FetchError>
where
    R: Keyed,
    F: FnMut(Option<&R::Cursor>, usize) -> rusqlite::Result<Vec<R>>,
{
    let mut rows = Vec::new();
    let mut cursor: Option<R::Cursor> = None;
    let mut page = 0;

    loop {
        page += 1;
        let started = Instant::now();

        let batch = match fetch_page(cursor.as_ref(), limit) {
            Ok(batch) => batch,
            Err(e) => {
                let err = FetchError::new(table, e);
                reporter.fetch_failed(table, &err);
                return Err(err);
            }
        };
        reporter.page_fetched(table, page, batch.len(), started.elapsed());

        let exhausted = batch.len() < limit;

        if let Some(last) = batch.last() {
            let next = last.cursor();
            if !exhausted && cursor.as_ref() == Some(&next) {
                let err = FetchError::stalled(table, format!("{next:?}"));
                reporter.fetch_failed(table, &err);
                return Err(err);
            }
            cursor = Some(next);
        }

        rows.extend(batch);

        if exhausted {
            break;
        }
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::things::query::ThingsDb;
    use crate::things::testing::{fixture_db, insert_checklist_item, insert_tag, insert_task};
    use crate::things::types::{ChecklistCursor, TaskCursor};
    use std::cell::{Cell, RefCell};

    /// Records every event it receives.
    #[derive(Default)]
    struct RecordingReporter {
        pages: RefCell<Vec<(Table, usize)>>,
        failures: RefCell<Vec<Table>>,
    }

    impl FetchReporter for RecordingReporter {
        fn page_fetched(&self, table: Table, _page: usize, rows: usize, _elapsed: Duration) {
            self.pages.borrow_mut().push((table, rows));
        }

        fn fetch_failed(&self, table: Table, _error: &FetchError) {
            self.failures.borrow_mut().push(table);
        }
    }

    fn task_row(n: usize) -> TaskRow {
        TaskRow {
            uuid: format!("task-{n:05}"),
            title: Some(format!("Task {n}")),
            notes: None,
            area: None,
            project: None,
            start_date: None,
            stop_date: 2000.0,
            status: Some(3),
            tag: None,
            tag_id: None,
        }
    }

    /// In-memory source that honours the cursor and can fail on a given page.
    struct VecSource {
        rows: Vec<TaskRow>,
        fail_on_page: Option<usize>,
        calls: Cell<usize>,
    }

    impl VecSource {
        fn new(count: usize) -> Self {
            Self {
                rows: (0..count).map(task_row).collect(),
                fail_on_page: None,
                calls: Cell::new(0),
            }
        }
    }

    impl RowSource for VecSource {
        fn task_page(
            &self,
            watermark: Watermark,
            after: Option<&TaskCursor>,
            limit: usize,
        ) -> rusqlite::Result<Vec<TaskRow>> {
            self.calls.set(self.calls.get() + 1);
            if self.fail_on_page == Some(self.calls.get()) {
                return Err(rusqlite::Error::QueryReturnedNoRows);
            }
            Ok(self
                .rows
                .iter()
                .filter(|r| r.stop_date > watermark.as_secs())
                .filter(|r| after.is_none_or(|c| r.uuid > c.uuid))
                .take(limit)
                .cloned()
                .collect())
        }

        fn checklist_page(
            &self,
            _watermark: Watermark,
            _after: Option<&ChecklistCursor>,
            _limit: usize,
        ) -> rusqlite::Result<Vec<ChecklistRow>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_single_short_page() {
        let source = VecSource::new(3);
        let reporter = RecordingReporter::default();

        let rows = fetch_tasks(&source, Watermark::ZERO, &reporter).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(source.calls.get(), 1);
        assert_eq!(*reporter.pages.borrow(), vec![(Table::Tasks, 3)]);
    }

    #[test]
    fn test_exact_page_size_issues_empty_final_page() {
        let source = VecSource::new(TASK_FETCH_LIMIT);
        let reporter = RecordingReporter::default();

        let rows = fetch_tasks(&source, Watermark::ZERO, &reporter).unwrap();

        assert_eq!(rows.len(), TASK_FETCH_LIMIT);
        assert_eq!(source.calls.get(), 2);
        assert_eq!(
            *reporter.pages.borrow(),
            vec![(Table::Tasks, TASK_FETCH_LIMIT), (Table::Tasks, 0)]
        );
    }

    #[test]
    fn test_multiple_pages_are_distinct() {
        let total = TASK_FETCH_LIMIT * 2 + 17;
        let source = VecSource::new(total);
        let reporter = RecordingReporter::default();

        let rows = fetch_tasks(&source, Watermark::ZERO, &reporter).unwrap();

        assert_eq!(rows.len(), total);
        assert_eq!(source.calls.get(), 3);
        let mut uuids: Vec<_> = rows.iter().map(|r| r.uuid.clone()).collect();
        uuids.dedup();
        assert_eq!(uuids.len(), total);
    }

    #[test]
    fn test_failure_discards_rows_and_names_table() {
        let mut source = VecSource::new(TASK_FETCH_LIMIT + 5);
        source.fail_on_page = Some(2);
        let reporter = RecordingReporter::default();

        let err = fetch_tasks(&source, Watermark::ZERO, &reporter).unwrap_err();

        assert_eq!(err.table, Table::Tasks);
        assert_eq!(err.to_string(), "fetch Tasks failed");
        assert_eq!(*reporter.failures.borrow(), vec![Table::Tasks]);
    }

    #[test]
    fn test_stalled_cursor_is_an_error() {
        let reporter = RecordingReporter::default();
        let rows: Vec<TaskRow> = (0..4).map(|_| task_row(1)).collect();

        let result = drain(Table::Tasks, 2, &reporter, |_after, limit| {
            Ok(rows.iter().take(limit).cloned().collect())
        });

        let err = result.unwrap_err();
        assert!(err.cause().to_string().contains("did not advance"));
        assert_eq!(reporter.pages.borrow().len(), 2);
    }

    #[test]
    fn test_small_pages_against_sqlite() {
        let conn = fixture_db();
        insert_tag(&conn, "tag-a", "a");
        insert_tag(&conn, "tag-b", "b");
        for n in 0..7 {
            let uuid = format!("t{n}");
            let tags: &[&str] = if n % 2 == 0 { &["tag-a", "tag-b"] } else { &[] };
            insert_task(&conn, &uuid, "Task", 1500.0 + f64::from(n / 3), 3, tags);
        }
        let db = ThingsDb::from_connection(conn);
        let reporter = RecordingReporter::default();

        let rows = drain(Table::Tasks, 3, &reporter, |after, limit| {
            db.task_page(Watermark::from_secs(1000.0), after, limit)
        })
        .unwrap();

        // 4 tagged tasks x 2 rows + 3 untagged tasks x 1 row
        assert_eq!(rows.len(), 11);
        assert_eq!(reporter.pages.borrow().len(), 4);
    }

    #[test]
    fn test_checklist_pages_against_sqlite() {
        let conn = fixture_db();
        insert_task(&conn, "t1", "Parent", 1500.0, 3, &[]);
        for n in 0..5 {
            insert_checklist_item(&conn, &format!("c{n}"), "t1", &format!("item {n}"), 3, n);
        }
        let db = ThingsDb::from_connection(conn);
        let reporter = RecordingReporter::default();

        let rows = drain(Table::ChecklistItems, 2, &reporter, |after, limit| {
            db.checklist_page(Watermark::ZERO, after, limit)
        })
        .unwrap();

        let titles: Vec<_> = rows.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["item 0", "item 1", "item 2", "item 3", "item 4"]);

        let all = fetch_checklist_items(&db, Watermark::ZERO, &TracingReporter).unwrap();
        assert_eq!(all.len(), 5);
    }
}
