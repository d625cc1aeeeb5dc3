//! Logbook queries against the Things SQLite database.
//!
//! The database is owned by Things; it is only ever opened read-only. Both
//! queries return rows strictly after the watermark, ordered by completion
//! time, with a keyset cursor so consecutive pages never overlap.

use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OpenFlags};
use std::path::Path;
use tracing::debug;

use super::types::{ChecklistCursor, ChecklistRow, TaskCursor, TaskRow, Watermark};

/// Source of logbook rows, one page at a time.
pub trait RowSource {
    /// Completed task rows after `watermark` (and after `after`, if given).
    ///
    /// # Errors
    ///
    /// Returns the underlying SQLite error if the query fails.
    fn task_page(
        &self,
        watermark: Watermark,
        after: Option<&TaskCursor>,
        limit: usize,
    ) -> rusqlite::Result<Vec<TaskRow>>;

    /// Checked checklist items whose parent completed after `watermark`.
    ///
    /// # Errors
    ///
    /// Returns the underlying SQLite error if the query fails.
    fn checklist_page(
        &self,
        watermark: Watermark,
        after: Option<&ChecklistCursor>,
        limit: usize,
    ) -> rusqlite::Result<Vec<ChecklistRow>>;
}

const TASK_COLUMNS: &str = "
SELECT    T.uuid
         ,T.title
         ,T.notes
         ,T.startDate
         ,T.stopDate
         ,T.status
         ,Ta.title
         ,P.title
         ,Tt.title
         ,Ttt.tags
    FROM  TMTask AS T
    LEFT JOIN (SELECT DISTINCT tasks, tags FROM TMTaskTag) AS Ttt ON T.uuid = Ttt.tasks
    LEFT JOIN TMTag AS Tt ON Ttt.tags = Tt.uuid
    LEFT JOIN TMArea AS Ta ON T.area = Ta.uuid
    LEFT JOIN TMTask AS P ON T.project = P.uuid
   WHERE  T.trashed = 0
     AND  T.stopDate IS NOT NULL
     AND  T.stopDate > ?1";

const TASK_ORDER: &str = "
   ORDER BY T.stopDate, T.uuid, COALESCE(Ttt.tags, '')";

const CHECKLIST_COLUMNS: &str = "
SELECT    CL.uuid
         ,CL.task
         ,CL.title
         ,CL.\"index\"
         ,T.stopDate
    FROM  TMChecklistItem AS CL
    JOIN  TMTask AS T ON CL.task = T.uuid
   WHERE  CL.status = 3
     AND  COALESCE(CL.title, '') != ''
     AND  T.stopDate > ?1";

const CHECKLIST_ORDER: &str = "
   ORDER BY T.stopDate, CL.task, COALESCE(CL.\"index\", 0), CL.uuid";

/// Read-only handle on the Things database.
#[derive(Debug)]
pub struct ThingsDb {
    conn: Connection,
}

impl ThingsDb {
    /// Open the Things database read-only.
    ///
    /// No busy timeout is set: if Things holds a lock, queries fail
    /// immediately and the pass is retried later.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened as a SQLite database.
    pub fn open(path: &Path) -> rusqlite::Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        debug!(path = %path.display(), "Opened Things database");
        Ok(Self { conn })
    }

    /// Wrap an existing connection (used by tests with fixture databases).
    #[must_use]
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// Count distinct tasks completed after the watermark.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn count_pending(&self, watermark: Watermark) -> rusqlite::Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM TMTask
              WHERE trashed = 0 AND stopDate IS NOT NULL AND stopDate > ?1",
            params![watermark.as_secs()],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

impl RowSource for ThingsDb {
    fn task_page(
        &self,
        watermark: Watermark,
        after: Option<&TaskCursor>,
        limit: usize,
    ) -> rusqlite::Result<Vec<TaskRow>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        if let Some(cursor) = after {
            let sql = format!(
                "{TASK_COLUMNS}
     AND  (T.stopDate, T.uuid, COALESCE(Ttt.tags, '')) > (?2, ?3, ?4){TASK_ORDER}
   LIMIT  ?5"
            );
            let mut stmt = self.conn.prepare_cached(&sql)?;
            let rows = stmt.query_map(
                params![
                    watermark.as_secs(),
                    cursor.stop_date,
                    cursor.uuid,
                    cursor.tag_id,
                    limit
                ],
                map_task_row,
            )?;
            rows.collect()
        } else {
            let sql = format!("{TASK_COLUMNS}{TASK_ORDER}\n   LIMIT  ?2");
            let mut stmt = self.conn.prepare_cached(&sql)?;
            let rows = stmt.query_map(params![watermark.as_secs(), limit], map_task_row)?;
            rows.collect()
        }
    }

    fn checklist_page(
        &self,
        watermark: Watermark,
        after: Option<&ChecklistCursor>,
        limit: usize,
    ) -> rusqlite::Result<Vec<ChecklistRow>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        if let Some(cursor) = after {
            let sql = format!(
                "{CHECKLIST_COLUMNS}
     AND  (T.stopDate, CL.task, COALESCE(CL.\"index\", 0), CL.uuid) > (?2, ?3, ?4, ?5){CHECKLIST_ORDER}
   LIMIT  ?6"
            );
            let mut stmt = self.conn.prepare_cached(&sql)?;
            let rows = stmt.query_map(
                params![
                    watermark.as_secs(),
                    cursor.stop_date,
                    cursor.task_id,
                    cursor.index,
                    cursor.uuid,
                    limit
                ],
                map_checklist_row,
            )?;
            rows.collect()
        } else {
            let sql = format!("{CHECKLIST_COLUMNS}{CHECKLIST_ORDER}\n   LIMIT  ?2");
            let mut stmt = self.conn.prepare_cached(&sql)?;
            let rows = stmt.query_map(params![watermark.as_secs(), limit], map_checklist_row)?;
            rows.collect()
        }
    }
}

fn map_task_row(row: &rusqlite::Row) -> rusqlite::Result<TaskRow> {
    let uuid: String = row.get(0)?;
    let status = coerce_status(row.get_ref(5)?);
    if status.is_none() {
        debug!(uuid = %uuid, "Task status is not numeric, treating as not cancelled");
    }

    Ok(TaskRow {
        uuid,
        title: row.get(1)?,
        notes: row.get(2)?,
        start_date: row.get(3)?,
        stop_date: row.get(4)?,
        status,
        area: row.get(6)?,
        project: row.get(7)?,
        tag: row.get(8)?,
        tag_id: row.get(9)?,
    })
}

fn map_checklist_row(row: &rusqlite::Row) -> rusqlite::Result<ChecklistRow> {
    Ok(ChecklistRow {
        uuid: row.get(0)?,
        task_id: row.get(1)?,
        title: row.get(2)?,
        index: row.get::<_, Option<i64>>(3)?.unwrap_or_default(),
        stop_date: row.get(4)?,
    })
}

/// Read `TMTask.status` leniently: integers, integral reals, and numeric text.
#[allow(clippy::cast_possible_truncation)]
fn coerce_status(value: ValueRef<'_>) -> Option<i64> {
    match value {
        ValueRef::Integer(i) => Some(i),
        ValueRef::Real(f) if f.fract() == 0.0 => Some(f as i64),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes).ok()?.trim().parse().ok(),
        _ => None,
    }
}
