//! Fixture helpers: an in-memory database with the subset of the Things
//! schema the logbook queries touch.

use rusqlite::{params, Connection};

pub(crate) const SCHEMA: &str = "
CREATE TABLE TMArea (
    uuid TEXT PRIMARY KEY,
    title TEXT
);
CREATE TABLE TMTag (
    uuid TEXT PRIMARY KEY,
    title TEXT
);
CREATE TABLE TMTask (
    uuid TEXT PRIMARY KEY,
    title TEXT,
    notes TEXT,
    type INTEGER DEFAULT 0,
    status INTEGER,
    trashed INTEGER DEFAULT 0,
    startDate REAL,
    stopDate REAL,
    area TEXT,
    project TEXT
);
CREATE TABLE TMTaskTag (
    tasks TEXT NOT NULL,
    tags TEXT NOT NULL
);
CREATE TABLE TMChecklistItem (
    uuid TEXT PRIMARY KEY,
    title TEXT,
    status INTEGER,
    stopDate REAL,
    \"index\" INTEGER,
    task TEXT
);
";

pub(crate) fn fixture_db() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(SCHEMA).unwrap();
    conn
}

pub(crate) fn insert_tag(conn: &Connection, uuid: &str, title: &str) {
    conn.execute(
        "INSERT INTO TMTag (uuid, title) VALUES (?1, ?2)",
        params![uuid, title],
    )
    .unwrap();
}

pub(crate) fn insert_task(
    conn: &Connection,
    uuid: &str,
    title: &str,
    stop_date: f64,
    status: i64,
    tag_ids: &[&str],
) {
    conn.execute(
        "INSERT INTO TMTask (uuid, title, notes, status, trashed, startDate, stopDate)
         VALUES (?1, ?2, '', ?3, 0, NULL, ?4)",
        params![uuid, title, status, stop_date],
    )
    .unwrap();
    for tag_id in tag_ids {
        conn.execute(
            "INSERT INTO TMTaskTag (tasks, tags) VALUES (?1, ?2)",
            params![uuid, tag_id],
        )
        .unwrap();
    }
}

pub(crate) fn insert_checklist_item(
    conn: &Connection,
    uuid: &str,
    task: &str,
    title: &str,
    status: i64,
    index: i64,
) {
    conn.execute(
        "INSERT INTO TMChecklistItem (uuid, title, status, stopDate, \"index\", task)
         VALUES (?1, ?2, ?3, NULL, ?4, ?5)",
        params![uuid, title, status, index, task],
    )
    .unwrap();
}
