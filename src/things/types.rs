//! Row and task types for the Things import.
//!
//! Rows are the flat tuples returned by the logbook queries; tasks are the
//! nested records produced by the merge.

use chrono::{DateTime, Duration, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};

/// `TMTask.status` value for a cancelled to-do.
pub const STATUS_CANCELLED: i64 = 2;

/// Completion-time cutoff, in epoch seconds.
///
/// Rows whose `stopDate` is at or below the watermark are considered synced.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Watermark(f64);

impl Watermark {
    /// Nothing synced yet.
    pub const ZERO: Self = Self(0.0);

    #[must_use]
    pub const fn from_secs(secs: f64) -> Self {
        Self(secs)
    }

    #[must_use]
    pub const fn as_secs(self) -> f64 {
        self.0
    }

    /// Watermark for the next pass after a successful pass started at `now`.
    ///
    /// Moves to the start of `now`'s calendar day so that the current day is
    /// fetched again on every pass until it is over. Never moves backwards.
    #[must_use]
    pub fn advanced_to_day_start<Tz: TimeZone>(self, now: &DateTime<Tz>) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let day_start = first_instant_of_day(now).timestamp() as f64;

        if day_start > self.0 {
            Self(day_start)
        } else {
            self
        }
    }

    /// Convert to a local date-time, if representable.
    #[must_use]
    pub fn to_datetime<Tz: TimeZone>(self, tz: &Tz) -> Option<DateTime<Tz>> {
        secs_to_datetime(self.0, tz)
    }
}

impl std::fmt::Display for Watermark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One row of the task query: a task paired with at most one of its tags.
///
/// A task with N tags produces N rows; a task with no tags produces a single
/// row with `tag = None`.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRow {
    pub uuid: String,
    pub title: Option<String>,
    pub notes: Option<String>,
    pub area: Option<String>,
    pub project: Option<String>,
    pub start_date: Option<f64>,
    pub stop_date: f64,
    /// `None` when the stored status is not an integer.
    pub status: Option<i64>,
    pub tag: Option<String>,
    pub tag_id: Option<String>,
}

/// One completed checklist item joined with its parent task.
#[derive(Debug, Clone, PartialEq)]
pub struct ChecklistRow {
    pub uuid: String,
    pub task_id: String,
    pub title: String,
    pub index: i64,
    /// Completion time of the parent task, not of the item.
    pub stop_date: Option<f64>,
}

/// Position after the last task row of a page.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskCursor {
    pub stop_date: f64,
    pub uuid: String,
    pub tag_id: String,
}

/// Position after the last checklist row of a page.
#[derive(Debug, Clone, PartialEq)]
pub struct ChecklistCursor {
    pub stop_date: f64,
    pub task_id: String,
    pub index: i64,
    pub uuid: String,
}

/// A row that can resume a query after itself.
pub trait Keyed {
    type Cursor: std::fmt::Debug + PartialEq;

    fn cursor(&self) -> Self::Cursor;
}

impl Keyed for TaskRow {
    type Cursor = TaskCursor;

    fn cursor(&self) -> TaskCursor {
        TaskCursor {
            stop_date: self.stop_date,
            uuid: self.uuid.clone(),
            tag_id: self.tag_id.clone().unwrap_or_default(),
        }
    }
}

impl Keyed for ChecklistRow {
    type Cursor = ChecklistCursor;

    fn cursor(&self) -> ChecklistCursor {
        ChecklistCursor {
            // The parent join filters on stopDate, so it is always set here.
            stop_date: self.stop_date.unwrap_or_default(),
            task_id: self.task_id.clone(),
            index: self.index,
            uuid: self.uuid.clone(),
        }
    }
}

/// A checklist entry attached to a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subtask {
    pub title: String,
    pub completed: bool,
}

/// A completed (or cancelled) Things task with its tags and checklist.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    pub uuid: String,
    pub title: String,
    pub notes: String,
    pub area: Option<String>,
    pub project: Option<String>,
    /// One entry per tag join row. `None` marks the row of an untagged task.
    pub tags: Vec<Option<String>>,
    pub cancelled: bool,
    pub start_date: Option<f64>,
    pub stop_date: f64,
    pub subtasks: Vec<Subtask>,
}

impl Task {
    /// Tag names, without the untagged placeholder.
    pub fn named_tags(&self) -> impl Iterator<Item = &str> {
        self.tags
            .iter()
            .filter_map(|tag| tag.as_deref())
            .filter(|tag| !tag.is_empty())
    }

    /// Project title, falling back to the area name.
    #[must_use]
    pub fn heading(&self) -> Option<&str> {
        self.project.as_deref().or(self.area.as_deref())
    }

    /// Completion time in the given time zone.
    #[must_use]
    pub fn completed_at<Tz: TimeZone>(&self, tz: &Tz) -> Option<DateTime<Tz>> {
        secs_to_datetime(self.stop_date, tz)
    }
}

/// Earliest instant whose local date is `now`'s date.
///
/// Local midnight can be skipped by a DST jump; the day then starts at the
/// first local time that exists, found by stepping forward a minute at a time.
fn first_instant_of_day<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Tz> {
    let tz = now.timezone();
    let mut local = now.date_naive().and_time(NaiveTime::MIN);
    let day_end = local + Duration::days(1);

    while local < day_end {
        if let Some(start) = tz.from_local_datetime(&local).earliest() {
            if start <= *now {
                return start;
            }
            break;
        }
        local += Duration::minutes(1);
    }

    now.clone()
}

#[allow(clippy::cast_possible_truncation)]
fn secs_to_datetime<Tz: TimeZone>(secs: f64, tz: &Tz) -> Option<DateTime<Tz>> {
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9) as u32;
    DateTime::from_timestamp(whole as i64, nanos).map(|utc| utc.with_timezone(tz))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    fn task_with_tags(tags: Vec<Option<String>>) -> Task {
        Task {
            uuid: "t1".to_string(),
            title: "Title".to_string(),
            notes: String::new(),
            area: Some("Home".to_string()),
            project: None,
            tags,
            cancelled: false,
            start_date: None,
            stop_date: 1_700_000_000.5,
            subtasks: Vec::new(),
        }
    }

    #[test]
    fn test_named_tags_skips_placeholder() {
        let task = task_with_tags(vec![
            Some("work".to_string()),
            None,
            Some(String::new()),
            Some("urgent".to_string()),
        ]);

        let tags: Vec<_> = task.named_tags().collect();
        assert_eq!(tags, vec!["work", "urgent"]);
        assert_eq!(task.tags.len(), 4);
    }

    #[test]
    fn test_heading_prefers_project() {
        let mut task = task_with_tags(vec![None]);
        assert_eq!(task.heading(), Some("Home"));

        task.project = Some("Renovation".to_string());
        assert_eq!(task.heading(), Some("Renovation"));
    }

    #[test]
    fn test_watermark_advances_to_day_start() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        // 2024-03-10 15:30 at +02:00
        let now = tz.with_ymd_and_hms(2024, 3, 10, 15, 30, 0).unwrap();
        let expected = tz.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap().timestamp();

        let next = Watermark::ZERO.advanced_to_day_start(&now);
        assert!((next.as_secs() - expected as f64).abs() < f64::EPSILON);
    }

    /// +01:00 that skips 00:00-01:00 on 2024-03-31, like zones with DST at midnight.
    #[derive(Debug, Clone, Copy)]
    struct MidnightGap;

    impl TimeZone for MidnightGap {
        type Offset = FixedOffset;

        fn from_offset(_offset: &FixedOffset) -> Self {
            Self
        }

        fn offset_from_local_date(&self, _local: &chrono::NaiveDate) -> chrono::LocalResult<FixedOffset> {
            chrono::LocalResult::Single(Self::offset())
        }

        fn offset_from_local_datetime(
            &self,
            local: &chrono::NaiveDateTime,
        ) -> chrono::LocalResult<FixedOffset> {
            let gap_start = chrono::NaiveDate::from_ymd_opt(2024, 3, 31)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap();
            if *local >= gap_start && *local < gap_start + Duration::hours(1) {
                chrono::LocalResult::None
            } else {
                chrono::LocalResult::Single(Self::offset())
            }
        }

        fn offset_from_utc_date(&self, _utc: &chrono::NaiveDate) -> FixedOffset {
            Self::offset()
        }

        fn offset_from_utc_datetime(&self, _utc: &chrono::NaiveDateTime) -> FixedOffset {
            Self::offset()
        }
    }

    impl MidnightGap {
        fn offset() -> FixedOffset {
            FixedOffset::east_opt(3600).unwrap()
        }
    }

    #[test]
    fn test_watermark_day_start_when_midnight_is_skipped() {
        let now = MidnightGap
            .from_local_datetime(
                &chrono::NaiveDate::from_ymd_opt(2024, 3, 31)
                    .unwrap()
                    .and_hms_opt(15, 0, 0)
                    .unwrap(),
            )
            .unwrap();
        let one_am = FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 31, 1, 0, 0)
            .unwrap()
            .timestamp();

        let next = Watermark::ZERO.advanced_to_day_start(&now);
        assert!((next.as_secs() - one_am as f64).abs() < f64::EPSILON);
    }

    #[test]
    fn test_watermark_never_moves_backwards() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        let ahead = Watermark::from_secs(now.timestamp() as f64 + 3600.0);

        assert_eq!(ahead.advanced_to_day_start(&now), ahead);
    }

    #[test]
    fn test_completed_at_keeps_fraction() {
        let task = task_with_tags(vec![None]);
        let at = task.completed_at(&Utc).unwrap();
        assert_eq!(at.timestamp(), 1_700_000_000);
        assert_eq!(at.timestamp_subsec_millis(), 500);
    }
}
