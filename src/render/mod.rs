//! Markdown rendering of merged tasks.
//!
//! Tasks are grouped by the local day they were completed on, and each day is
//! rendered as one Markdown block: a checklist (optionally grouped under
//! project/area headings) or a table.

use std::collections::BTreeMap;

use chrono::{NaiveDate, TimeZone};

use crate::config::Settings;
use crate::notes::section_level;
use crate::things::Task;

const NOTE_INDENT: &str = "    ";
const GROUP_HEADING_LEVEL: usize = 4;
const MAX_HEADING_LEVEL: usize = 6;

/// Group tasks by the calendar day of their completion time in `tz`.
///
/// Days are ascending; tasks keep their merge order within a day. Tasks whose
/// timestamp cannot be represented are skipped.
#[must_use]
pub fn group_by_day<'a, Tz: TimeZone>(
    tasks: &'a [Task],
    tz: &Tz,
) -> BTreeMap<NaiveDate, Vec<&'a Task>> {
    let mut days: BTreeMap<NaiveDate, Vec<&Task>> = BTreeMap::new();
    for task in tasks {
        if let Some(at) = task.completed_at(tz) {
            days.entry(at.date_naive()).or_default().push(task);
        }
    }
    days
}

/// Render one day's tasks according to `settings`.
#[must_use]
pub fn render_day(tasks: &[&Task], settings: &Settings) -> String {
    if settings.render_as_table {
        let columns = table_columns(&settings.table_format_definition);
        if !columns.is_empty() {
            return render_table(tasks, &columns, settings);
        }
    }
    render_list(tasks, settings)
}

fn render_list(tasks: &[&Task], settings: &Settings) -> String {
    let mut out = String::new();

    if !settings.include_headers {
        for task in tasks {
            push_task(&mut out, task, settings);
        }
        return out;
    }

    let mut groups: Vec<(Option<&str>, Vec<&Task>)> = vec![(None, Vec::new())];
    for &task in tasks {
        let heading = task.heading();
        match groups.iter_mut().find(|(h, _)| *h == heading) {
            Some((_, members)) => members.push(task),
            None => groups.push((heading, vec![task])),
        }
    }

    for (heading, members) in groups {
        if members.is_empty() {
            continue;
        }
        if let Some(heading) = heading {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&group_heading(heading, settings));
            out.push('\n');
        }
        for task in members {
            push_task(&mut out, task, settings);
        }
    }

    out
}

/// Project/area heading one level below the section, at least `####`.
///
/// Below `######` there are no headings left, so the name is set in bold.
fn group_heading(name: &str, settings: &Settings) -> String {
    let level = (section_level(&settings.section_heading) + 1).max(GROUP_HEADING_LEVEL);
    if level > MAX_HEADING_LEVEL {
        format!("**{name}**")
    } else {
        format!("{} {name}", "#".repeat(level))
    }
}

fn push_task(out: &mut String, task: &Task, settings: &Settings) {
    out.push_str(&checkbox(task, settings));
    out.push(' ');
    out.push_str(&task.title);

    if settings.include_tags {
        for tag in task.named_tags() {
            out.push_str(" #");
            out.push_str(&tag_text(tag, settings));
        }
    }
    out.push('\n');

    if settings.does_sync_note_body && !task.notes.trim().is_empty() {
        for line in task.notes.trim_end().lines() {
            if line.trim().is_empty() {
                out.push('\n');
            } else {
                out.push_str(NOTE_INDENT);
                out.push_str(line.trim_end());
                out.push('\n');
            }
        }
    }

    if settings.render_checklists {
        for subtask in &task.subtasks {
            out.push_str(NOTE_INDENT);
            out.push_str(if subtask.completed { "- [x] " } else { "- [ ] " });
            out.push_str(&subtask.title);
            out.push('\n');
        }
    }
}

fn checkbox(task: &Task, settings: &Settings) -> String {
    if !settings.alternative_checkbox_prefix.is_empty() {
        return format!("- {}", settings.alternative_checkbox_prefix);
    }
    if task.cancelled {
        format!("- [{}]", settings.canceled_mark)
    } else {
        "- [x]".to_string()
    }
}

fn tag_text(tag: &str, settings: &Settings) -> String {
    let slug: String = tag
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .collect();
    format!("{}{slug}", settings.tag_prefix)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Title,
    Area,
    Tags,
}

impl Column {
    const fn header(self) -> &'static str {
        match self {
            Self::Title => "Task",
            Self::Area => "Area",
            Self::Tags => "Tags",
        }
    }
}

fn table_columns(definition: &str) -> Vec<Column> {
    definition
        .chars()
        .filter_map(|c| match c {
            'T' => Some(Column::Title),
            'A' => Some(Column::Area),
            'g' => Some(Column::Tags),
            _ => None,
        })
        .collect()
}

fn render_table(tasks: &[&Task], columns: &[Column], settings: &Settings) -> String {
    let mut out = String::new();

    let headers: Vec<&str> = columns.iter().map(|c| c.header()).collect();
    out.push_str(&table_row(&headers));
    out.push_str(&table_row(&vec!["---"; columns.len()]));

    for task in tasks {
        let cells: Vec<String> = columns
            .iter()
            .map(|column| match column {
                Column::Title => {
                    let mark = if task.cancelled {
                        settings.canceled_mark.as_str()
                    } else {
                        "x"
                    };
                    escape_cell(&format!("[{mark}] {}", task.title))
                }
                Column::Area => escape_cell(task.heading().unwrap_or_default()),
                Column::Tags => task
                    .named_tags()
                    .map(|tag| format!("#{}", tag_text(tag, settings)))
                    .collect::<Vec<_>>()
                    .join(" "),
            })
            .collect();
        let cells: Vec<&str> = cells.iter().map(String::as_str).collect();
        out.push_str(&table_row(&cells));
    }

    out
}

fn table_row(cells: &[&str]) -> String {
    format!("| {} |\n", cells.join(" | "))
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
