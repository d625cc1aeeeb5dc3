//! Merge flat logbook rows into nested tasks.

use std::collections::HashMap;

use super::types::{ChecklistRow, Subtask, Task, TaskRow, STATUS_CANCELLED};

/// Fold task/tag rows into one [`Task`] per uuid and attach checklist items.
///
/// Tasks come back in the order their uuid first appears in `task_rows`.
/// Each row contributes one entry to its task's tag list, so an untagged task
/// carries a single `None`. Checklist rows whose task is not among
/// `task_rows` are dropped.
#[must_use]
pub fn build_tasks(task_rows: &[TaskRow], checklist_rows: &[ChecklistRow]) -> Vec<Task> {
    let mut tasks: Vec<Task> = Vec::new();
    let mut by_uuid: HashMap<&str, usize> = HashMap::with_capacity(task_rows.len());

    for row in task_rows {
        if let Some(&idx) = by_uuid.get(row.uuid.as_str()) {
            tasks[idx].tags.push(row.tag.clone());
        } else {
            by_uuid.insert(row.uuid.as_str(), tasks.len());
            tasks.push(task_from_row(row));
        }
    }

    for item in checklist_rows {
        let Some(&idx) = by_uuid.get(item.task_id.as_str()) else {
            continue;
        };
        tasks[idx].subtasks.push(Subtask {
            title: item.title.trim_end().to_string(),
            completed: item.stop_date.is_some(),
        });
    }

    tasks
}

fn task_from_row(row: &TaskRow) -> Task {
    Task {
        uuid: row.uuid.clone(),
        title: row.title.as_deref().unwrap_or_default().trim_end().to_string(),
        notes: row.notes.clone().unwrap_or_default(),
        area: row.area.clone(),
        project: row.project.clone(),
        tags: vec![row.tag.clone()],
        cancelled: row.status == Some(STATUS_CANCELLED),
        start_date: row.start_date,
        stop_date: row.stop_date,
        subtasks: Vec::new(),
    }
}
