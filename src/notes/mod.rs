//! Daily note writing.
//!
//! A sync pass hands each day's rendered Markdown to a [`NoteSink`] together
//! with the heading it belongs under. [`DailyNotes`] is the file-backed sink:
//! it edits `<vault>/<folder>/<date>.md`, replacing only the logbook section
//! and leaving the rest of the note alone.

use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Destination for rendered day sections.
pub trait NoteSink {
    /// Put `body` under `heading` in the note for `day`.
    ///
    /// # Errors
    ///
    /// Returns an error if the note cannot be read or written.
    fn write_section(&mut self, day: NaiveDate, heading: &str, body: &str) -> Result<()>;
}

/// Daily notes stored as Markdown files in a vault folder.
#[derive(Debug, Clone)]
pub struct DailyNotes {
    dir: PathBuf,
    format: String,
}

impl DailyNotes {
    /// Notes live in `vault/folder`, named with the `chrono` pattern `format`.
    #[must_use]
    pub fn new(vault: &Path, folder: &str, format: &str) -> Self {
        let folder = folder.trim_matches('/');
        let dir = if folder.is_empty() {
            vault.to_path_buf()
        } else {
            vault.join(folder)
        };
        Self {
            dir,
            format: format.to_string(),
        }
    }

    /// Path of the note for `day`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file name pattern is not a valid
    /// `chrono` format string.
    pub fn note_path(&self, day: NaiveDate) -> Result<PathBuf> {
        let mut name = String::new();
        write!(name, "{}", day.format(&self.format)).map_err(|_| {
            Error::Config(format!("Invalid daily note format '{}'", self.format))
        })?;
        Ok(self.dir.join(format!("{name}.md")))
    }
}

impl NoteSink for DailyNotes {
    fn write_section(&mut self, day: NaiveDate, heading: &str, body: &str) -> Result<()> {
        let path = self.note_path(day)?;

        let updated = match fs::read_to_string(&path) {
            Ok(existing) => splice_section(&existing, heading, body),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => new_note(heading, body),
            Err(e) => return Err(e.into()),
        };

        atomic_write(&path, &updated)?;
        info!(path = %path.display(), %day, "Updated daily note");
        Ok(())
    }
}

/// Sections collected in memory instead of written, for dry runs.
#[derive(Debug, Default)]
pub struct NotePreview {
    pub sections: Vec<(NaiveDate, String)>,
}

impl NoteSink for NotePreview {
    fn write_section(&mut self, day: NaiveDate, _heading: &str, body: &str) -> Result<()> {
        self.sections.push((day, body.to_string()));
        Ok(())
    }
}

fn new_note(heading: &str, body: &str) -> String {
    format!("{}\n\n{}\n", heading.trim(), body.trim_end_matches('\n'))
}

/// Replace the section under `heading` in `existing` with `body`.
///
/// The section runs from the line after the heading to the next heading of
/// the same or higher level, or the end of the note. A plain-text heading
/// counts as level 3. Headings inside fenced code blocks are ignored. If the heading is missing, the section is
/// appended at the end.
#[must_use]
pub fn splice_section(existing: &str, heading: &str, body: &str) -> String {
    let heading = heading.trim();
    let level = section_level(heading);
    let lines: Vec<&str> = existing.lines().collect();
    let body = body.trim_end_matches('\n');

    let Some(start) = find_heading(&lines, heading) else {
        let kept = existing.trim_end();
        if kept.is_empty() {
            return new_note(heading, body);
        }
        return format!("{kept}\n\n{}", new_note(heading, body));
    };

    let end = section_end(&lines, start + 1, level);

    let mut out = String::with_capacity(existing.len() + body.len());
    for line in &lines[..=start] {
        out.push_str(line);
        out.push('\n');
    }
    out.push('\n');
    out.push_str(body);
    out.push('\n');

    if end < lines.len() {
        out.push('\n');
        for line in &lines[end..] {
            out.push_str(line);
            out.push('\n');
        }
    }

    out
}

fn find_heading(lines: &[&str], heading: &str) -> Option<usize> {
    let mut in_fence = false;
    for (idx, line) in lines.iter().enumerate() {
        if is_fence(line) {
            in_fence = !in_fence;
            continue;
        }
        if !in_fence && line.trim() == heading {
            return Some(idx);
        }
    }
    None
}

/// Index of the first line at or after `from` that closes a section of `level`.
fn section_end(lines: &[&str], from: usize, level: usize) -> usize {
    let mut in_fence = false;
    for (idx, line) in lines.iter().enumerate().skip(from) {
        if is_fence(line) {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        let other = heading_level(line);
        if other > 0 && other <= level {
            return idx;
        }
    }
    lines.len()
}

/// Level a section under `heading` closes at.
///
/// Plain text has no level of its own; it is placed above the `####` group
/// headings the renderer writes so those stay inside the section.
pub(crate) fn section_level(heading: &str) -> usize {
    match heading_level(heading.trim()) {
        0 => 3,
        level => level,
    }
}

/// ATX heading level of `line`, or 0 if it is not a heading.
fn heading_level(line: &str) -> usize {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    if hashes == 0 || hashes > 6 {
        return 0;
    }
    match line[hashes..].chars().next() {
        None => hashes,
        Some(c) if c.is_whitespace() => hashes,
        Some(_) => 0,
    }
}

fn is_fence(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("```") || trimmed.starts_with("~~~")
}

/// Write content to a file atomically.
///
/// Writes to a sibling temp file, syncs it to disk, then renames it over
/// `path`. If any step fails the original file is untouched.
///
/// # Errors
///
/// Returns an error if any file operation fails.
pub fn atomic_write(path: &Path, content: &str) -> std::io::Result<()> {
    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    {
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(content.as_bytes())?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }

    fs::rename(&temp_path, path)?;
    debug!(path = %path.display(), bytes = content.len(), "Wrote file");

    Ok(())
}
