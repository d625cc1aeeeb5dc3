//! Error types for Things Logbook.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=things db, 3=fetch, 4=validation, etc.)
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers

use std::path::PathBuf;
use thiserror::Error;

use crate::things::FetchError;

/// Result type alias for Things Logbook operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Things database (exit 2)
    ThingsDbNotFound,
    DatabaseError,

    // Fetch (exit 3)
    TaskFetchFailed,
    ChecklistFetchFailed,

    // Validation (exit 4)
    InvalidArgument,
    UnknownSetting,

    // Config (exit 7)
    ConfigError,
    VaultNotConfigured,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::ThingsDbNotFound => "THINGS_DB_NOT_FOUND",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::TaskFetchFailed => "TASK_FETCH_FAILED",
            Self::ChecklistFetchFailed => "CHECKLIST_FETCH_FAILED",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::UnknownSetting => "UNKNOWN_SETTING",
            Self::ConfigError => "CONFIG_ERROR",
            Self::VaultNotConfigured => "VAULT_NOT_CONFIGURED",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-8).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::ThingsDbNotFound | Self::DatabaseError => 2,
            Self::TaskFetchFailed | Self::ChecklistFetchFailed => 3,
            Self::InvalidArgument | Self::UnknownSetting => 4,
            Self::ConfigError | Self::VaultNotConfigured => 7,
            Self::IoError | Self::JsonError => 8,
        }
    }

    /// Whether the next scheduled pass may succeed without user action.
    ///
    /// Fetch failures are usually a busy or locked Things database.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TaskFetchFailed | Self::ChecklistFetchFailed | Self::DatabaseError | Self::IoError
        )
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in Things Logbook operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Things database not found at {path}")]
    ThingsDbNotFound { path: PathBuf },

    #[error("Things database location could not be determined")]
    ThingsDbUnresolved,

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown setting: {key}")]
    UnknownSetting { key: String },

    #[error("No vault configured")]
    VaultNotConfigured,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::ThingsDbNotFound { .. } | Self::ThingsDbUnresolved => ErrorCode::ThingsDbNotFound,
            Self::Fetch(e) => match e.table {
                crate::things::Table::Tasks => ErrorCode::TaskFetchFailed,
                crate::things::Table::ChecklistItems => ErrorCode::ChecklistFetchFailed,
            },
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::UnknownSetting { .. } => ErrorCode::UnknownSetting,
            Self::VaultNotConfigured => ErrorCode::VaultNotConfigured,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::ThingsDbNotFound { path } => Some(format!(
                "Is Things 3 installed? Nothing exists at {}.\n  \
                 Point at the database with `--things-db <path>` or \
                 `logbook config set thingsDbPath <path>`.",
                path.display()
            )),
            Self::ThingsDbUnresolved => Some(
                "Set THINGS_DB or run `logbook config set thingsDbPath <path>`".to_string(),
            ),
            Self::Fetch(e) => Some(format!(
                "Reading the Things database failed ({}). It may be locked while Things \
                 is writing; the next sync retries from the same point.",
                e.cause()
            )),
            Self::UnknownSetting { .. } => {
                Some("Use `logbook config show` to list the available settings.".to_string())
            }
            Self::VaultNotConfigured => Some(
                "Run `logbook config set vaultPath <dir>` or pass `--vault <dir>`".to_string(),
            ),
            Self::Database(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::InvalidArgument(_)
            | Self::Config(_)
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::things::Table;

    #[test]
    fn test_fetch_errors_have_distinct_codes() {
        let tasks = Error::from(FetchError::new(
            Table::Tasks,
            rusqlite::Error::InvalidQuery,
        ));
        let checklist = Error::from(FetchError::new(
            Table::ChecklistItems,
            rusqlite::Error::InvalidQuery,
        ));

        assert_eq!(tasks.error_code(), ErrorCode::TaskFetchFailed);
        assert_eq!(checklist.error_code(), ErrorCode::ChecklistFetchFailed);
        assert_eq!(tasks.to_string(), "fetch Tasks failed");
        assert_eq!(checklist.to_string(), "fetch Subtasks failed");
        assert!(tasks.error_code().is_retryable());
    }

    #[test]
    fn test_structured_json_includes_hint() {
        let err = Error::VaultNotConfigured;
        let json = err.to_structured_json();

        assert_eq!(json["error"]["code"], "VAULT_NOT_CONFIGURED");
        assert_eq!(json["error"]["exit_code"], 7);
        assert!(json["error"]["hint"].as_str().unwrap().contains("vaultPath"));
    }

    #[test]
    fn test_exit_codes_by_category() {
        assert_eq!(Error::ThingsDbUnresolved.exit_code(), 2);
        assert_eq!(Error::InvalidArgument("x".into()).exit_code(), 4);
        assert_eq!(Error::Config("x".into()).exit_code(), 7);
        assert_eq!(Error::Other("x".into()).exit_code(), 1);
    }
}
