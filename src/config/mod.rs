//! Configuration management.
//!
//! This module resolves the three locations a sync needs and loads settings:
//!
//! - **Settings file**: `~/.things-logbook/config.json` (see [`settings`])
//! - **Things database**: the `main.sqlite` inside the Things 3 group container
//! - **Vault**: the notes directory daily notes are written into
//!
//! Each location can be overridden by a CLI flag or environment variable,
//! which always wins over the settings file.

pub mod settings;

pub use settings::{Settings, SettingsStore};

use crate::error::{Error, Result};

use std::path::{Path, PathBuf};
use tracing::debug;

/// Things 3 group container, relative to the home directory.
const THINGS_GROUP_CONTAINER: &str =
    "Library/Group Containers/JLMPQHK86H.com.culturedcode.ThingsMac";

/// Database bundle inside the container (or inside a `ThingsData-*` folder).
const THINGS_DATABASE_BUNDLE: &str = "Things Database.thingsdatabase/main.sqlite";

/// Get the global Things Logbook directory location.
#[must_use]
pub fn global_logbook_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".things-logbook"))
}

/// Resolve the settings file path.
///
/// Priority:
/// 1. If `explicit_path` is provided (`--config` / `LOGBOOK_CONFIG`), use it
/// 2. Global location: `~/.things-logbook/config.json`
///
/// # Errors
///
/// Returns [`Error::Config`] if the home directory cannot be determined.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit_path {
        return Ok(path.to_path_buf());
    }

    global_logbook_dir()
        .map(|dir| dir.join("config.json"))
        .ok_or_else(|| Error::Config("Could not determine home directory".into()))
}

/// Locate the Things database under the default group container.
///
/// Things 3.15+ keeps the database inside a `ThingsData-XXXXX` folder; older
/// versions keep it directly in the container. When neither exists the legacy
/// path is returned so error messages can point at it.
#[must_use]
pub fn default_things_db_path() -> Option<PathBuf> {
    let container = directories::BaseDirs::new()?
        .home_dir()
        .join(THINGS_GROUP_CONTAINER);
    Some(find_things_db_in(&container))
}

fn find_things_db_in(container: &Path) -> PathBuf {
    let legacy = container.join(THINGS_DATABASE_BUNDLE);
    if legacy.exists() {
        return legacy;
    }

    if let Ok(entries) = std::fs::read_dir(container) {
        let mut candidates: Vec<PathBuf> = entries
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().starts_with("ThingsData-"))
            .map(|entry| entry.path().join(THINGS_DATABASE_BUNDLE))
            .filter(|path| path.exists())
            .collect();
        candidates.sort();
        if let Some(found) = candidates.into_iter().next() {
            return found;
        }
    }

    legacy
}

/// Resolve the Things database path.
///
/// Priority:
/// 1. `explicit_path` (`--things-db` / `THINGS_DB`)
/// 2. `thingsDbPath` setting
/// 3. The default group container location
///
/// # Errors
///
/// Returns [`Error::ThingsDbNotFound`] if the resolved file does not exist and
/// [`Error::ThingsDbUnresolved`] if no location can be determined.
pub fn resolve_things_db(explicit_path: Option<&Path>, settings: &Settings) -> Result<PathBuf> {
    let path = explicit_path
        .map(Path::to_path_buf)
        .or_else(|| settings.things_db_path.clone())
        .or_else(default_things_db_path)
        .ok_or(Error::ThingsDbUnresolved)?;

    let path = expand_home(&path);
    if !path.exists() {
        return Err(Error::ThingsDbNotFound { path });
    }

    debug!(path = %path.display(), "Resolved Things database");
    Ok(path)
}

/// Resolve the vault directory.
///
/// Priority:
/// 1. `explicit_path` (`--vault` / `LOGBOOK_VAULT`)
/// 2. `vaultPath` setting
///
/// # Errors
///
/// Returns [`Error::VaultNotConfigured`] if neither is set.
pub fn resolve_vault(explicit_path: Option<&Path>, settings: &Settings) -> Result<PathBuf> {
    explicit_path
        .map(Path::to_path_buf)
        .or_else(|| settings.vault_path.clone())
        .map(|path| expand_home(&path))
        .ok_or(Error::VaultNotConfigured)
}

/// Expand a leading `~` to the home directory.
#[must_use]
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };

    match directories::BaseDirs::new() {
        Some(base) => base.home_dir().join(rest),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_config_path_with_explicit() {
        let explicit = PathBuf::from("/custom/config.json");
        assert_eq!(resolve_config_path(Some(explicit.as_path())).unwrap(), explicit);
    }

    #[test]
    fn test_resolve_config_path_uses_global() {
        let path = resolve_config_path(None).unwrap();
        assert!(path.ends_with(".things-logbook/config.json"));
    }

    #[test]
    fn test_find_things_db_prefers_legacy_location() {
        let dir = TempDir::new().unwrap();
        let legacy = dir.path().join(THINGS_DATABASE_BUNDLE);
        fs::create_dir_all(legacy.parent().unwrap()).unwrap();
        fs::write(&legacy, "").unwrap();

        assert_eq!(find_things_db_in(dir.path()), legacy);
    }

    #[test]
    fn test_find_things_db_in_things_data_folder() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("ThingsData-ABC12").join(THINGS_DATABASE_BUNDLE);
        fs::create_dir_all(nested.parent().unwrap()).unwrap();
        fs::write(&nested, "").unwrap();

        assert_eq!(find_things_db_in(dir.path()), nested);
    }

    #[test]
    fn test_find_things_db_falls_back_to_legacy_path() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            find_things_db_in(dir.path()),
            dir.path().join(THINGS_DATABASE_BUNDLE)
        );
    }

    #[test]
    fn test_resolve_things_db_explicit_wins() {
        let dir = TempDir::new().unwrap();
        let explicit = dir.path().join("main.sqlite");
        fs::write(&explicit, "").unwrap();
        let mut settings = Settings::default();
        settings.things_db_path = Some(PathBuf::from("/elsewhere/main.sqlite"));

        assert_eq!(resolve_things_db(Some(explicit.as_path()), &settings).unwrap(), explicit);
    }

    #[test]
    fn test_resolve_things_db_missing_file() {
        let mut settings = Settings::default();
        settings.things_db_path = Some(PathBuf::from("/definitely/not/here.sqlite"));

        let err = resolve_things_db(None, &settings).unwrap_err();
        assert!(matches!(err, Error::ThingsDbNotFound { .. }));
    }

    #[test]
    fn test_resolve_vault() {
        let mut settings = Settings::default();
        assert!(matches!(
            resolve_vault(None, &settings),
            Err(Error::VaultNotConfigured)
        ));

        settings.vault_path = Some(PathBuf::from("/vault"));
        assert_eq!(resolve_vault(None, &settings).unwrap(), PathBuf::from("/vault"));

        let flag = PathBuf::from("/other");
        assert_eq!(resolve_vault(Some(flag.as_path()), &settings).unwrap(), flag);
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home(Path::new("/abs/path")), PathBuf::from("/abs/path"));

        let expanded = expand_home(Path::new("~/notes"));
        assert!(expanded.ends_with("notes"));
        assert!(!expanded.starts_with("~"));
    }
}
