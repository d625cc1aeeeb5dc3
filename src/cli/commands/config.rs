//! Config command implementations.

use colored::Colorize;

use crate::cli::ConfigCommands;
use crate::config::{resolve_config_path, SettingsStore};
use crate::error::Result;
use std::path::Path;

/// Execute config commands.
///
/// # Errors
///
/// Returns an error if the settings file cannot be read or written, or if a
/// key or value is invalid.
pub fn execute(command: &ConfigCommands, config: Option<&Path>, json: bool) -> Result<()> {
    let store = SettingsStore::new(resolve_config_path(config)?);

    match command {
        ConfigCommands::Show => show(&store, json),
        ConfigCommands::Get { key } => get(&store, key, json),
        ConfigCommands::Set { key, value } => set(&store, key, value, json),
        ConfigCommands::Path => {
            if json {
                let output = serde_json::json!({ "path": store.path() });
                println!("{}", serde_json::to_string(&output)?);
            } else {
                println!("{}", store.path().display());
            }
            Ok(())
        }
    }
}

fn show(store: &SettingsStore, json: bool) -> Result<()> {
    let settings = store.load()?;

    if json {
        println!("{}", serde_json::to_string(&settings)?);
        return Ok(());
    }

    println!("{}", "Settings".bold().underline());
    println!("{}", store.path().display().to_string().dimmed());
    println!();
    for key in settings.keys()? {
        let value = settings.get(&key)?;
        println!("  {:<26} {}", key.cyan(), display_value(&value));
    }
    Ok(())
}

fn get(store: &SettingsStore, key: &str, json: bool) -> Result<()> {
    let value = store.load()?.get(key)?;

    if json {
        let output = serde_json::json!({ "key": key, "value": value });
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("{}", display_value(&value));
    }
    Ok(())
}

fn set(store: &SettingsStore, key: &str, raw: &str, json: bool) -> Result<()> {
    let mut settings = store.load()?;
    settings.set(key, raw)?;
    store.save(&settings)?;

    let value = settings.get(key)?;
    if json {
        let output = serde_json::json!({ "key": key, "value": value });
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("{} {key} = {}", "Set".green(), display_value(&value));
    }
    Ok(())
}

/// Strings print bare; everything else prints as JSON.
fn display_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "(unset)".to_string(),
        other => other.to_string(),
    }
}
