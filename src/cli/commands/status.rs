//! Status command implementation.

use crate::cli::Cli;
use crate::config::{resolve_config_path, SettingsStore};
use crate::error::Result;
use crate::sync::{get_sync_status, print_status};

/// Show the watermark, the resolved locations, and the pending backlog.
///
/// # Errors
///
/// Returns an error if the settings file cannot be read.
pub fn execute(cli: &Cli, json: bool) -> Result<()> {
    let config_path = resolve_config_path(cli.config.as_deref())?;
    let settings = SettingsStore::new(config_path.clone()).load()?;

    let status = get_sync_status(
        &config_path,
        &settings,
        cli.things_db.as_deref(),
        cli.vault.as_deref(),
    );

    if json {
        println!("{}", serde_json::to_string(&status)?);
    } else {
        print_status(&status);
    }

    Ok(())
}
