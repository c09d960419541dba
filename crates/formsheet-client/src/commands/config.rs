//! Configuration commands.

use std::path::Path;

use crate::config::Settings;
use crate::error::{ClientError, ClientResult};

/// Dump the current settings to stdout.
pub fn dump(settings: &Settings, path: &Path) -> ClientResult<()> {
    let toml_str = toml::to_string_pretty(settings)
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))?;
    println!("# config.toml ({})", path.display());
    println!("{}", toml_str);
    Ok(())
}

/// Show the settings file path.
pub fn path(path: &Path) -> ClientResult<()> {
    println!("config: {}", path.display());
    Ok(())
}
