//! Client settings.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/formsheet/config.toml` by default. Every field is optional:
//!
//! ```toml
//! actions_dir = "./actions"
//! timeout_secs = 30
//! expiry_margin_secs = 60
//! open_browser = true
//!
//! [api]
//! sheets_base = "https://sheets.googleapis.com"
//! drive_base = "https://www.googleapis.com"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use formsheet_auth::manager::MAX_EXPIRY_MARGIN_SECS;
use serde::{Deserialize, Serialize};

/// Settings for the formsheet client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding one subdirectory per action, with its
    /// `credentials.json` client file and stored tokens.
    pub actions_dir: PathBuf,

    /// Timeout for each token endpoint exchange, in seconds.
    pub timeout_secs: u64,

    /// Credentials expiring within this many seconds are refreshed early.
    /// At most one day.
    pub expiry_margin_secs: u64,

    /// Open the authorization URL in the default browser.
    pub open_browser: bool,

    /// API endpoint overrides.
    pub api: ApiSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            actions_dir: PathBuf::from("./actions"),
            timeout_secs: 30,
            expiry_margin_secs: 60,
            open_browser: false,
            api: ApiSettings::default(),
        }
    }
}

/// Base URL overrides for the Google APIs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Sheets API base URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheets_base: Option<String>,

    /// Drive API base URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drive_base: Option<String>,
}

impl Settings {
    /// Loads settings from the default path, or defaults if it does not exist.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads settings from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("failed to read config: {}", e))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse config: {}", e))
    }

    /// Returns the default settings file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("formsheet")
    }

    /// Token endpoint timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Expiry margin, rejected when above the manager's limit.
    pub fn expiry_margin(&self) -> Result<chrono::Duration, String> {
        i64::try_from(self.expiry_margin_secs)
            .ok()
            .filter(|secs| *secs <= MAX_EXPIRY_MARGIN_SECS)
            .and_then(chrono::Duration::try_seconds)
            .ok_or_else(|| {
                format!(
                    "expiry_margin_secs must be at most {}, got {}",
                    MAX_EXPIRY_MARGIN_SECS, self.expiry_margin_secs
                )
            })
    }
}
