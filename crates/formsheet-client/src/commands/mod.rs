//! Subcommand implementations.

pub mod auth;
pub mod config;
pub mod sheet;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use formsheet_auth::{
    ClientConfig, ConsoleCodeSource, CredentialManager, FileTokenStore, Identity,
};
use formsheet_sheets::SheetAction;

use crate::cli::{Api, Command, ConfigAction};
use crate::config::Settings;
use crate::error::{ClientError, ClientResult};

/// Everything a command needs: settings plus the shared credential manager.
#[derive(Debug)]
pub struct Context {
    settings: Settings,
    store: FileTokenStore,
    manager: Arc<CredentialManager>,
}

impl Context {
    /// Builds the credential manager described by `settings`.
    ///
    /// Tokens are stored next to each action's client file.
    pub fn new(settings: Settings) -> ClientResult<Self> {
        let store = FileTokenStore::new(&settings.actions_dir);
        let manager = CredentialManager::builder()
            .store(store.clone())
            .code_source(ConsoleCodeSource::new().with_browser(settings.open_browser))
            .timeout(settings.timeout())
            .expiry_margin(settings.expiry_margin().map_err(ClientError::Config)?)
            .build()?;

        Ok(Self {
            settings,
            store,
            manager: Arc::new(manager),
        })
    }

    /// The loaded settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The shared credential manager.
    pub fn manager(&self) -> &CredentialManager {
        &self.manager
    }

    /// Path of `action`'s OAuth client file, in the directory that also
    /// holds its tokens.
    pub fn credentials_path(&self, action: &str, api: Api) -> ClientResult<PathBuf> {
        let dir = self.store.action_dir(&Self::identity(action, api))?;
        Ok(dir.join("credentials.json"))
    }

    /// Reads `action`'s client file for `api`'s scope.
    pub fn client_config(&self, action: &str, api: Api) -> ClientResult<ClientConfig> {
        let path = self.credentials_path(action, api)?;
        if !path.exists() {
            return Err(ClientError::Config(format!(
                "no client file for action {:?}; expected {}",
                action,
                path.display()
            )));
        }
        Ok(ClientConfig::from_file(&path, api.oauth_scope())?)
    }

    /// Credential identity of `action` for `api`.
    pub fn identity(action: &str, api: Api) -> Identity {
        Identity::new(action, api.label())
    }

    /// The spreadsheet action for `action`, honoring API base overrides.
    pub fn sheet_action(&self, action: &str) -> ClientResult<SheetAction> {
        let mut sheet_action = SheetAction::new(
            self.manager.clone(),
            action,
            self.client_config(action, Api::Sheets)?,
            self.client_config(action, Api::Drive)?,
        );
        if let Some(ref base) = self.settings.api.sheets_base {
            sheet_action = sheet_action.with_sheets_base(base);
        }
        if let Some(ref base) = self.settings.api.drive_base {
            sheet_action = sheet_action.with_drive_base(base);
        }
        Ok(sheet_action)
    }
}

/// Runs `command`. Configuration commands never touch credentials.
pub async fn execute(command: Command, settings: Settings, config_path: &Path) -> ClientResult<()> {
    match command {
        Command::Config { action } => match action {
            ConfigAction::Path => config::path(config_path),
            ConfigAction::Dump => config::dump(&settings, config_path),
        },
        Command::Auth { action, api } => auth::authorize(&Context::new(settings)?, &action, api).await,
        Command::Status { action } => auth::status(&Context::new(settings)?, &action).await,
        Command::Refresh { action, api } => auth::refresh(&Context::new(settings)?, &action, api).await,
        Command::Init {
            action,
            title,
            questions,
            json,
        } => {
            let ctx = Context::new(settings)?;
            sheet::init(&ctx, &action, &title, &questions, json).await
        }
        Command::Record {
            action,
            sheet_id,
            index,
            user,
            answers,
        } => {
            let ctx = Context::new(settings)?;
            sheet::record(&ctx, &action, &sheet_id, index, &user, &answers).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formsheet_auth::{scopes, ErrorKind};

    const CLIENT_FILE: &str = r#"{
  "installed": {
    "client_id": "client-1.apps.googleusercontent.com",
    "client_secret": "secret-1",
    "redirect_uris": ["urn:ietf:wg:oauth:2.0:oob"]
  }
}"#;

    fn context(dir: &std::path::Path) -> Context {
        let settings = Settings {
            actions_dir: dir.to_path_buf(),
            ..Settings::default()
        };
        Context::new(settings).unwrap()
    }

    #[test]
    fn client_config_uses_api_scope() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("formA")).unwrap();
        std::fs::write(dir.path().join("formA/credentials.json"), CLIENT_FILE).unwrap();

        let ctx = context(dir.path());
        let sheets = ctx.client_config("formA", Api::Sheets).unwrap();
        let drive = ctx.client_config("formA", Api::Drive).unwrap();
        assert_eq!(sheets.scope, scopes::SPREADSHEETS);
        assert_eq!(drive.scope, scopes::DRIVE);
        assert_eq!(sheets.client_id, drive.client_id);
    }

    #[test]
    fn missing_client_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = context(dir.path())
            .client_config("formB", Api::Sheets)
            .unwrap_err();
        assert!(err.to_string().contains("credentials.json"));
    }

    #[test]
    fn client_file_sits_beside_encoded_token_records() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());

        let path = ctx.credentials_path("survey 2024", Api::Sheets).unwrap();
        assert_eq!(path, dir.path().join("survey%202024").join("credentials.json"));

        let store = FileTokenStore::new(dir.path());
        let record = store
            .path_for(&Context::identity("survey 2024", Api::Sheets))
            .unwrap();
        assert_eq!(record.parent(), path.parent());
    }

    #[test]
    fn traversing_action_is_rejected_before_reading() {
        let dir = tempfile::tempdir().unwrap();
        let actions = dir.path().join("actions");
        std::fs::create_dir_all(&actions).unwrap();
        // A client file one level up must never be picked up.
        std::fs::write(dir.path().join("credentials.json"), CLIENT_FILE).unwrap();

        let err = context(&actions).client_config("..", Api::Sheets).unwrap_err();
        match err {
            ClientError::Credential(e) => assert_eq!(e.kind(), ErrorKind::Config),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn out_of_range_margin_is_config_error() {
        let settings = Settings {
            expiry_margin_secs: 10_000_000,
            ..Settings::default()
        };
        let err = Context::new(settings).unwrap_err();
        assert!(matches!(err, ClientError::Config(ref msg) if msg.contains("expiry_margin_secs")));
    }

    fn unusable_settings(dir: &std::path::Path) -> Settings {
        Settings {
            actions_dir: dir.to_path_buf(),
            expiry_margin_secs: 10_000_000,
            ..Settings::default()
        }
    }

    #[tokio::test]
    async fn config_commands_run_without_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        for action in [ConfigAction::Path, ConfigAction::Dump] {
            let command = Command::Config { action };
            execute(command, unusable_settings(dir.path()), &config_path)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn credential_commands_build_the_manager() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        let command = Command::Status {
            action: "formA".into(),
        };
        let err = execute(command, unusable_settings(dir.path()), &config_path)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Config(ref msg) if msg.contains("expiry_margin_secs")));
    }

    #[tokio::test]
    async fn status_of_a_new_action_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            actions_dir: dir.path().to_path_buf(),
            ..Settings::default()
        };
        let command = Command::Status {
            action: "formA".into(),
        };
        execute(command, settings, &dir.path().join("config.toml"))
            .await
            .unwrap();
    }

    #[test]
    fn identities_are_per_api() {
        assert_eq!(Context::identity("formA", Api::Sheets).to_string(), "formA/sheets");
        assert_eq!(Context::identity("formA", Api::Drive).to_string(), "formA/drive");
    }
}
