//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use formsheet_auth::scopes;
use formsheet_sheets::{DRIVE_API, SHEETS_API};

/// formsheet - Google Sheets action for form responses
#[derive(Debug, Parser)]
#[command(name = "formsheet")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "FORMSHEET_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    /// Log JSON records, for running under a form-processing host
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Override the actions directory from the configuration file
    #[arg(long, global = true)]
    pub actions_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Authorize an action, prompting for a code if it has no credential
    Auth {
        /// Action name
        action: String,

        /// API to authorize
        #[arg(long, value_enum, default_value_t = Api::Sheets)]
        api: Api,
    },

    /// Show the stored credential state of an action
    Status {
        /// Action name
        action: String,
    },

    /// Refresh an action's access token now
    Refresh {
        /// Action name
        action: String,

        /// API to refresh
        #[arg(long, value_enum, default_value_t = Api::Sheets)]
        api: Api,
    },

    /// Create the response spreadsheet for a form
    Init {
        /// Action name
        action: String,

        /// Spreadsheet title
        #[arg(long)]
        title: String,

        /// Question title (can be repeated, in order)
        #[arg(long = "question", action = clap::ArgAction::Append)]
        questions: Vec<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Record one form response
    Record {
        /// Action name
        action: String,

        /// Spreadsheet identifier returned by `init`
        #[arg(long)]
        sheet_id: String,

        /// Number of responses recorded before this one
        #[arg(long)]
        index: usize,

        /// Responding user's identifier
        #[arg(long)]
        user: String,

        /// Answers, in question order
        answers: Vec<String>,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Show configuration file path
    Path,

    /// Dump current configuration
    Dump,
}

/// Google API an action talks to. Each has its own credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Api {
    /// Google Sheets
    Sheets,
    /// Google Drive
    Drive,
}

impl Api {
    /// Every API, in display order.
    pub const ALL: [Api; 2] = [Api::Sheets, Api::Drive];

    /// Scope label used in the credential identity.
    pub fn label(self) -> &'static str {
        match self {
            Self::Sheets => SHEETS_API,
            Self::Drive => DRIVE_API,
        }
    }

    /// OAuth scope requested for this API.
    pub fn oauth_scope(self) -> &'static str {
        match self {
            Self::Sheets => scopes::SPREADSHEETS,
            Self::Drive => scopes::DRIVE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_takes_trailing_answers() {
        let cli = Cli::try_parse_from([
            "formsheet", "record", "formA", "--sheet-id", "s1", "--index", "4", "--user", "u1",
            "yes", "blue",
        ])
        .unwrap();

        match cli.command {
            Command::Record {
                action,
                sheet_id,
                index,
                user,
                answers,
            } => {
                assert_eq!(action, "formA");
                assert_eq!(sheet_id, "s1");
                assert_eq!(index, 4);
                assert_eq!(user, "u1");
                assert_eq!(answers, ["yes", "blue"]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn init_collects_questions_in_order() {
        let cli = Cli::try_parse_from([
            "formsheet", "--debug", "init", "formA", "--title", "Survey", "--question", "Name?",
            "--question", "Age?",
        ])
        .unwrap();

        assert!(cli.debug);
        match cli.command {
            Command::Init { title, questions, json, .. } => {
                assert_eq!(title, "Survey");
                assert_eq!(questions, ["Name?", "Age?"]);
                assert!(!json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn api_defaults_to_sheets() {
        let cli = Cli::try_parse_from(["formsheet", "auth", "formA"]).unwrap();
        assert!(matches!(cli.command, Command::Auth { api: Api::Sheets, .. }));

        let cli = Cli::try_parse_from(["formsheet", "refresh", "formA", "--api", "drive"]).unwrap();
        assert!(matches!(cli.command, Command::Refresh { api: Api::Drive, .. }));
    }

    #[test]
    fn api_labels_and_scopes() {
        assert_eq!(Api::Sheets.label(), "sheets");
        assert_eq!(Api::Drive.oauth_scope(), scopes::DRIVE);
    }
}
