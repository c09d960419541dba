//! Spreadsheet glue for the formsheet action.
//!
//! [`SheetAction`] turns a form into a public Google spreadsheet and appends
//! one row per response. Every call goes through a
//! [`formsheet_auth::CredentialManager`]; nothing here handles tokens.

pub mod action;
pub mod drive;
mod response;
pub mod sheets;

pub use action::{SheetAction, SheetLink, DRIVE_API, SHEETS_API};
pub use drive::{DriveClient, DEFAULT_DRIVE_BASE};
pub use sheets::{SheetsClient, Spreadsheet, DEFAULT_SHEETS_BASE};
