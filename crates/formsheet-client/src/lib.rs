//! formsheet command-line interface.
//!
//! Authorizes form actions against Google, inspects their stored
//! credentials and drives the spreadsheet action by hand.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

pub use cli::Cli;
pub use error::{ClientError, ClientResult};
