//! OAuth2 credential lifecycle for the formsheet action plugin.
//!
//! Downstream API clients never touch tokens. They ask a
//! [`CredentialManager`] for an [`AuthenticatedTransport`] and send requests
//! through it:
//!
//! ```text
//!                 get_transport(identity, config)
//!                              │
//!                              ▼
//!                   ┌─────────────────────┐
//!                   │  CredentialManager  │  one lock per Identity
//!                   └──┬───────┬───────┬──┘
//!           load/save  │       │       │  stale
//!                      ▼       │       ▼
//!              ┌────────────┐  │  ┌───────────┐
//!              │ TokenStore │  │  │ Refresher │──► token endpoint
//!              └────────────┘  │  └───────────┘
//!                              │ missing
//!                              ▼
//!                       ┌──────────┐
//!                       │ Acquirer │──► AuthCodeSource + token endpoint
//!                       └──────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use formsheet_auth::{ClientConfig, CredentialManager, FileTokenStore, Identity, scopes};
//!
//! let config = ClientConfig::from_file("actions/survey/credentials.json", scopes::SPREADSHEETS)?;
//! let manager = CredentialManager::builder()
//!     .store(FileTokenStore::new("actions"))
//!     .build()?;
//!
//! let transport = manager
//!     .get_transport(&Identity::new("survey", "sheets"), &config)
//!     .await?;
//! let response = transport.get("https://sheets.googleapis.com/v4/spreadsheets/ID").send().await?;
//! ```

pub mod acquire;
pub mod config;
pub mod credential;
pub mod error;
pub mod identity;
pub mod manager;
pub mod oauth;
pub mod refresh;
pub mod store;
pub mod transport;

pub use acquire::{Acquirer, AuthCodeSource, BoxFuture, ConsoleCodeSource, StaticCodeSource};
pub use config::{scopes, ClientConfig};
pub use credential::Credential;
pub use error::{Error, ErrorKind, Result};
pub use identity::Identity;
pub use manager::{CredentialManager, CredentialManagerBuilder, CredentialStatus};
pub use oauth::OAuthClient;
pub use refresh::Refresher;
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use transport::AuthenticatedTransport;
