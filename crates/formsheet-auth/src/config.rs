//! OAuth client configuration.
//!
//! A [`ClientConfig`] is the registered application's identity at the
//! authorization server plus the scope being requested. It is read once from
//! the vendor client file (`credentials.json`) and never changes afterwards.

use std::path::Path;

use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};

/// Well-known API scopes.
pub mod scopes {
    /// Read/write access to spreadsheets.
    pub const SPREADSHEETS: &str = "https://www.googleapis.com/auth/spreadsheets";
    /// Full Drive access, needed to change sharing permissions.
    pub const DRIVE: &str = "https://www.googleapis.com/auth/drive";
}

const DEFAULT_AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

/// The registered application's OAuth identity for one scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// OAuth client ID.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Authorization endpoint the resource owner visits.
    pub auth_endpoint: String,
    /// Token endpoint for code and refresh exchanges.
    pub token_endpoint: String,
    /// Space-separated scopes to request.
    pub scope: String,
    /// Redirect URI registered for the client, if any.
    pub redirect_uri: Option<String>,
}

/// Layout of a vendor OAuth client file.
///
/// Either an `installed`/`web` section, or the fields at the root.
#[derive(Debug, Deserialize)]
struct ClientFile {
    installed: Option<ClientSection>,
    web: Option<ClientSection>,
    #[serde(flatten)]
    flat: FlatSection,
}

#[derive(Debug, Deserialize)]
struct ClientSection {
    client_id: String,
    client_secret: String,
    auth_uri: Option<String>,
    token_uri: Option<String>,
    #[serde(default)]
    redirect_uris: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct FlatSection {
    client_id: Option<String>,
    client_secret: Option<String>,
    auth_uri: Option<String>,
    token_uri: Option<String>,
    #[serde(default)]
    redirect_uris: Vec<String>,
}

impl FlatSection {
    fn into_section(self) -> Option<ClientSection> {
        Some(ClientSection {
            client_id: self.client_id?,
            client_secret: self.client_secret?,
            auth_uri: self.auth_uri,
            token_uri: self.token_uri,
            redirect_uris: self.redirect_uris,
        })
    }
}

impl ClientConfig {
    /// Creates a configuration against the default Google endpoints.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            auth_endpoint: DEFAULT_AUTH_ENDPOINT.to_string(),
            token_endpoint: DEFAULT_TOKEN_ENDPOINT.to_string(),
            scope: scope.into(),
            redirect_uri: None,
        }
    }

    /// Sets the authorization endpoint.
    pub fn with_auth_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.auth_endpoint = endpoint.into();
        self
    }

    /// Sets the token endpoint.
    pub fn with_token_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.token_endpoint = endpoint.into();
        self
    }

    /// Sets the redirect URI.
    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(uri.into());
        self
    }

    /// Returns a copy of this configuration requesting a different scope.
    ///
    /// One client file usually backs several identities (spreadsheets and
    /// drive for the same action).
    pub fn for_scope(&self, scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            ..self.clone()
        }
    }

    /// Loads the configuration from a vendor client file.
    pub fn from_file(path: impl AsRef<Path>, scope: impl Into<String>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "unable to read client secret file {}",
                path.display()
            ))
            .with_source(e)
        })?;
        Self::from_json(&content, scope)
    }

    /// Parses the configuration from a vendor client file's JSON.
    pub fn from_json(json: &str, scope: impl Into<String>) -> Result<Self> {
        let file: ClientFile = serde_json::from_str(json).map_err(|e| {
            Error::config("unable to parse client secret file to config").with_source(e)
        })?;

        let section = file
            .installed
            .or(file.web)
            .or_else(|| file.flat.into_section())
            .ok_or_else(|| {
                Error::config(
                    "client secret file must contain an 'installed' or 'web' section, \
                     or 'client_id'/'client_secret' at the root",
                )
            })?;

        let config = Self {
            client_id: section.client_id,
            client_secret: section.client_secret,
            auth_endpoint: section
                .auth_uri
                .unwrap_or_else(|| DEFAULT_AUTH_ENDPOINT.to_string()),
            token_endpoint: section
                .token_uri
                .unwrap_or_else(|| DEFAULT_TOKEN_ENDPOINT.to_string()),
            scope: scope.into(),
            redirect_uri: section.redirect_uris.into_iter().next(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks that every field the OAuth exchanges need is present and
    /// well-formed.
    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(Error::config("client_id is required"));
        }
        if self.client_secret.trim().is_empty() {
            return Err(Error::config("client_secret is required"));
        }
        if self.scope.trim().is_empty() {
            return Err(Error::config("at least one OAuth scope is required"));
        }
        parse_endpoint("auth_endpoint", &self.auth_endpoint)?;
        parse_endpoint("token_endpoint", &self.token_endpoint)?;
        Ok(())
    }
}

/// Parses an endpoint, accepting only absolute http(s) URLs.
pub(crate) fn parse_endpoint(name: &str, value: &str) -> Result<Url> {
    let url = Url::parse(value)
        .map_err(|e| Error::config(format!("{} is not a valid URL: {}", name, value)).with_source(e))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(Error::config(format!(
            "{} must use http or https, got '{}'",
            name, other
        ))),
    }
}
