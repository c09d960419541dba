//! One-time interactive acquisition of a credential.
//!
//! The authorization-code grant needs a human to visit a URL and hand back a
//! code. How the code comes back is behind [`AuthCodeSource`]: the CLI reads
//! it from the console, a web host could receive it on a callback instead.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use formsheet_core::Clock;
use tokio::io::AsyncBufReadExt as _;
use tracing::{info, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::credential::Credential;
use crate::error::{Error, Result};
use crate::oauth::OAuthClient;

/// A boxed future, used to keep [`AuthCodeSource`] object-safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Capability to obtain an authorization code from the resource owner.
pub trait AuthCodeSource: Send + Sync + fmt::Debug {
    /// Presents `auth_url` to the resource owner and resolves to the code they
    /// were given.
    fn obtain_authorization_code<'a>(&'a self, auth_url: &'a Url) -> BoxFuture<'a, Result<String>>;
}

/// Prints the URL on stderr and reads the code from stdin.
#[derive(Debug, Clone, Default)]
pub struct ConsoleCodeSource {
    open_browser: bool,
}

impl ConsoleCodeSource {
    /// Creates a console source that only prints the URL.
    pub fn new() -> Self {
        Self::default()
    }

    /// Also tries to open the URL in the default browser.
    pub fn with_browser(mut self, open_browser: bool) -> Self {
        self.open_browser = open_browser;
        self
    }
}

impl AuthCodeSource for ConsoleCodeSource {
    fn obtain_authorization_code<'a>(&'a self, auth_url: &'a Url) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            eprintln!(
                "\nGo to the following link in your browser, then type the authorization code:\n\n{}\n",
                auth_url
            );
            if self.open_browser
                && let Err(e) = open::that(auth_url.as_str())
            {
                warn!("failed to open browser: {}", e);
            }

            let mut line = String::new();
            tokio::io::BufReader::new(tokio::io::stdin())
                .read_line(&mut line)
                .await
                .map_err(|e| Error::auth("unable to read authorization code").with_source(e))?;

            let code = line.trim();
            if code.is_empty() {
                return Err(Error::auth("no authorization code was entered"));
            }
            Ok(code.to_string())
        })
    }
}

/// Hands out a code supplied up front.
#[derive(Debug, Clone)]
pub struct StaticCodeSource {
    code: String,
}

impl StaticCodeSource {
    /// Creates a source that always answers `code`.
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

impl AuthCodeSource for StaticCodeSource {
    fn obtain_authorization_code<'a>(&'a self, _auth_url: &'a Url) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move { Ok(self.code.clone()) })
    }
}

/// Runs the authorization-code grant for an identity with no credential.
#[derive(Debug, Clone)]
pub struct Acquirer {
    oauth: OAuthClient,
    code_source: Arc<dyn AuthCodeSource>,
    clock: Arc<dyn Clock>,
}

impl Acquirer {
    /// Creates an acquirer.
    pub fn new(
        oauth: OAuthClient,
        code_source: Arc<dyn AuthCodeSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            oauth,
            code_source,
            clock,
        }
    }

    /// Obtains a brand-new credential. Nothing is retried: on failure the
    /// caller starts over.
    pub async fn acquire(&self, config: &ClientConfig) -> Result<Credential> {
        let auth_url = config
            .validate()
            .and_then(|()| OAuthClient::authorization_url(config))
            .map_err(|e| Error::auth("malformed client configuration").with_source(e))?;

        info!(scope = %config.scope, "requesting authorization from resource owner");
        let code = self.code_source.obtain_authorization_code(&auth_url).await?;

        let response = self.oauth.exchange_code(config, &code).await?;
        let lifetime = response.lifetime_secs()?;
        let refresh_token = response
            .refresh_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                Error::auth(
                    "authorization server issued no refresh token; revoke the app's access and authorize again",
                )
            })?;

        info!(scope = %config.scope, "obtained initial credential");
        Ok(Credential::from_token_response(
            response.access_token,
            refresh_token,
            lifetime,
            response.token_type,
            self.clock.now(),
        ))
    }
}
