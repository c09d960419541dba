//! Non-interactive renewal of a stale access token.

use std::sync::Arc;

use formsheet_core::Clock;
use tracing::info;

use crate::config::ClientConfig;
use crate::credential::{expiry_after, Credential};
use crate::error::{Error, Result};
use crate::oauth::OAuthClient;

/// Exchanges a refresh token for a new access token.
#[derive(Debug, Clone)]
pub struct Refresher {
    oauth: OAuthClient,
    clock: Arc<dyn Clock>,
}

impl Refresher {
    /// Creates a refresher.
    pub fn new(oauth: OAuthClient, clock: Arc<dyn Clock>) -> Self {
        Self { oauth, clock }
    }

    /// Returns `credential` with a new access token and expiry.
    ///
    /// The refresh token is kept as is, even if the server sends a new one.
    /// Transport failures are returned, never retried.
    pub async fn refresh(&self, config: &ClientConfig, credential: &Credential) -> Result<Credential> {
        if credential.refresh_token.is_empty() {
            return Err(Error::auth(
                "stored credential has no refresh token; authorize again",
            ));
        }

        info!(scope = %config.scope, "renewing access token");
        let response = self.oauth.refresh(config, &credential.refresh_token).await?;
        let lifetime = response.lifetime_secs()?;
        let expiry = expiry_after(self.clock.now(), lifetime)
            .ok_or_else(|| Error::auth("token response has out-of-range expires_in"))?;

        let mut renewed = credential.clone();
        renewed.access_token = response.access_token;
        renewed.expiry = expiry;
        if let Some(token_type) = response.token_type.filter(|t| !t.is_empty()) {
            renewed.token_type = token_type;
        }

        info!(scope = %config.scope, expiry = %renewed.expiry, "access token renewed");
        Ok(renewed)
    }
}
