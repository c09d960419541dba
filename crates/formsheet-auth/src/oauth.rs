//! HTTP side of the OAuth2 authorization-code and refresh grants.
//!
//! [`OAuthClient`] only speaks to the authorization server. It turns
//! responses into [`TokenResponse`]s and leaves expiry arithmetic and
//! persistence to the acquirer and refresher.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::config::{parse_endpoint, ClientConfig};
use crate::error::{Error, Result};

/// Longest access token lifetime accepted from the token endpoint.
pub const MAX_LIFETIME_SECS: i64 = 366 * 24 * 60 * 60;

/// Response body of the token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// The new access token.
    pub access_token: String,
    /// Present on the code exchange; normally absent on refresh.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime of `access_token` in seconds.
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Token type, normally `Bearer`.
    #[serde(default)]
    pub token_type: Option<String>,
}

impl TokenResponse {
    /// Lifetime in seconds; a response without a positive lifetime cannot
    /// produce a fresh credential.
    pub fn lifetime_secs(&self) -> Result<i64> {
        match self.expires_in {
            Some(secs) if secs > MAX_LIFETIME_SECS => Err(Error::auth(format!(
                "token response has out-of-range expires_in: {}",
                secs
            ))),
            Some(secs) if secs > 0 => Ok(secs),
            Some(secs) => Err(Error::auth(format!(
                "token response has non-positive expires_in: {}",
                secs
            ))),
            None => Err(Error::auth("token response is missing expires_in")),
        }
    }
}

/// Client for the token and authorization endpoints.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    http_client: reqwest::Client,
}

impl OAuthClient {
    /// Creates a client whose every exchange gives up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("formsheet/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::config("failed to create HTTP client").with_source(e))?;
        Ok(Self { http_client })
    }

    /// The underlying HTTP client, shared with authenticated transports.
    pub fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }

    /// Builds the URL the resource owner visits to grant access.
    ///
    /// Requests offline access so the server issues a refresh token.
    pub fn authorization_url(config: &ClientConfig) -> Result<Url> {
        let mut url = parse_endpoint("auth_endpoint", &config.auth_endpoint)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("client_id", &config.client_id);
            if let Some(ref redirect_uri) = config.redirect_uri {
                query.append_pair("redirect_uri", redirect_uri);
            }
            query
                .append_pair("response_type", "code")
                .append_pair("scope", &config.scope)
                .append_pair("access_type", "offline")
                .append_pair("prompt", "consent");
        }
        Ok(url)
    }

    /// Exchanges an authorization code for a token set.
    pub async fn exchange_code(&self, config: &ClientConfig, code: &str) -> Result<TokenResponse> {
        let mut params = vec![
            ("code", code),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
            ("grant_type", "authorization_code"),
        ];
        if let Some(ref redirect_uri) = config.redirect_uri {
            params.push(("redirect_uri", redirect_uri.as_str()));
        }

        self.post_token(config, &params, "token exchange").await
    }

    /// Exchanges a refresh token for a new access token.
    pub async fn refresh(&self, config: &ClientConfig, refresh_token: &str) -> Result<TokenResponse> {
        let params = [
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        self.post_token(config, &params, "token refresh").await
    }

    async fn post_token(
        &self,
        config: &ClientConfig,
        params: &[(&str, &str)],
        what: &str,
    ) -> Result<TokenResponse> {
        let endpoint = parse_endpoint("token_endpoint", &config.token_endpoint)?;
        debug!(endpoint = %endpoint, "{} request", what);

        let response = self
            .http_client
            .post(endpoint)
            .form(params)
            .send()
            .await
            .map_err(|e| {
                let reason = if e.is_timeout() { "timed out" } else { "failed" };
                Error::auth(format!("{} request {}", what, reason)).with_source(e)
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::auth(format!("failed to read {} response", what)).with_source(e))?;

        if !status.is_success() {
            return Err(
                Error::auth(format!("{} failed: {}", what, body.trim())).with_status(status.as_u16()),
            );
        }

        serde_json::from_str(&body)
            .map_err(|e| Error::auth(format!("invalid {} response", what)).with_source(e))
    }
}
