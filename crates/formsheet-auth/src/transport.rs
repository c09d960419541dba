//! HTTP handle that carries a bearer credential.

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{IntoUrl, Method, RequestBuilder};

use crate::credential::Credential;
use crate::error::{Error, Result};

/// Sends requests with the identity's access token attached.
///
/// Freshness is checked when the transport is handed out, not per request.
/// Long-lived callers should ask the [`CredentialManager`] again rather than
/// keep one around.
///
/// [`CredentialManager`]: crate::CredentialManager
#[derive(Clone)]
pub struct AuthenticatedTransport {
    http_client: reqwest::Client,
    authorization: HeaderValue,
    expiry: DateTime<Utc>,
}

impl AuthenticatedTransport {
    pub(crate) fn new(http_client: reqwest::Client, credential: &Credential) -> Result<Self> {
        let scheme = if credential.token_type.is_empty()
            || credential.token_type.eq_ignore_ascii_case("bearer")
        {
            "Bearer"
        } else {
            credential.token_type.as_str()
        };

        let mut authorization =
            HeaderValue::from_str(&format!("{} {}", scheme, credential.access_token)).map_err(
                |e| Error::auth("access token is not a valid header value").with_source(e),
            )?;
        authorization.set_sensitive(true);

        Ok(Self {
            http_client,
            authorization,
            expiry: credential.expiry,
        })
    }

    /// Expiry of the credential this transport was built from.
    pub fn expiry(&self) -> DateTime<Utc> {
        self.expiry
    }

    /// Starts a request with the credential attached.
    pub fn request(&self, method: Method, url: impl IntoUrl) -> RequestBuilder {
        self.http_client
            .request(method, url)
            .header(AUTHORIZATION, self.authorization.clone())
    }

    /// Starts a GET request.
    pub fn get(&self, url: impl IntoUrl) -> RequestBuilder {
        self.request(Method::GET, url)
    }

    /// Starts a POST request.
    pub fn post(&self, url: impl IntoUrl) -> RequestBuilder {
        self.request(Method::POST, url)
    }

    /// Starts a PUT request.
    pub fn put(&self, url: impl IntoUrl) -> RequestBuilder {
        self.request(Method::PUT, url)
    }

    /// Whether this transport was built from `credential`'s access token.
    pub(crate) fn carries(&self, credential: &Credential) -> bool {
        Self::new(self.http_client.clone(), credential)
            .is_ok_and(|other| other.authorization == self.authorization)
    }

    #[cfg(test)]
    pub(crate) fn authorization(&self) -> &HeaderValue {
        &self.authorization
    }
}

impl std::fmt::Debug for AuthenticatedTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedTransport")
            .field("expiry", &self.expiry)
            .finish_non_exhaustive()
    }
}
