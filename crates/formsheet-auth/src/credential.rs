//! The OAuth2 token set held for one identity.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Token type assumed when the server does not send one.
pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";

/// An access/refresh token pair with its absolute expiry.
///
/// Serializes with the field names of the common `oauth2` token file, with
/// `expiry` as an RFC 3339 instant.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Short-lived bearer token.
    pub access_token: String,

    /// Token type, normally `Bearer`.
    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// Long-lived token used only to mint new access tokens.
    pub refresh_token: String,

    /// Instant after which `access_token` must not be used.
    pub expiry: DateTime<Utc>,
}

fn default_token_type() -> String {
    DEFAULT_TOKEN_TYPE.to_string()
}

impl Credential {
    /// Builds a credential from a token endpoint response received at `now`.
    pub fn from_token_response(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_in_secs: i64,
        token_type: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: token_type.unwrap_or_else(default_token_type),
            refresh_token: refresh_token.into(),
            expiry: expiry_after(now, expires_in_secs).unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// True while the access token is usable at `now`, keeping `margin` in
    /// reserve.
    pub fn is_fresh_at(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        now.checked_add_signed(margin)
            .is_some_and(|deadline| self.expiry > deadline)
    }

    /// True once the access token must go through a refresh first.
    pub fn is_stale_at(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        !self.is_fresh_at(now, margin)
    }
}

/// `now + secs`, or `None` when that is not a representable instant.
pub(crate) fn expiry_after(now: DateTime<Utc>, secs: i64) -> Option<DateTime<Utc>> {
    Duration::try_seconds(secs).and_then(|lifetime| now.checked_add_signed(lifetime))
}

// Tokens stay out of logs and panic messages.
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("refresh_token", &"<redacted>")
            .field("expiry", &self.expiry)
            .finish()
    }
}
