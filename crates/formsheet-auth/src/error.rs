//! Error types for the credential subsystem.
//!
//! Every failure carries an [`ErrorKind`] so callers can tell a broken client
//! file from a rejected refresh token from a spreadsheet API that answered 500.

use std::fmt;
use thiserror::Error;

/// The category of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Client configuration is missing, unreadable or invalid.
    Config,
    /// The token store could not be read or written.
    Store,
    /// The authorization-code or refresh exchange failed.
    Auth,
    /// A downstream API call made through an authenticated transport failed.
    Downstream,
}

impl ErrorKind {
    /// Returns a short machine-readable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Config => "config_error",
            Self::Store => "store_error",
            Self::Auth => "auth_error",
            Self::Downstream => "downstream_api_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error raised by the credential subsystem or a downstream call.
#[derive(Debug, Error)]
pub struct Error {
    kind: ErrorKind,
    message: String,
    /// HTTP status returned by the remote side, when there was one.
    status: Option<u16>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Creates an error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            source: None,
        }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    /// Creates a store error.
    pub fn store(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Store, message)
    }

    /// Creates an authentication error.
    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Auth, message)
    }

    /// Creates a downstream API error for a response with `status`.
    pub fn downstream(status: u16, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Downstream, message).with_status(status)
    }

    /// Sets the HTTP status.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Attaches the underlying cause.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the HTTP status, if the error came from a response.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Returns true for a downstream response that rejected the bearer token.
    ///
    /// Only this case justifies refreshing the credential and retrying; any
    /// other downstream failure is reported as is.
    pub fn is_auth_failure(&self) -> bool {
        self.kind == ErrorKind::Downstream && self.status == Some(401)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(status) = self.status {
            write!(f, " (HTTP {})", status)?;
        }
        Ok(())
    }
}

/// A specialized Result type for credential operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names() {
        assert_eq!(ErrorKind::Config.as_str(), "config_error");
        assert_eq!(ErrorKind::Downstream.to_string(), "downstream_api_error");
    }

    #[test]
    fn display_includes_status() {
        let err = Error::downstream(503, "values update failed");
        assert_eq!(
            err.to_string(),
            "downstream_api_error: values update failed (HTTP 503)"
        );

        let err = Error::store("disk full");
        assert_eq!(err.to_string(), "store_error: disk full");
    }

    #[test]
    fn only_downstream_401_is_auth_failure() {
        assert!(Error::downstream(401, "unauthorized").is_auth_failure());
        assert!(!Error::downstream(403, "forbidden").is_auth_failure());
        assert!(!Error::downstream(500, "boom").is_auth_failure());
        assert!(!Error::auth("token exchange failed").with_status(401).is_auth_failure());
    }

    #[test]
    fn source_is_kept() {
        use std::error::Error as _;
        let io_err = std::io::Error::other("permission denied");
        let err = Error::store("failed to write token file").with_source(io_err);
        assert!(err.source().is_some());
        assert_eq!(err.kind(), ErrorKind::Store);
        assert_eq!(err.message(), "failed to write token file");
    }
}
