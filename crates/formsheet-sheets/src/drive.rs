//! Google Drive v3 permissions client.

use formsheet_auth::{AuthenticatedTransport, Result};
use serde_json::json;

use crate::response::send;

/// Base URL of the Drive API.
pub const DEFAULT_DRIVE_BASE: &str = "https://www.googleapis.com";

/// Grants access to Drive files.
#[derive(Debug, Clone)]
pub struct DriveClient {
    base_url: String,
}

impl Default for DriveClient {
    fn default() -> Self {
        Self::new(DEFAULT_DRIVE_BASE)
    }
}

impl DriveClient {
    /// Creates a client rooted at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Lets anyone with the link read `file_id`.
    pub async fn share_with_anyone(
        &self,
        transport: &AuthenticatedTransport,
        file_id: &str,
    ) -> Result<()> {
        let url = format!(
            "{}/drive/v3/files/{}/permissions",
            self.base_url,
            urlencoding::encode(file_id)
        );
        let body = json!({ "type": "anyone", "role": "reader" });

        send(transport.post(&url).json(&body), "permission creation").await?;
        Ok(())
    }
}
