//! Google Sheets v4 client.

use formsheet_auth::{AuthenticatedTransport, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::response::{send, send_json};

/// Base URL of the Sheets API.
pub const DEFAULT_SHEETS_BASE: &str = "https://sheets.googleapis.com";

/// A newly created spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spreadsheet {
    /// Spreadsheet identifier.
    #[serde(rename = "spreadsheetId")]
    pub id: String,
    /// Browser link to the spreadsheet.
    #[serde(rename = "spreadsheetUrl")]
    pub url: String,
}

/// Thin client for the two Sheets calls the action needs.
#[derive(Debug, Clone)]
pub struct SheetsClient {
    base_url: String,
}

impl Default for SheetsClient {
    fn default() -> Self {
        Self::new(DEFAULT_SHEETS_BASE)
    }
}

impl SheetsClient {
    /// Creates a client rooted at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Creates an empty spreadsheet titled `title`.
    pub async fn create_spreadsheet(
        &self,
        transport: &AuthenticatedTransport,
        title: &str,
    ) -> Result<Spreadsheet> {
        let url = format!("{}/v4/spreadsheets", self.base_url);
        let body = json!({ "properties": { "title": title } });

        let sheet: Spreadsheet =
            send_json(transport.post(&url).json(&body), "spreadsheet creation").await?;
        debug!(sheet_id = %sheet.id, "created spreadsheet");
        Ok(sheet)
    }

    /// Overwrites `range` with `rows`, stored as typed (no formula parsing).
    pub async fn update_values(
        &self,
        transport: &AuthenticatedTransport,
        spreadsheet_id: &str,
        range: &str,
        rows: &[Vec<String>],
    ) -> Result<()> {
        let url = format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.base_url,
            urlencoding::encode(spreadsheet_id),
            urlencoding::encode(range)
        );
        let body = json!({ "range": range, "majorDimension": "ROWS", "values": rows });

        send(
            transport
                .put(&url)
                .query(&[("valueInputOption", "RAW")])
                .json(&body),
            "value update",
        )
        .await?;
        debug!(sheet_id = spreadsheet_id, range, rows = rows.len(), "updated values");
        Ok(())
    }
}
