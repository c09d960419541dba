//! The spreadsheet action: one sheet per form, one row per response.

use std::future::Future;
use std::sync::Arc;

use formsheet_auth::{AuthenticatedTransport, ClientConfig, CredentialManager, Identity, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::drive::DriveClient;
use crate::sheets::SheetsClient;

/// Scope label of the identity used for spreadsheet calls.
pub const SHEETS_API: &str = "sheets";

/// Scope label of the identity used for sharing.
pub const DRIVE_API: &str = "drive";

/// Where a form's responses end up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetLink {
    /// Public link to the spreadsheet.
    pub link: String,
    /// Spreadsheet identifier, needed to record responses.
    pub sheet_id: String,
}

/// Spreadsheet action bound to one action name.
#[derive(Debug, Clone)]
pub struct SheetAction {
    manager: Arc<CredentialManager>,
    sheets_identity: Identity,
    drive_identity: Identity,
    sheets_config: ClientConfig,
    drive_config: ClientConfig,
    sheets: SheetsClient,
    drive: DriveClient,
}

impl SheetAction {
    /// Creates the action for `action`, using one client configuration per
    /// API scope.
    pub fn new(
        manager: Arc<CredentialManager>,
        action: &str,
        sheets_config: ClientConfig,
        drive_config: ClientConfig,
    ) -> Self {
        Self {
            manager,
            sheets_identity: Identity::new(action, SHEETS_API),
            drive_identity: Identity::new(action, DRIVE_API),
            sheets_config,
            drive_config,
            sheets: SheetsClient::default(),
            drive: DriveClient::default(),
        }
    }

    /// Points spreadsheet calls at another base URL.
    pub fn with_sheets_base(mut self, base_url: impl Into<String>) -> Self {
        self.sheets = SheetsClient::new(base_url);
        self
    }

    /// Points sharing calls at another base URL.
    pub fn with_drive_base(mut self, base_url: impl Into<String>) -> Self {
        self.drive = DriveClient::new(base_url);
        self
    }

    /// Creates the response sheet for a form and makes it public.
    ///
    /// Row 1 holds `User_Id` and numbered question headers, row 2 the
    /// question titles. A sheet that could not be shared is still returned.
    pub async fn initialize(&self, title: &str, questions: &[String]) -> Result<SheetLink> {
        let sheets = &self.sheets;

        let sheet = self
            .with_sheets(move |t| async move { sheets.create_spreadsheet(&t, title).await })
            .await?;
        info!(sheet_id = %sheet.id, link = %sheet.url, "spreadsheet created");

        let header = header_row(questions.len());
        let titles = titles_row(questions);
        let id = sheet.id.as_str();
        for (range, row) in [("A1", &header), ("A2", &titles)] {
            self.with_sheets(move |t| async move {
                sheets
                    .update_values(&t, id, range, std::slice::from_ref(row))
                    .await
            })
            .await?;
        }

        if let Err(e) = self.share(id).await {
            warn!(sheet_id = id, error = %e, "unable to make sheet public");
        }

        Ok(SheetLink {
            link: sheet.url,
            sheet_id: sheet.id,
        })
    }

    /// Writes one response as row `3 + response_index`.
    pub async fn record(
        &self,
        sheet_id: &str,
        response_index: usize,
        user_id: &str,
        answers: &[String],
    ) -> Result<()> {
        let sheets = &self.sheets;
        let range = format!("A{}", 3 + response_index);
        let range = range.as_str();
        let rows = [answer_row(user_id, answers)];
        let rows = rows.as_slice();

        self.with_sheets(move |t| async move {
            sheets.update_values(&t, sheet_id, range, rows).await
        })
        .await?;
        info!(sheet_id, range, "response recorded");
        Ok(())
    }

    async fn share(&self, sheet_id: &str) -> Result<()> {
        let drive = &self.drive;
        with_retry(
            &self.manager,
            &self.drive_identity,
            &self.drive_config,
            move |t| async move { drive.share_with_anyone(&t, sheet_id).await },
        )
        .await
    }

    async fn with_sheets<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: Fn(AuthenticatedTransport) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        with_retry(&self.manager, &self.sheets_identity, &self.sheets_config, op).await
    }
}

/// Runs `op` with a fresh transport. If the API answers 401 the credential
/// is renewed once and `op` runs a second time; any other failure is final.
async fn with_retry<T, F, Fut>(
    manager: &CredentialManager,
    identity: &Identity,
    config: &ClientConfig,
    op: F,
) -> Result<T>
where
    F: Fn(AuthenticatedTransport) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let transport = manager.get_transport(identity, config).await?;
    match op(transport.clone()).await {
        Err(e) if e.is_auth_failure() => {
            warn!(%identity, "access token rejected, renewing and retrying once");
            let transport = manager.refresh_rejected(identity, config, &transport).await?;
            op(transport).await
        }
        other => other,
    }
}

fn header_row(questions: usize) -> Vec<String> {
    std::iter::once("User_Id".to_string())
        .chain((1..=questions).map(|i| format!("Question - {}", i)))
        .collect()
}

fn titles_row(questions: &[String]) -> Vec<String> {
    std::iter::once("----".to_string())
        .chain(questions.iter().cloned())
        .collect()
}

fn answer_row(user_id: &str, answers: &[String]) -> Vec<String> {
    std::iter::once(user_id.to_string())
        .chain(answers.iter().cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use formsheet_auth::{ErrorKind, MemoryTokenStore, StaticCodeSource, TokenStore};
    use formsheet_auth::{scopes, Credential};
    use formsheet_core::ManualClock;
    use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn rows_follow_sheet_layout() {
        let questions = vec!["Name?".to_string(), "Age?".to_string()];
        assert_eq!(header_row(2), ["User_Id", "Question - 1", "Question - 2"]);
        assert_eq!(titles_row(&questions), ["----", "Name?", "Age?"]);
        assert_eq!(answer_row("u1", &questions), ["u1", "Name?", "Age?"]);
        assert_eq!(header_row(0), ["User_Id"]);
    }

    /// A manager whose store already holds fresh AT1 credentials for both
    /// scopes of `formA`, so no authorization happens unless a test asks.
    fn action(server: &MockServer) -> SheetAction {
        let now = chrono::Utc::now();
        let store = MemoryTokenStore::new();
        for api in [SHEETS_API, DRIVE_API] {
            let cred = Credential::from_token_response("AT1", "RT1", 3600, None, now);
            store.save(&Identity::new("formA", api), &cred).unwrap();
        }

        let manager = CredentialManager::builder()
            .store(store)
            .code_source(StaticCodeSource::new("unused"))
            .clock(ManualClock::new(now))
            .build()
            .unwrap();

        let token_endpoint = format!("{}/token", server.uri());
        let sheets_config = ClientConfig::new("client-1", "secret-1", scopes::SPREADSHEETS)
            .with_token_endpoint(token_endpoint.clone());
        let drive_config = sheets_config.for_scope(scopes::DRIVE);

        SheetAction::new(Arc::new(manager), "formA", sheets_config, drive_config)
            .with_sheets_base(server.uri())
            .with_drive_base(server.uri())
    }

    async fn mount_create(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/v4/spreadsheets"))
            .and(header("authorization", "Bearer AT1"))
            .and(body_json(serde_json::json!({ "properties": { "title": "Survey" } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "spreadsheetId": "sheet-1",
                "spreadsheetUrl": "https://docs.google.com/spreadsheets/d/sheet-1/edit"
            })))
            .expect(1)
            .mount(server)
            .await;
    }

    async fn mount_update(server: &MockServer, range: &str, values: serde_json::Value) {
        Mock::given(method("PUT"))
            .and(path(format!("/v4/spreadsheets/sheet-1/values/{}", range)))
            .and(query_param("valueInputOption", "RAW"))
            .and(body_string_contains(values.to_string()))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn initialize_creates_writes_headers_and_shares() {
        let server = MockServer::start().await;
        mount_create(&server).await;
        mount_update(
            &server,
            "A1",
            serde_json::json!([["User_Id", "Question - 1", "Question - 2"]]),
        )
        .await;
        mount_update(&server, "A2", serde_json::json!([["----", "Name?", "Age?"]])).await;
        Mock::given(method("POST"))
            .and(path("/drive/v3/files/sheet-1/permissions"))
            .and(body_json(serde_json::json!({ "type": "anyone", "role": "reader" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let link = action(&server)
            .initialize("Survey", &["Name?".to_string(), "Age?".to_string()])
            .await
            .unwrap();
        assert_eq!(link.sheet_id, "sheet-1");
        assert_eq!(link.link, "https://docs.google.com/spreadsheets/d/sheet-1/edit");
    }

    #[tokio::test]
    async fn sharing_failure_does_not_fail_initialize() {
        let server = MockServer::start().await;
        mount_create(&server).await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/drive/v3/files/sheet-1/permissions"))
            .respond_with(ResponseTemplate::new(403).set_body_string("sharing disabled"))
            .expect(1)
            .mount(&server)
            .await;

        let link = action(&server).initialize("Survey", &[]).await.unwrap();
        assert_eq!(link.sheet_id, "sheet-1");
    }

    #[tokio::test]
    async fn record_writes_row_after_previous_responses() {
        let server = MockServer::start().await;
        mount_update(&server, "A5", serde_json::json!([["user-42", "Ada", "36"]])).await;

        action(&server)
            .record("sheet-1", 2, "user-42", &["Ada".to_string(), "36".to_string()])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn unauthorized_triggers_one_refresh_and_retry() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(header("authorization", "Bearer AT1"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(header("authorization", "Bearer AT2"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "AT2",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;

        action(&server)
            .record("sheet-1", 0, "user-1", &["yes".to_string()])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn persistent_unauthorized_is_returned_after_one_retry() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(401))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "AT2",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = action(&server)
            .record("sheet-1", 0, "user-1", &[])
            .await
            .unwrap_err();
        assert!(err.is_auth_failure());
    }

    #[tokio::test]
    async fn other_statuses_never_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(500).set_body_string("backend error"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = action(&server)
            .record("sheet-1", 0, "user-1", &[])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Downstream);
        assert_eq!(err.status(), Some(500));
        assert!(err.message().contains("backend error"));
    }
}
