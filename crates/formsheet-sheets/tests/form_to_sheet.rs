use std::sync::Arc;

use formsheet_auth::{
    scopes, ClientConfig, CredentialManager, FileTokenStore, Identity, StaticCodeSource,
    TokenStore,
};
use formsheet_sheets::{SheetAction, DRIVE_API, SHEETS_API};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn first_form_authorizes_both_apis_then_records() {
    let server = MockServer::start().await;

    // One authorization per API scope.
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "AT1",
            "refresh_token": "RT1",
            "expires_in": 3600,
            "token_type": "Bearer"
        })))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v4/spreadsheets"))
        .and(header("authorization", "Bearer AT1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "spreadsheetId": "sheet-9",
            "spreadsheetUrl": "https://docs.google.com/spreadsheets/d/sheet-9/edit"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(header("authorization", "Bearer AT1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/drive/v3/files/sheet-9/permissions"))
        .and(header("authorization", "Bearer AT1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let manager = CredentialManager::builder()
        .store(FileTokenStore::new(dir.path()))
        .code_source(StaticCodeSource::new("granted"))
        .build()
        .unwrap();

    let sheets_config = ClientConfig::new("client-1", "secret-1", scopes::SPREADSHEETS)
        .with_token_endpoint(format!("{}/token", server.uri()));
    let drive_config = sheets_config.for_scope(scopes::DRIVE);

    let action = SheetAction::new(Arc::new(manager), "formA", sheets_config, drive_config)
        .with_sheets_base(server.uri())
        .with_drive_base(server.uri());

    let link = action
        .initialize("Survey", &["Favourite colour?".to_string()])
        .await
        .unwrap();
    assert_eq!(link.sheet_id, "sheet-9");

    action
        .record(&link.sheet_id, 0, "user-1", &["blue".to_string()])
        .await
        .unwrap();

    let store = FileTokenStore::new(dir.path());
    for api in [SHEETS_API, DRIVE_API] {
        let saved = store.load(&Identity::new("formA", api)).unwrap().unwrap();
        assert_eq!(saved.refresh_token, "RT1");
    }
}
