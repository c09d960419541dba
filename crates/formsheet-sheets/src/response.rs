use formsheet_auth::{Error, ErrorKind, Result};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Sends `request`, mapping transport failures and non-2xx answers to
/// downstream errors.
pub(crate) async fn send(request: reqwest::RequestBuilder, what: &str) -> Result<reqwest::Response> {
    let response = request.send().await.map_err(|e| {
        let reason = if e.is_timeout() { "timed out" } else { "failed" };
        Error::new(ErrorKind::Downstream, format!("{} request {}", what, reason)).with_source(e)
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!(error = %e, "failed to read {} error body", what);
                String::new()
            }
        };
        return Err(Error::downstream(
            status.as_u16(),
            format!("{} failed: {}", what, body.trim()),
        ));
    }
    Ok(response)
}

/// Sends `request` and decodes a JSON body.
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    what: &str,
) -> Result<T> {
    let body = send(request, what)
        .await?
        .text()
        .await
        .map_err(|e| {
            Error::new(ErrorKind::Downstream, format!("failed to read {} response", what))
                .with_source(e)
        })?;

    serde_json::from_str(&body).map_err(|e| {
        Error::new(ErrorKind::Downstream, format!("invalid {} response", what)).with_source(e)
    })
}
