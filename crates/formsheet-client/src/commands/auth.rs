//! Credential commands.

use chrono::Utc;
use formsheet_auth::CredentialStatus;
use tracing::info;

use super::Context;
use crate::cli::Api;
use crate::error::ClientResult;

/// Make sure `action` holds a usable credential for `api`.
///
/// Prompts for an authorization code the first time; later runs only
/// refresh when needed.
pub async fn authorize(ctx: &Context, action: &str, api: Api) -> ClientResult<()> {
    let config = ctx.client_config(action, api)?;
    let identity = Context::identity(action, api);

    let transport = ctx.manager().get_transport(&identity, &config).await?;
    info!(%identity, "authorized");
    println!("{}: authorized, valid until {}", identity, transport.expiry());
    Ok(())
}

/// Print the stored credential state of both APIs of `action`.
pub async fn status(ctx: &Context, action: &str) -> ClientResult<()> {
    for api in Api::ALL {
        let identity = Context::identity(action, api);
        let line = describe(ctx.manager().status(&identity).await?);
        println!("{}: {}", identity, line);
    }
    Ok(())
}

/// Refresh `action`'s access token for `api` regardless of its expiry.
pub async fn refresh(ctx: &Context, action: &str, api: Api) -> ClientResult<()> {
    let config = ctx.client_config(action, api)?;
    let identity = Context::identity(action, api);

    let transport = ctx.manager().force_refresh(&identity, &config).await?;
    println!("{}: refreshed, valid until {}", identity, transport.expiry());
    Ok(())
}

fn describe(status: CredentialStatus) -> String {
    match status {
        CredentialStatus::Missing => "not authorized (run `formsheet auth`)".to_string(),
        CredentialStatus::Fresh { expiry } => {
            let left = expiry - Utc::now();
            format!("valid until {} ({} min left)", expiry, left.num_minutes())
        }
        CredentialStatus::Stale { expiry } => {
            format!("expired at {}, will refresh on next use", expiry)
        }
    }
}
