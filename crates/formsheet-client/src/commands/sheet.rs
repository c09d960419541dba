//! Spreadsheet commands.

use super::Context;
use crate::error::{ClientError, ClientResult};

/// Create the response sheet for a form and print its link.
pub async fn init(
    ctx: &Context,
    action: &str,
    title: &str,
    questions: &[String],
    json: bool,
) -> ClientResult<()> {
    let link = ctx.sheet_action(action)?.initialize(title, questions).await?;

    if json {
        let out = serde_json::to_string_pretty(&link)
            .map_err(|e| ClientError::Config(format!("failed to serialize result: {}", e)))?;
        println!("{}", out);
    } else {
        println!("Spreadsheet : {}", link.link);
        println!("sheet_id    : {}", link.sheet_id);
    }
    Ok(())
}

/// Append one response to a sheet created by [`init`].
pub async fn record(
    ctx: &Context,
    action: &str,
    sheet_id: &str,
    index: usize,
    user: &str,
    answers: &[String],
) -> ClientResult<()> {
    ctx.sheet_action(action)?
        .record(sheet_id, index, user, answers)
        .await?;
    println!("recorded response {} for {}", index, user);
    Ok(())
}
