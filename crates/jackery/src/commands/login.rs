//! Login command: one explicit handshake to check credentials.

use serde::Serialize;

use jackery_api::SessionClient;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct LoginResult<'a> {
    account: &'a str,
    base_url: &'a str,
    authenticated: bool,
}

pub async fn handle(client: &SessionClient, global: &GlobalOpts) -> Result<(), CliError> {
    client.login().await?;

    let result = LoginResult {
        account: &client.credentials().account,
        base_url: client.base_url().as_str(),
        authenticated: true,
    };

    let out = match global.output {
        OutputFormat::Table | OutputFormat::Plain => {
            format!("Logged in as {} ({})", result.account, result.base_url)
        }
        OutputFormat::Json => serde_json::to_string_pretty(&result)?,
        OutputFormat::JsonCompact => serde_json::to_string(&result)?,
    };
    output::print_output(&out, global.quiet);
    Ok(())
}
