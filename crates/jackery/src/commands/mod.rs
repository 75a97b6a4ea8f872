//! Command dispatch: bridges CLI args -> SessionClient calls -> output formatting.

pub mod config_cmd;
pub mod devices;
pub mod login;
pub mod watch;

use std::time::Duration;

use jackery_api::SessionClient;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a session-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    client: &SessionClient,
    poll_interval: Duration,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Login => login::handle(client, global).await,
        Command::Devices(args) => devices::handle(client, args, global).await,
        Command::Watch(args) => watch::handle(client, args, poll_interval, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
