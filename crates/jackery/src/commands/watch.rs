//! Watch command: poll one device's telemetry on a fixed interval.
//!
//! A failed cycle is logged and the last good snapshot is kept; the loop
//! only stops on Ctrl-C or after `--count` polls.

use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use jackery_api::{SessionClient, TelemetrySnapshot};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

use super::devices::{self, OUTLETS, READINGS};

/// One-line summary of a snapshot for streaming output.
fn summary_line(name: &str, snap: &TelemetrySnapshot, color: bool) -> String {
    let mut parts = vec![
        snap.fetched_at.format("%H:%M:%S").to_string(),
        name.to_owned(),
    ];

    parts.extend(
        READINGS
            .iter()
            .filter(|r| matches!(r.key, "rb" | "ip" | "op"))
            .filter_map(|r| r.format(snap).map(|v| format!("{} {v}", r.label.to_lowercase()))),
    );

    parts.extend(OUTLETS.iter().filter_map(|(key, label)| {
        snap.flag(key)
            .map(|on| format!("{} {}", label.to_lowercase(), output::on_off(on, color)))
    }));

    parts.join("  ")
}

fn render(
    format: OutputFormat,
    name: &str,
    snap: &TelemetrySnapshot,
    color: bool,
) -> Result<String, CliError> {
    Ok(match format {
        OutputFormat::Table => summary_line(name, snap, color),
        OutputFormat::Plain => summary_line(name, snap, false),
        // One JSON document per line for both JSON modes.
        OutputFormat::Json | OutputFormat::JsonCompact => serde_json::to_string(snap)?,
    })
}

pub async fn handle(
    client: &SessionClient,
    args: WatchArgs,
    poll_interval: Duration,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let interval = args.interval.map_or(poll_interval, Duration::from_secs);
    if interval.is_zero() {
        return Err(CliError::Validation {
            field: "interval".into(),
            reason: "must be at least one second".into(),
        });
    }

    let device = devices::find_device(client, &args.device).await?;
    let name = device.display_name();
    let color = output::should_color(global.color);

    info!(
        device = %device.id,
        every = %humantime::format_duration(interval),
        "watching device"
    );

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut last_good: Option<TelemetrySnapshot> = None;
    let mut last_err: Option<jackery_api::Error> = None;
    let mut polls: u64 = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }

        match client.device_telemetry(&device.id).await {
            Ok(snap) => {
                let out = render(global.output, &name, &snap, color)?;
                output::print_output(&out, global.quiet);
                last_good = Some(snap);
                last_err = None;
            }
            Err(e) => {
                match &last_good {
                    Some(prev) => warn!(
                        error = %e,
                        last_good = %prev.fetched_at,
                        "poll failed, keeping last known values"
                    ),
                    None => warn!(error = %e, "poll failed"),
                }
                last_err = Some(e);
            }
        }

        polls += 1;
        if args.count.is_some_and(|n| polls >= n) {
            break;
        }
    }

    // Nothing ever succeeded: report why.
    match (last_good, last_err) {
        (None, Some(e)) => Err(e.into()),
        _ => Ok(()),
    }
}
