//! Device command handlers.

use serde::Serialize;
use serde_json::Value;
use tabled::Tabled;

use jackery_api::{Device, SessionClient, TelemetrySnapshot};

use crate::cli::{DevicesArgs, DevicesCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

// ── Telemetry keys ──────────────────────────────────────────────────

/// A numeric property with its display label and scaling.
pub struct Reading {
    pub key: &'static str,
    pub label: &'static str,
    pub unit: &'static str,
    /// Raw values are reported in 1/divisor units.
    pub divisor: f64,
    pub decimals: usize,
}

pub const READINGS: &[Reading] = &[
    Reading::new("rb", "Battery", "%", 1.0, 0),
    Reading::new("bt", "Battery temperature", "°C", 10.0, 1),
    Reading::new("op", "Output power", "W", 1.0, 0),
    Reading::new("ip", "Input power", "W", 1.0, 0),
    Reading::new("acip", "AC input power", "W", 1.0, 0),
    Reading::new("it", "Time to full", "h", 10.0, 1),
    Reading::new("ot", "Remaining output time", "h", 10.0, 1),
    Reading::new("acov", "AC output voltage", "V", 10.0, 1),
];

/// Outlet toggles. Models report either `odc` or the split `odcc`/`odcu`.
pub const OUTLETS: &[(&str, &str)] = &[
    ("oac", "AC output"),
    ("odc", "DC output"),
    ("odcc", "DC car output"),
    ("odcu", "USB output"),
];

impl Reading {
    const fn new(
        key: &'static str,
        label: &'static str,
        unit: &'static str,
        divisor: f64,
        decimals: usize,
    ) -> Self {
        Self {
            key,
            label,
            unit,
            divisor,
            decimals,
        }
    }

    /// Scaled value with its unit, if the snapshot has this key.
    pub fn format(&self, snap: &TelemetrySnapshot) -> Option<String> {
        let raw = snap.number(self.key)?;
        Some(format!(
            "{:.*} {}",
            self.decimals,
            raw / self.divisor,
            self.unit
        ))
    }
}

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Product")]
    product: String,
}

impl From<&Device> for DeviceRow {
    fn from(d: &Device) -> Self {
        Self {
            id: d.id.clone(),
            name: d.display_name(),
            product: d.product_type.clone().unwrap_or_default(),
        }
    }
}

#[derive(Tabled)]
struct PropertyRow {
    #[tabled(rename = "Reading")]
    label: String,
    #[tabled(rename = "Value")]
    value: String,
}

/// One device with its current telemetry.
#[derive(Serialize)]
struct DeviceTelemetry {
    device: Device,
    telemetry: TelemetrySnapshot,
}

fn property_rows(snap: &TelemetrySnapshot, color: bool) -> Vec<PropertyRow> {
    let mut rows: Vec<PropertyRow> = READINGS
        .iter()
        .filter_map(|r| {
            r.format(snap).map(|value| PropertyRow {
                label: r.label.into(),
                value,
            })
        })
        .collect();

    rows.extend(OUTLETS.iter().filter_map(|(key, label)| {
        snap.flag(key).map(|on| PropertyRow {
            label: (*label).into(),
            value: output::on_off(on, color),
        })
    }));

    // Keys without a label are shown raw.
    rows.extend(
        snap.properties
            .iter()
            .filter(|(key, _)| !is_known_key(key))
            .map(|(key, value)| PropertyRow {
                label: key.clone(),
                value: raw_value(value),
            }),
    );
    rows
}

fn is_known_key(key: &str) -> bool {
    READINGS.iter().any(|r| r.key == key) || OUTLETS.iter().any(|(k, _)| *k == key)
}

fn raw_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn detail(dt: &DeviceTelemetry, color: bool) -> String {
    let header = [
        format!("Device:   {} ({})", dt.device.display_name(), dt.device.id),
        format!(
            "Product:  {}",
            dt.device.product_type.as_deref().unwrap_or("-")
        ),
        format!(
            "Updated:  {}",
            dt.telemetry.fetched_at.format("%Y-%m-%d %H:%M:%S UTC")
        ),
    ]
    .join("\n");

    if dt.telemetry.is_empty() {
        return format!("{header}\n\nNo telemetry reported.");
    }
    format!(
        "{header}\n\n{}",
        output::render_table(&property_rows(&dt.telemetry, color))
    )
}

fn plain(dt: &DeviceTelemetry) -> String {
    dt.telemetry
        .properties
        .iter()
        .map(|(key, value)| format!("{key}={}", raw_value(value)))
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Lookup ──────────────────────────────────────────────────────────

/// Find a bound device by ID, or by name (case-insensitive).
pub async fn find_device(client: &SessionClient, query: &str) -> Result<Device, CliError> {
    let devices = client.list_devices().await?;
    select_device(devices, query).ok_or_else(|| CliError::NotFound {
        resource_type: "device".into(),
        identifier: query.into(),
        list_command: "devices list".into(),
    })
}

fn select_device(devices: Vec<Device>, query: &str) -> Option<Device> {
    let mut by_name = None;
    for device in devices {
        if device.id == query {
            return Some(device);
        }
        if by_name.is_none() && device.display_name().eq_ignore_ascii_case(query) {
            by_name = Some(device);
        }
    }
    by_name
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    client: &SessionClient,
    args: DevicesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        DevicesCommand::List => {
            let devices = client.list_devices().await?;
            let out = output::render_list(
                global.output,
                &devices,
                |d| DeviceRow::from(d),
                |d| d.id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Show { device } => {
            let device = find_device(client, &device).await?;
            let telemetry = client.device_telemetry(&device.id).await?;
            let color = output::should_color(global.color);

            let dt = DeviceTelemetry { device, telemetry };
            let out = output::render_single(global.output, &dt, |d| detail(d, color), plain)?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
