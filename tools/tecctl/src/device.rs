//! Commands that talk to a controller

use anyhow::{Context, Result};
use colored::*;
use mecom::{Value, ValueKind};
use meer_tec::{
    create_transport, parameters, DeviceInfo, Tec, TecConfig, Transport, TransportStats,
};
use serde_json::json;
use std::time::Duration;
use tracing::info;

use crate::params::resolve_target;
use crate::Output;

type Device = Tec<Box<dyn Transport>>;

async fn open(config: &TecConfig) -> Result<Device> {
    let transport = create_transport(&config.transport)?;
    let mut tec = Tec::new(transport, config.device_addr)
        .with_default_instance(config.default_instance);
    tec.connect()
        .await
        .with_context(|| format!("Failed to connect via {}", config.transport.kind()))?;
    Ok(tec)
}

fn value_json(value: Value) -> serde_json::Value {
    match value {
        Value::Float(v) => json!(v),
        Value::Int(v) => json!(v),
    }
}

pub async fn get(
    config: &TecConfig,
    parameter: &str,
    instance: Option<u8>,
    kind: Option<ValueKind>,
    output: Output,
) -> Result<()> {
    let (id, kind) = resolve_target(parameter, kind)?;
    let instance = instance.unwrap_or(config.default_instance);

    let mut tec = open(config).await?;
    let value = tec.get_value(id, kind, instance).await?;
    tec.disconnect().await?;

    let name = parameters::by_id(id).map(|p| p.name);
    if output.json {
        println!(
            "{}",
            json!({
                "id": id,
                "name": name,
                "instance": instance,
                "value": value_json(value),
            })
        );
    } else {
        println!("{}", value);
    }
    Ok(())
}

pub async fn set(
    config: &TecConfig,
    parameter: &str,
    text: &str,
    instance: Option<u8>,
    kind: Option<ValueKind>,
) -> Result<()> {
    let (id, kind) = resolve_target(parameter, kind)?;
    let value = Value::parse(kind, text)?;

    let mut tec = open(config).await?;
    if parameters::by_id(id).is_some() {
        // catalog entries go through the read-only check
        tec.set_named(&id.to_string(), value, instance).await?;
    } else {
        let instance = instance.unwrap_or(config.default_instance);
        tec.set_value(id, value, instance).await?;
    }
    tec.disconnect().await?;

    println!("{} {} = {}", "OK".green(), parameter, value);
    Ok(())
}

pub async fn info(config: &TecConfig, verbose: bool, output: Output) -> Result<()> {
    let mut tec = open(config).await?;
    let info = tec.device_info().await?;
    let link = tec.link_stats().await;
    tec.disconnect().await?;

    if output.json {
        let doc = info_json(&info, verbose.then_some(&link))?;
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    println!("{}", "Device".bright_cyan());
    println!("  address:          {}", config.device_addr);
    println!("  type:             {}", info.device_type);
    println!("  serial number:    {}", info.serial_number);
    println!("  hardware version: {}", format_version(info.hardware_version));
    println!("  firmware version: {}", format_version(info.firmware_version));
    println!("  status:           {}", format_status(info.device_status));
    if verbose {
        print_link(config, &link);
    }
    Ok(())
}

fn info_json(info: &DeviceInfo, link: Option<&TransportStats>) -> Result<serde_json::Value> {
    let mut doc = serde_json::to_value(info)?;
    if let Some(link) = link {
        doc["link"] = serde_json::to_value(link)?;
    }
    Ok(doc)
}

fn print_link(config: &TecConfig, link: &TransportStats) {
    println!("{}", "Link".bright_cyan());
    println!("  transport:        {}", config.transport.kind());
    println!("  state:            {:?}", link.connection_state);
    println!("  uptime:           {:.1?}", link.uptime);
    println!(
        "  bytes:            {} sent, {} received, {} discarded",
        link.bytes_sent, link.bytes_received, link.bytes_discarded
    );
    println!(
        "  connections:      {} of {} attempts",
        link.successful_connections, link.connection_attempts
    );
}

pub async fn monitor(
    config: &TecConfig,
    instance: Option<u8>,
    count: u32,
    interval_ms: u64,
    output: Output,
) -> Result<()> {
    let instance = instance.unwrap_or(config.default_instance);
    let mut tec = open(config).await?;
    let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms.max(1)));

    let mut sample = 0u32;
    while count == 0 || sample < count {
        ticker.tick().await;
        sample += 1;

        let object = tec.object_temperature(instance).await?;
        let sink = tec.sink_temperature(instance).await?;
        let target = tec.target_object_temperature(instance).await?;
        let current = tec.actual_output_current(instance).await?;
        let voltage = tec.actual_output_voltage(instance).await?;
        let stability = tec.temperature_stability(instance).await?;

        if output.json {
            println!(
                "{}",
                json!({
                    "instance": instance,
                    "object_temperature": object,
                    "sink_temperature": sink,
                    "target_object_temperature": target,
                    "actual_output_current": current,
                    "actual_output_voltage": voltage,
                    "temperature_stability": stability,
                })
            );
        } else {
            println!(
                "object {:>8.3} °C  target {:>8.3} °C  sink {:>8.3} °C  {:>7.3} A  {:>7.3} V  {}",
                object,
                target,
                sink,
                current,
                voltage,
                format_stability(stability)
            );
        }
    }

    tec.disconnect().await?;
    Ok(())
}

pub async fn reset(config: &TecConfig) -> Result<()> {
    let mut tec = open(config).await?;
    tec.reset().await?;
    tec.disconnect().await?;
    info!("Device {} is restarting", config.device_addr);
    println!("{} reset acknowledged", "OK".green());
    Ok(())
}

/// 123 means 1.23
fn format_version(raw: u32) -> String {
    format!("{}.{:02}", raw / 100, raw % 100)
}

fn format_status(status: u32) -> ColoredString {
    match status {
        0 => "Init".normal(),
        1 => "Ready".green(),
        2 => "Run".green(),
        3 => "Error".red(),
        4 => "Bootloader".yellow(),
        5 => "Reset pending".yellow(),
        other => format!("Unknown ({})", other).normal(),
    }
}

fn format_stability(stability: u32) -> ColoredString {
    match stability {
        0 => "regulation off".normal(),
        1 => "not stable".yellow(),
        2 => "stable".green(),
        other => format!("stability {}", other).normal(),
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_format_version() {
        assert_eq!(format_version(123), "1.23");
        assert_eq!(format_version(405), "4.05");
        assert_eq!(format_version(7), "0.07");
    }

    #[test]
    fn test_status_labels() {
        colored::control::set_override(false);
        assert_eq!(format_status(2).to_string(), "Run");
        assert_eq!(format_status(9).to_string(), "Unknown (9)");
        assert_eq!(format_stability(2).to_string(), "stable");
    }

    #[test]
    fn test_value_json() {
        assert_eq!(value_json(Value::Int(7)), json!(7));
        assert_eq!(value_json(Value::Float(0.5)), json!(0.5));
    }

    #[test]
    fn test_info_json_link_section() {
        let info = DeviceInfo {
            device_type: 1122,
            hardware_version: 150,
            firmware_version: 460,
            serial_number: 4711,
            device_status: 2,
        };
        let plain = info_json(&info, None).unwrap();
        assert_eq!(plain["serial_number"], json!(4711));
        assert!(plain.get("link").is_none());

        let mut link = TransportStats::new();
        link.record_bytes_discarded(20);
        let verbose = info_json(&info, Some(&link)).unwrap();
        assert_eq!(verbose["link"]["bytes_discarded"], json!(20));
        assert_eq!(verbose["link"]["connection_state"], json!("Disconnected"));
    }
}
