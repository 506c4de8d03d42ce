//! Offline frame tools
//!
//! Build request frames exactly as the driver would send them, or take apart a frame
//! captured on the wire.

use anyhow::{bail, Result};
use clap::Subcommand;
use colored::*;
use mecom::{
    build_read, build_reset, build_write, checksum, DeviceAddress, Frame, Message,
    SequenceNumber, Value, ValueKind,
};
use serde_json::json;

use crate::params::{resolve_id, resolve_target};
use crate::Output;

#[derive(Subcommand)]
pub enum FrameCommands {
    /// Build a parameter read (?VR) frame
    Read {
        /// Parameter name or decimal ID
        parameter: String,

        #[arg(short, long, default_value_t = 1)]
        instance: u8,

        /// Sequence number, random when omitted
        #[arg(short, long)]
        seq: Option<u16>,
    },

    /// Build a parameter write (VS) frame
    Write {
        /// Parameter name or decimal ID
        parameter: String,

        #[arg(allow_hyphen_values = true)]
        value: String,

        #[arg(short, long, default_value_t = 1)]
        instance: u8,

        /// Value kind (float|int), required for IDs outside the catalog
        #[arg(short, long)]
        kind: Option<ValueKind>,

        /// Sequence number, random when omitted
        #[arg(short, long)]
        seq: Option<u16>,
    },

    /// Build a reset (RS) frame
    Reset {
        /// Sequence number, random when omitted
        #[arg(short, long)]
        seq: Option<u16>,
    },

    /// Decode a captured frame and check its checksum
    Decode {
        /// Frame text; a literal `\r` or a missing terminator is accepted
        frame: String,

        /// How to interpret the payload value
        #[arg(short, long, default_value = "float")]
        kind: ValueKind,
    },
}

pub fn handle_command(cmd: FrameCommands, addr: DeviceAddress, output: Output) -> Result<()> {
    match cmd {
        FrameCommands::Read {
            parameter,
            instance,
            seq,
        } => {
            let id = resolve_id(&parameter)?;
            print_frame(&build_read(addr, id, instance, seq.map(SequenceNumber::from)), output);
        },
        FrameCommands::Write {
            parameter,
            value,
            instance,
            kind,
            seq,
        } => {
            let (id, kind) = resolve_target(&parameter, kind)?;
            let value = Value::parse(kind, &value)?;
            print_frame(
                &build_write(addr, id, instance, value, seq.map(SequenceNumber::from)),
                output,
            );
        },
        FrameCommands::Reset { seq } => {
            print_frame(&build_reset(addr, seq.map(SequenceNumber::from)), output);
        },
        FrameCommands::Decode { frame, kind } => decode(&frame, kind, output)?,
    }
    Ok(())
}

fn print_frame(frame: &Frame, output: Output) {
    if output.json {
        println!(
            "{}",
            json!({
                "frame": frame.as_str(),
                "device_addr": frame.device_addr().value(),
                "sequence": frame.sequence_number().value(),
                "command": frame.command().code(),
            })
        );
    } else {
        println!("{}", frame.as_str().escape_debug());
    }
}

/// Normalise shell input: `\r` written out literally, or no terminator at all
fn normalise(input: &str) -> String {
    let trimmed = input.trim_end_matches("\\r").trim_end_matches('\r');
    format!("{}\r", trimmed)
}

fn decode(input: &str, kind: ValueKind, output: Output) -> Result<()> {
    let raw = normalise(input);
    let message = Message::parse(&raw, kind)?;
    let expected = checksum(message.body());
    let checksum_ok = expected == message.checksum();

    let value = match message.device_error() {
        Some(_) => None,
        None if message.payload().len() == 8 => message.value().ok(),
        None => None,
    };

    if output.json {
        println!(
            "{}",
            json!({
                "reply": message.is_reply(),
                "device_addr": message.device_addr(),
                "sequence": message.sequence_number(),
                "payload": message.payload(),
                "value": value.map(|v| v.to_string()),
                "device_error": message.device_error().map(|e| e.code),
                "checksum": message.checksum(),
                "checksum_expected": expected,
                "checksum_ok": checksum_ok,
            })
        );
    } else {
        let kind_label = if message.is_reply() { "reply" } else { "request" };
        println!("type:      {}", kind_label);
        println!("address:   {}", message.device_addr());
        println!("sequence:  {}", message.sequence_number());
        println!("payload:   {}", message.payload());
        if let Some(err) = message.device_error() {
            println!("error:     {}", err.to_string().red());
        } else if let Some(value) = value {
            println!("value:     {}", value);
        }
        if checksum_ok {
            println!("checksum:  {} {}", message.checksum(), "OK".green());
        } else {
            println!(
                "checksum:  {} {} (expected {})",
                message.checksum(),
                "MISMATCH".red(),
                expected
            );
        }
    }

    if !checksum_ok {
        bail!("checksum mismatch");
    }
    Ok(())
}
