//! tecctl - Meerstetter TEC command line tool
//!
//! Builds MeCom frames offline and talks to controllers over TCP (XPort bridge) or a
//! serial/USB port.

mod device;
mod frame;
mod params;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mecom::{DeviceAddress, ValueKind};
use meer_tec::transport::tcp::DEFAULT_TCP_PORT;
use meer_tec::{TecConfig, TransportSettings};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tecctl")]
#[command(about = "Meerstetter TEC controller tool")]
#[command(long_about = "Meerstetter TEC controller tool

Offline:
  frame       Build request frames or decode a received frame
  params      List the known parameters
  config      Print the effective configuration

Device:
  get         Read a parameter
  set         Write a parameter
  info        Show device identification
  monitor     Poll temperatures, current and voltage
  reset       Reset the device

Examples:
  tecctl frame read object_temperature --instance 1 --seq 1
  tecctl --tcp 192.168.1.50 get object_temperature
  tecctl --serial /dev/ttyUSB0 set target_object_temperature 25.5
  tecctl --tcp 192.168.1.50:10001 get 3034 --kind int")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Configuration file (YAML), MEERTEC_* environment variables apply on top
    #[arg(short = 'c', long, global = true, env = "MEERTEC_CONFIG")]
    config: Option<PathBuf>,

    /// Device address (0 broadcasts)
    #[arg(short = 'a', long, global = true)]
    addr: Option<u8>,

    /// Connect through a TCP bridge, host[:port]
    #[arg(long, global = true, conflicts_with = "serial")]
    tcp: Option<String>,

    /// Connect through a serial/USB port
    #[arg(long, global = true)]
    serial: Option<String>,

    /// Request timeout in milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build or decode frames without a device
    #[command(subcommand)]
    Frame(frame::FrameCommands),

    /// List the parameter catalog
    Params,

    /// Print the effective configuration as YAML
    Config,

    /// Read a parameter by name or ID
    Get {
        /// Parameter name or decimal ID
        parameter: String,

        /// Instance (channel), defaults to the configured instance
        #[arg(short, long)]
        instance: Option<u8>,

        /// Value kind (float|int), required for IDs outside the catalog
        #[arg(short, long)]
        kind: Option<ValueKind>,
    },

    /// Write a parameter by name or ID
    Set {
        /// Parameter name or decimal ID
        parameter: String,

        /// New value
        #[arg(allow_hyphen_values = true)]
        value: String,

        /// Instance (channel), defaults to the configured instance
        #[arg(short, long)]
        instance: Option<u8>,

        /// Value kind (float|int), required for IDs outside the catalog
        #[arg(short, long)]
        kind: Option<ValueKind>,
    },

    /// Show device identification and status
    Info,

    /// Poll monitor values of one channel
    Monitor {
        /// Instance (channel), defaults to the configured instance
        #[arg(short, long)]
        instance: Option<u8>,

        /// Number of samples, 0 polls until interrupted
        #[arg(short = 'n', long, default_value_t = 1)]
        count: u32,

        /// Delay between samples
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
    },

    /// Reset the device
    Reset,
}

/// Output settings shared by the subcommands
#[derive(Debug, Clone, Copy)]
pub struct Output {
    pub json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    // RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = effective_config(&cli)?;
    debug!("Effective configuration: {:?}", config);
    let output = Output { json: cli.json };

    match cli.command {
        Commands::Frame(cmd) => frame::handle_command(cmd, config.device_addr, output),
        Commands::Params => params::list(output),
        Commands::Config => {
            print!("{}", config.to_yaml()?);
            Ok(())
        },
        Commands::Get {
            parameter,
            instance,
            kind,
        } => device::get(&config, &parameter, instance, kind, output).await,
        Commands::Set {
            parameter,
            value,
            instance,
            kind,
        } => device::set(&config, &parameter, &value, instance, kind).await,
        Commands::Info => device::info(&config, cli.verbose, output).await,
        Commands::Monitor {
            instance,
            count,
            interval_ms,
        } => device::monitor(&config, instance, count, interval_ms, output).await,
        Commands::Reset => device::reset(&config).await,
    }
}

/// Config file and environment, then command line overrides
fn effective_config(cli: &Cli) -> Result<TecConfig> {
    let mut config = TecConfig::load(cli.config.as_deref())
        .with_context(|| "Failed to load configuration")?;

    if let Some(addr) = cli.addr {
        config.device_addr = DeviceAddress::from(addr);
    }

    if let Some(target) = cli.tcp.as_deref() {
        let (host, port) = parse_tcp_target(target)?;
        config.transport = TransportSettings::tcp(host, port);
    } else if let Some(port) = cli.serial.as_deref() {
        config.transport = TransportSettings::serial(port);
    }

    if let Some(ms) = cli.timeout_ms {
        match &mut config.transport {
            TransportSettings::Tcp { timeout_ms, .. }
            | TransportSettings::Serial { timeout_ms, .. } => {
                *timeout_ms = ms;
            },
        }
    }

    config.validate()?;
    Ok(config)
}

/// `host` or `host:port`
fn parse_tcp_target(target: &str) -> Result<(String, u16)> {
    match target.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse::<u16>()
                .with_context(|| format!("Invalid TCP port in '{}'", target))?;
            Ok((host.to_string(), port))
        },
        None => Ok((target.to_string(), DEFAULT_TCP_PORT)),
    }
}
