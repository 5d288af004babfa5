//! # DAL Supervisor Binary
//!
//! Loads a device configuration, connects every device through the
//! simulation transport and runs one command against them.
//!
//! # Usage
//!
//! ```bash
//! # Print every device's state
//! dal --config dal/config/devices.toml status
//!
//! # Same, as JSON
//! dal --config dal/config/devices.toml status --output json
//!
//! # Open a stopper and wait for the limits to confirm
//! dal --config dal/config/devices.toml move st1 OUT --timeout-ms 3000
//!
//! # Log every state change until Ctrl-C
//! dal --config dal/config/devices.toml -v watch
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use dal_common::config::{ConfigError, ConfigLoader, DalConfig, LogLevel};
use dal_common::consts::{DAL_SERVICE_NAME, DEFAULT_CONFIG_PATH};
use dal_common::signal::StateLabel;
use dal_device::prelude::{Device, DeviceRegistry, DeviceSnapshot, StateChange};
use dal_sim::SimTransport;
use tokio::signal;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

/// DAL Supervisor - observe and command discrete devices
#[derive(Parser, Debug)]
#[command(name = DAL_SERVICE_NAME)]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Device abstraction layer: state aggregation and move completion")]
#[command(long_about = None)]
struct Args {
    /// Path to the device configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the aggregate state of every device.
    Status {
        /// Output format.
        #[arg(long, value_enum, default_value_t = Output::Text)]
        output: Output,
    },
    /// Move a device to a state and wait for the outcome.
    Move {
        /// Device name.
        device: String,
        /// Target state (e.g. IN, OUT).
        state: String,
        /// Override the device's move timeout.
        #[arg(long, value_name = "MS")]
        timeout_ms: Option<u64>,
    },
    /// Log every aggregate state change until Ctrl-C.
    Watch,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Output {
    Text,
    Json,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("dal failed: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let loaded = load_config(&args);
    setup_tracing(&args, loaded.as_ref().ok().map(|c| c.shared.log_level));
    let config = loaded.map_err(|e| format!("{}: {}", args.config.display(), e))?;

    info!(
        "DAL v{} ({}) starting with {} devices",
        env!("CARGO_PKG_VERSION"),
        config.shared.service_name,
        config.devices.len()
    );

    let transport = SimTransport::from_config(&config.simulation);
    let registry = DeviceRegistry::from_config(&config, &transport)?;

    match args.command {
        Command::Status { output } => print_status(&registry.snapshots(), output)?,
        Command::Move {
            device,
            state,
            timeout_ms,
        } => {
            let target: StateLabel = state.parse()?;
            let device = registry.require(&device)?;
            move_device(device, target, timeout_ms.map(Duration::from_millis)).await?;
        }
        Command::Watch => watch(&registry).await?,
    }

    info!("DAL shutdown complete");
    Ok(())
}

fn load_config(args: &Args) -> Result<DalConfig, ConfigError> {
    let config = DalConfig::load(&args.config)?;
    config.validate()?;
    Ok(config)
}

fn print_status(
    snapshots: &[DeviceSnapshot],
    output: Output,
) -> Result<(), Box<dyn std::error::Error>> {
    match output {
        Output::Json => println!("{}", serde_json::to_string_pretty(snapshots)?),
        Output::Text => {
            for snapshot in snapshots {
                let mut flags = Vec::new();
                if snapshot.interlocked {
                    flags.push("interlocked".to_string());
                }
                if !snapshot.reachable {
                    flags.push("unreachable".to_string());
                }
                if let Some(target) = &snapshot.moving_to {
                    flags.push(format!("moving to {target}"));
                }
                println!("{:<16} {:<10} {}", snapshot.name, snapshot.state, flags.join(", "));
            }
        }
    }
    Ok(())
}

async fn move_device(
    device: &Device,
    target: StateLabel,
    timeout: Option<Duration>,
) -> Result<(), Box<dyn std::error::Error>> {
    let status = device.move_to(target, timeout)?;
    info!(
        "Moving '{}' from {} to {}",
        device.name(),
        device.current_state(),
        status.target()
    );

    let outcome = tokio::select! {
        outcome = status.wait() => outcome,
        _ = signal::ctrl_c() => {
            warn!("Received shutdown signal, cancelling move");
            device.cancel(&status);
            status.wait().await
        }
    };

    let reached = outcome?;
    info!("'{}' reached {}", device.name(), reached);
    Ok(())
}

async fn watch(registry: &DeviceRegistry) -> Result<(), Box<dyn std::error::Error>> {
    let observers: Vec<_> = registry
        .iter()
        .map(|device| {
            let id = device.subscribe(
                |change: &StateChange| {
                    info!("{}: {} -> {}", change.device, change.previous, change.current);
                },
                true,
            );
            (device, id)
        })
        .collect();

    info!("Watching {} devices, Ctrl-C to stop", observers.len());
    signal::ctrl_c().await?;
    info!("Received shutdown signal");

    for (device, id) in observers {
        device.unsubscribe(id);
    }
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments and the configured level.
///
/// `RUST_LOG` wins over the config file; `-v` adds a debug directive.
fn setup_tracing(args: &Args, configured: Option<LogLevel>) {
    let default_level = configured.unwrap_or_default().as_directive();
    let mut filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    if args.verbose {
        filter = filter.add_directive(Level::DEBUG.into());
    }

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
