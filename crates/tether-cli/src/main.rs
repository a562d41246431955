//! Tether - join local devices to cloud-managed fleets
//!
//! Usage:
//!   tether join                              # Discover a device and join it
//!   tether join 192.168.1.50 --fleet myorg/myfleet
//!   tether leave                             # Remove a device from its fleet
//!   tether scan                              # List devices on the local network
//!   tether whoami                            # Show the authenticated account

mod prompt;
mod ui;

use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tether_core::api::{FleetApi, HttpFleetApi};
use tether_core::commands::{JoinCommand, JoinOptions, LeaveCommand, LeaveOptions};
use tether_core::remote::SshExec;
use tether_core::scan::{DISCOVERY_TIMEOUT, DeviceCandidate, Locator, MdnsDiscovery};
use tether_core::settings::Settings;

use crate::prompt::TermPrompter;
use crate::ui::SpinnerReporter;

#[derive(Parser)]
#[command(name = "tether")]
#[command(about = "Join local devices to cloud-managed fleets", long_about = None)]
struct Cli {
    /// Platform API endpoint (overrides the settings file and TETHER_API_URL)
    #[arg(long, global = true, value_name = "URL")]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Join a device to a fleet
    Join {
        /// Device address; discovered on the local network when omitted
        address: Option<String>,

        /// Fleet to join, as a name or a ns/name slug
        #[arg(long, short)]
        fleet: Option<String>,

        /// Application update poll interval in milliseconds
        #[arg(long, value_name = "MILLISECONDS")]
        poll_interval: Option<u64>,
    },

    /// Remove a device from fleet management
    Leave {
        /// Device address; discovered on the local network when omitted
        address: Option<String>,
    },

    /// List devices on the local network
    Scan {
        /// Discovery window in milliseconds
        #[arg(long, value_name = "MILLISECONDS", default_value_t = DISCOVERY_TIMEOUT.as_millis() as u64)]
        timeout: u64,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show the authenticated account
    Whoami {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Pin a device to a specific release commit
    Pin {
        /// Device UUID
        uuid: String,

        /// Release commit to pin to
        commit: String,
    },
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing; quiet by default so prompts and spinners stay
    // readable, RUST_LOG opts in.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tether=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut settings = Settings::load()?;
    if let Some(api_url) = cli.api_url {
        settings.api_url = api_url;
    }
    debug!("using API endpoint {}", settings.api_url);

    if let Err(err) = run(cli.command, &settings).await {
        eprintln!("{} {:#}", style("Error:").red().bold(), err);
        std::process::exit(1);
    }

    Ok(())
}

async fn run(command: Commands, settings: &Settings) -> Result<()> {
    match command {
        Commands::Join {
            address,
            fleet,
            poll_interval,
        } => run_join(settings, address, fleet, poll_interval).await,
        Commands::Leave { address } => run_leave(address).await,
        Commands::Scan { timeout, format } => run_scan(timeout, format).await,
        Commands::Whoami { format } => run_whoami(settings, format).await,
        Commands::Pin { uuid, commit } => run_pin(settings, uuid, commit).await,
    }
}

async fn run_join(
    settings: &Settings,
    address: Option<String>,
    fleet: Option<String>,
    poll_interval: Option<u64>,
) -> Result<()> {
    let api = HttpFleetApi::new(settings)?;
    let exec = SshExec::new();
    let discovery = MdnsDiscovery;
    let prompter = TermPrompter::new();
    let reporter = SpinnerReporter::new();

    let mut options = JoinOptions::new();
    if let Some(address) = address {
        options = options.with_address(address);
    }
    if let Some(fleet) = fleet {
        options = options.with_fleet(fleet);
    }
    if let Some(interval) = poll_interval {
        options = options.with_poll_interval(interval);
    }

    let command = JoinCommand::new(&api, &exec, &discovery, &prompter, &reporter);
    let result = command.execute(&options).await;
    reporter.finish();
    let report = result?;

    ui::print_success(&format!(
        "Device at {} joined {}",
        report.address, report.fleet_slug
    ));
    ui::print_next_step(&format!("Manage the fleet at {}", report.dashboard_url));
    Ok(())
}

async fn run_leave(address: Option<String>) -> Result<()> {
    let exec = SshExec::new();
    let discovery = MdnsDiscovery;
    let prompter = TermPrompter::new();
    let reporter = SpinnerReporter::new();

    let mut options = LeaveOptions::new();
    if let Some(address) = address {
        options = options.with_address(address);
    }

    let command = LeaveCommand::new(&exec, &discovery, &prompter, &reporter);
    let result = command.execute(&options).await;
    reporter.finish();
    let report = result?;

    ui::print_success(&format!(
        "Device at {} left fleet management",
        report.address
    ));
    Ok(())
}

async fn run_scan(timeout: u64, format: OutputFormat) -> Result<()> {
    let discovery = MdnsDiscovery;
    let prompter = TermPrompter::new();
    let reporter = SpinnerReporter::new();

    let locator = Locator::new(&discovery, &prompter, &reporter)
        .with_timeout(Duration::from_millis(timeout));
    let result = locator.scan().await;
    reporter.finish();
    let devices = result?;

    match format {
        OutputFormat::Table => print_device_table(&devices),
        OutputFormat::Json => print_device_json(&devices)?,
    }
    Ok(())
}

fn print_device_table(devices: &[DeviceCandidate]) {
    if devices.is_empty() {
        println!("No devices found on the local network.");
        return;
    }
    print!("{}", render_device_table(devices));
}

fn render_device_table(devices: &[DeviceCandidate]) -> String {
    // Discovery can return IPv6 addresses, so columns size to the data.
    let address_width = devices
        .iter()
        .map(|device| device.address.len())
        .max()
        .unwrap_or(0)
        .max("Address".len());
    let host_width = devices
        .iter()
        .map(|device| device.host.as_deref().unwrap_or("-").len())
        .max()
        .unwrap_or(0)
        .max("Host".len());

    let header = format!("{:<address_width$} {:<host_width$} Responsive", "Address", "Host");
    let mut table = format!("{header}\n{}\n", "-".repeat(header.len()));
    for device in devices {
        table.push_str(&format!(
            "{:<address_width$} {:<host_width$} {}\n",
            device.address,
            device.host.as_deref().unwrap_or("-"),
            if device.responsive { "yes" } else { "no" }
        ));
    }
    table
}

fn print_device_json(devices: &[DeviceCandidate]) -> Result<()> {
    let output: Vec<_> = devices
        .iter()
        .map(|device| {
            serde_json::json!({
                "address": device.address,
                "host": device.host,
                "responsive": device.responsive,
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run_whoami(settings: &Settings, format: OutputFormat) -> Result<()> {
    let api = HttpFleetApi::new(settings)?;

    match api.whoami().await? {
        Some(user) => match format {
            OutputFormat::Table => {
                println!("Logged in as {} (id {})", user.username, user.id);
                println!("Platform: {}", api.base_url());
            }
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "username": user.username,
                    "id": user.id,
                    "platform": api.base_url(),
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
        },
        None => {
            ui::print_error("Not logged in. Set TETHER_TOKEN or add a token to the settings file.");
            std::process::exit(1);
        }
    }

    Ok(())
}

async fn run_pin(settings: &Settings, uuid: String, commit: String) -> Result<()> {
    let api = HttpFleetApi::new(settings)?;
    api.pin_device(&uuid, &commit).await?;
    ui::print_success(&format!("Device {uuid} pinned to {commit}"));
    Ok(())
}
