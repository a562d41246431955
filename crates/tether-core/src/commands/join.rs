//! Join workflow: provision a device into a fleet.

use anyhow::Context;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use tracing::{debug, info};

use crate::api::FleetApi;
use crate::device_config::{ConfigGenerator, GenerateOptions};
use crate::fleet::FleetResolver;
use crate::probe::{DeviceProbe, OS_CONFIG_TOOL};
use crate::prompt::Prompter;
use crate::remote::RemoteExec;
use crate::report::Reporter;
use crate::scan::{Discovery, Locator};

/// Caller-tunable inputs to a join.
#[derive(Debug, Clone, Default)]
pub struct JoinOptions {
    pub address: Option<String>,
    pub fleet: Option<String>,
    pub app_update_poll_interval: Option<u64>,
}

impl JoinOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_fleet(mut self, fleet: impl Into<String>) -> Self {
        self.fleet = Some(fleet.into());
        self
    }

    pub fn with_poll_interval(mut self, milliseconds: u64) -> Self {
        self.app_update_poll_interval = Some(milliseconds);
        self
    }
}

/// Outcome of a successful join.
#[derive(Debug, Clone)]
pub struct JoinReport {
    pub address: String,
    pub fleet_slug: String,
    pub dashboard_url: String,
}

pub struct JoinCommand<'a> {
    api: &'a dyn FleetApi,
    exec: &'a dyn RemoteExec,
    discovery: &'a dyn Discovery,
    prompter: &'a dyn Prompter,
    reporter: &'a dyn Reporter,
}

impl<'a> JoinCommand<'a> {
    pub fn new(
        api: &'a dyn FleetApi,
        exec: &'a dyn RemoteExec,
        discovery: &'a dyn Discovery,
        prompter: &'a dyn Prompter,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            api,
            exec,
            discovery,
            prompter,
            reporter,
        }
    }

    pub async fn execute(&self, options: &JoinOptions) -> anyhow::Result<JoinReport> {
        let address = match &options.address {
            Some(address) => address.clone(),
            None => {
                Locator::new(self.discovery, self.prompter, self.reporter)
                    .locate()
                    .await?
            }
        };
        info!("joining device at {address}");

        self.reporter.status(&format!("Checking {address}..."));
        let mut probe = DeviceProbe::new(self.exec, &address);
        probe.assert_compatible().await?;

        let device_type = probe.device_type().await?;
        debug!("device reports type {device_type}");

        let resolver = FleetResolver::new(self.api, self.prompter, self.reporter);
        let fleet = resolver
            .resolve(&device_type, options.fleet.as_deref())
            .await?;

        // Configuration must target the probed hardware even when the
        // fleet was created for a sibling type; the platform record stays
        // as is.
        let fleet = if fleet.device_type == device_type {
            fleet
        } else {
            debug!(
                "forcing device type {} over fleet default {}",
                device_type, fleet.device_type
            );
            fleet.with_device_type(&device_type)
        };

        let os_version = probe.os_version().await?;
        let generator = ConfigGenerator::new(self.api, self.prompter);
        let payload = generator
            .generate(
                &fleet,
                &GenerateOptions {
                    os_version,
                    app_update_poll_interval: options.app_update_poll_interval,
                },
            )
            .await?;

        self.reporter.status(&format!("Configuring {address}..."));
        let command = join_command(&payload)?;
        let sink = |line: &str| {
            if !line.is_empty() {
                self.reporter.status(line);
            }
        };
        self.exec
            .exec_streaming(&address, &command, &sink)
            .await
            .context("Failed to deliver the configuration")?;

        self.reporter
            .info(&format!("Device at {address} joined {}", fleet.slug));
        Ok(JoinReport {
            address,
            fleet_slug: fleet.slug,
            dashboard_url: self.api.base_url(),
        })
    }
}

/// One-line apply command. The payload travels base64-encoded so quoting
/// survives the remote shell; the device-side tool decodes, parses, and
/// applies it atomically.
fn join_command(payload: &serde_json::Map<String, serde_json::Value>) -> anyhow::Result<String> {
    let json =
        serde_json::to_string(payload).context("Failed to serialize the configuration payload")?;
    let encoded = BASE64.encode(json);
    Ok(format!(
        r#"{OS_CONFIG_TOOL} join "$(base64 -d <<< {encoded})""#
    ))
}
