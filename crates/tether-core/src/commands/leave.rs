//! Leave workflow: take a device out of fleet management.

use anyhow::Context;
use tracing::info;

use crate::probe::{DeviceProbe, OS_CONFIG_TOOL};
use crate::prompt::Prompter;
use crate::remote::RemoteExec;
use crate::report::Reporter;
use crate::scan::{Discovery, Locator};

#[derive(Debug, Clone, Default)]
pub struct LeaveOptions {
    pub address: Option<String>,
}

impl LeaveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct LeaveReport {
    pub address: String,
}

/// No fleet interaction here: the device unregisters itself once its
/// configuration is removed.
pub struct LeaveCommand<'a> {
    exec: &'a dyn RemoteExec,
    discovery: &'a dyn Discovery,
    prompter: &'a dyn Prompter,
    reporter: &'a dyn Reporter,
}

impl<'a> LeaveCommand<'a> {
    pub fn new(
        exec: &'a dyn RemoteExec,
        discovery: &'a dyn Discovery,
        prompter: &'a dyn Prompter,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            exec,
            discovery,
            prompter,
            reporter,
        }
    }

    pub async fn execute(&self, options: &LeaveOptions) -> anyhow::Result<LeaveReport> {
        let address = match &options.address {
            Some(address) => address.clone(),
            None => {
                Locator::new(self.discovery, self.prompter, self.reporter)
                    .locate()
                    .await?
            }
        };
        info!("removing device at {address} from fleet management");

        self.reporter.status(&format!("Checking {address}..."));
        let probe = DeviceProbe::new(self.exec, &address);
        probe.assert_compatible().await?;

        self.reporter.status(&format!("Deconfiguring {address}..."));
        let command = format!("{OS_CONFIG_TOOL} leave");
        let sink = |line: &str| {
            if !line.is_empty() {
                self.reporter.status(line);
            }
        };
        self.exec
            .exec_streaming(&address, &command, &sink)
            .await
            .context("Failed to remove the configuration")?;

        self.reporter
            .info(&format!("Device at {address} left fleet management"));
        Ok(LeaveReport { address })
    }
}
