//! Device locator: local network discovery plus the liveness gate.
//!
//! Discovery returns every host advertising a local shell; only hosts that
//! also answer on the management port are fleet devices. The liveness gate
//! probes all candidates in parallel so a slow host bounds the scan instead
//! of every host adding to it.

pub mod mdns;

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use futures::future::join_all;
use tokio::net::TcpStream;
use tracing::debug;

use crate::error::ProvisionError;
use crate::prompt::Prompter;
use crate::report::Reporter;

pub use mdns::MdnsDiscovery;

/// How long one discovery pass listens for advertisements.
pub const DISCOVERY_TIMEOUT: Duration = Duration::from_millis(4000);

/// Management port fleet devices expose on the local network.
pub const MANAGEMENT_PORT: u16 = 2375;

/// Per-candidate liveness probe budget.
pub const LIVENESS_TIMEOUT: Duration = Duration::from_millis(2000);

/// One host seen during discovery. Valid for a single locator invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceCandidate {
    pub address: String,
    pub host: Option<String>,
    pub responsive: bool,
}

impl DeviceCandidate {
    pub fn new(address: impl Into<String>, host: Option<String>) -> Self {
        Self {
            address: address.into(),
            host,
            responsive: false,
        }
    }

    /// `host (address)`, or the bare address when no hostname is known.
    pub fn label(&self) -> String {
        match &self.host {
            Some(host) => format!("{} ({})", host, self.address),
            None => self.address.clone(),
        }
    }
}

/// Produces discovery candidates; the transport lives behind this seam.
#[async_trait]
pub trait Discovery: Send + Sync {
    async fn discover(&self, timeout: Duration) -> anyhow::Result<Vec<DeviceCandidate>>;
}

async fn check_management_port(address: &str, port: u16, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, TcpStream::connect((address, port))).await {
        Ok(Ok(_)) => {
            debug!("{}:{} is open", address, port);
            true
        }
        Ok(Err(e)) => {
            debug!("{}:{} connection failed: {}", address, port, e);
            false
        }
        Err(_) => {
            debug!("{}:{} connection timed out", address, port);
            false
        }
    }
}

/// Probe every candidate in parallel. Results keep discovery order; probe
/// failures mark the candidate unresponsive and are never fatal.
pub async fn probe_candidates(
    candidates: Vec<DeviceCandidate>,
    port: u16,
    timeout: Duration,
) -> Vec<DeviceCandidate> {
    let probes = candidates
        .iter()
        .map(|candidate| check_management_port(&candidate.address, port, timeout));
    let results = join_all(probes).await;

    candidates
        .into_iter()
        .zip(results)
        .map(|(mut candidate, responsive)| {
            candidate.responsive = responsive;
            candidate
        })
        .collect()
}

/// Finds the device a workflow should target.
pub struct Locator<'a> {
    discovery: &'a dyn Discovery,
    prompter: &'a dyn Prompter,
    reporter: &'a dyn Reporter,
    timeout: Duration,
    management_port: u16,
}

impl<'a> Locator<'a> {
    pub fn new(
        discovery: &'a dyn Discovery,
        prompter: &'a dyn Prompter,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            discovery,
            prompter,
            reporter,
            timeout: DISCOVERY_TIMEOUT,
            management_port: MANAGEMENT_PORT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Dev images occasionally remap the management port.
    pub fn with_management_port(mut self, port: u16) -> Self {
        self.management_port = port;
        self
    }

    /// One discovery pass with liveness already probed, no selection.
    pub async fn scan(&self) -> anyhow::Result<Vec<DeviceCandidate>> {
        self.reporter
            .status("Scanning for devices on the local network...");
        let candidates = self.discovery.discover(self.timeout).await?;
        debug!("discovery returned {} candidate(s)", candidates.len());
        Ok(probe_candidates(candidates, self.management_port, LIVENESS_TIMEOUT).await)
    }

    /// Exactly one responsive device, asking the user when several qualify.
    pub async fn locate(&self) -> anyhow::Result<String> {
        let candidates = self.scan().await?;
        let responsive: Vec<DeviceCandidate> = candidates
            .into_iter()
            .filter(|candidate| candidate.responsive)
            .collect();

        match responsive.as_slice() {
            [] => Err(ProvisionError::NoDevicesFound.into()),
            [only] => {
                self.reporter.info(&format!("Found {}", only.label()));
                Ok(only.address.clone())
            }
            _ => {
                let labels: Vec<String> = responsive.iter().map(DeviceCandidate::label).collect();
                let index = self.prompter.select("Select a device", &labels, 0)?;
                let chosen = responsive
                    .get(index)
                    .context("Device selection out of range")?;
                Ok(chosen.address.clone())
            }
        }
    }
}
