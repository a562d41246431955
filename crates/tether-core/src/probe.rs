//! Device probe: identity and compatibility checks over the remote shell.

use std::collections::HashMap;

use anyhow::Context;
use tracing::debug;

use crate::error::ProvisionError;
use crate::remote::RemoteExec;

/// Minimum OS version the workflows support. Older images ship without the
/// on-device configuration tool.
pub const MIN_OS_VERSION: &str = "2.14.0";

/// On-device configuration tool invoked over the remote shell.
pub const OS_CONFIG_TOOL: &str = "os-config";

/// Identity record path on the device.
pub const IDENTITY_RECORD: &str = "/etc/os-release";

/// Parsed identity record: `KEY="value"` lines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OsRelease {
    values: HashMap<String, String>,
}

impl OsRelease {
    pub fn parse(text: &str) -> Self {
        let mut values = HashMap::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            values.insert(
                key.trim().to_string(),
                value.trim().trim_matches('"').to_string(),
            );
        }
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// The device-type slug, required for fleet resolution.
    pub fn slug(&self) -> Result<&str, ProvisionError> {
        self.get("SLUG").ok_or(ProvisionError::Probe { field: "SLUG" })
    }

    /// The OS version, required for configuration generation.
    pub fn version_id(&self) -> Result<&str, ProvisionError> {
        self.get("VERSION_ID")
            .ok_or(ProvisionError::Probe { field: "VERSION_ID" })
    }
}

/// Probes one device. The identity record is fetched at most once per
/// probe, so type and version lookups share a single remote round-trip.
pub struct DeviceProbe<'a> {
    exec: &'a dyn RemoteExec,
    address: String,
    record: Option<OsRelease>,
}

impl<'a> DeviceProbe<'a> {
    pub fn new(exec: &'a dyn RemoteExec, address: impl Into<String>) -> Self {
        Self {
            exec,
            address: address.into(),
            record: None,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Every workflow passes through this gate first. Any failure reads as
    /// an incompatible (or unreachable) device; the transport detail goes
    /// to the log instead of the user.
    pub async fn assert_compatible(&self) -> anyhow::Result<()> {
        let check = format!("{OS_CONFIG_TOOL} --version");
        match self.exec.exec(&self.address, &check).await {
            Ok(_) => Ok(()),
            Err(e) => {
                debug!("compatibility check on {} failed: {e:#}", self.address);
                Err(ProvisionError::Incompatible {
                    address: self.address.clone(),
                    min_version: MIN_OS_VERSION,
                }
                .into())
            }
        }
    }

    pub async fn device_type(&mut self) -> anyhow::Result<String> {
        Ok(self.record().await?.slug()?.to_string())
    }

    pub async fn os_version(&mut self) -> anyhow::Result<String> {
        Ok(self.record().await?.version_id()?.to_string())
    }

    async fn record(&mut self) -> anyhow::Result<&OsRelease> {
        if self.record.is_none() {
            let command = format!("cat {IDENTITY_RECORD}");
            let output = self
                .exec
                .exec(&self.address, &command)
                .await
                .with_context(|| {
                    format!("Failed to read {IDENTITY_RECORD} from {}", self.address)
                })?;
            self.record = Some(OsRelease::parse(&output));
        }
        Ok(self.record.get_or_insert_with(OsRelease::default))
    }
}
