//! Platform API data model.

use serde::{Deserialize, Serialize};

/// A named group of devices sharing configuration and releases.
///
/// Owned by the platform; this crate only reads, filters, and creates
/// fleets. `device_type` and `architecture` come from the expanded
/// device-type association.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fleet {
    pub id: u64,
    pub name: String,
    pub slug: String,
    pub device_type: String,
    pub architecture: String,
}

impl Fleet {
    /// Local copy with the device type overridden.
    ///
    /// Configuration generation needs an exact match with the probed
    /// device; the platform record is never mutated.
    pub fn with_device_type(&self, device_type: &str) -> Fleet {
        Fleet {
            device_type: device_type.to_string(),
            ..self.clone()
        }
    }
}

/// A hardware/board identifier from the platform catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceType {
    pub slug: String,
    pub name: String,
    pub architecture: String,
}

/// Configurable option schema for one device type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceManifest {
    pub slug: String,
    pub options: Vec<OptionDescriptor>,
}

/// One entry in a device-type option schema, consumed by the interactive
/// form renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionDescriptor {
    pub name: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(rename = "type")]
    pub kind: OptionKind,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    #[serde(default)]
    pub choices: Option<Vec<String>>,
}

impl OptionDescriptor {
    /// Prompt text: the descriptor's message, or its name when none is set.
    pub fn label(&self) -> &str {
        self.message.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    Text,
    Number,
    Boolean,
    Select,
}

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: u64,
    pub username: String,
}

/// Architecture pairs beyond identity: binaries built for any architecture
/// in the second position run on devices of the first.
const ARCH_COMPAT: &[(&str, &[&str])] = &[("aarch64", &["armv7hf", "rpi"]), ("armv7hf", &["rpi"])];

/// Can a binary built for `target_arch` run on a device whose OS
/// architecture is `device_arch`?
pub fn is_architecture_compatible(device_arch: &str, target_arch: &str) -> bool {
    if device_arch == target_arch {
        return true;
    }
    ARCH_COMPAT
        .iter()
        .any(|(device, targets)| *device == device_arch && targets.contains(&target_arch))
}
