//! Workflow error taxonomy.
//!
//! These are the outcomes a user can act on. Transport-level failures are
//! carried as `anyhow` context instead and never surface raw to the user
//! without an operation name attached.

use thiserror::Error;

/// Errors that terminate a join/leave workflow with a specific remedy.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Discovery plus the liveness gate produced an empty set.
    #[error(
        "no devices found on the local network; make sure the device is powered \
         on and connected, or pass its address explicitly"
    )]
    NoDevicesFound,

    /// The on-device version check failed, either because the OS predates
    /// the configuration tool or because the device is unreachable.
    #[error(
        "device at {address} could not be verified; this workflow requires OS \
         version {min_version} or newer and a reachable device"
    )]
    Incompatible {
        address: String,
        min_version: &'static str,
    },

    /// The identity record parsed but lacks a required field.
    #[error("device identity record is missing the {field} field")]
    Probe { field: &'static str },

    /// A fleet matched by name but none of the matches accept the device.
    #[error("no fleet matching `{name}` accepts device type {device_type}")]
    NoMatchingFleet { name: String, device_type: String },

    /// Fleet creation needs an authenticated identity.
    #[error("not logged in; set a valid API token before creating a fleet")]
    NotLoggedIn,

    /// The user declined a confirmation that the workflow cannot proceed
    /// without.
    #[error("aborted")]
    Aborted,
}
