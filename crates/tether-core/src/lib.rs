//! Tether Core Library
//!
//! Provides the domain logic for joining devices to fleets and removing
//! them again: local network discovery, device probing over a remote shell,
//! fleet resolution against the platform API, and configuration delivery.

pub mod api;
pub mod commands;
pub mod device_config;
pub mod error;
pub mod fleet;
pub mod probe;
pub mod prompt;
pub mod remote;
pub mod report;
pub mod scan;
pub mod settings;

/// Re-exports of commonly used types
pub mod prelude {
    // Workflow commands
    pub use crate::commands::{
        JoinCommand, JoinOptions, JoinReport, LeaveCommand, LeaveOptions, LeaveReport,
    };

    // Errors
    pub use crate::error::ProvisionError;

    // API seam
    pub use crate::api::{
        DeviceManifest, DeviceType, Fleet, FleetApi, FleetFilter, HttpFleetApi, OptionDescriptor,
        OptionKind, User,
    };

    // Device access
    pub use crate::probe::{DeviceProbe, OsRelease};
    pub use crate::remote::{RemoteExec, SshExec};
    pub use crate::scan::{DeviceCandidate, Discovery, Locator, MdnsDiscovery};

    // Interaction seams
    pub use crate::prompt::Prompter;
    pub use crate::report::{NullReporter, Reporter};

    // Settings
    pub use crate::settings::Settings;
}
