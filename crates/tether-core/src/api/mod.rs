//! Fleet-management API seam.
//!
//! The workflows consume the platform through the [`FleetApi`] trait so the
//! orchestration logic stays independent of the transport. [`HttpFleetApi`]
//! is the production implementation; tests substitute scripted fakes.

pub mod http;
mod models;

use async_trait::async_trait;

pub use http::HttpFleetApi;
pub use models::{
    DeviceManifest, DeviceType, Fleet, OptionDescriptor, OptionKind, User,
    is_architecture_compatible,
};

/// How to scope a fleet query.
#[derive(Debug, Clone, PartialEq)]
pub enum FleetFilter {
    /// Exact display-name match.
    Name(String),
    /// Exact fully-qualified slug match, case-insensitive.
    Slug(String),
    /// Fleets whose device type is any of the given slugs.
    DeviceTypes(Vec<String>),
}

/// Operations the platform exposes to the provisioning workflows.
#[async_trait]
pub trait FleetApi: Send + Sync {
    /// One device type by catalog slug.
    async fn device_type(&self, slug: &str) -> anyhow::Result<DeviceType>;

    /// The full catalog of supported device types.
    async fn supported_device_types(&self) -> anyhow::Result<Vec<DeviceType>>;

    /// Catalog compatibility rule; see [`is_architecture_compatible`].
    fn is_architecture_compatible(&self, device_arch: &str, target_arch: &str) -> bool {
        models::is_architecture_compatible(device_arch, target_arch)
    }

    /// Fleets accessible to the caller, scoped by `filter`.
    async fn fleets(&self, filter: &FleetFilter) -> anyhow::Result<Vec<Fleet>>;

    /// Create a fleet under `owner`. The returned record may lack the
    /// expanded device-type association; fetch it again via [`Self::fleet`].
    async fn create_fleet(
        &self,
        name: &str,
        device_type: &str,
        owner: &str,
    ) -> anyhow::Result<Fleet>;

    /// One fleet by id, device-type association expanded.
    async fn fleet(&self, id: u64) -> anyhow::Result<Fleet>;

    /// Configurable option schema for a device type.
    async fn device_manifest(&self, slug: &str) -> anyhow::Result<DeviceManifest>;

    /// The authenticated caller, or `None` when the token is absent or
    /// rejected.
    async fn whoami(&self) -> anyhow::Result<Option<User>>;

    /// Pin a device to a release commit.
    async fn pin_device(&self, uuid: &str, commit: &str) -> anyhow::Result<()>;

    /// User-facing platform base URL.
    fn base_url(&self) -> String;
}
