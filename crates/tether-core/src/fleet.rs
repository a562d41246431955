//! Fleet resolution and creation.
//!
//! Resolution narrows the caller's accessible fleets to exactly one:
//! compatibility filtering happens after name matching, so a name match
//! determines the candidate set and an incompatible sole match is rejected
//! instead of silently used.

use anyhow::Context;
use tracing::debug;

use crate::api::{DeviceType, Fleet, FleetApi, FleetFilter};
use crate::error::ProvisionError;
use crate::prompt::Prompter;
use crate::report::Reporter;

pub struct FleetResolver<'a> {
    api: &'a dyn FleetApi,
    prompter: &'a dyn Prompter,
    reporter: &'a dyn Reporter,
}

impl<'a> FleetResolver<'a> {
    pub fn new(
        api: &'a dyn FleetApi,
        prompter: &'a dyn Prompter,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            api,
            prompter,
            reporter,
        }
    }

    /// Resolve the target fleet for a device of type `device_type`,
    /// optionally constrained to `name` (a display name or a `ns/name`
    /// slug). Never returns a fleet whose device type the device cannot
    /// run.
    pub async fn resolve(&self, device_type: &str, name: Option<&str>) -> anyhow::Result<Fleet> {
        let probed = self
            .api
            .device_type(device_type)
            .await
            .with_context(|| format!("Unknown device type {device_type}"))?;
        let compatible = self.compatible_device_types(&probed).await?;

        match name {
            Some(name) => self.resolve_named(device_type, &compatible, name).await,
            None => self.resolve_any(device_type, &compatible).await,
        }
    }

    /// Catalog slugs whose binaries the probed device can run.
    async fn compatible_device_types(&self, probed: &DeviceType) -> anyhow::Result<Vec<String>> {
        let catalog = self.api.supported_device_types().await?;
        let slugs: Vec<String> = catalog
            .into_iter()
            .filter(|entry| {
                self.api
                    .is_architecture_compatible(&probed.architecture, &entry.architecture)
            })
            .map(|entry| entry.slug)
            .collect();
        debug!(
            "{} of the catalog is compatible with {}",
            slugs.len(),
            probed.slug
        );
        Ok(slugs)
    }

    /// No name given: offer every accessible compatible fleet. The user
    /// confirms the target even when only one qualifies, since nothing was
    /// named.
    async fn resolve_any(&self, device_type: &str, compatible: &[String]) -> anyhow::Result<Fleet> {
        let fleets = self
            .api
            .fleets(&FleetFilter::DeviceTypes(compatible.to_vec()))
            .await?;

        if fleets.is_empty() {
            let create = self
                .prompter
                .confirm("No fleet accepts this device type. Create one?", true)?;
            if !create {
                return Err(ProvisionError::Aborted.into());
            }
            return self.create(device_type, None).await;
        }

        let labels: Vec<String> = fleets.iter().map(|fleet| fleet.slug.clone()).collect();
        let index = self.prompter.select("Select a fleet", &labels, 0)?;
        let fleet = fleets.get(index).context("Fleet selection out of range")?;
        Ok(fleet.clone())
    }

    async fn resolve_named(
        &self,
        device_type: &str,
        compatible: &[String],
        name: &str,
    ) -> anyhow::Result<Fleet> {
        // `ns/name` means an exact slug; the part after the slash doubles
        // as the display name if the fleet has to be created.
        let (filter, display) = match name.split_once('/') {
            Some((_, short)) => (FleetFilter::Slug(name.to_lowercase()), short.to_string()),
            None => (FleetFilter::Name(name.to_string()), name.to_string()),
        };

        let matches = self.api.fleets(&filter).await?;
        if matches.is_empty() {
            let create = self
                .prompter
                .confirm(&format!("Fleet {name} not found. Create it?"), true)?;
            if !create {
                return Err(ProvisionError::Aborted.into());
            }
            return self.create(device_type, Some(&display)).await;
        }

        let eligible: Vec<Fleet> = matches
            .into_iter()
            .filter(|fleet| compatible.contains(&fleet.device_type))
            .collect();

        match eligible.as_slice() {
            [] => Err(ProvisionError::NoMatchingFleet {
                name: name.to_string(),
                device_type: device_type.to_string(),
            }
            .into()),
            [only] => Ok(only.clone()),
            _ => {
                let labels: Vec<String> =
                    eligible.iter().map(|fleet| fleet.slug.clone()).collect();
                let index = self
                    .prompter
                    .select("Several fleets match; select one", &labels, 0)?;
                let fleet = eligible.get(index).context("Fleet selection out of range")?;
                Ok(fleet.clone())
            }
        }
    }

    /// Create a fleet under the caller's namespace, looping on invalid or
    /// colliding names until one is accepted.
    pub async fn create(
        &self,
        device_type: &str,
        default_name: Option<&str>,
    ) -> anyhow::Result<Fleet> {
        let user = self
            .api
            .whoami()
            .await?
            .ok_or(ProvisionError::NotLoggedIn)?;

        let name = loop {
            let entered = self.prompter.input("Fleet name", default_name)?;
            if let Err(reason) = validate_fleet_name(&entered) {
                self.reporter
                    .info(&format!("`{entered}` will not work: {reason}"));
                continue;
            }

            let slug = format!("{}/{}", user.username, entered.to_lowercase());
            // A failed duplicate check is an error, not an available name;
            // a transient platform outage must not trigger a
            // duplicate-create attempt.
            let existing = self
                .api
                .fleets(&FleetFilter::Slug(slug))
                .await
                .context("Failed to check for an existing fleet with that name")?;
            if existing.is_empty() {
                break entered;
            }
            self.reporter
                .info(&format!("You already have a fleet named {entered}"));
        };

        self.reporter.status(&format!("Creating fleet {name}..."));
        let created = self
            .api
            .create_fleet(&name, device_type, &user.username)
            .await?;
        debug!("created fleet {} (id {})", created.slug, created.id);

        // Fetch back with the device-type association expanded.
        self.api.fleet(created.id).await
    }
}

/// Platform naming rules for fleets.
pub fn validate_fleet_name(name: &str) -> Result<(), String> {
    if name.len() < 4 {
        return Err("must be at least 4 characters long".to_string());
    }
    if name.len() > 50 {
        return Err("must be at most 50 characters long".to_string());
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err("may only contain letters, digits, dashes and underscores".to_string());
    }
    Ok(())
}
