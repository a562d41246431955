//! Device configuration synthesis.
//!
//! Builds the JSON payload a device applies when it joins a fleet: the
//! device-type option schema rendered as an interactive form, caller
//! overrides, the probed OS version, and the fleet association.

use anyhow::Context;
use serde_json::{Map, Value};
use tracing::debug;

use crate::api::{Fleet, FleetApi, OptionDescriptor, OptionKind};
use crate::prompt::Prompter;

/// Option excluded from the interactive schema; network setup is handled
/// out-of-band.
const NETWORK_OPTION: &str = "network";

/// Connection manager mode of offline/local devices. `connectivity` and
/// `files` only mean something to network-connected configuration methods.
const LOCAL_CONNECTIVITY: &str = "connman";

/// Caller-supplied inputs to one generation pass.
pub struct GenerateOptions {
    pub os_version: String,
    pub app_update_poll_interval: Option<u64>,
}

pub struct ConfigGenerator<'a> {
    api: &'a dyn FleetApi,
    prompter: &'a dyn Prompter,
}

impl<'a> ConfigGenerator<'a> {
    pub fn new(api: &'a dyn FleetApi, prompter: &'a dyn Prompter) -> Self {
        Self { api, prompter }
    }

    /// The fleet's device type must already match the device; callers force
    /// it beforehand when the fleet was created for a sibling type.
    pub async fn generate(
        &self,
        fleet: &Fleet,
        options: &GenerateOptions,
    ) -> anyhow::Result<Map<String, Value>> {
        let manifest = self
            .api
            .device_manifest(&fleet.device_type)
            .await
            .with_context(|| format!("Failed to fetch the {} manifest", fleet.device_type))?;

        let mut payload = Map::new();
        for descriptor in &manifest.options {
            if descriptor.name == NETWORK_OPTION {
                debug!("skipping the {NETWORK_OPTION} option group");
                continue;
            }
            let value = match (descriptor.name.as_str(), options.app_update_poll_interval) {
                ("appUpdatePollInterval", Some(interval)) => Value::from(interval),
                _ => self.render(descriptor)?,
            };
            payload.insert(descriptor.name.clone(), value);
        }

        payload.insert(
            "osVersion".to_string(),
            Value::from(normalize_os_version(&options.os_version)?),
        );
        payload.insert("applicationId".to_string(), Value::from(fleet.id));

        if payload.get("connectivity").and_then(Value::as_str) == Some(LOCAL_CONNECTIVITY) {
            payload.remove("connectivity");
            payload.remove("files");
        }

        Ok(payload)
    }

    fn render(&self, descriptor: &OptionDescriptor) -> anyhow::Result<Value> {
        match descriptor.kind {
            OptionKind::Text => {
                let default = descriptor.default.as_ref().and_then(Value::as_str);
                let answer = self.prompter.input(descriptor.label(), default)?;
                Ok(Value::String(answer))
            }
            OptionKind::Number => {
                let default = descriptor
                    .default
                    .as_ref()
                    .and_then(Value::as_i64)
                    .map(|n| n.to_string());
                let answer = self.prompter.input(descriptor.label(), default.as_deref())?;
                let number: i64 = answer.trim().parse().with_context(|| {
                    format!("`{}` expects a number, got `{}`", descriptor.name, answer)
                })?;
                Ok(Value::from(number))
            }
            OptionKind::Boolean => {
                let default = descriptor
                    .default
                    .as_ref()
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                let answer = self.prompter.confirm(descriptor.label(), default)?;
                Ok(Value::Bool(answer))
            }
            OptionKind::Select => {
                let choices = descriptor.choices.as_deref().unwrap_or(&[]);
                if choices.is_empty() {
                    anyhow::bail!("Option `{}` offers no choices", descriptor.name);
                }
                let default_index = descriptor
                    .default
                    .as_ref()
                    .and_then(Value::as_str)
                    .and_then(|default| choices.iter().position(|choice| choice == default))
                    .unwrap_or(0);
                let index = self
                    .prompter
                    .select(descriptor.label(), choices, default_index)?;
                let choice = choices.get(index).context("Selection out of range")?;
                Ok(Value::String(choice.clone()))
            }
        }
    }
}

/// Normalize a probed OS version to its semver core. Build metadata such as
/// `+rev1` varies per board image and never belongs in the payload;
/// prerelease tags are kept.
pub fn normalize_os_version(version: &str) -> anyhow::Result<String> {
    let parsed = semver::Version::parse(version.trim().trim_start_matches('v'))
        .with_context(|| format!("Device reported an unparseable OS version `{version}`"))?;

    let mut normalized = format!("{}.{}.{}", parsed.major, parsed.minor, parsed.patch);
    if !parsed.pre.is_empty() {
        normalized.push('-');
        normalized.push_str(parsed.pre.as_str());
    }
    Ok(normalized)
}
