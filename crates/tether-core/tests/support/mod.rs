#![allow(dead_code)]

//! Scripted fakes for the external seams, shared across integration tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use tether_core::api::{
    DeviceManifest, DeviceType, Fleet, FleetApi, FleetFilter, OptionDescriptor, OptionKind, User,
    is_architecture_compatible,
};
use tether_core::prompt::Prompter;
use tether_core::remote::RemoteExec;
use tether_core::report::Reporter;
use tether_core::scan::{DeviceCandidate, Discovery};

pub const FAKE_BASE_URL: &str = "https://tether.example.com";

// ---------------------------------------------------------------------------
// Platform API

#[derive(Default)]
pub struct FakeApi {
    user: Option<User>,
    catalog: Vec<DeviceType>,
    fleets: Mutex<Vec<Fleet>>,
    manifests: HashMap<String, DeviceManifest>,
    compat: Option<fn(&str, &str) -> bool>,
    fail_fleet_queries: bool,
    pub created: Mutex<Vec<(String, String, String)>>,
    pub pins: Mutex<Vec<(String, String)>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, username: &str) -> Self {
        self.user = Some(User {
            id: 1,
            username: username.to_string(),
        });
        self
    }

    pub fn with_device_type(mut self, slug: &str, architecture: &str) -> Self {
        self.catalog.push(DeviceType {
            slug: slug.to_string(),
            name: slug.to_string(),
            architecture: architecture.to_string(),
        });
        self
    }

    pub fn with_fleet(
        self,
        id: u64,
        name: &str,
        slug: &str,
        device_type: &str,
        architecture: &str,
    ) -> Self {
        self.fleets.lock().unwrap().push(Fleet {
            id,
            name: name.to_string(),
            slug: slug.to_string(),
            device_type: device_type.to_string(),
            architecture: architecture.to_string(),
        });
        self
    }

    pub fn with_manifest(mut self, slug: &str, options: Vec<OptionDescriptor>) -> Self {
        self.manifests.insert(
            slug.to_string(),
            DeviceManifest {
                slug: slug.to_string(),
                options,
            },
        );
        self
    }

    /// Replace the catalog compatibility relation.
    pub fn with_compat(mut self, relation: fn(&str, &str) -> bool) -> Self {
        self.compat = Some(relation);
        self
    }

    /// Every fleet query fails, as during a platform outage.
    pub fn with_failing_fleet_queries(mut self) -> Self {
        self.fail_fleet_queries = true;
        self
    }

    pub fn fleet_records(&self) -> Vec<Fleet> {
        self.fleets.lock().unwrap().clone()
    }
}

#[async_trait]
impl FleetApi for FakeApi {
    async fn device_type(&self, slug: &str) -> anyhow::Result<DeviceType> {
        self.catalog
            .iter()
            .find(|entry| entry.slug == slug)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("unknown device type {slug}"))
    }

    async fn supported_device_types(&self) -> anyhow::Result<Vec<DeviceType>> {
        Ok(self.catalog.clone())
    }

    fn is_architecture_compatible(&self, device_arch: &str, target_arch: &str) -> bool {
        match self.compat {
            Some(relation) => relation(device_arch, target_arch),
            None => is_architecture_compatible(device_arch, target_arch),
        }
    }

    async fn fleets(&self, filter: &FleetFilter) -> anyhow::Result<Vec<Fleet>> {
        if self.fail_fleet_queries {
            anyhow::bail!("fleet query unavailable");
        }
        let fleets = self.fleets.lock().unwrap();
        let matches = fleets
            .iter()
            .filter(|fleet| match filter {
                FleetFilter::Name(name) => fleet.name == *name,
                FleetFilter::Slug(slug) => fleet.slug.eq_ignore_ascii_case(slug),
                FleetFilter::DeviceTypes(slugs) => slugs.contains(&fleet.device_type),
            })
            .cloned()
            .collect();
        Ok(matches)
    }

    async fn create_fleet(
        &self,
        name: &str,
        device_type: &str,
        owner: &str,
    ) -> anyhow::Result<Fleet> {
        self.created.lock().unwrap().push((
            name.to_string(),
            device_type.to_string(),
            owner.to_string(),
        ));

        let architecture = self
            .catalog
            .iter()
            .find(|entry| entry.slug == device_type)
            .map(|entry| entry.architecture.clone())
            .unwrap_or_else(|| "unknown".to_string());

        let mut fleets = self.fleets.lock().unwrap();
        let id = fleets.iter().map(|fleet| fleet.id).max().unwrap_or(0) + 1;
        let fleet = Fleet {
            id,
            name: name.to_string(),
            slug: format!("{}/{}", owner, name.to_lowercase()),
            device_type: device_type.to_string(),
            architecture,
        };
        fleets.push(fleet.clone());
        Ok(fleet)
    }

    async fn fleet(&self, id: u64) -> anyhow::Result<Fleet> {
        self.fleets
            .lock()
            .unwrap()
            .iter()
            .find(|fleet| fleet.id == id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no fleet with id {id}"))
    }

    async fn device_manifest(&self, slug: &str) -> anyhow::Result<DeviceManifest> {
        self.manifests
            .get(slug)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no manifest registered for {slug}"))
    }

    async fn whoami(&self) -> anyhow::Result<Option<User>> {
        Ok(self.user.clone())
    }

    async fn pin_device(&self, uuid: &str, commit: &str) -> anyhow::Result<()> {
        self.pins
            .lock()
            .unwrap()
            .push((uuid.to_string(), commit.to_string()));
        Ok(())
    }

    fn base_url(&self) -> String {
        FAKE_BASE_URL.to_string()
    }
}

// Manifest option builders.

pub fn poll_interval_option() -> OptionDescriptor {
    number_option("appUpdatePollInterval", 600000)
}

pub fn number_option(name: &str, default: i64) -> OptionDescriptor {
    OptionDescriptor {
        name: name.to_string(),
        message: None,
        kind: OptionKind::Number,
        default: Some(json!(default)),
        choices: None,
    }
}

pub fn text_option(name: &str, default: &str) -> OptionDescriptor {
    OptionDescriptor {
        name: name.to_string(),
        message: None,
        kind: OptionKind::Text,
        default: Some(json!(default)),
        choices: None,
    }
}

pub fn bool_option(name: &str, default: bool) -> OptionDescriptor {
    OptionDescriptor {
        name: name.to_string(),
        message: None,
        kind: OptionKind::Boolean,
        default: Some(json!(default)),
        choices: None,
    }
}

pub fn select_option(name: &str, choices: &[&str], default: &str) -> OptionDescriptor {
    OptionDescriptor {
        name: name.to_string(),
        message: None,
        kind: OptionKind::Select,
        default: Some(json!(default)),
        choices: Some(choices.iter().map(|choice| choice.to_string()).collect()),
    }
}

// ---------------------------------------------------------------------------
// Remote shell

#[derive(Debug, Clone, PartialEq)]
pub struct ExecCall {
    pub address: String,
    pub command: String,
    pub streaming: bool,
}

pub struct ScriptedExec {
    record: Option<String>,
    tool_ok: bool,
    fail_streaming: bool,
    pub calls: Mutex<Vec<ExecCall>>,
}

impl ScriptedExec {
    /// A healthy device exposing the given identity record.
    pub fn device(record: &str) -> Self {
        Self {
            record: Some(record.to_string()),
            tool_ok: true,
            fail_streaming: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A device whose OS predates the configuration tool.
    pub fn without_tool() -> Self {
        Self {
            record: None,
            tool_ok: false,
            fail_streaming: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_streaming_failure(mut self) -> Self {
        self.fail_streaming = true;
        self
    }

    pub fn calls(&self) -> Vec<ExecCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn delivery_commands(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call.streaming)
            .map(|call| call.command)
            .collect()
    }
}

#[async_trait]
impl RemoteExec for ScriptedExec {
    async fn exec(&self, address: &str, command: &str) -> anyhow::Result<String> {
        self.calls.lock().unwrap().push(ExecCall {
            address: address.to_string(),
            command: command.to_string(),
            streaming: false,
        });

        if command == "os-config --version" {
            return if self.tool_ok {
                Ok("os-config 1.2.3".to_string())
            } else {
                anyhow::bail!("sh: os-config: not found")
            };
        }
        if command == "cat /etc/os-release" {
            return match &self.record {
                Some(record) => Ok(record.clone()),
                None => anyhow::bail!("cat: /etc/os-release: No such file"),
            };
        }
        anyhow::bail!("unexpected command: {command}")
    }

    async fn exec_streaming(
        &self,
        address: &str,
        command: &str,
        sink: &(dyn for<'a> Fn(&'a str) + Send + Sync),
    ) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(ExecCall {
            address: address.to_string(),
            command: command.to_string(),
            streaming: true,
        });

        if self.fail_streaming {
            anyhow::bail!("connection reset by peer");
        }
        if command.starts_with("os-config join ") || command == "os-config leave" {
            sink("Applying configuration...");
            sink("Done");
            return Ok(());
        }
        anyhow::bail!("unexpected streaming command: {command}")
    }
}

// ---------------------------------------------------------------------------
// Discovery

pub struct StaticDiscovery {
    candidates: Vec<DeviceCandidate>,
}

impl StaticDiscovery {
    pub fn new(candidates: Vec<DeviceCandidate>) -> Self {
        Self { candidates }
    }
}

#[async_trait]
impl Discovery for StaticDiscovery {
    async fn discover(&self, _timeout: Duration) -> anyhow::Result<Vec<DeviceCandidate>> {
        Ok(self.candidates.clone())
    }
}

// ---------------------------------------------------------------------------
// Prompter

/// Answers prompts from pre-loaded queues and records every question asked.
/// An unscripted prompt is an error, so tests prove "no prompt happened"
/// by scripting nothing.
#[derive(Default)]
pub struct ScriptedPrompter {
    inputs: Mutex<VecDeque<String>>,
    selects: Mutex<VecDeque<usize>>,
    confirms: Mutex<VecDeque<bool>>,
    log: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_input(self, answer: &str) -> Self {
        self.inputs.lock().unwrap().push_back(answer.to_string());
        self
    }

    pub fn push_select(self, index: usize) -> Self {
        self.selects.lock().unwrap().push_back(index);
        self
    }

    pub fn push_confirm(self, answer: bool) -> Self {
        self.confirms.lock().unwrap().push_back(answer);
        self
    }

    pub fn recorded(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn interaction_count(&self) -> usize {
        self.log.lock().unwrap().len()
    }
}

impl Prompter for ScriptedPrompter {
    fn input(&self, message: &str, default: Option<&str>) -> anyhow::Result<String> {
        self.log.lock().unwrap().push(format!(
            "input:{message}:default={}",
            default.unwrap_or("")
        ));
        self.inputs
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("unscripted input prompt: {message}"))
    }

    fn select(&self, message: &str, items: &[String], default: usize) -> anyhow::Result<usize> {
        self.log.lock().unwrap().push(format!(
            "select:{message}:[{}]:default={default}",
            items.join(", ")
        ));
        self.selects
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("unscripted select prompt: {message}"))
    }

    fn confirm(&self, message: &str, default: bool) -> anyhow::Result<bool> {
        self.log
            .lock()
            .unwrap()
            .push(format!("confirm:{message}:default={default}"));
        self.confirms
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("unscripted confirm prompt: {message}"))
    }
}

// ---------------------------------------------------------------------------
// Reporter

#[derive(Default)]
pub struct RecordingReporter {
    statuses: Mutex<Vec<String>>,
    infos: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn statuses(&self) -> Vec<String> {
        self.statuses.lock().unwrap().clone()
    }

    pub fn infos(&self) -> Vec<String> {
        self.infos.lock().unwrap().clone()
    }
}

impl Reporter for RecordingReporter {
    fn status(&self, message: &str) {
        self.statuses.lock().unwrap().push(message.to_string());
    }

    fn info(&self, message: &str) {
        self.infos.lock().unwrap().push(message.to_string());
    }
}
