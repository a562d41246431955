//! HTTP implementation of the platform API.

use anyhow::Context;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::settings::{Settings, platform_base_url};

use super::{DeviceManifest, DeviceType, Fleet, FleetApi, FleetFilter, User};

pub struct HttpFleetApi {
    client: reqwest::Client,
    api_url: String,
    token: Option<String>,
}

impl HttpFleetApi {
    pub fn new(settings: &Settings) -> anyhow::Result<Self> {
        Self::with_endpoint(&settings.api_url, settings.token.clone())
    }

    pub fn with_endpoint(api_url: &str, token: Option<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("tether/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v1/{}", self.api_url, path)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> anyhow::Result<T> {
        debug!("GET {url}");
        let response = self
            .authorized(self.client.get(url).query(query))
            .send()
            .await
            .with_context(|| format!("Failed to reach {url}"))?;

        if !response.status().is_success() {
            anyhow::bail!("Request to {} failed with status {}", url, response.status());
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {url}"))
    }
}

/// Query parameters for a fleet listing. Slug queries are lowercased so the
/// lookup is case-insensitive against canonically lowercase platform slugs.
fn fleet_query(filter: &FleetFilter) -> Vec<(&'static str, String)> {
    match filter {
        FleetFilter::Name(name) => vec![("name", name.clone())],
        FleetFilter::Slug(slug) => vec![("slug", slug.to_lowercase())],
        FleetFilter::DeviceTypes(slugs) => vec![("deviceType", slugs.join(","))],
    }
}

#[async_trait]
impl FleetApi for HttpFleetApi {
    async fn device_type(&self, slug: &str) -> anyhow::Result<DeviceType> {
        let url = self.endpoint(&format!("device-types/{slug}"));
        self.get_json(&url, &[]).await
    }

    async fn supported_device_types(&self) -> anyhow::Result<Vec<DeviceType>> {
        let url = self.endpoint("device-types");
        self.get_json(&url, &[]).await
    }

    async fn fleets(&self, filter: &FleetFilter) -> anyhow::Result<Vec<Fleet>> {
        let url = self.endpoint("fleets");
        self.get_json(&url, &fleet_query(filter)).await
    }

    async fn create_fleet(
        &self,
        name: &str,
        device_type: &str,
        owner: &str,
    ) -> anyhow::Result<Fleet> {
        let url = self.endpoint("fleets");
        debug!("POST {url}");
        let response = self
            .authorized(self.client.post(&url).json(&serde_json::json!({
                "name": name,
                "deviceType": device_type,
                "organization": owner,
            })))
            .send()
            .await
            .with_context(|| format!("Failed to reach {url}"))?;

        if !response.status().is_success() {
            anyhow::bail!(
                "Fleet creation at {} failed with status {}",
                url,
                response.status()
            );
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {url}"))
    }

    async fn fleet(&self, id: u64) -> anyhow::Result<Fleet> {
        let url = self.endpoint(&format!("fleets/{id}"));
        self.get_json(&url, &[("expand", "deviceType".to_string())])
            .await
    }

    async fn device_manifest(&self, slug: &str) -> anyhow::Result<DeviceManifest> {
        let url = self.endpoint(&format!("device-types/{slug}/manifest"));
        self.get_json(&url, &[]).await
    }

    async fn whoami(&self) -> anyhow::Result<Option<User>> {
        let url = self.endpoint("whoami");
        debug!("GET {url}");
        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .with_context(|| format!("Failed to reach {url}"))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        if !response.status().is_success() {
            anyhow::bail!("Request to {} failed with status {}", url, response.status());
        }

        let user: User = response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {url}"))?;
        Ok(Some(user))
    }

    async fn pin_device(&self, uuid: &str, commit: &str) -> anyhow::Result<()> {
        let url = self.endpoint(&format!("devices/{uuid}/pin"));
        debug!("POST {url}");
        let response = self
            .authorized(
                self.client
                    .post(&url)
                    .json(&serde_json::json!({ "commit": commit })),
            )
            .send()
            .await
            .with_context(|| format!("Failed to reach {url}"))?;

        if !response.status().is_success() {
            anyhow::bail!(
                "Pinning device {} failed with status {}",
                uuid,
                response.status()
            );
        }
        Ok(())
    }

    fn base_url(&self) -> String {
        platform_base_url(&self.api_url)
    }
}
