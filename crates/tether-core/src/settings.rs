//! Endpoint and token settings.
//!
//! Layering, lowest to highest precedence: built-in defaults, the settings
//! file at `~/.config/tether/config.toml`, then the `TETHER_API_URL` and
//! `TETHER_TOKEN` environment variables.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Platform API endpoint used when nothing else is configured.
pub const DEFAULT_API_URL: &str = "https://api.tether-cloud.io";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub api_url: String,
    pub token: Option<String>,
}

/// On-disk shape; every field optional so partial files merge over defaults.
#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    api_url: Option<String>,
    token: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
        }
    }
}

impl Settings {
    /// Load from the default location with environment overrides applied.
    pub fn load() -> anyhow::Result<Self> {
        let path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
            .join("tether")
            .join("config.toml");
        let mut settings = Self::from_path(&path)?;
        settings.apply_overrides(
            std::env::var("TETHER_API_URL").ok(),
            std::env::var("TETHER_TOKEN").ok(),
        );
        Ok(settings)
    }

    /// Load from an explicit file, without environment overrides. A missing
    /// file yields the defaults.
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
        let file: SettingsFile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse settings file: {}", path.display()))?;

        let mut settings = Self::default();
        if let Some(api_url) = file.api_url {
            settings.api_url = api_url;
        }
        settings.token = file.token;
        Ok(settings)
    }

    fn apply_overrides(&mut self, api_url: Option<String>, token: Option<String>) {
        if let Some(api_url) = api_url.filter(|v| !v.is_empty()) {
            self.api_url = api_url;
        }
        if let Some(token) = token.filter(|v| !v.is_empty()) {
            self.token = Some(token);
        }
    }

    /// User-facing platform URL for these settings.
    pub fn base_url(&self) -> String {
        platform_base_url(&self.api_url)
    }
}

/// User-facing platform URL, derived from the API endpoint by dropping a
/// leading `api.` host label.
pub fn platform_base_url(api_url: &str) -> String {
    match api_url.split_once("://") {
        Some((scheme, rest)) => {
            let host = rest.strip_prefix("api.").unwrap_or(rest);
            format!("{scheme}://{host}")
        }
        None => api_url.to_string(),
    }
}
