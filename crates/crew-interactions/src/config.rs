use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Operator codes offered by autocomplete when none are configured.
pub const DEFAULT_OPERATORS: &str = "RAM";
pub const DEFAULT_DISCORD_API_BASE: &str = "https://discord.com/api/v10";
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

const REDACTED: &str = "<redacted>";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TOML config {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid JSON config {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("`{key}` must be a port number, got `{value}`")]
    InvalidPort { key: &'static str, value: String },
    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),
}

/// Resolved configuration for the webhook. Every section falls back to its
/// documented defaults, so a partial file (or none at all) is valid.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    pub discord: DiscordConfig,
    pub store: StoreConfig,
    pub pirep: PirepConfig,
    pub server: ServerConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    /// Hex-encoded Ed25519 application public key. Without it every
    /// interaction is rejected.
    pub public_key: Option<String>,
    pub application_id: Option<String>,
    pub bot_token: Option<String>,
    /// Shared secret gating the command registration endpoint.
    pub register_secret: Option<String>,
    pub api_base: String,
    /// Reply locale used when an interaction carries none.
    pub default_locale: Option<String>,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            public_key: None,
            application_id: None,
            bot_token: None,
            register_secret: None,
            api_base: DEFAULT_DISCORD_API_BASE.to_string(),
            default_locale: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Project URL of the hosted store, e.g. `https://abc.supabase.co`.
    pub url: Option<String>,
    pub service_key: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PirepConfig {
    /// Comma-separated operator codes, in suggestion order.
    pub operators: Option<String>,
    /// Link appended to submission confirmations.
    pub tracker_url: Option<String>,
}

impl PirepConfig {
    pub fn operator_codes(&self) -> Vec<String> {
        let parsed = self
            .operators
            .as_deref()
            .map(parse_operator_list)
            .unwrap_or_default();
        if parsed.is_empty() {
            parse_operator_list(DEFAULT_OPERATORS)
        } else {
            parsed
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

pub fn parse_operator_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(ToString::to_string)
        .collect()
}

impl PortalConfig {
    /// Load a config file, picking the format from its extension (`.json`,
    /// anything else is TOML).
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&contents).map_err(|source| ConfigError::Json {
                path: path.to_path_buf(),
                source,
            }),
            _ => toml::from_str(&contents).map_err(|source| ConfigError::Toml {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Overlay process environment variables.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Overlay values from `lookup`; blank values count as unset.
    pub fn apply_env_from(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        overlay(&mut self.discord.public_key, get("DISCORD_PUBLIC_KEY"));
        overlay(&mut self.discord.application_id, get("DISCORD_APPLICATION_ID"));
        overlay(&mut self.discord.bot_token, get("DISCORD_BOT_TOKEN"));
        overlay(
            &mut self.discord.register_secret,
            get("DISCORD_REGISTER_SECRET"),
        );
        overlay(&mut self.discord.default_locale, get("DISCORD_DEFAULT_LOCALE"));
        if let Some(api_base) = get("DISCORD_API_BASE") {
            self.discord.api_base = api_base;
        }
        overlay(&mut self.store.url, get("SUPABASE_URL"));
        overlay(&mut self.store.service_key, get("SUPABASE_SERVICE_ROLE_KEY"));
        overlay(&mut self.pirep.operators, get("PIREP_OPERATORS"));
        overlay(&mut self.pirep.tracker_url, get("PIREP_TRACKER_URL"));
        if let Some(bind) = get("CREW_PORTAL_BIND") {
            self.server.bind = bind;
        }
        if let Some(port) = get("PORT") {
            self.server.port = port.parse().map_err(|_| ConfigError::InvalidPort {
                key: "PORT",
                value: port,
            })?;
        }
        Ok(())
    }

    /// Keys whose absence keeps the webhook from serving interactions.
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.discord.public_key.is_none() {
            missing.push("discord.public_key");
        }
        if self.store.url.is_none() {
            missing.push("store.url");
        }
        if self.store.service_key.is_none() {
            missing.push("store.service_key");
        }
        missing
    }

    /// Render the resolved config as TOML with secrets masked.
    pub fn explain(&self) -> Result<String, ConfigError> {
        let mut redacted = self.clone();
        for secret in [
            &mut redacted.discord.bot_token,
            &mut redacted.discord.register_secret,
            &mut redacted.store.service_key,
        ] {
            if secret.is_some() {
                *secret = Some(REDACTED.to_string());
            }
        }
        Ok(toml::to_string_pretty(&redacted)?)
    }
}

fn overlay(slot: &mut Option<String>, value: Option<String>) {
    if value.is_some() {
        *slot = value;
    }
}
