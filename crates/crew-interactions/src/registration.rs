//! Bulk registration of the portal's slash commands with the platform.

use reqwest::Client;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::autocomplete::{AIRCRAFT_FIELD, OPERATOR_FIELD};
use crate::config::DiscordConfig;
use crate::pirep::PIREP_COMMAND;

pub const REGISTER_SECRET_HEADER: &str = "x-register-secret";

const CHAT_INPUT_COMMAND: u8 = 1;
const OPTION_STRING: u8 = 3;
const OPTION_NUMBER: u8 = 10;

pub const FLIGHT_TYPES: [&str; 5] = ["passenger", "cargo", "ferry", "training", "charter"];

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("command registration is not configured: missing {0}")]
    NotConfigured(&'static str),
    #[error("invalid platform api base: {0}")]
    InvalidApiBase(#[from] url::ParseError),
    #[error("platform request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("platform rejected command registration ({status}): {body}")]
    Upstream { status: u16, body: String },
}

/// Definition of the `/pirep` chat command.
pub fn pirep_command() -> Value {
    let flight_types: Vec<Value> = FLIGHT_TYPES
        .iter()
        .map(|kind| json!({ "name": kind, "value": kind }))
        .collect();
    json!({
        "name": PIREP_COMMAND,
        "type": CHAT_INPUT_COMMAND,
        "description": "File a pilot report for a completed flight",
        "options": [
            { "name": "flight_number", "description": "Flight number, e.g. RAM123", "type": OPTION_STRING, "required": true },
            { "name": "departure", "description": "Departure airport ICAO", "type": OPTION_STRING, "required": true },
            { "name": "arrival", "description": "Arrival airport ICAO", "type": OPTION_STRING, "required": true },
            { "name": OPERATOR_FIELD, "description": "Operating airline code", "type": OPTION_STRING, "autocomplete": true },
            { "name": AIRCRAFT_FIELD, "description": "Aircraft type", "type": OPTION_STRING, "autocomplete": true },
            { "name": "flight_type", "description": "Kind of flight", "type": OPTION_STRING, "choices": flight_types },
            { "name": "flight_time", "description": "Block time in hours", "type": OPTION_NUMBER, "min_value": 0 },
            { "name": "flight_date", "description": "Date flown (YYYY-MM-DD, defaults to today UTC)", "type": OPTION_STRING },
            { "name": "remarks", "description": "Notes for the reviewer", "type": OPTION_STRING }
        ]
    })
}

pub fn command_definitions() -> Vec<Value> {
    vec![pirep_command()]
}

pub struct CommandRegistrar {
    client: Client,
    api_base: String,
    application_id: Option<String>,
    bot_token: Option<String>,
    secret: Option<String>,
}

impl CommandRegistrar {
    pub fn new(client: Client, config: &DiscordConfig) -> Self {
        Self {
            client,
            api_base: config.api_base.clone(),
            application_id: config.application_id.clone(),
            bot_token: config.bot_token.clone(),
            secret: config.register_secret.clone(),
        }
    }

    /// Without a configured secret every caller is allowed.
    pub fn authorize(&self, provided: Option<&str>) -> bool {
        match self.secret.as_deref() {
            None => true,
            Some(expected) => provided.is_some_and(|value| constant_time_eq(expected, value)),
        }
    }

    pub fn commands_url(&self) -> Result<Url, RegistrationError> {
        let application_id = self
            .application_id
            .as_deref()
            .ok_or(RegistrationError::NotConfigured("discord.application_id"))?;
        let base = self.api_base.trim_end_matches('/');
        Ok(Url::parse(&format!(
            "{base}/applications/{application_id}/commands"
        ))?)
    }

    /// Replace the application's global commands with ours; returns the
    /// platform's view of the registered commands.
    pub async fn register(&self) -> Result<Value, RegistrationError> {
        let url = self.commands_url()?;
        let token = self
            .bot_token
            .as_deref()
            .ok_or(RegistrationError::NotConfigured("discord.bot_token"))?;
        let response = self
            .client
            .put(url)
            .header("authorization", format!("Bot {token}"))
            .json(&command_definitions())
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(RegistrationError::Upstream {
                status: status.as_u16(),
                body,
            });
        }
        let registered: Value = serde_json::from_str(&body).unwrap_or(Value::String(body));
        info!(
            count = registered.as_array().map(Vec::len).unwrap_or(0),
            "slash commands registered"
        );
        Ok(registered)
    }
}

fn constant_time_eq(expected: &str, provided: &str) -> bool {
    let (a, b) = (expected.as_bytes(), provided.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
