use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};
use url::Url;

use super::{
    AircraftCatalog, AircraftEntry, IdentityStore, NewFlightReport, Pilot, ReportReceipt,
    ReportStore, StoreError,
};
use crate::config::StoreConfig;

const PILOT_COLUMNS: &str = "id,name,user_id,discord_id";
const IDENTITY_SCHEMA: &str = "auth";

/// Collaborator adapter for the hosted store's REST interface (PostgREST).
#[derive(Clone, Debug)]
pub struct PostgrestStore {
    client: Client,
    base: Option<Url>,
    service_key: Option<String>,
}

#[derive(Deserialize)]
struct IdentityRow {
    user_id: String,
}

impl PostgrestStore {
    pub fn new(config: &StoreConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: &StoreConfig) -> Self {
        let base = config
            .url
            .as_deref()
            .and_then(|raw| match Url::parse(raw) {
                Ok(url) => Some(url),
                Err(err) => {
                    error!(error = %err, "store url is not a valid URL");
                    None
                }
            });
        Self {
            client,
            base,
            service_key: config.service_key.clone(),
        }
    }

    fn table_url(&self, table: &str, query: &[(&str, &str)]) -> Result<Url, StoreError> {
        let mut url = self
            .base
            .clone()
            .ok_or(StoreError::NotConfigured("store.url"))?;
        url.path_segments_mut()
            .map_err(|_| StoreError::NotConfigured("store.url"))?
            .pop_if_empty()
            .extend(["rest", "v1", table]);
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder, StoreError> {
        let key = self
            .service_key
            .as_deref()
            .ok_or(StoreError::NotConfigured("store.service_key"))?;
        Ok(request
            .header("apikey", key)
            .bearer_auth(key)
            .header("accept", "application/json"))
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, &str)],
        schema: Option<&str>,
    ) -> Result<Vec<T>, StoreError> {
        let url = self.table_url(table, query)?;
        debug!(table, "store select");
        let mut request = self.authorize(self.client.get(url))?;
        if let Some(schema) = schema {
            request = request.header("accept-profile", schema);
        }
        let response = check_status(request.send().await?).await?;
        response
            .json::<Vec<T>>()
            .await
            .map_err(|err| StoreError::Decode(err.to_string()))
    }

    async fn first_pilot(&self, column: &str, value: &str) -> Result<Option<Pilot>, StoreError> {
        let filter = format!("eq.{value}");
        let rows: Vec<Pilot> = self
            .select(
                "pilots",
                &[
                    (column, filter.as_str()),
                    ("select", PILOT_COLUMNS),
                    ("limit", "1"),
                ],
                None,
            )
            .await?;
        Ok(rows.into_iter().next())
    }
}

async fn check_status(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Status {
        status: status.as_u16(),
        message: error_message(&body),
    })
}

/// Prefer the `message` field of a PostgREST error document.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|doc| doc.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

fn receipt_from_rows(rows: &Value) -> ReportReceipt {
    let id = rows
        .as_array()
        .and_then(|rows| rows.first())
        .or(Some(rows))
        .and_then(|row| row.get("id"))
        .and_then(|id| match id {
            Value::String(text) => Some(text.clone()),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        });
    ReportReceipt { id }
}

#[async_trait]
impl IdentityStore for PostgrestStore {
    async fn linked_account(
        &self,
        provider: &str,
        external_id: &str,
    ) -> Result<Option<String>, StoreError> {
        let provider = format!("eq.{provider}");
        let external_id = format!("eq.{external_id}");
        let rows: Vec<IdentityRow> = self
            .select(
                "identities",
                &[
                    ("provider", provider.as_str()),
                    ("provider_id", external_id.as_str()),
                    ("select", "user_id"),
                    ("limit", "1"),
                ],
                Some(IDENTITY_SCHEMA),
            )
            .await?;
        Ok(rows.into_iter().next().map(|row| row.user_id))
    }

    async fn pilot_by_account(&self, account_id: &str) -> Result<Option<Pilot>, StoreError> {
        self.first_pilot("user_id", account_id).await
    }

    async fn pilot_by_legacy_id(&self, external_id: &str) -> Result<Option<Pilot>, StoreError> {
        self.first_pilot("discord_id", external_id).await
    }
}

#[async_trait]
impl ReportStore for PostgrestStore {
    async fn insert_report(&self, report: &NewFlightReport) -> Result<ReportReceipt, StoreError> {
        let url = self.table_url("pireps", &[])?;
        let request = self
            .authorize(self.client.post(url))?
            .header("prefer", "return=representation")
            .json(report);
        let response = check_status(request.send().await?).await?;
        let rows: Value = response
            .json()
            .await
            .map_err(|err| StoreError::Decode(err.to_string()))?;
        Ok(receipt_from_rows(&rows))
    }
}

#[async_trait]
impl AircraftCatalog for PostgrestStore {
    async fn aircraft(&self, limit: usize) -> Result<Vec<AircraftEntry>, StoreError> {
        let limit = limit.to_string();
        self.select(
            "aircraft",
            &[
                ("select", "code,name"),
                ("order", "code.asc"),
                ("limit", limit.as_str()),
            ],
            None,
        )
        .await
    }
}
