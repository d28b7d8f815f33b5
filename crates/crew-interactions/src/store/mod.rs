//! Collaborator interfaces over the hosted relational store.
//!
//! The webhook owns none of these records. Pilots and identities are only
//! read, flight reports are only inserted, and the aircraft catalog only
//! feeds autocomplete.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

pub mod memory;
pub mod postgrest;

pub use memory::{MAX_RECORDED_CALLS, MemoryStore, StoreCall, StoreOp};
pub use postgrest::PostgrestStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store is not configured: missing {0}")]
    NotConfigured(&'static str),
    #[error("store request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("store returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("failed to decode store response: {0}")]
    Decode(String),
    #[error("{0}")]
    Backend(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pilot {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    /// Internal account the pilot profile belongs to.
    #[serde(default)]
    pub user_id: Option<String>,
    /// External user id mapped by staff for pilots who never linked.
    #[serde(default)]
    pub discord_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AircraftEntry {
    pub code: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
}

/// Nullable text columns read as empty strings.
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Review state of a filed report; the webhook files pending reports only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
}

/// A flight report as inserted. Field names match the store's columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewFlightReport {
    pub pilot_id: String,
    pub flight_number: String,
    pub departure: String,
    pub arrival: String,
    pub operator: Option<String>,
    pub aircraft: Option<String>,
    pub flight_type: String,
    pub flight_time: f64,
    pub flight_date: String,
    pub remarks: Option<String>,
    pub status: ReviewStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportReceipt {
    pub id: Option<String>,
}

#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Internal account id linked to `external_id` through the OAuth provider.
    async fn linked_account(
        &self,
        provider: &str,
        external_id: &str,
    ) -> Result<Option<String>, StoreError>;

    async fn pilot_by_account(&self, account_id: &str) -> Result<Option<Pilot>, StoreError>;

    async fn pilot_by_legacy_id(&self, external_id: &str) -> Result<Option<Pilot>, StoreError>;
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn insert_report(&self, report: &NewFlightReport) -> Result<ReportReceipt, StoreError>;
}

#[async_trait]
pub trait AircraftCatalog: Send + Sync {
    /// At most `limit` catalog entries, in the store's order.
    async fn aircraft(&self, limit: usize) -> Result<Vec<AircraftEntry>, StoreError>;
}

pub type DynIdentityStore = Arc<dyn IdentityStore>;
pub type DynReportStore = Arc<dyn ReportStore>;
pub type DynAircraftCatalog = Arc<dyn AircraftCatalog>;

/// The three collaborators the webhook talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub identities: DynIdentityStore,
    pub reports: DynReportStore,
    pub catalog: DynAircraftCatalog,
}

impl Collaborators {
    /// Use one backend for every collaborator.
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: IdentityStore + ReportStore + AircraftCatalog + 'static,
    {
        Self {
            identities: store.clone(),
            reports: store.clone(),
            catalog: store,
        }
    }
}
