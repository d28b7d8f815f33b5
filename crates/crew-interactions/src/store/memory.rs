use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{
    AircraftCatalog, AircraftEntry, IdentityStore, NewFlightReport, Pilot, ReportReceipt,
    ReportStore, StoreError,
};

/// Oldest calls are dropped once the log holds this many.
pub const MAX_RECORDED_CALLS: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    LinkedAccount,
    PilotByAccount,
    PilotByLegacyId,
    InsertReport,
    Aircraft,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    LinkedAccount {
        provider: String,
        external_id: String,
    },
    PilotByAccount(String),
    PilotByLegacyId(String),
    InsertReport {
        pilot_id: String,
        flight_number: String,
    },
    Aircraft {
        limit: usize,
    },
}

#[derive(Debug, Default)]
struct MemoryState {
    identities: Vec<(String, String, String)>,
    pilots: Vec<Pilot>,
    aircraft: Vec<AircraftEntry>,
    reports: Vec<NewFlightReport>,
    calls: VecDeque<StoreCall>,
    failures: HashMap<StoreOp, String>,
}

/// In-process store that records every call. Backs tests and the
/// `--memory-store` development mode.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pilot(self, pilot: Pilot) -> Self {
        self.state.lock().pilots.push(pilot);
        self
    }

    pub fn with_linked_identity(
        self,
        provider: impl Into<String>,
        external_id: impl Into<String>,
        account_id: impl Into<String>,
    ) -> Self {
        self.state
            .lock()
            .identities
            .push((provider.into(), external_id.into(), account_id.into()));
        self
    }

    pub fn with_aircraft(self, entries: impl IntoIterator<Item = AircraftEntry>) -> Self {
        self.state.lock().aircraft.extend(entries);
        self
    }

    /// Make every subsequent `op` fail with `message`.
    pub fn failing(self, op: StoreOp, message: impl Into<String>) -> Self {
        self.state.lock().failures.insert(op, message.into());
        self
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.state.lock().calls.iter().cloned().collect()
    }

    pub fn reports(&self) -> Vec<NewFlightReport> {
        self.state.lock().reports.clone()
    }

    fn record(&self, op: StoreOp, call: StoreCall) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        if state.calls.len() >= MAX_RECORDED_CALLS {
            state.calls.pop_front();
        }
        state.calls.push_back(call);
        match state.failures.get(&op) {
            Some(message) => Err(StoreError::Backend(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn linked_account(
        &self,
        provider: &str,
        external_id: &str,
    ) -> Result<Option<String>, StoreError> {
        self.record(
            StoreOp::LinkedAccount,
            StoreCall::LinkedAccount {
                provider: provider.to_string(),
                external_id: external_id.to_string(),
            },
        )?;
        Ok(self
            .state
            .lock()
            .identities
            .iter()
            .find(|(p, id, _)| p == provider && id == external_id)
            .map(|(_, _, account)| account.clone()))
    }

    async fn pilot_by_account(&self, account_id: &str) -> Result<Option<Pilot>, StoreError> {
        self.record(
            StoreOp::PilotByAccount,
            StoreCall::PilotByAccount(account_id.to_string()),
        )?;
        Ok(self
            .state
            .lock()
            .pilots
            .iter()
            .find(|pilot| pilot.user_id.as_deref() == Some(account_id))
            .cloned())
    }

    async fn pilot_by_legacy_id(&self, external_id: &str) -> Result<Option<Pilot>, StoreError> {
        self.record(
            StoreOp::PilotByLegacyId,
            StoreCall::PilotByLegacyId(external_id.to_string()),
        )?;
        Ok(self
            .state
            .lock()
            .pilots
            .iter()
            .find(|pilot| pilot.discord_id.as_deref() == Some(external_id))
            .cloned())
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn insert_report(&self, report: &NewFlightReport) -> Result<ReportReceipt, StoreError> {
        self.record(
            StoreOp::InsertReport,
            StoreCall::InsertReport {
                pilot_id: report.pilot_id.clone(),
                flight_number: report.flight_number.clone(),
            },
        )?;
        let mut state = self.state.lock();
        state.reports.push(report.clone());
        Ok(ReportReceipt {
            id: Some(state.reports.len().to_string()),
        })
    }
}

#[async_trait]
impl AircraftCatalog for MemoryStore {
    async fn aircraft(&self, limit: usize) -> Result<Vec<AircraftEntry>, StoreError> {
        self.record(StoreOp::Aircraft, StoreCall::Aircraft { limit })?;
        Ok(self
            .state
            .lock()
            .aircraft
            .iter()
            .take(limit)
            .cloned()
            .collect())
    }
}
