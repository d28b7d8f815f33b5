use async_trait::async_trait;
use tracing::{debug, warn};

use crate::store::{DynIdentityStore, Pilot, StoreError};

/// OAuth provider name under which chat accounts are linked.
pub const DISCORD_PROVIDER: &str = "discord";

/// One way of finding the pilot behind an external user id.
#[async_trait]
pub trait PilotLookup: Send + Sync {
    fn name(&self) -> &'static str;

    async fn lookup(&self, external_id: &str) -> Result<Option<Pilot>, StoreError>;
}

/// Linked OAuth identity → internal account → pilot profile.
pub struct LinkedIdentityLookup {
    store: DynIdentityStore,
    provider: String,
}

impl LinkedIdentityLookup {
    pub fn new(store: DynIdentityStore, provider: impl Into<String>) -> Self {
        Self {
            store,
            provider: provider.into(),
        }
    }
}

#[async_trait]
impl PilotLookup for LinkedIdentityLookup {
    fn name(&self) -> &'static str {
        "linked_identity"
    }

    async fn lookup(&self, external_id: &str) -> Result<Option<Pilot>, StoreError> {
        let Some(account_id) = self
            .store
            .linked_account(&self.provider, external_id)
            .await?
        else {
            return Ok(None);
        };
        self.store.pilot_by_account(&account_id).await
    }
}

/// Staff-maintained external id stored on the pilot profile itself.
pub struct LegacyMappingLookup {
    store: DynIdentityStore,
}

impl LegacyMappingLookup {
    pub fn new(store: DynIdentityStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl PilotLookup for LegacyMappingLookup {
    fn name(&self) -> &'static str {
        "legacy_mapping"
    }

    async fn lookup(&self, external_id: &str) -> Result<Option<Pilot>, StoreError> {
        self.store.pilot_by_legacy_id(external_id).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPilot {
    pub pilot: Pilot,
    /// Name of the lookup that produced the match.
    pub via: &'static str,
}

/// Ordered chain of lookups; the first hit wins. A failing lookup is logged
/// and the next one is still tried.
pub struct IdentityResolver {
    lookups: Vec<Box<dyn PilotLookup>>,
}

impl IdentityResolver {
    pub fn new(lookups: Vec<Box<dyn PilotLookup>>) -> Self {
        Self { lookups }
    }

    /// Linked identity first, legacy mapping second.
    pub fn standard(store: DynIdentityStore) -> Self {
        Self::new(vec![
            Box::new(LinkedIdentityLookup::new(store.clone(), DISCORD_PROVIDER)),
            Box::new(LegacyMappingLookup::new(store)),
        ])
    }

    pub async fn resolve(&self, external_id: &str) -> Option<ResolvedPilot> {
        for lookup in &self.lookups {
            match lookup.lookup(external_id).await {
                Ok(Some(pilot)) => {
                    debug!(via = lookup.name(), pilot_id = %pilot.id, "pilot resolved");
                    return Some(ResolvedPilot {
                        pilot,
                        via: lookup.name(),
                    });
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(lookup = lookup.name(), error = %err, "pilot lookup failed; trying next");
                }
            }
        }
        None
    }
}
