//! Discord interactions webhook for the crew portal.
//!
//! Pilots file flight reports (PIREPs) with the `/pirep` slash command. The
//! webhook verifies the platform signature over the raw body, routes the
//! interaction (ping, autocomplete or command), resolves the invoking chat
//! account to a pilot profile and inserts one pending report into the hosted
//! store. Every collaborator sits behind a trait in [`store`], so the whole
//! path runs against [`store::MemoryStore`] in tests.

use std::sync::Arc;

pub mod autocomplete;
pub mod config;
pub mod dispatch;
pub mod http;
pub mod identity;
pub mod interaction;
pub mod pirep;
pub mod registration;
pub mod signature;
pub mod store;

pub use config::PortalConfig;
pub use dispatch::{DispatchError, HandleOutcome, InteractionService};
pub use http::{PortalState, router};
pub use interaction::{Choice, Interaction, InteractionKind, InteractionResponse};
pub use signature::SignatureVerifier;
pub use store::{Collaborators, MemoryStore, PostgrestStore};

/// Wire the webhook state from resolved config and collaborators.
pub fn build_state(config: &PortalConfig, collaborators: Collaborators) -> Arc<PortalState> {
    build_state_with(config, collaborators, Arc::new(pirep::SystemClock))
}

pub fn build_state_with(
    config: &PortalConfig,
    collaborators: Collaborators,
    clock: Arc<dyn pirep::Clock>,
) -> Arc<PortalState> {
    Arc::new(PortalState {
        interactions: InteractionService::with_clock(config, collaborators, clock),
        registrar: registration::CommandRegistrar::new(reqwest::Client::new(), &config.discord),
    })
}
