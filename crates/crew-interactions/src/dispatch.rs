use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::http::HeaderMap;
use crew_i18n::{I18nText, resolve_text, select_locale_with_sources};
use futures::FutureExt;
use thiserror::Error;
use tracing::{Instrument, Level, error, info, span};

use crate::autocomplete::AutocompleteResolver;
use crate::config::PortalConfig;
use crate::identity::IdentityResolver;
use crate::interaction::{Interaction, InteractionKind, InteractionResponse, peek_kind};
use crate::pirep::{Clock, CommandExecutor, PIREP_COMMAND, SystemClock};
use crate::signature::SignatureVerifier;
use crate::store::Collaborators;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("interaction body is not a valid interaction: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("command interaction carries no invoking user")]
    MissingInvoker,
}

/// Result of handling one webhook call.
#[derive(Debug, Clone, PartialEq)]
pub enum HandleOutcome {
    /// Signature check failed; nothing was parsed or looked up.
    Unauthorized,
    Reply(InteractionResponse),
}

/// Verifies, parses and routes interactions. Holds no per-request state.
pub struct InteractionService {
    verifier: SignatureVerifier,
    autocomplete: AutocompleteResolver,
    identity: IdentityResolver,
    executor: CommandExecutor,
    tracker_url: Option<String>,
    default_locale: Option<String>,
}

impl InteractionService {
    pub fn new(config: &PortalConfig, collaborators: Collaborators) -> Self {
        Self::with_clock(config, collaborators, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: &PortalConfig,
        collaborators: Collaborators,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            verifier: SignatureVerifier::from_config(config.discord.public_key.as_deref()),
            autocomplete: AutocompleteResolver::new(
                config.pirep.operator_codes(),
                collaborators.catalog,
            ),
            identity: IdentityResolver::standard(collaborators.identities),
            executor: CommandExecutor::new(collaborators.reports, clock),
            tracker_url: config.pirep.tracker_url.clone(),
            default_locale: config.discord.default_locale.clone(),
        }
    }

    /// Full webhook path: verify the raw body against the signature headers,
    /// then dispatch.
    pub async fn handle(&self, headers: &HeaderMap, body: &[u8]) -> HandleOutcome {
        if !self.verifier.verify_headers(headers, body) {
            return HandleOutcome::Unauthorized;
        }
        HandleOutcome::Reply(self.dispatch_body(body).await)
    }

    /// Parse and dispatch a verified body. Errors and panics become a generic
    /// private reply so the caller always gets a well-formed response.
    pub async fn dispatch_body(&self, body: &[u8]) -> InteractionResponse {
        let outcome = AssertUnwindSafe(self.parse_and_dispatch(body))
            .catch_unwind()
            .await;
        match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                error!(error = %err, "interaction dispatch failed");
                self.generic_failure()
            }
            Err(_) => {
                error!("interaction dispatch panicked");
                self.generic_failure()
            }
        }
    }

    async fn parse_and_dispatch(&self, body: &[u8]) -> Result<InteractionResponse, DispatchError> {
        if peek_kind(body)? == InteractionKind::Ping {
            return Ok(InteractionResponse::pong());
        }
        let interaction = Interaction::from_slice(body)?;
        let locale = self.locale_for(&interaction);
        self.dispatch(&interaction, &locale).await
    }

    pub async fn dispatch(
        &self,
        interaction: &Interaction,
        locale: &str,
    ) -> Result<InteractionResponse, DispatchError> {
        let kind = interaction.kind();
        let dispatch_span = span!(
            Level::INFO,
            "interaction.dispatch",
            kind = kind.as_str(),
            command = interaction.command_name().unwrap_or(""),
            invoker = interaction.invoker_id().unwrap_or("")
        );
        async {
            match kind {
                InteractionKind::Ping => Ok(InteractionResponse::pong()),
                InteractionKind::Autocomplete => Ok(self.autocomplete(interaction).await),
                InteractionKind::ApplicationCommand => self.command(interaction, locale).await,
                _ => Ok(reply(
                    I18nText::new(
                        "interaction.unsupported_type",
                        "This interaction is not supported.",
                    ),
                    locale,
                )),
            }
        }
        .instrument(dispatch_span)
        .await
    }

    async fn autocomplete(&self, interaction: &Interaction) -> InteractionResponse {
        let Some(focused) = interaction.focused_option() else {
            return InteractionResponse::choices(Vec::new());
        };
        let partial = focused.value_text().unwrap_or_default();
        InteractionResponse::choices(self.autocomplete.suggest(&focused.name, &partial).await)
    }

    async fn command(
        &self,
        interaction: &Interaction,
        locale: &str,
    ) -> Result<InteractionResponse, DispatchError> {
        if interaction.command_name() != Some(PIREP_COMMAND) {
            return Ok(reply(
                I18nText::new("interaction.unsupported_command", "Unsupported command."),
                locale,
            ));
        }
        let invoker = interaction
            .invoker_id()
            .ok_or(DispatchError::MissingInvoker)?;
        let Some(resolved) = self.identity.resolve(invoker).await else {
            info!(invoker, "no pilot linked to invoker");
            return Ok(reply(
                I18nText::new(
                    "pirep.unlinked",
                    "No pilot profile is linked to your Discord account. Sign in to the crew portal with Discord (or ask staff to map your account), then try again.",
                ),
                locale,
            ));
        };
        let outcome = self
            .executor
            .submit(&resolved.pilot, &interaction.options())
            .await;
        Ok(reply(
            outcome.reply_text(self.tracker_url.as_deref()),
            locale,
        ))
    }

    fn locale_for(&self, interaction: &Interaction) -> String {
        select_locale_with_sources(
            interaction.locale.as_deref(),
            interaction.guild_locale.as_deref(),
            self.default_locale.as_deref(),
        )
    }

    fn generic_failure(&self) -> InteractionResponse {
        let locale = select_locale_with_sources(None, None, self.default_locale.as_deref());
        reply(
            I18nText::new(
                "interaction.failed",
                "Something went wrong while handling this interaction. Please try again later.",
            ),
            &locale,
        )
    }
}

fn reply(text: I18nText, locale: &str) -> InteractionResponse {
    InteractionResponse::ephemeral(resolve_text(&text, locale))
}
