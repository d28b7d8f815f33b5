#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A user-facing message: a catalog key, an English fallback and the named
/// arguments substituted into `{name}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct I18nText {
    pub message_key: String,
    pub fallback: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub args: Vec<(String, String)>,
}

impl I18nText {
    pub fn new(message_key: impl Into<String>, fallback: impl Into<String>) -> Self {
        Self {
            message_key: message_key.into(),
            fallback: fallback.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.push((name.into(), value.into()));
        self
    }
}

/// Reduce a platform locale (`en-US`, `pt_BR`, `fr`) to its primary subtag.
pub fn normalize_locale(value: &str) -> String {
    let lower = value.replace('_', "-").to_ascii_lowercase();
    match lower.split('-').next() {
        Some("en") => "en".to_string(),
        Some(primary) if !primary.is_empty() => primary.to_string(),
        _ => "en".to_string(),
    }
}

/// Pick the reply locale: the invoking user's locale first, then the guild's,
/// then the configured default, then English.
pub fn select_locale_with_sources(
    user_locale: Option<&str>,
    guild_locale: Option<&str>,
    default_locale: Option<&str>,
) -> String {
    [user_locale, guild_locale, default_locale]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(normalize_locale)
        .unwrap_or_else(|| "en".to_string())
}

pub fn resolve_text(text: &I18nText, locale: &str) -> String {
    let template = resolve_message(&text.message_key, &text.fallback, locale);
    substitute(&template, &text.args)
}

pub fn resolve_message(key: &str, fallback: &str, locale: &str) -> String {
    let normalized = normalize_locale(locale);
    let message = match normalized.as_str() {
        "en" => english_message(key),
        "fr" => french_message(key),
        _ => None,
    };
    message.unwrap_or(fallback).to_string()
}

fn substitute(template: &str, args: &[(String, String)]) -> String {
    let mut rendered = template.to_string();
    for (name, value) in args {
        rendered = rendered.replace(&format!("{{{name}}}"), value);
    }
    rendered
}

fn english_message(key: &str) -> Option<&'static str> {
    match key {
        "interaction.unsupported_command" => Some("Unsupported command."),
        "interaction.unsupported_type" => Some("This interaction is not supported."),
        "interaction.failed" => {
            Some("Something went wrong while handling this interaction. Please try again later.")
        }
        "pirep.unlinked" => Some(
            "No pilot profile is linked to your Discord account. Sign in to the crew portal with Discord (or ask staff to map your account), then try again.",
        ),
        "pirep.missing_option" => Some("Missing required option `{option}`."),
        "pirep.submitted" => {
            Some("PIREP {flight_number} ({departure} → {arrival}) submitted for review.")
        }
        "pirep.submitted_tracked" => Some(
            "PIREP {flight_number} ({departure} → {arrival}) submitted for review. Track it at {tracker_url}",
        ),
        "pirep.store_failed" => Some("Failed to submit PIREP: {error}"),
        _ => None,
    }
}

fn french_message(key: &str) -> Option<&'static str> {
    match key {
        "interaction.unsupported_command" => Some("Commande non prise en charge."),
        "interaction.unsupported_type" => Some("Cette interaction n'est pas prise en charge."),
        "interaction.failed" => Some(
            "Une erreur est survenue lors du traitement de cette interaction. Réessayez plus tard.",
        ),
        "pirep.unlinked" => Some(
            "Aucun profil pilote n'est lié à votre compte Discord. Connectez-vous au portail équipage avec Discord (ou demandez au staff de lier votre compte), puis réessayez.",
        ),
        "pirep.missing_option" => Some("Option obligatoire manquante : `{option}`."),
        "pirep.submitted" => {
            Some("PIREP {flight_number} ({departure} → {arrival}) envoyé pour validation.")
        }
        "pirep.submitted_tracked" => Some(
            "PIREP {flight_number} ({departure} → {arrival}) envoyé pour validation. Suivi : {tracker_url}",
        ),
        "pirep.store_failed" => Some("Échec de l'envoi du PIREP : {error}"),
        _ => None,
    }
}
