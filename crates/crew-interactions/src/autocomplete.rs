use tracing::warn;

use crate::interaction::Choice;
use crate::store::{AircraftEntry, DynAircraftCatalog};

/// Platform limit on suggestions per autocomplete reply.
pub const MAX_CHOICES: usize = 25;
/// Platform limit on a suggestion label, in characters.
pub const MAX_LABEL_CHARS: usize = 100;
/// Catalog rows considered per request.
pub const CATALOG_SCAN_LIMIT: usize = 500;

pub const OPERATOR_FIELD: &str = "operator";
pub const AIRCRAFT_FIELD: &str = "aircraft";

pub struct AutocompleteResolver {
    operators: Vec<String>,
    catalog: DynAircraftCatalog,
}

impl AutocompleteResolver {
    pub fn new(operators: Vec<String>, catalog: DynAircraftCatalog) -> Self {
        Self { operators, catalog }
    }

    /// Suggestions for `field`. Unknown fields and catalog failures yield an
    /// empty list rather than an error.
    pub async fn suggest(&self, field: &str, partial: &str) -> Vec<Choice> {
        match field {
            OPERATOR_FIELD => operator_choices(&self.operators, partial),
            AIRCRAFT_FIELD => match self.catalog.aircraft(CATALOG_SCAN_LIMIT).await {
                Ok(entries) => aircraft_choices(&entries, partial),
                Err(err) => {
                    warn!(error = %err, "aircraft catalog lookup failed; returning no suggestions");
                    Vec::new()
                }
            },
            _ => Vec::new(),
        }
    }
}

pub fn operator_choices(operators: &[String], partial: &str) -> Vec<Choice> {
    let needle = partial.to_lowercase();
    operators
        .iter()
        .filter(|code| code.to_lowercase().contains(&needle))
        .take(MAX_CHOICES)
        .map(|code| Choice::new(truncate_chars(code, MAX_LABEL_CHARS), code.clone()))
        .collect()
}

pub fn aircraft_choices(entries: &[AircraftEntry], partial: &str) -> Vec<Choice> {
    let needle = partial.to_lowercase();
    entries
        .iter()
        .take(CATALOG_SCAN_LIMIT)
        .filter(|entry| {
            entry.code.to_lowercase().contains(&needle)
                || entry.name.to_lowercase().contains(&needle)
        })
        .take(MAX_CHOICES)
        .map(|entry| {
            let label = format!("{} - {}", entry.code, entry.name);
            Choice::new(truncate_chars(&label, MAX_LABEL_CHARS), entry.code.clone())
        })
        .collect()
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text.to_string(),
    }
}
