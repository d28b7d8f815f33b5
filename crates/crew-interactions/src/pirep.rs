//! The `/pirep` slash command: option normalization and report submission.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use crew_i18n::I18nText;
use tracing::{info, warn};

use crate::interaction::CommandOption;
use crate::store::{DynReportStore, NewFlightReport, Pilot, ReportReceipt, ReviewStatus, StoreError};

pub const PIREP_COMMAND: &str = "pirep";
pub const DEFAULT_FLIGHT_TYPE: &str = "passenger";
pub const REQUIRED_OPTIONS: [&str; 3] = ["flight_number", "departure", "arrival"];

pub trait Clock: Send + Sync {
    fn today_utc(&self) -> NaiveDate;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today_utc(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// Always reports the same day.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today_utc(&self) -> NaiveDate {
        self.0
    }
}

#[derive(Debug)]
pub enum SubmitOutcome {
    Submitted {
        report: NewFlightReport,
        receipt: ReportReceipt,
    },
    MissingOption(&'static str),
    StoreFailed(StoreError),
}

impl SubmitOutcome {
    /// Reply text for the invoker. `tracker_url` is linked on success.
    pub fn reply_text(&self, tracker_url: Option<&str>) -> I18nText {
        match self {
            Self::Submitted { report, .. } => {
                let text = match tracker_url {
                    Some(url) => I18nText::new(
                        "pirep.submitted_tracked",
                        "PIREP {flight_number} ({departure} → {arrival}) submitted for review. Track it at {tracker_url}",
                    )
                    .arg("tracker_url", url),
                    None => I18nText::new(
                        "pirep.submitted",
                        "PIREP {flight_number} ({departure} → {arrival}) submitted for review.",
                    ),
                };
                text.arg("flight_number", &report.flight_number)
                    .arg("departure", &report.departure)
                    .arg("arrival", &report.arrival)
            }
            Self::MissingOption(option) => {
                I18nText::new("pirep.missing_option", "Missing required option `{option}`.")
                    .arg("option", *option)
            }
            Self::StoreFailed(err) => {
                I18nText::new("pirep.store_failed", "Failed to submit PIREP: {error}")
                    .arg("error", err.to_string())
            }
        }
    }
}

/// Build the report for `pilot_id` from raw command options.
pub fn normalize_report(
    pilot_id: &str,
    options: &[&CommandOption],
    today: NaiveDate,
) -> Result<NewFlightReport, &'static str> {
    let text = |name: &str| {
        options
            .iter()
            .find(|option| option.name == name)
            .and_then(|option| option.value_text())
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };
    let required = |name: &'static str| text(name).ok_or(name);

    let [flight_number, departure, arrival] = REQUIRED_OPTIONS;
    let flight_number = required(flight_number)?.to_uppercase();
    let departure = required(departure)?.to_uppercase();
    let arrival = required(arrival)?.to_uppercase();

    Ok(NewFlightReport {
        pilot_id: pilot_id.to_string(),
        flight_number,
        departure,
        arrival,
        operator: text("operator"),
        aircraft: text("aircraft").map(|code| code.to_uppercase()),
        flight_type: text("flight_type").unwrap_or_else(|| DEFAULT_FLIGHT_TYPE.to_string()),
        flight_time: options
            .iter()
            .find(|option| option.name == "flight_time")
            .and_then(|option| option.value.as_ref())
            .map(coerce_hours)
            .unwrap_or(0.0),
        flight_date: text("flight_date")
            .unwrap_or_else(|| today.format("%Y-%m-%d").to_string()),
        remarks: text("remarks"),
        status: ReviewStatus::Pending,
    })
}

fn coerce_hours(value: &serde_json::Value) -> f64 {
    let hours = match value {
        serde_json::Value::Number(number) => number.as_f64(),
        serde_json::Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    hours
        .filter(|hours| hours.is_finite() && *hours >= 0.0)
        .unwrap_or(0.0)
}

pub struct CommandExecutor {
    reports: DynReportStore,
    clock: Arc<dyn Clock>,
}

impl CommandExecutor {
    pub fn new(reports: DynReportStore, clock: Arc<dyn Clock>) -> Self {
        Self { reports, clock }
    }

    /// Normalize and insert one report for an already resolved pilot. Never
    /// retries.
    pub async fn submit(&self, pilot: &Pilot, options: &[&CommandOption]) -> SubmitOutcome {
        let report = match normalize_report(&pilot.id, options, self.clock.today_utc()) {
            Ok(report) => report,
            Err(option) => return SubmitOutcome::MissingOption(option),
        };
        match self.reports.insert_report(&report).await {
            Ok(receipt) => {
                info!(
                    pilot_id = %report.pilot_id,
                    flight_number = %report.flight_number,
                    report_id = ?receipt.id,
                    "pirep submitted"
                );
                SubmitOutcome::Submitted { report, receipt }
            }
            Err(err) => {
                warn!(pilot_id = %report.pilot_id, error = %err, "pirep insert failed");
                SubmitOutcome::StoreFailed(err)
            }
        }
    }
}
