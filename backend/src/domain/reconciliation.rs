//! Delivery status reconciliation against an uploaded sheet.
//!
//! Preview parses the sheet and classifies each row against the persisted
//! deliveries without writing anything. Apply takes the operator-approved
//! changes, re-fetches every delivery and patches its status together with
//! audit fields. Apply never aborts: each item succeeds or fails on its own.

mod sheet;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::SecondsFormat;
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use utoipa::ToSchema;

pub use sheet::{ReconciliationError, SheetRow, normalise_sheet_status, parse_status_sheet};

use super::ports::DocumentStore;
use super::{
    DELIVERIES, DELIVERY_NUMBER_FIELD, DeliveryStatus, Error, Patch, Pattern, Principal, Query,
    QueryError, Record, STATUS_FIELD, normalise_delivery_number,
};

/// Audit attribute: when the status was last reconciled.
pub const RECONCILED_AT_FIELD: &str = "reconciledAt";
/// Audit attribute: who reconciled the status.
pub const RECONCILED_BY_FIELD: &str = "reconciledBy";
/// Audit attribute: where the current status came from.
pub const STATUS_SOURCE_FIELD: &str = "statusSource";
const RECONCILIATION_SOURCE: &str = "reconciliation";

impl From<ReconciliationError> for Error {
    fn from(err: ReconciliationError) -> Self {
        let error = Self::invalid_request(err.to_string());
        match err.headers() {
            Some(headers) => error.with_details(json!({ "headers": headers })),
            None => error,
        }
    }
}

/// A sheet row whose status already agrees with the system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MatchedRow {
    /// Delivery number.
    pub delivery_number: String,
    /// Identifier of the matching delivery.
    pub delivery_id: String,
    /// Shared status.
    pub status: String,
}

/// A sheet row whose status differs from the system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    /// Delivery number.
    pub delivery_number: String,
    /// Identifier of the delivery.
    pub delivery_id: String,
    /// Status currently stored.
    pub current_status: String,
    /// Normalised status proposed by the sheet.
    pub proposed_status: String,
    /// Status text exactly as uploaded (lower-cased).
    pub uploaded_status: String,
}

/// A sheet row naming no known delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnmatchedRow {
    /// Delivery number as uploaded.
    pub delivery_number: String,
    /// Status text as uploaded.
    pub uploaded_status: String,
}

/// Classification of every usable sheet row.
///
/// The three lists partition the rows; nothing is written while building it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationReport {
    /// Number of usable rows in the sheet.
    pub total_rows: usize,
    /// Rows agreeing with the system.
    pub matched: Vec<MatchedRow>,
    /// Rows proposing a status change.
    pub needs_update: Vec<StatusChange>,
    /// Rows naming unknown deliveries.
    pub not_found: Vec<UnmatchedRow>,
}

/// One operator-approved status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    /// Delivery number to update.
    pub delivery_number: String,
    /// Status to store.
    pub new_status: String,
}

/// A status change that was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppliedUpdate {
    /// Delivery number.
    pub delivery_number: String,
    /// Identifier of the updated delivery.
    pub delivery_id: String,
    /// Status before the update, when one was stored.
    pub previous_status: Option<String>,
    /// Status now stored.
    pub new_status: String,
}

/// A status change that could not be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FailedUpdate {
    /// Delivery number as requested.
    pub delivery_number: String,
    /// Why the item failed.
    pub reason: String,
}

/// Per-item outcome of an apply batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplyReport {
    /// Items written.
    pub applied: Vec<AppliedUpdate>,
    /// Items that failed.
    pub failed: Vec<FailedUpdate>,
}

/// Status the system holds for a delivery, in the sheet vocabulary.
fn system_status(record: &Record) -> String {
    match record.str_field(STATUS_FIELD) {
        Some(raw) => DeliveryStatus::parse(raw)
            .map_or_else(|| raw.trim().to_lowercase(), |status| status.as_str().to_owned()),
        None => DeliveryStatus::Pending.as_str().to_owned(),
    }
}

/// Classify sheet rows against the persisted deliveries.
///
/// When several deliveries share a number the first one wins.
#[must_use]
pub fn classify(rows: &[SheetRow], deliveries: &[Record]) -> ReconciliationReport {
    let mut by_number: HashMap<String, &Record> = HashMap::new();
    for delivery in deliveries {
        if let Some(number) = delivery.str_field(DELIVERY_NUMBER_FIELD) {
            by_number
                .entry(normalise_delivery_number(number))
                .or_insert(delivery);
        }
    }

    let mut report = ReconciliationReport {
        total_rows: rows.len(),
        ..ReconciliationReport::default()
    };
    for row in rows {
        let Some(delivery) = by_number.get(&row.delivery_number) else {
            report.not_found.push(UnmatchedRow {
                delivery_number: row.delivery_number.clone(),
                uploaded_status: row.status.clone(),
            });
            continue;
        };
        let current = system_status(delivery);
        let proposed = normalise_sheet_status(&row.status);
        if current == proposed {
            report.matched.push(MatchedRow {
                delivery_number: row.delivery_number.clone(),
                delivery_id: delivery.id().to_string(),
                status: current,
            });
        } else {
            report.needs_update.push(StatusChange {
                delivery_number: row.delivery_number.clone(),
                delivery_id: delivery.id().to_string(),
                current_status: current,
                proposed_status: proposed,
                uploaded_status: row.status.clone(),
            });
        }
    }
    report
}

/// Preview and apply reconciliation against one tenant's store.
#[derive(Clone)]
pub struct ReconciliationService {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
}

impl ReconciliationService {
    /// Create a service over `store`.
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Parse `sheet` and classify its rows. Writes nothing.
    ///
    /// # Errors
    /// Returns an invalid-request [`Error`] for malformed sheets and an
    /// internal [`Error`] when deliveries cannot be read.
    pub async fn preview(&self, sheet: &str) -> Result<ReconciliationReport, Error> {
        let rows = parse_status_sheet(sheet)?;
        let deliveries = self.store.find(DELIVERIES, &Query::new()).await?;
        let report = classify(&rows, &deliveries);
        info!(
            rows = report.total_rows,
            matched = report.matched.len(),
            needs_update = report.needs_update.len(),
            not_found = report.not_found.len(),
            "reconciliation preview computed"
        );
        Ok(report)
    }

    /// Apply approved status changes one by one.
    pub async fn apply(&self, updates: &[StatusUpdate], actor: &Principal) -> ApplyReport {
        let mut report = ApplyReport::default();
        for update in updates {
            let number = normalise_delivery_number(&update.delivery_number);
            match self.apply_one(&number, &update.new_status, actor).await {
                Ok(applied) => report.applied.push(applied),
                Err(reason) => {
                    warn!(delivery_number = %number, %reason, "reconciliation item failed");
                    report.failed.push(FailedUpdate {
                        delivery_number: number,
                        reason,
                    });
                }
            }
        }
        info!(
            applied = report.applied.len(),
            failed = report.failed.len(),
            actor = actor.id(),
            "reconciliation applied"
        );
        report
    }

    async fn apply_one(
        &self,
        number: &str,
        new_status: &str,
        actor: &Principal,
    ) -> Result<AppliedUpdate, String> {
        let status = new_status.trim().to_lowercase();
        if number.is_empty() {
            return Err("deliveryNumber must not be empty".to_owned());
        }
        if status.is_empty() {
            return Err("newStatus must not be empty".to_owned());
        }

        let lookup = number_lookup(number).map_err(|err| err.to_string())?;
        let delivery = self
            .store
            .find_one(DELIVERIES, &lookup)
            .await
            .map_err(|err| err.to_string())?
            .ok_or_else(|| "delivery not found".to_owned())?;

        let reconciled_at = self.clock.utc().to_rfc3339_opts(SecondsFormat::Millis, true);
        let patch = Patch::default()
            .set(STATUS_FIELD, status.clone())
            .set(RECONCILED_AT_FIELD, reconciled_at)
            .set(RECONCILED_BY_FIELD, actor.id())
            .set(STATUS_SOURCE_FIELD, RECONCILIATION_SOURCE);
        let updated = self
            .store
            .update_one(DELIVERIES, &Query::by_id(delivery.id()), &patch)
            .await
            .map_err(|err| err.to_string())?
            .ok_or_else(|| "delivery not found".to_owned())?;

        Ok(AppliedUpdate {
            delivery_number: number.to_owned(),
            delivery_id: updated.id().to_string(),
            previous_status: delivery.str_field(STATUS_FIELD).map(str::to_owned),
            new_status: status,
        })
    }
}

/// Select the delivery whose trimmed number equals `number` ignoring case,
/// the comparison preview applies through [`normalise_delivery_number`].
fn number_lookup(number: &str) -> Result<Query, QueryError> {
    let pattern = Pattern::new(format!(r"^\s*{}\s*$", regex::escape(number)), true)?;
    Ok(Query::new().matching(DELIVERY_NUMBER_FIELD, pattern))
}
