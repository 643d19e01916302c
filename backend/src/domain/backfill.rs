//! Contractor backfill migration.
//!
//! Normalises user roles and enforces the driver to contractor reference:
//! every contractor owns itself, every driver points at an existing
//! contractor, and deliveries inherit the contractor of their driver. A driver
//! with a dangling reference is assigned to the first contractor in
//! collection order; with no contractors at all it is reported unassigned.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::ports::{DocumentStore, DocumentStoreError};
use super::{
    CONTRACTOR_ID_FIELD, DELIVERIES, DRIVER_ID_FIELD, DRIVERS, Patch, Query, ROLE_FIELD, Record,
    Role,
};

/// Counters describing one backfill run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillReport {
    /// Users whose stored role spelling changed.
    pub roles_normalised: usize,
    /// Contractors whose `contractorId` was set to their own id.
    pub contractors_fixed: usize,
    /// Drivers assigned to a contractor.
    pub drivers_assigned: usize,
    /// Drivers left without a contractor because none exists.
    pub drivers_unassigned: usize,
    /// Deliveries that inherited their driver's contractor.
    pub deliveries_backfilled: usize,
}

/// Runs the backfill against one store.
pub struct ContractorBackfill {
    store: Arc<dyn DocumentStore>,
}

impl ContractorBackfill {
    /// Create a backfill over `store`.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Execute every step and report what changed.
    ///
    /// # Errors
    /// Propagates the first [`DocumentStoreError`]; steps already written stay
    /// written, and a rerun resumes idempotently.
    pub async fn run(&self) -> Result<BackfillReport, DocumentStoreError> {
        let mut report = BackfillReport::default();
        let users = self.normalise_roles(&mut report).await?;

        let contractors: Vec<&Record> = users
            .iter()
            .filter(|user| role_of(user) == Role::Contractor)
            .collect();
        let contractor_ids: HashSet<&str> =
            contractors.iter().map(|user| user.id().as_str()).collect();

        for contractor in &contractors {
            if contractor.str_field(CONTRACTOR_ID_FIELD) != Some(contractor.id().as_str()) {
                self.set_contractor(DRIVERS, contractor, contractor.id().as_str())
                    .await?;
                report.contractors_fixed += 1;
            }
        }

        let fallback = contractors.first().map(|user| user.id().as_str());
        let mut driver_contractors: HashMap<String, String> = HashMap::new();
        for driver in users.iter().filter(|user| role_of(user) == Role::Driver) {
            let current = driver
                .str_field(CONTRACTOR_ID_FIELD)
                .filter(|id| contractor_ids.contains(id));
            let assigned = match (current, fallback) {
                (Some(id), _) => id,
                (None, Some(first)) => {
                    self.set_contractor(DRIVERS, driver, first).await?;
                    report.drivers_assigned += 1;
                    first
                }
                (None, None) => {
                    warn!(driver_id = %driver.id(), "no contractor available for driver");
                    report.drivers_unassigned += 1;
                    continue;
                }
            };
            driver_contractors.insert(driver.id().to_string(), assigned.to_owned());
        }

        self.backfill_deliveries(&driver_contractors, &mut report)
            .await?;
        info!(?report, "contractor backfill finished");
        Ok(report)
    }

    async fn normalise_roles(
        &self,
        report: &mut BackfillReport,
    ) -> Result<Vec<Record>, DocumentStoreError> {
        let users = self.store.find(DRIVERS, &Query::new()).await?;
        let mut normalised = Vec::with_capacity(users.len());
        for user in users {
            let role = role_of(&user);
            if user.str_field(ROLE_FIELD) == Some(role.as_str()) {
                normalised.push(user);
                continue;
            }
            let patch = Patch::default().set(ROLE_FIELD, role.as_str());
            let updated = self
                .store
                .update_one(DRIVERS, &Query::by_id(user.id()), &patch)
                .await?;
            report.roles_normalised += 1;
            normalised.push(updated.unwrap_or(user));
        }
        Ok(normalised)
    }

    async fn backfill_deliveries(
        &self,
        driver_contractors: &HashMap<String, String>,
        report: &mut BackfillReport,
    ) -> Result<(), DocumentStoreError> {
        let deliveries = self.store.find(DELIVERIES, &Query::new()).await?;
        for delivery in deliveries {
            let has_contractor = delivery
                .str_field(CONTRACTOR_ID_FIELD)
                .is_some_and(|id| !id.is_empty());
            if has_contractor {
                continue;
            }
            let Some(contractor) = delivery
                .str_field(DRIVER_ID_FIELD)
                .and_then(|driver| driver_contractors.get(driver))
            else {
                continue;
            };
            self.set_contractor(DELIVERIES, &delivery, contractor)
                .await?;
            report.deliveries_backfilled += 1;
        }
        Ok(())
    }

    async fn set_contractor(
        &self,
        collection: &str,
        record: &Record,
        contractor_id: &str,
    ) -> Result<(), DocumentStoreError> {
        let patch = Patch::default().set(CONTRACTOR_ID_FIELD, contractor_id);
        self.store
            .update_one(collection, &Query::by_id(record.id()), &patch)
            .await?;
        Ok(())
    }
}

fn role_of(user: &Record) -> Role {
    Role::parse_lenient(user.str_field(ROLE_FIELD))
}
