//! Role-scoped delivery operations over the uniform document store.
//!
//! Administrators see every delivery, contractors see deliveries carrying
//! their `contractorId`, drivers see deliveries carrying their `driverId`.
//! Records outside the caller's scope are reported as not found.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use utoipa::{IntoParams, ToSchema};

use super::ports::{BlobCleanup, DocumentStore};
use super::{
    CONTRACTOR_ID_FIELD, DELIVERIES, DELIVERY_NUMBER_FIELD, DOCUMENTS_FIELD, DRIVER_ID_FIELD,
    DeliveryStatus, Error, Fields, Patch, Pattern, Principal, Query, Record, Role, STATUS_FIELD,
    TENANT_FIELD, document_references, normalise_delivery_number, normalise_documents,
};

/// Listing filters.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DeliveryFilter {
    /// Case-insensitive substring of the delivery number.
    pub search: Option<String>,
    /// `pending`, `draft` or `submitted`.
    pub status: Option<String>,
}

/// Per-status counts for administrators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeliverySummary {
    /// Deliveries in the tenant.
    pub total: usize,
    /// Pending (or draft) deliveries.
    pub pending: usize,
    /// Submitted deliveries.
    pub submitted: usize,
    /// Deliveries with any other stored status.
    pub other: usize,
    /// Numbers of deliveries with no document attached.
    pub without_documents: Vec<String>,
}

/// Delivery use cases for one tenant.
#[derive(Clone)]
pub struct DeliveryService {
    store: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobCleanup>,
}

impl DeliveryService {
    /// Create a service over a tenant store.
    pub fn new(store: Arc<dyn DocumentStore>, blobs: Arc<dyn BlobCleanup>) -> Self {
        Self { store, blobs }
    }

    /// Deliveries visible to `principal` that match `filter`.
    ///
    /// # Errors
    /// Invalid filters yield an invalid-request [`Error`]; backend failures an
    /// internal one.
    pub async fn list(
        &self,
        principal: &Principal,
        filter: &DeliveryFilter,
    ) -> Result<Vec<Record>, Error> {
        let mut query = visibility(principal);
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = Pattern::contains_literal(search)
                .map_err(|err| Error::invalid_request(err.to_string()))?;
            query = query.matching(DELIVERY_NUMBER_FIELD, pattern);
        }
        if let Some(raw) = filter.status.as_deref().filter(|s| !s.trim().is_empty()) {
            query = match parse_status(raw)? {
                DeliveryStatus::Pending => query.any_of(vec![
                    Query::new().equals(STATUS_FIELD, DeliveryStatus::Pending.as_str()),
                    Query::new().equals(STATUS_FIELD, "draft"),
                ]),
                DeliveryStatus::Submitted => {
                    query.equals(STATUS_FIELD, DeliveryStatus::Submitted.as_str())
                }
            };
        }
        Ok(self.store.find(DELIVERIES, &query).await?)
    }

    /// A single visible delivery.
    ///
    /// # Errors
    /// Not-found when the delivery does not exist or is out of scope.
    pub async fn get(&self, principal: &Principal, id: &str) -> Result<Record, Error> {
        self.store
            .find_by_id(DELIVERIES, id)
            .await?
            .filter(|record| visibility(principal).matches(record))
            .ok_or_else(|| Error::not_found(format!("delivery {id} not found")))
    }

    /// Create a delivery owned by `principal`.
    ///
    /// # Errors
    /// Invalid-request when the number is missing or the status unknown.
    pub async fn create(&self, principal: &Principal, mut fields: Fields) -> Result<Record, Error> {
        let number = fields
            .get(DELIVERY_NUMBER_FIELD)
            .and_then(Value::as_str)
            .map(normalise_delivery_number)
            .filter(|number| !number.is_empty())
            .ok_or_else(|| Error::invalid_request("deliveryNumber is required"))?;
        let status = match fields.get(STATUS_FIELD).and_then(Value::as_str) {
            Some(raw) => parse_status(raw)?,
            None => DeliveryStatus::Pending,
        };
        let documents = normalise_documents(fields.get(DOCUMENTS_FIELD).unwrap_or(&Value::Null));

        fields.remove(TENANT_FIELD);
        fields.insert(DELIVERY_NUMBER_FIELD.to_owned(), Value::from(number));
        fields.insert(STATUS_FIELD.to_owned(), Value::from(status.as_str()));
        fields.insert(DOCUMENTS_FIELD.to_owned(), documents);
        if principal.role() != Role::Admin {
            fields.remove(DRIVER_ID_FIELD);
            fields.remove(CONTRACTOR_ID_FIELD);
            if principal.role() == Role::Driver {
                fields.insert(DRIVER_ID_FIELD.to_owned(), Value::from(principal.id()));
            }
            if let Some(contractor) = principal.contractor_id() {
                fields.insert(CONTRACTOR_ID_FIELD.to_owned(), Value::from(contractor));
            }
        }

        let record = self.store.create(DELIVERIES, fields).await?;
        info!(delivery_id = %record.id(), user_id = principal.id(), "delivery created");
        Ok(record)
    }

    /// Merge-patch a visible delivery.
    ///
    /// # Errors
    /// Not-found when out of scope; invalid-request for an unknown status.
    pub async fn update(
        &self,
        principal: &Principal,
        id: &str,
        mut fields: Fields,
    ) -> Result<Record, Error> {
        let existing = self.get(principal, id).await?;

        fields.remove(TENANT_FIELD);
        if !principal.is_admin() {
            fields.remove(DRIVER_ID_FIELD);
            fields.remove(CONTRACTOR_ID_FIELD);
        }
        if let Some(number) = fields.get(DELIVERY_NUMBER_FIELD).and_then(Value::as_str) {
            let number = normalise_delivery_number(number);
            fields.insert(DELIVERY_NUMBER_FIELD.to_owned(), Value::from(number));
        }
        if let Some(raw) = fields.get(STATUS_FIELD).and_then(Value::as_str) {
            let status = parse_status(raw)?;
            fields.insert(STATUS_FIELD.to_owned(), Value::from(status.as_str()));
        }
        if let Some(documents) = fields.get(DOCUMENTS_FIELD) {
            let documents = normalise_documents(documents);
            fields.insert(DOCUMENTS_FIELD.to_owned(), documents);
        }

        self.store
            .update_one(DELIVERIES, &Query::by_id(existing.id()), &Patch::new(fields))
            .await?
            .ok_or_else(|| Error::not_found(format!("delivery {id} not found")))
    }

    /// Delete a delivery and request removal of its stored documents.
    ///
    /// Blob removal failures are logged; the record stays deleted.
    ///
    /// # Errors
    /// Forbidden for non-admins; not-found when the delivery is absent.
    pub async fn delete(&self, principal: &Principal, id: &str) -> Result<(), Error> {
        principal.require_admin()?;
        let Some(record) = self.store.find_by_id(DELIVERIES, id).await? else {
            return Err(Error::not_found(format!("delivery {id} not found")));
        };
        if !self
            .store
            .delete_one(DELIVERIES, &Query::by_id(record.id()))
            .await?
        {
            return Err(Error::not_found(format!("delivery {id} not found")));
        }

        for reference in document_references(record.field(DOCUMENTS_FIELD)) {
            if let Err(err) = self.blobs.remove(&reference).await {
                warn!(error = %err, delivery_id = %record.id(), "blob cleanup failed");
            }
        }
        info!(delivery_id = %record.id(), user_id = principal.id(), "delivery deleted");
        Ok(())
    }

    /// Status counts and deliveries lacking documents.
    ///
    /// # Errors
    /// Forbidden for non-admins.
    pub async fn summary(&self, principal: &Principal) -> Result<DeliverySummary, Error> {
        principal.require_admin()?;
        let deliveries = self.store.find(DELIVERIES, &Query::new()).await?;
        let mut summary = DeliverySummary {
            total: deliveries.len(),
            ..DeliverySummary::default()
        };
        for delivery in &deliveries {
            match delivery.str_field(STATUS_FIELD).and_then(DeliveryStatus::parse) {
                Some(DeliveryStatus::Pending) => summary.pending += 1,
                Some(DeliveryStatus::Submitted) => summary.submitted += 1,
                None => summary.other += 1,
            }
            if document_references(delivery.field(DOCUMENTS_FIELD)).is_empty() {
                let number = delivery
                    .str_field(DELIVERY_NUMBER_FIELD)
                    .map_or_else(|| delivery.id().to_string(), str::to_owned);
                summary.without_documents.push(number);
            }
        }
        Ok(summary)
    }
}

/// Query restricting deliveries to those `principal` may see.
#[must_use]
pub fn visibility(principal: &Principal) -> Query {
    match principal.role() {
        Role::Admin => Query::new(),
        Role::Contractor => Query::new().equals(
            CONTRACTOR_ID_FIELD,
            principal.contractor_id().unwrap_or(principal.id()),
        ),
        Role::Driver => Query::new().equals(DRIVER_ID_FIELD, principal.id()),
    }
}

fn parse_status(raw: &str) -> Result<DeliveryStatus, Error> {
    DeliveryStatus::parse(raw)
        .ok_or_else(|| Error::invalid_request(format!("unknown delivery status `{raw}`")))
}
