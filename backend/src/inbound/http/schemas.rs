//! OpenAPI schema definitions for domain types.
//!
//! [`crate::domain::Record`] is an open attribute map and cannot derive
//! `ToSchema`. The wrappers here document the delivery shape served by the
//! HTTP adapter; they are never constructed.

use utoipa::ToSchema;

/// OpenAPI schema for a delivery [`crate::domain::Record`].
///
/// Stored attributes are open; the documented ones are those the delivery
/// endpoints normalise.
#[derive(ToSchema)]
#[schema(as = crate::domain::Record)]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct DeliverySchema {
    /// Opaque identifier.
    #[schema(rename = "_id", example = "6f1c1d2e-8b6a-4c43-9d57-1b2f7b7f0a10")]
    id: String,
    /// Upper-cased delivery number.
    #[schema(rename = "deliveryNumber", example = "CNT-0001")]
    delivery_number: String,
    /// `pending` or `submitted`.
    #[schema(example = "pending")]
    status: String,
    /// Document kind to stored file references.
    #[schema(value_type = Object)]
    documents: Option<serde_json::Value>,
    /// Driver who registered the delivery.
    #[schema(rename = "driverId")]
    driver_id: Option<String>,
    /// Contractor owning the driver.
    #[schema(rename = "contractorId")]
    contractor_id: Option<String>,
    /// RFC 3339 creation time.
    #[schema(rename = "createdAt", example = "2026-03-02T10:30:00Z")]
    created_at: String,
    /// RFC 3339 time of the last change.
    #[schema(rename = "updatedAt", example = "2026-03-02T10:30:00Z")]
    updated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use utoipa::PartialSchema;

    #[test]
    fn delivery_schema_uses_serialised_field_names() {
        let schema_json =
            serde_json::to_string(&DeliverySchema::schema()).expect("schema serialises to JSON");
        // utoipa replaces :: with . in schema names
        assert_eq!(DeliverySchema::name(), "crate.domain.Record");
        for field in ["_id", "deliveryNumber", "createdAt", "updatedAt"] {
            assert!(schema_json.contains(field), "schema should contain {field}");
        }
    }
}
