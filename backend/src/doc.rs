//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] collects the delivery, reconciliation and health endpoints of
//! the inbound layer together with their payload schemas. Swagger UI serves
//! it in debug builds.

use utoipa::OpenApi;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};

use crate::domain::{
    ApplyReport, DeliverySummary, Error, ErrorCode, ReconciliationReport, Role, StatusUpdate,
};
use crate::inbound::http::reconciliation::ApplyRequest;
use crate::inbound::http::schemas::DeliverySchema;

/// Document the trusted identity headers set by the authentication proxy.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "UserHeader",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                "x-user-id",
                "Authenticated user id, set by the upstream authentication proxy.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Proof-of-delivery tracking API",
        description = "Deliveries, their documents and status reconciliation, partitioned by city."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("UserHeader" = [])),
    paths(
        crate::inbound::http::deliveries::list_deliveries,
        crate::inbound::http::deliveries::delivery_summary,
        crate::inbound::http::deliveries::get_delivery,
        crate::inbound::http::deliveries::create_delivery,
        crate::inbound::http::deliveries::update_delivery,
        crate::inbound::http::deliveries::delete_delivery,
        crate::inbound::http::reconciliation::preview_reconciliation,
        crate::inbound::http::reconciliation::apply_reconciliation,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        DeliverySchema,
        DeliverySummary,
        ReconciliationReport,
        ApplyRequest,
        StatusUpdate,
        ApplyReport,
        Error,
        ErrorCode,
        Role
    )),
    tags(
        (name = "deliveries", description = "Role-scoped delivery records"),
        (name = "reconciliation", description = "Status sheet reconciliation"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    //! Tests verifying the generated OpenAPI document.

    use super::*;
    use rstest::rstest;
    use utoipa::openapi::RefOr;
    use utoipa::openapi::schema::Schema;

    fn assert_object_schema_has_field(schema: &RefOr<Schema>, field: &str) {
        match schema {
            RefOr::T(Schema::Object(obj)) => {
                assert!(
                    obj.properties.contains_key(field),
                    "schema should have field '{field}'"
                );
            }
            _ => panic!("expected Object schema"),
        }
    }

    #[rstest]
    #[case("/api/v1/deliveries")]
    #[case("/api/v1/deliveries/summary")]
    #[case("/api/v1/deliveries/{id}")]
    #[case("/api/v1/reconciliation/preview")]
    #[case("/api/v1/reconciliation/apply")]
    #[case("/health/ready")]
    fn paths_are_registered(#[case] path: &str) {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key(path), "missing {path}");
    }

    #[rstest]
    fn error_schema_has_code_and_message() {
        let doc = ApiDoc::openapi();
        let schemas = &doc.components.as_ref().expect("components").schemas;
        let error_schema = schemas.get("Error").expect("Error schema");

        assert_object_schema_has_field(error_schema, "code");
        assert_object_schema_has_field(error_schema, "message");
    }
}
