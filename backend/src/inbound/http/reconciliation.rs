//! Reconciliation API handlers.
//!
//! ```text
//! POST /api/v1/reconciliation/preview   (text/csv body)
//! POST /api/v1/reconciliation/apply {"items":[{"deliveryNumber":"CNT-1","newStatus":"submitted"}]}
//! ```

use actix_web::{post, web};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::domain::{ApiResult, ApplyReport, Error, Principal, ReconciliationReport, StatusUpdate};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::tenant::RequestTenant;

/// Approved status changes.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRequest {
    /// Changes to write.
    pub items: Vec<StatusUpdate>,
    /// Tenant, consulted after the header and query parameter.
    #[serde(default)]
    pub city: Option<String>,
}

/// Classify an uploaded status sheet against stored deliveries.
#[utoipa::path(
    post,
    path = "/api/v1/reconciliation/preview",
    request_body(content = String, content_type = "text/csv", description = "Delimited sheet with a header row"),
    params(("x-city" = Option<String>, Header, description = "Tenant (city)")),
    responses(
        (status = 200, description = "Classified rows", body = ReconciliationReport),
        (status = 400, description = "Malformed sheet", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Administrators only", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["reconciliation"],
    operation_id = "previewReconciliation"
)]
#[post("/reconciliation/preview")]
pub async fn preview_reconciliation(
    state: web::Data<HttpState>,
    tenant: RequestTenant,
    principal: Principal,
    sheet: String,
) -> ApiResult<web::Json<ReconciliationReport>> {
    principal.require_admin()?;
    let tenant = tenant.resolve(&state.tenants, None);
    let report = state.reconciliation(&tenant)?.preview(&sheet).await?;
    Ok(web::Json(report))
}

/// Write approved status changes; per-item failures do not fail the batch.
#[utoipa::path(
    post,
    path = "/api/v1/reconciliation/apply",
    request_body = ApplyRequest,
    params(("x-city" = Option<String>, Header, description = "Tenant (city)")),
    responses(
        (status = 200, description = "Per-item outcomes", body = ApplyReport),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Administrators only", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["reconciliation"],
    operation_id = "applyReconciliation"
)]
#[post("/reconciliation/apply")]
pub async fn apply_reconciliation(
    state: web::Data<HttpState>,
    tenant: RequestTenant,
    principal: Principal,
    payload: web::Json<ApplyRequest>,
) -> ApiResult<web::Json<ApplyReport>> {
    principal.require_admin()?;
    let ApplyRequest { items, city } = payload.into_inner();
    let tenant = tenant.resolve(&state.tenants, city.as_deref());
    let report = state
        .reconciliation(&tenant)?
        .apply(&items, &principal)
        .await;
    Ok(web::Json(report))
}

/// Register the reconciliation routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(preview_reconciliation)
        .service(apply_reconciliation);
}
