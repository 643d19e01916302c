//! Delivery API handlers.
//!
//! ```text
//! GET    /api/v1/deliveries?search=cnt&status=pending
//! GET    /api/v1/deliveries/summary
//! GET    /api/v1/deliveries/{id}
//! POST   /api/v1/deliveries {"deliveryNumber":"cnt-9","documents":{"canhotoNF":"a.pdf"}}
//! PATCH  /api/v1/deliveries/{id} {"status":"submitted"}
//! DELETE /api/v1/deliveries/{id}
//! ```
//!
//! Every handler resolves the tenant before touching a store.

use actix_web::{HttpResponse, delete, get, patch, post, web};

use crate::domain::{
    ApiResult, DeliveryFilter, DeliverySummary, Error, Fields, Principal, Record,
};
use crate::inbound::http::schemas::DeliverySchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::tenant::{RequestTenant, body_tenant};

/// List deliveries visible to the caller.
#[utoipa::path(
    get,
    path = "/api/v1/deliveries",
    params(
        DeliveryFilter,
        ("x-city" = Option<String>, Header, description = "Tenant (city)")
    ),
    responses(
        (status = 200, description = "Visible deliveries", body = [DeliverySchema]),
        (status = 400, description = "Invalid filter", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["deliveries"],
    operation_id = "listDeliveries"
)]
#[get("/deliveries")]
pub async fn list_deliveries(
    state: web::Data<HttpState>,
    tenant: RequestTenant,
    principal: Principal,
    filter: web::Query<DeliveryFilter>,
) -> ApiResult<web::Json<Vec<Record>>> {
    let tenant = tenant.resolve(&state.tenants, None);
    let deliveries = state
        .deliveries(&tenant)?
        .list(&principal, &filter.into_inner())
        .await?;
    Ok(web::Json(deliveries))
}

/// Status counts for administrators.
#[utoipa::path(
    get,
    path = "/api/v1/deliveries/summary",
    params(("x-city" = Option<String>, Header, description = "Tenant (city)")),
    responses(
        (status = 200, description = "Per-status counts", body = DeliverySummary),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Administrators only", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["deliveries"],
    operation_id = "deliverySummary"
)]
#[get("/deliveries/summary")]
pub async fn delivery_summary(
    state: web::Data<HttpState>,
    tenant: RequestTenant,
    principal: Principal,
) -> ApiResult<web::Json<DeliverySummary>> {
    let tenant = tenant.resolve(&state.tenants, None);
    let summary = state.deliveries(&tenant)?.summary(&principal).await?;
    Ok(web::Json(summary))
}

/// Fetch one visible delivery.
#[utoipa::path(
    get,
    path = "/api/v1/deliveries/{id}",
    params(
        ("id" = String, Path, description = "Delivery identifier"),
        ("x-city" = Option<String>, Header, description = "Tenant (city)")
    ),
    responses(
        (status = 200, description = "Delivery", body = DeliverySchema),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Not found or not visible", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["deliveries"],
    operation_id = "getDelivery"
)]
#[get("/deliveries/{id}")]
pub async fn get_delivery(
    state: web::Data<HttpState>,
    tenant: RequestTenant,
    principal: Principal,
    path: web::Path<String>,
) -> ApiResult<web::Json<Record>> {
    let tenant = tenant.resolve(&state.tenants, None);
    let delivery = state.deliveries(&tenant)?.get(&principal, &path).await?;
    Ok(web::Json(delivery))
}

/// Register a delivery for the caller.
#[utoipa::path(
    post,
    path = "/api/v1/deliveries",
    request_body = DeliverySchema,
    params(("x-city" = Option<String>, Header, description = "Tenant (city)")),
    responses(
        (status = 201, description = "Created delivery", body = DeliverySchema),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["deliveries"],
    operation_id = "createDelivery"
)]
#[post("/deliveries")]
pub async fn create_delivery(
    state: web::Data<HttpState>,
    tenant: RequestTenant,
    principal: Principal,
    payload: web::Json<Fields>,
) -> ApiResult<HttpResponse> {
    let fields = payload.into_inner();
    let tenant = tenant.resolve(&state.tenants, body_tenant(&fields));
    let created = state.deliveries(&tenant)?.create(&principal, fields).await?;
    Ok(HttpResponse::Created().json(created))
}

/// Merge-patch a visible delivery.
#[utoipa::path(
    patch,
    path = "/api/v1/deliveries/{id}",
    request_body = DeliverySchema,
    params(
        ("id" = String, Path, description = "Delivery identifier"),
        ("x-city" = Option<String>, Header, description = "Tenant (city)")
    ),
    responses(
        (status = 200, description = "Updated delivery", body = DeliverySchema),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Not found or not visible", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["deliveries"],
    operation_id = "updateDelivery"
)]
#[patch("/deliveries/{id}")]
pub async fn update_delivery(
    state: web::Data<HttpState>,
    tenant: RequestTenant,
    principal: Principal,
    path: web::Path<String>,
    payload: web::Json<Fields>,
) -> ApiResult<web::Json<Record>> {
    let fields = payload.into_inner();
    let tenant = tenant.resolve(&state.tenants, body_tenant(&fields));
    let updated = state
        .deliveries(&tenant)?
        .update(&principal, &path, fields)
        .await?;
    Ok(web::Json(updated))
}

/// Delete a delivery and its stored documents. Administrators only.
#[utoipa::path(
    delete,
    path = "/api/v1/deliveries/{id}",
    params(
        ("id" = String, Path, description = "Delivery identifier"),
        ("x-city" = Option<String>, Header, description = "Tenant (city)")
    ),
    responses(
        (status = 204, description = "Deleted"),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Administrators only", body = Error),
        (status = 404, description = "Not found", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["deliveries"],
    operation_id = "deleteDelivery"
)]
#[delete("/deliveries/{id}")]
pub async fn delete_delivery(
    state: web::Data<HttpState>,
    tenant: RequestTenant,
    principal: Principal,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let tenant = tenant.resolve(&state.tenants, None);
    state.deliveries(&tenant)?.delete(&principal, &path).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Register the delivery routes; the summary precedes `{id}` so it is not
/// captured as an identifier.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_deliveries)
        .service(delivery_summary)
        .service(get_delivery)
        .service(create_delivery)
        .service(update_delivery)
        .service(delete_delivery);
}
