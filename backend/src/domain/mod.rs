//! Domain primitives, services and ports.
//!
//! Purpose: define the record model, the backend-neutral query vocabulary,
//! tenant and principal resolution, and the delivery use cases. Nothing here
//! knows about HTTP, Diesel or the filesystem; adapters plug in through the
//! traits in [`ports`].
//!
//! Public surface:
//! - [`Record`], [`Patch`] and [`Query`]: the uniform document model.
//! - [`TenantPolicy`] and [`Principal`]: who is asking, and for which city.
//! - [`DeliveryService`], [`ReconciliationService`] and
//!   [`ContractorBackfill`]: the use cases served by the inbound adapters.

pub mod backfill;
pub mod delivery;
pub mod delivery_service;
pub mod error;
pub mod ports;
pub mod query;
pub mod reconciliation;
pub mod record;
pub mod tenant;
pub mod trace_id;
pub mod user;

pub use self::backfill::{BackfillReport, ContractorBackfill};
pub use self::delivery::{
    DELIVERY_NUMBER_FIELD, DOCUMENT_KINDS, DOCUMENTS_FIELD, DeliveryStatus, STATUS_FIELD,
    document_references, normalise_delivery_number, normalise_documents,
};
pub use self::delivery_service::{DeliveryFilter, DeliveryService, DeliverySummary, visibility};
pub use self::error::{Error, ErrorCode};
pub use self::query::{Clause, Condition, Pattern, Query, QueryError};
pub use self::reconciliation::{
    AppliedUpdate, ApplyReport, FailedUpdate, MatchedRow, RECONCILED_AT_FIELD,
    RECONCILED_BY_FIELD, ReconciliationError, ReconciliationReport, ReconciliationService,
    STATUS_SOURCE_FIELD, SheetRow, StatusChange, StatusUpdate, UnmatchedRow,
    normalise_sheet_status, parse_status_sheet,
};
pub use self::record::{CREATED_AT_FIELD, Fields, ID_FIELD, Patch, Record, RecordId, UPDATED_AT_FIELD};
pub use self::tenant::{
    DEFAULT_TENANT, DEFAULT_TENANTS, DELIVERIES, DRIVERS, TENANT_FIELD, Tenant, TenantCandidates,
    TenantPolicy, TenantPolicyError, is_tenant_partitioned,
};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::user::{CONTRACTOR_ID_FIELD, DRIVER_ID_FIELD, Principal, ROLE_FIELD, Role};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use podtrack::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<()> {
///     Err(Error::forbidden("administrators only"))
/// }
/// assert!(handler().is_err());
/// ```
pub type ApiResult<T> = Result<T, Error>;
