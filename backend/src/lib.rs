//! Proof-of-delivery tracking backend.
//!
//! Deliveries and the users who drive them are stored as schemaless
//! documents partitioned by city. A PostgreSQL JSONB table is the primary
//! store; a per-city JSON file keeps the service answering when the database
//! is disabled or unreachable.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod server;
pub mod settings;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use middleware::Trace;
