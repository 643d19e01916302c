//! HTTP inbound adapter exposing REST endpoints.

pub mod deliveries;
pub mod error;
pub mod health;
pub mod principal;
pub mod reconciliation;
pub mod schemas;
pub mod state;
pub mod tenant;

pub use crate::domain::ApiResult;
