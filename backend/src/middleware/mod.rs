//! Request middleware.
//!
//! Purpose: request lifecycle concerns shared by every route, currently the
//! trace identifier attached to logs, error payloads and responses.

pub mod trace;

pub use trace::Trace;
