//! Diesel and pool error mapping onto [`DocumentStoreError`].

use tracing::debug;

use crate::domain::ports::DocumentStoreError;

use super::pool::PoolError;

/// Map pool failures to connection errors.
pub(super) fn map_pool_error(error: PoolError) -> DocumentStoreError {
    match error {
        PoolError::Checkout { message }
        | PoolError::Build { message }
        | PoolError::Migration { message } => DocumentStoreError::connection(message),
        timeout @ PoolError::Timeout { .. } => DocumentStoreError::connection(timeout.to_string()),
    }
}

/// Map Diesel errors to query or connection errors.
///
/// Database messages are logged at debug level and kept out of the returned
/// error, which may end up in a response body.
pub(super) fn map_diesel_error(error: diesel::result::Error) -> DocumentStoreError {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(error = %error, "diesel operation failed"),
    }

    match error {
        DieselError::NotFound => DocumentStoreError::query("record not found"),
        DieselError::QueryBuilderError(_) => DocumentStoreError::query("database query error"),
        DieselError::DeserializationError(_) | DieselError::SerializationError(_) => {
            DocumentStoreError::query("document encoding error")
        }
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            DocumentStoreError::connection("database connection error")
        }
        _ => DocumentStoreError::query("database error"),
    }
}
