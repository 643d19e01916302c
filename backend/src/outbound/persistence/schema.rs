//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match the embedded migrations exactly. Regenerate
//! with `diesel print-schema` or update by hand when a migration changes the
//! table.

diesel::table! {
    /// Schemaless records of every collection.
    ///
    /// `body` holds the open attribute map; the identifier and timestamps live
    /// in their own columns. Primary key is `(collection, id)`.
    documents (collection, id) {
        /// Collection name, e.g. `drivers` or `deliveries`.
        collection -> Text,
        /// Record identifier (UUID v4).
        id -> Uuid,
        /// Attribute map; always a JSON object.
        body -> Jsonb,
        /// Record creation timestamp.
        created_at -> Timestamptz,
        /// Last mutation timestamp.
        updated_at -> Timestamptz,
    }
}
