//! Generic stored record and the shallow merge patch applied to it.
//!
//! A [`Record`] serialises to a flat JSON object: `_id`, the open attribute
//! map, and the `createdAt`/`updatedAt` RFC 3339 timestamps. The same shape
//! is persisted by the file store and returned by every backend.

use std::borrow::Cow;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Open attribute map held by a record.
pub type Fields = Map<String, Value>;

/// Serialised key of the record identifier.
pub const ID_FIELD: &str = "_id";
/// Serialised key of the creation timestamp.
pub const CREATED_AT_FIELD: &str = "createdAt";
/// Serialised key of the last-mutation timestamp.
pub const UPDATED_AT_FIELD: &str = "updatedAt";

const RESERVED_FIELDS: [&str; 3] = [ID_FIELD, CREATED_AT_FIELD, UPDATED_AT_FIELD];

/// Opaque, immutable record identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Generate a fresh UUID v4 identifier.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrow the identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl AsRef<str> for RecordId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored document: identifier, timestamps and open fields.
///
/// # Examples
/// ```
/// use chrono::Utc;
/// use podtrack::domain::{Fields, Record, RecordId};
/// use serde_json::json;
///
/// let mut fields = Fields::new();
/// fields.insert("deliveryNumber".into(), json!("CNT-1"));
/// let record = Record::new(RecordId::from("d-1"), fields, Utc::now());
///
/// let value = serde_json::to_value(&record).unwrap();
/// assert_eq!(value["_id"], "d-1");
/// assert_eq!(value["deliveryNumber"], "CNT-1");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "_id")]
    id: RecordId,
    #[serde(rename = "createdAt")]
    created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    updated_at: DateTime<Utc>,
    #[serde(flatten)]
    fields: Fields,
}

impl Record {
    /// Build a new record stamped with `now` for both timestamps.
    ///
    /// Reserved keys present in `fields` are discarded.
    #[must_use]
    pub fn new(id: RecordId, fields: Fields, now: DateTime<Utc>) -> Self {
        Self::from_parts(id, fields, now, now)
    }

    /// Rehydrate a record from storage.
    #[must_use]
    pub fn from_parts(
        id: RecordId,
        mut fields: Fields,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        for key in RESERVED_FIELDS {
            fields.remove(key);
        }
        Self {
            id,
            created_at,
            updated_at,
            fields,
        }
    }

    /// Record identifier.
    #[must_use]
    pub fn id(&self) -> &RecordId {
        &self.id
    }

    /// Creation timestamp.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Timestamp of the last mutation.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Open attribute map.
    #[must_use]
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Consume the record, returning its attribute map.
    #[must_use]
    pub fn into_fields(self) -> Fields {
        self.fields
    }

    /// A top-level attribute.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// A top-level attribute holding a string.
    #[must_use]
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(Value::as_str)
    }

    /// Resolve a query path against the serialised view of the record.
    ///
    /// `_id` and the timestamps resolve to their serialised strings. Dotted
    /// paths descend into nested maps.
    #[must_use]
    pub fn lookup(&self, path: &str) -> Option<Cow<'_, Value>> {
        match path {
            ID_FIELD => Some(Cow::Owned(Value::String(self.id.0.clone()))),
            CREATED_AT_FIELD => serde_json::to_value(self.created_at).ok().map(Cow::Owned),
            UPDATED_AT_FIELD => serde_json::to_value(self.updated_at).ok().map(Cow::Owned),
            _ => {
                let mut segments = path.split('.');
                let first = segments.next()?;
                let mut current = self.fields.get(first)?;
                for segment in segments {
                    current = current.as_object()?.get(segment)?;
                }
                Some(Cow::Borrowed(current))
            }
        }
    }

    /// Apply a shallow merge patch and refresh `updatedAt`.
    pub fn apply(&mut self, patch: &Patch, now: DateTime<Utc>) {
        for (key, value) in &patch.0 {
            self.fields.insert(key.clone(), value.clone());
        }
        self.updated_at = now;
    }
}

/// Shallow merge patch.
///
/// Each entry replaces the attribute of the same name wholesale, nested maps
/// included. `_id`, `createdAt` and `updatedAt` cannot be patched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Patch(Fields);

impl Patch {
    /// Build a patch, discarding reserved keys.
    #[must_use]
    pub fn new(mut fields: Fields) -> Self {
        for key in RESERVED_FIELDS {
            fields.remove(key);
        }
        Self(fields)
    }

    /// Add or replace one entry.
    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if !RESERVED_FIELDS.contains(&key.as_str()) {
            self.0.insert(key, value.into());
        }
        self
    }

    /// Entries carried by the patch.
    #[must_use]
    pub fn fields(&self) -> &Fields {
        &self.0
    }

    /// Whether the patch carries no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A copy of the patch without `name`.
    #[must_use]
    pub fn without_field(&self, name: &str) -> Self {
        let mut fields = self.0.clone();
        fields.remove(name);
        Self(fields)
    }
}

impl From<Fields> for Patch {
    fn from(fields: Fields) -> Self {
        Self::new(fields)
    }
}
