//! Delivery vocabulary: numbers, statuses and attached documents.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

/// Attribute holding the human-assigned delivery number.
pub const DELIVERY_NUMBER_FIELD: &str = "deliveryNumber";
/// Attribute holding the delivery status.
pub const STATUS_FIELD: &str = "status";
/// Attribute holding the document map.
pub const DOCUMENTS_FIELD: &str = "documents";

/// Document slots a delivery can carry.
pub const DOCUMENT_KINDS: [&str; 5] = [
    "canhotoNF",
    "canhotoCTE",
    "diarioBordo",
    "devolucaoVazio",
    "retiradaCheio",
];

/// Lifecycle status of a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    /// Documents still being collected (alias `draft`).
    Pending,
    /// Documents handed in.
    Submitted,
}

impl DeliveryStatus {
    /// Parse a stored or submitted status, accepting the `draft` alias.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "pending" | "draft" => Some(Self::Pending),
            "submitted" => Some(Self::Submitted),
            _ => None,
        }
    }

    /// Canonical stored spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Submitted => "submitted",
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical form of a delivery number: trimmed and upper-cased.
#[must_use]
pub fn normalise_delivery_number(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Normalise a document map at the boundary.
///
/// Only the known slots are kept. Each slot holds `null`, one reference or a
/// list of references; comma-joined legacy strings become lists.
#[must_use]
pub fn normalise_documents(raw: &Value) -> Value {
    let source = raw.as_object();
    let mut documents = Map::new();
    for kind in DOCUMENT_KINDS {
        let slot = source
            .and_then(|map| map.get(kind))
            .map_or(Value::Null, normalise_slot);
        documents.insert(kind.to_owned(), slot);
    }
    Value::Object(documents)
}

fn normalise_slot(value: &Value) -> Value {
    match value {
        Value::String(text) if text.contains(',') => references_value(text.split(',')),
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                Value::Null
            } else {
                Value::String(trimmed.to_owned())
            }
        }
        Value::Array(items) => references_value(items.iter().filter_map(Value::as_str)),
        _ => Value::Null,
    }
}

fn references_value<'a>(items: impl Iterator<Item = &'a str>) -> Value {
    let references: Vec<Value> = items
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| Value::String(item.to_owned()))
        .collect();
    if references.is_empty() {
        Value::Null
    } else {
        Value::Array(references)
    }
}

/// Every stored reference in a document map.
#[must_use]
pub fn document_references(documents: Option<&Value>) -> Vec<String> {
    let Some(map) = documents.and_then(Value::as_object) else {
        return Vec::new();
    };
    map.values()
        .flat_map(|slot| match slot {
            Value::String(text) => text
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_owned)
                .collect::<Vec<_>>(),
            Value::Array(items) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect::<Vec<_>>(),
            _ => Vec::new(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("pending", Some(DeliveryStatus::Pending))]
    #[case(" Draft", Some(DeliveryStatus::Pending))]
    #[case("SUBMITTED", Some(DeliveryStatus::Submitted))]
    #[case("lost", None)]
    fn statuses_parse_with_alias(#[case] raw: &str, #[case] expected: Option<DeliveryStatus>) {
        assert_eq!(DeliveryStatus::parse(raw), expected);
    }

    #[rstest]
    fn documents_are_normalised_per_slot() {
        let raw = json!({
            "canhotoNF": "a.pdf, b.pdf,",
            "canhotoCTE": "  ",
            "diarioBordo": ["c.pdf", 3, ""],
            "retiradaCheio": "d.pdf",
            "unknown": "x.pdf"
        });
        assert_eq!(
            normalise_documents(&raw),
            json!({
                "canhotoNF": ["a.pdf", "b.pdf"],
                "canhotoCTE": null,
                "diarioBordo": ["c.pdf"],
                "devolucaoVazio": null,
                "retiradaCheio": "d.pdf"
            })
        );
    }

    #[rstest]
    fn non_maps_normalise_to_empty_slots() {
        let normalised = normalise_documents(&json!("oops"));
        assert!(normalised
            .as_object()
            .is_some_and(|map| map.values().all(Value::is_null)));
    }

    #[rstest]
    fn references_flatten_legacy_strings() {
        let documents = json!({
            "canhotoNF": "a.pdf,b.pdf",
            "canhotoCTE": ["c.pdf"],
            "diarioBordo": null
        });
        let mut references = document_references(Some(&documents));
        references.sort();
        assert_eq!(references, vec!["a.pdf", "b.pdf", "c.pdf"]);
        assert!(document_references(None).is_empty());
    }
}
