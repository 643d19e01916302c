//! Translation of [`Query`] onto the `documents` table.
//!
//! Scalar equalities are merged into one JSONB containment literal
//! (`body @> $1`), which the GIN index serves. Object and array equalities
//! compare the value at the field path (`body #> $path = $value`), since
//! containment would accept supersets of them. Null equality also accepts a
//! missing key. Regex descriptors compare the text at the field path with
//! PostgreSQL's `~*`/`~`. `_id` maps to the `id` column when it parses as a
//! UUID and to the legacy identifier stored in the body otherwise.
//!
//! Regex syntax is passed through unchanged; PostgreSQL evaluates it with its
//! own ARE dialect, which agrees with the in-memory evaluator for the escaped
//! literals and simple anchors the services build.

use diesel::dsl::sql;
use diesel::expression::BoxableExpression;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::sql_types::{Array, Bool, Jsonb, Text};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::domain::{Clause, Condition, ID_FIELD, Pattern, Query};

use super::schema::documents;

/// Body key holding identifiers imported from the previous system.
pub const LEGACY_ID_FIELD: &str = "legacyId";

/// Boolean SQL expression over the `documents` table.
pub(crate) type DocumentPredicate = Box<dyn BoxableExpression<documents::table, Pg, SqlType = Bool>>;

/// Translate `query` into a boxed predicate.
///
/// The empty query becomes `TRUE`; an `Or` with no alternatives `FALSE`.
pub(crate) fn translate(query: &Query) -> DocumentPredicate {
    let Equalities {
        literal,
        overlapping,
        structured,
    } = split_equalities(query);
    let mut predicates: Vec<DocumentPredicate> = Vec::new();
    if !literal.is_empty() {
        predicates.push(contains(Value::Object(literal)));
    }
    predicates.extend(
        overlapping
            .into_iter()
            .map(|(name, value)| contains(nested(&name, value))),
    );
    predicates.extend(
        structured
            .into_iter()
            .map(|(name, value)| value_at_path_equals(&name, value)),
    );

    for clause in query.clauses() {
        match clause {
            Clause::Field { name, condition } if name == ID_FIELD => {
                predicates.push(id_predicate(condition));
            }
            Clause::Field {
                name,
                condition: Condition::Equals(Value::Null),
            } => predicates.push(null_predicate(name)),
            Clause::Field {
                condition: Condition::Equals(_),
                ..
            } => {}
            Clause::Field {
                name,
                condition: Condition::Matches(pattern),
            } => predicates.push(regex_predicate(name, pattern)),
            Clause::Or(alternatives) => predicates.push(any_of(alternatives)),
        }
    }

    predicates
        .into_iter()
        .reduce(|all, next| Box::new(all.and(next)))
        .unwrap_or_else(|| Box::new(sql::<Bool>("TRUE")))
}

/// The containment literal built from the scalar equalities of `query`.
///
/// Dotted paths are expanded into nested objects. Object and array values
/// are compared by path instead and never appear in the literal.
///
/// # Examples
/// ```
/// use podtrack::domain::Query;
/// use podtrack::outbound::persistence::containment_literal;
/// use serde_json::json;
///
/// let query = Query::new()
///     .equals("status", "pending")
///     .equals("documents.canhotoNF", "a.pdf")
///     .equals("documents.fotos", json!(["b.jpg"]));
/// assert_eq!(
///     containment_literal(&query),
///     Some(json!({ "status": "pending", "documents": { "canhotoNF": "a.pdf" } }))
/// );
/// ```
#[must_use]
pub fn containment_literal(query: &Query) -> Option<Value> {
    let Equalities { literal, .. } = split_equalities(query);
    (!literal.is_empty()).then_some(Value::Object(literal))
}

#[derive(Default)]
struct Equalities {
    /// Scalar equalities merged into one containment literal.
    literal: Map<String, Value>,
    /// Scalar equalities that contradict the merged literal.
    overlapping: Vec<(String, Value)>,
    /// Object and array equalities.
    structured: Vec<(String, Value)>,
}

fn split_equalities(query: &Query) -> Equalities {
    let mut equalities = Equalities::default();
    for clause in query.clauses() {
        let Clause::Field {
            name,
            condition: Condition::Equals(value),
        } = clause
        else {
            continue;
        };
        match value {
            _ if name == ID_FIELD => {}
            Value::Null => {}
            Value::Object(_) | Value::Array(_) => {
                equalities.structured.push((name.clone(), value.clone()));
            }
            Value::Bool(_) | Value::Number(_) | Value::String(_) => {
                if !merge(&mut equalities.literal, name, value.clone()) {
                    equalities.overlapping.push((name.clone(), value.clone()));
                }
            }
        }
    }
    equalities
}

fn merge(target: &mut Map<String, Value>, path: &str, value: Value) -> bool {
    let Value::Object(addition) = nested(path, value) else {
        return false;
    };
    merge_maps(target, addition)
}

fn merge_maps(target: &mut Map<String, Value>, addition: Map<String, Value>) -> bool {
    let mut compatible = true;
    for (key, value) in addition {
        match (target.get_mut(&key), value) {
            (None, value) => {
                target.insert(key, value);
            }
            (Some(Value::Object(existing)), Value::Object(more)) => {
                compatible &= merge_maps(existing, more);
            }
            (Some(existing), value) => compatible &= *existing == value,
        }
    }
    compatible
}

fn nested(path: &str, value: Value) -> Value {
    path.rsplit('.').fold(value, |inner, segment| {
        let mut map = Map::new();
        map.insert(segment.to_owned(), inner);
        Value::Object(map)
    })
}

fn path_segments(path: &str) -> Vec<String> {
    path.split('.').map(str::to_owned).collect()
}

fn contains(literal: Value) -> DocumentPredicate {
    Box::new(sql::<Bool>("body @> ").bind::<Jsonb, _>(literal))
}

fn value_at_path_equals(name: &str, value: Value) -> DocumentPredicate {
    Box::new(
        sql::<Bool>("body #> ")
            .bind::<Array<Text>, _>(path_segments(name))
            .sql(" = ")
            .bind::<Jsonb, _>(value),
    )
}

fn null_predicate(name: &str) -> DocumentPredicate {
    let path = path_segments(name);
    Box::new(
        sql::<Bool>("(body #> ")
            .bind::<Array<Text>, _>(path.clone())
            .sql(" IS NULL OR body #> ")
            .bind::<Array<Text>, _>(path)
            .sql(" = 'null'::jsonb)"),
    )
}

fn regex_operator(pattern: &Pattern) -> &'static str {
    if pattern.is_case_insensitive() {
        "~*"
    } else {
        "~"
    }
}

fn regex_predicate(name: &str, pattern: &Pattern) -> DocumentPredicate {
    Box::new(
        sql::<Bool>("(body #>> ")
            .bind::<Array<Text>, _>(path_segments(name))
            .sql(&format!(") {} ", regex_operator(pattern)))
            .bind::<Text, _>(pattern.source().to_owned()),
    )
}

fn legacy_id_equals(raw: String) -> DocumentPredicate {
    Box::new(sql::<Bool>(&format!("body ->> '{LEGACY_ID_FIELD}' = ")).bind::<Text, _>(raw))
}

fn id_predicate(condition: &Condition) -> DocumentPredicate {
    match condition {
        Condition::Equals(Value::String(raw)) => match Uuid::parse_str(raw) {
            Ok(uuid) => Box::new(documents::id.eq(uuid)),
            Err(_) => legacy_id_equals(raw.clone()),
        },
        Condition::Equals(Value::Number(number)) => legacy_id_equals(number.to_string()),
        Condition::Equals(_) => Box::new(sql::<Bool>("FALSE")),
        Condition::Matches(pattern) => Box::new(
            sql::<Bool>(&format!("id::text {} ", regex_operator(pattern)))
                .bind::<Text, _>(pattern.source().to_owned()),
        ),
    }
}

/// Predicate matching the legacy identifier only.
pub(crate) fn legacy_id_predicate(raw: &str) -> DocumentPredicate {
    legacy_id_equals(raw.to_owned())
}

fn any_of(alternatives: &[Query]) -> DocumentPredicate {
    alternatives
        .iter()
        .map(translate)
        .reduce(|any, next| Box::new(any.or(next)))
        .unwrap_or_else(|| Box::new(sql::<Bool>("FALSE")))
}
