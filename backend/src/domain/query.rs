//! Backend-neutral query vocabulary.
//!
//! A [`Query`] is a conjunction of clauses. Each clause either constrains one
//! field (equality or regular-expression match) or holds alternatives, any of
//! which may match. The file store evaluates it in memory; the database
//! adapter translates it to SQL. [`Query::from_json`] accepts the
//! Mongo-flavoured JSON form used by callers that build filters dynamically.

use regex::{Regex, RegexBuilder};
use serde_json::{Map, Value};
use thiserror::Error;

use super::record::{ID_FIELD, Record};

/// Failures raised while building a query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The regular expression did not compile.
    #[error("invalid pattern `{pattern}`: {message}")]
    InvalidPattern {
        /// Offending pattern source.
        pattern: String,
        /// Compiler diagnostic.
        message: String,
    },
    /// The JSON filter does not have a supported shape.
    #[error("unsupported filter: {message}")]
    UnsupportedFilter {
        /// What was wrong with the filter.
        message: String,
    },
}

/// Compiled regular expression plus the flags it was built with.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    case_insensitive: bool,
    regex: Regex,
}

impl Pattern {
    /// Compile a pattern.
    ///
    /// # Errors
    /// Returns [`QueryError::InvalidPattern`] when the expression is invalid.
    pub fn new(source: impl Into<String>, case_insensitive: bool) -> Result<Self, QueryError> {
        let source = source.into();
        let regex = RegexBuilder::new(&source)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|err| QueryError::InvalidPattern {
                pattern: source.clone(),
                message: err.to_string(),
            })?;
        Ok(Self {
            source,
            case_insensitive,
            regex,
        })
    }

    /// Case-insensitive pattern matching `text` literally anywhere.
    ///
    /// # Errors
    /// Returns [`QueryError::InvalidPattern`] if the escaped text exceeds the
    /// compiler's size limits.
    pub fn contains_literal(text: &str) -> Result<Self, QueryError> {
        Self::new(regex::escape(text), true)
    }

    /// Pattern source as supplied.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether matching ignores case.
    #[must_use]
    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    /// Test a string value.
    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.case_insensitive == other.case_insensitive
    }
}

/// Constraint applied to a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// JSON equality. A missing field equals `null`.
    Equals(Value),
    /// Regular-expression test against a string value.
    Matches(Pattern),
}

/// One conjunct of a [`Query`].
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// Constraint on the field at `name` (dotted paths descend into maps).
    Field {
        /// Field path.
        name: String,
        /// Constraint to satisfy.
        condition: Condition,
    },
    /// Alternatives; the clause holds when any sub-query matches.
    Or(Vec<Query>),
}

/// Conjunction of clauses. The empty query matches every record.
///
/// # Examples
/// ```
/// use podtrack::domain::{Pattern, Query};
///
/// let query = Query::new()
///     .equals("status", "pending")
///     .matching("deliveryNumber", Pattern::contains_literal("cnt").unwrap());
/// assert_eq!(query.clauses().len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    clauses: Vec<Clause>,
}

impl Query {
    /// The empty query.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Query selecting the record with identifier `id`.
    #[must_use]
    pub fn by_id(id: impl AsRef<str>) -> Self {
        Self::new().equals(ID_FIELD, id.as_ref())
    }

    /// Add an equality clause.
    #[must_use]
    pub fn equals(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push(Clause::Field {
            name: field.into(),
            condition: Condition::Equals(value.into()),
        });
        self
    }

    /// Add a regular-expression clause.
    #[must_use]
    pub fn matching(mut self, field: impl Into<String>, pattern: Pattern) -> Self {
        self.clauses.push(Clause::Field {
            name: field.into(),
            condition: Condition::Matches(pattern),
        });
        self
    }

    /// Add a disjunction of sub-queries.
    #[must_use]
    pub fn any_of(mut self, alternatives: Vec<Self>) -> Self {
        self.clauses.push(Clause::Or(alternatives));
        self
    }

    /// Clauses in insertion order.
    #[must_use]
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Whether the query has no clauses.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Whether any clause, at any depth, constrains `name`.
    #[must_use]
    pub fn mentions_field(&self, name: &str) -> bool {
        self.clauses.iter().any(|clause| match clause {
            Clause::Field { name: field, .. } => field == name,
            Clause::Or(alternatives) => alternatives.iter().any(|q| q.mentions_field(name)),
        })
    }

    /// A copy with every clause on `name` removed, recursing through `Or`.
    #[must_use]
    pub fn without_field(&self, name: &str) -> Self {
        let clauses = self
            .clauses
            .iter()
            .filter_map(|clause| match clause {
                Clause::Field { name: field, .. } if field == name => None,
                Clause::Field { .. } => Some(clause.clone()),
                Clause::Or(alternatives) => Some(Clause::Or(
                    alternatives.iter().map(|q| q.without_field(name)).collect(),
                )),
            })
            .collect();
        Self { clauses }
    }

    /// Evaluate against a record.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        self.clauses.iter().all(|clause| match clause {
            Clause::Field { name, condition } => {
                let value = record.lookup(name);
                match condition {
                    Condition::Equals(expected) => match value.as_deref() {
                        Some(actual) => actual == expected,
                        None => expected.is_null(),
                    },
                    Condition::Matches(pattern) => value
                        .as_deref()
                        .and_then(Value::as_str)
                        .is_some_and(|text| pattern.is_match(text)),
                }
            }
            Clause::Or(alternatives) => alternatives.iter().any(|q| q.matches(record)),
        })
    }

    /// Parse the Mongo-flavoured JSON form.
    ///
    /// Supported: plain values (equality), `{"$regex": p, "$options": "i"}`,
    /// `{"$eq": v}` and top-level `"$or": [..]`.
    ///
    /// # Errors
    /// Returns [`QueryError`] for unsupported operators or invalid patterns.
    pub fn from_json(filter: &Value) -> Result<Self, QueryError> {
        let Value::Object(map) = filter else {
            return Err(unsupported("filter must be a JSON object"));
        };
        let mut query = Self::new();
        for (key, value) in map {
            query = if key == "$or" {
                let Value::Array(items) = value else {
                    return Err(unsupported("`$or` expects an array"));
                };
                let alternatives = items
                    .iter()
                    .map(Self::from_json)
                    .collect::<Result<Vec<_>, _>>()?;
                query.any_of(alternatives)
            } else if key.starts_with('$') {
                return Err(unsupported(format!("operator `{key}` is not supported")));
            } else {
                query.with_field_filter(key, value)?
            };
        }
        Ok(query)
    }

    fn with_field_filter(self, key: &str, value: &Value) -> Result<Self, QueryError> {
        let Some(operators) = value.as_object().filter(|map| is_operator_map(map)) else {
            return Ok(self.equals(key, value.clone()));
        };
        if let Some(pattern) = operators.get("$regex") {
            let Value::String(source) = pattern else {
                return Err(unsupported("`$regex` expects a string"));
            };
            let options = operators
                .get("$options")
                .and_then(Value::as_str)
                .unwrap_or_default();
            return Ok(self.matching(key, Pattern::new(source.clone(), options.contains('i'))?));
        }
        if let Some(expected) = operators.get("$eq") {
            return Ok(self.equals(key, expected.clone()));
        }
        Err(unsupported(format!("unsupported operators on `{key}`")))
    }
}

fn is_operator_map(map: &Map<String, Value>) -> bool {
    !map.is_empty() && map.keys().all(|key| key.starts_with('$'))
}

fn unsupported(message: impl Into<String>) -> QueryError {
    QueryError::UnsupportedFilter {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests;
