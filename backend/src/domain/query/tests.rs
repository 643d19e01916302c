//! Evaluation and parsing coverage for the query vocabulary.

use super::*;
use chrono::Utc;
use rstest::{fixture, rstest};
use serde_json::json;

use crate::domain::RecordId;

fn record(id: &str, fields: Value) -> Record {
    let Value::Object(fields) = fields else {
        panic!("record fixtures must be objects");
    };
    Record::new(RecordId::from(id), fields, Utc::now())
}

#[fixture]
fn delivery() -> Record {
    record(
        "d-1",
        json!({
            "deliveryNumber": "CNT-0042",
            "status": "pending",
            "city": "santos",
            "documents": { "canhotoNF": "nf.pdf" }
        }),
    )
}

#[rstest]
fn empty_query_matches_everything(delivery: Record) {
    assert!(Query::new().matches(&delivery));
}

#[rstest]
#[case(Query::new().equals("status", "pending"), true)]
#[case(Query::new().equals("status", "submitted"), false)]
#[case(Query::new().equals("driverId", Value::Null), true)]
#[case(Query::new().equals("status", Value::Null), false)]
#[case(Query::by_id("d-1"), true)]
#[case(Query::by_id("d-2"), false)]
#[case(Query::new().equals("documents", json!({ "canhotoNF": "nf.pdf" })), true)]
#[case(Query::new().equals("documents.canhotoNF", "nf.pdf"), true)]
fn equality_is_json_equality(delivery: Record, #[case] query: Query, #[case] expected: bool) {
    assert_eq!(query.matches(&delivery), expected);
}

#[rstest]
fn every_clause_must_hold(delivery: Record) {
    let query = Query::new()
        .equals("status", "pending")
        .equals("city", "itajai");
    assert!(!query.matches(&delivery));
}

#[rstest]
#[case("cnt-00", true, true)]
#[case("cnt-00", false, false)]
#[case("^CNT-\\d{4}$", false, true)]
#[case("9999", true, false)]
fn regex_clauses_test_strings(
    delivery: Record,
    #[case] source: &str,
    #[case] case_insensitive: bool,
    #[case] expected: bool,
) {
    let pattern = Pattern::new(source, case_insensitive).expect("valid pattern");
    let query = Query::new().matching("deliveryNumber", pattern);
    assert_eq!(query.matches(&delivery), expected);
}

#[rstest]
fn regex_never_matches_non_strings(delivery: Record) {
    let pattern = Pattern::new(".*", false).expect("valid pattern");
    assert!(!Query::new().matching("documents", pattern.clone()).matches(&delivery));
    assert!(!Query::new().matching("missing", pattern).matches(&delivery));
}

#[rstest]
fn or_needs_one_alternative(delivery: Record) {
    let query = Query::new().any_of(vec![
        Query::new().equals("status", "submitted"),
        Query::new().equals("deliveryNumber", "CNT-0042"),
    ]);
    assert!(query.matches(&delivery));

    let none = Query::new().any_of(vec![Query::new().equals("status", "submitted")]);
    assert!(!none.matches(&delivery));
}

#[rstest]
fn without_field_recurses_into_alternatives() {
    let query = Query::new()
        .equals("city", "santos")
        .equals("status", "pending")
        .any_of(vec![
            Query::new().equals("city", "itajai").equals("driverId", "u-1"),
            Query::new().equals("contractorId", "c-1"),
        ]);

    let stripped = query.without_field("city");

    assert!(query.mentions_field("city"));
    assert!(!stripped.mentions_field("city"));
    assert_eq!(
        stripped,
        Query::new().equals("status", "pending").any_of(vec![
            Query::new().equals("driverId", "u-1"),
            Query::new().equals("contractorId", "c-1"),
        ])
    );
}

#[rstest]
fn from_json_reads_mongo_form() {
    let filter = json!({
        "status": "pending",
        "deliveryNumber": { "$regex": "^cnt", "$options": "i" },
        "$or": [ { "driverId": "u-1" }, { "contractorId": { "$eq": "c-1" } } ]
    });
    let query = Query::from_json(&filter).expect("supported filter");

    let expected = Query::new()
        .equals("status", "pending")
        .matching("deliveryNumber", Pattern::new("^cnt", true).expect("pattern"))
        .any_of(vec![
            Query::new().equals("driverId", "u-1"),
            Query::new().equals("contractorId", "c-1"),
        ]);
    // serde_json maps iterate in key order.
    assert_eq!(query.clauses().len(), expected.clauses().len());
    for clause in expected.clauses() {
        assert!(query.clauses().contains(clause), "missing {clause:?}");
    }
}

#[rstest]
fn from_json_keeps_plain_maps_as_equality() {
    let filter = json!({ "documents": { "canhotoNF": "nf.pdf" } });
    let query = Query::from_json(&filter).expect("supported filter");
    assert_eq!(
        query,
        Query::new().equals("documents", json!({ "canhotoNF": "nf.pdf" }))
    );
}

#[rstest]
#[case(json!([1, 2]))]
#[case(json!({ "$where": "1" }))]
#[case(json!({ "$or": { "a": 1 } }))]
#[case(json!({ "status": { "$gt": 1 } }))]
#[case(json!({ "status": { "$regex": 5 } }))]
fn from_json_rejects_unsupported_shapes(#[case] filter: Value) {
    assert!(matches!(
        Query::from_json(&filter),
        Err(QueryError::UnsupportedFilter { .. })
    ));
}

#[rstest]
fn invalid_patterns_are_reported() {
    let err = Pattern::new("(", false).expect_err("unbalanced group");
    assert!(matches!(err, QueryError::InvalidPattern { .. }));
}

#[rstest]
fn literal_patterns_escape_metacharacters() {
    let pattern = Pattern::contains_literal("a.b").expect("escaped pattern");
    assert!(pattern.is_match("xA.By"));
    assert!(!pattern.is_match("axb"));
}
