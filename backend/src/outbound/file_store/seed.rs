//! Deterministic starter data written on first load of a tenant file.
//!
//! One administrator, one contractor owning two drivers, and four sample
//! deliveries split between them. Identifiers are fixed UUIDs so fixtures and
//! manual testing can refer to them.

use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use crate::domain::{DELIVERIES, DRIVERS, Fields, Record, RecordId};

use super::Collections;

/// Seeded administrator.
pub const ADMIN_ID: &str = "00000000-0000-4000-8000-000000000001";
/// Seeded contractor, owner of both seeded drivers.
pub const CONTRACTOR_ID: &str = "00000000-0000-4000-8000-000000000002";
/// First seeded driver.
pub const FIRST_DRIVER_ID: &str = "00000000-0000-4000-8000-000000000003";
/// Second seeded driver.
pub const SECOND_DRIVER_ID: &str = "00000000-0000-4000-8000-000000000004";

fn record(id: &str, attributes: Value, now: DateTime<Utc>) -> Record {
    let fields = match attributes {
        Value::Object(map) => map,
        _ => Fields::new(),
    };
    Record::new(RecordId::from(id), fields, now)
}

fn users(now: DateTime<Utc>) -> Vec<Record> {
    vec![
        record(
            ADMIN_ID,
            json!({ "name": "Administrador", "email": "admin@podtrack.local", "role": "ADMIN" }),
            now,
        ),
        record(
            CONTRACTOR_ID,
            json!({
                "name": "Transportadora Litoral",
                "email": "contato@litoral.local",
                "role": "CONTRACTOR",
                "contractorId": CONTRACTOR_ID
            }),
            now,
        ),
        record(
            FIRST_DRIVER_ID,
            json!({
                "name": "Ana Souza",
                "email": "ana@litoral.local",
                "role": "DRIVER",
                "contractorId": CONTRACTOR_ID
            }),
            now,
        ),
        record(
            SECOND_DRIVER_ID,
            json!({
                "name": "Bruno Lima",
                "email": "bruno@litoral.local",
                "role": "DRIVER",
                "contractorId": CONTRACTOR_ID
            }),
            now,
        ),
    ]
}

fn deliveries(now: DateTime<Utc>) -> Vec<Record> {
    let samples = [
        ("000000000005", "CNT-0001", "pending", FIRST_DRIVER_ID, json!({})),
        (
            "000000000006",
            "CNT-0002",
            "submitted",
            FIRST_DRIVER_ID,
            json!({ "canhotoNF": ["cnt-0002-nf.pdf"], "diarioBordo": ["cnt-0002-diario.pdf"] }),
        ),
        (
            "000000000007",
            "CNT-0003",
            "pending",
            SECOND_DRIVER_ID,
            json!({ "retiradaCheio": ["cnt-0003-retirada.jpg"] }),
        ),
        (
            "000000000008",
            "CNT-0004",
            "submitted",
            SECOND_DRIVER_ID,
            json!({
                "canhotoCTE": ["cnt-0004-cte.pdf"],
                "devolucaoVazio": ["cnt-0004-devolucao.jpg"]
            }),
        ),
    ];
    samples
        .into_iter()
        .map(|(suffix, number, status, driver, documents)| {
            record(
                &format!("00000000-0000-4000-8000-{suffix}"),
                json!({
                    "deliveryNumber": number,
                    "status": status,
                    "driverId": driver,
                    "contractorId": CONTRACTOR_ID,
                    "documents": documents
                }),
                now,
            )
        })
        .collect()
}

/// Starter collections stamped with `now`.
pub(super) fn seed(now: DateTime<Utc>) -> Collections {
    Collections::from([
        (DRIVERS.to_owned(), users(now)),
        (DELIVERIES.to_owned(), deliveries(now)),
    ])
}
