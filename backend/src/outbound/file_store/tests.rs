//! In-memory semantics of the file store; persistence across reopen is
//! covered by the integration suite.

use super::*;
use crate::domain::{DELIVERIES, DRIVERS, Pattern, TenantPolicy};
use crate::test_support::{FixedClock, cap_fs, fields};
use camino::Utf8PathBuf;
use chrono::Duration;
use rstest::{fixture, rstest};
use serde_json::json;
use tempfile::TempDir;

struct Harness {
    _tmp: TempDir,
    path: Utf8PathBuf,
    clock: Arc<FixedClock>,
    store: FileDocumentStore,
}

#[fixture]
fn harness() -> Harness {
    let (tmp, path) = cap_fs::temp_data_dir().expect("temp dir");
    let clock = Arc::new(FixedClock::fixture());
    let tenant = TenantPolicy::standard().normalise("santos");
    let store = FileDocumentStore::open(&path, &tenant, clock.clone()).expect("open store");
    Harness {
        _tmp: tmp,
        path,
        clock,
        store,
    }
}

#[rstest]
#[tokio::test]
async fn first_open_seeds_and_persists(harness: Harness) {
    let users = harness
        .store
        .find(DRIVERS, &Query::new())
        .await
        .expect("find users");
    assert_eq!(users.len(), 4);

    let persisted = cap_fs::read_file(&harness.path, "santos.json").expect("file written");
    let parsed: Collections = serde_json::from_str(&persisted).expect("valid json");
    assert_eq!(parsed[DELIVERIES].len(), 4);
}

#[rstest]
#[tokio::test]
async fn equality_regex_and_alternatives_combine(harness: Harness) {
    let query = Query::new()
        .matching(
            "deliveryNumber",
            Pattern::new("^cnt-000[12]$", true).expect("pattern"),
        )
        .any_of(vec![
            Query::new().equals("status", "submitted"),
            Query::new().equals("status", "draft"),
        ]);

    let found = harness
        .store
        .find(DELIVERIES, &query)
        .await
        .expect("find");

    let numbers: Vec<&str> = found
        .iter()
        .filter_map(|record| record.str_field("deliveryNumber"))
        .collect();
    assert_eq!(numbers, vec!["CNT-0002"]);
}

#[rstest]
#[tokio::test]
async fn missing_fields_equal_null(harness: Harness) {
    let found = harness
        .store
        .find(DRIVERS, &Query::new().equals("phone", json!(null)))
        .await
        .expect("find");
    assert_eq!(found.len(), 4);
}

#[rstest]
#[tokio::test]
async fn unknown_collections_read_as_empty(harness: Harness) {
    let found = harness
        .store
        .find("invoices", &Query::new())
        .await
        .expect("find");
    assert!(found.is_empty());
}

#[rstest]
#[tokio::test]
async fn create_stamps_identifier_and_timestamps(harness: Harness) {
    let created = harness
        .store
        .create(DELIVERIES, fields(json!({ "deliveryNumber": "CNT-9", "_id": "forged" })))
        .await
        .expect("create");

    assert_ne!(created.id().as_str(), "forged");
    assert_eq!(created.created_at(), harness.clock.utc());
    assert_eq!(created.updated_at(), created.created_at());

    let fetched = harness
        .store
        .find_by_id(DELIVERIES, created.id().as_str())
        .await
        .expect("find by id");
    assert_eq!(fetched, Some(created));
}

#[rstest]
#[tokio::test]
async fn update_merges_shallowly_and_refreshes_updated_at(harness: Harness) {
    harness.clock.advance(Duration::minutes(5));
    let patch = Patch::default()
        .set("status", "submitted")
        .set("documents", json!({ "canhotoNF": ["new.pdf"] }));

    let updated = harness
        .store
        .update_one(DELIVERIES, &Query::new().equals("deliveryNumber", "CNT-0002"), &patch)
        .await
        .expect("update")
        .expect("matched");

    assert_eq!(updated.str_field("status"), Some("submitted"));
    assert_eq!(
        updated.field("documents"),
        Some(&json!({ "canhotoNF": ["new.pdf"] }))
    );
    assert_eq!(updated.str_field("driverId"), Some(seed::FIRST_DRIVER_ID));
    assert!(updated.updated_at() > updated.created_at());
}

#[rstest]
#[tokio::test]
async fn misses_write_nothing(harness: Harness) {
    let before = cap_fs::read_file(&harness.path, "santos.json").expect("read");
    harness.clock.advance(Duration::minutes(1));

    let updated = harness
        .store
        .update_one(
            DELIVERIES,
            &Query::new().equals("deliveryNumber", "NOPE"),
            &Patch::default().set("status", "submitted"),
        )
        .await
        .expect("update");
    let deleted = harness
        .store
        .delete_one(DELIVERIES, &Query::by_id("missing"))
        .await
        .expect("delete");

    assert!(updated.is_none());
    assert!(!deleted);
    assert_eq!(
        cap_fs::read_file(&harness.path, "santos.json").expect("read"),
        before
    );
}

#[rstest]
#[tokio::test]
async fn delete_removes_only_the_first_match(harness: Harness) {
    let deleted = harness
        .store
        .delete_one(DELIVERIES, &Query::new().equals("status", "pending"))
        .await
        .expect("delete");
    assert!(deleted);

    let pending = harness
        .store
        .find(DELIVERIES, &Query::new().equals("status", "pending"))
        .await
        .expect("find");
    let numbers: Vec<&str> = pending
        .iter()
        .filter_map(|record| record.str_field("deliveryNumber"))
        .collect();
    assert_eq!(numbers, vec!["CNT-0003"]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_are_serialised_and_all_persisted(harness: Harness) {
    let Harness {
        _tmp,
        path,
        clock,
        store,
    } = harness;
    let store = Arc::new(store);
    let before = store.find(DELIVERIES, &Query::new()).await.expect("find").len();

    let tasks: Vec<_> = (0..16)
        .map(|n| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                let number = format!("PAR-{n:04}");
                store
                    .create(DELIVERIES, fields(json!({ "deliveryNumber": number })))
                    .await
            })
        })
        .collect();
    for task in tasks {
        task.await.expect("join").expect("create");
    }

    let tenant = TenantPolicy::standard().normalise("santos");
    let reopened = FileDocumentStore::open(&path, &tenant, clock).expect("reopen");
    let persisted = reopened
        .find(DELIVERIES, &Query::new())
        .await
        .expect("find after reopen");
    assert_eq!(persisted.len(), before + 16);
}
