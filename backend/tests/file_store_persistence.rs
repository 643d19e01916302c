//! Durability of the per-tenant JSON file store across reopen.
//!
//! Each test opens a store in a fresh temporary directory, changes it, then
//! opens a second store over the same directory to observe what reached disk.

use std::sync::Arc;

use camino::Utf8PathBuf;
use chrono::Duration;
use podtrack::domain::ports::DocumentStore;
use podtrack::domain::{DELIVERIES, DRIVERS, Patch, Query, Tenant, TenantPolicy};
use podtrack::outbound::FileDocumentStore;
use podtrack::test_support::{FixedClock, cap_fs, fields};
use rstest::{fixture, rstest};
use serde_json::json;
use tempfile::TempDir;

struct DataDir {
    _tmp: TempDir,
    path: Utf8PathBuf,
    tenant: Tenant,
    clock: Arc<FixedClock>,
}

impl DataDir {
    fn open(&self) -> FileDocumentStore {
        FileDocumentStore::open(&self.path, &self.tenant, self.clock.clone()).expect("open store")
    }

    fn contents(&self) -> String {
        cap_fs::read_file(&self.path, "santos.json").expect("read data file")
    }
}

#[fixture]
fn data_dir() -> DataDir {
    let (tmp, path) = cap_fs::temp_data_dir().expect("temp dir");
    DataDir {
        _tmp: tmp,
        path,
        tenant: TenantPolicy::standard().normalise("santos"),
        clock: Arc::new(FixedClock::fixture()),
    }
}

#[rstest]
#[tokio::test]
async fn created_records_survive_reopen(data_dir: DataDir) {
    let store = data_dir.open();
    let created = store
        .create(
            DELIVERIES,
            fields(json!({ "deliveryNumber": "A1", "status": "pending" })),
        )
        .await
        .expect("create");

    assert!(!created.id().as_str().is_empty());
    assert_eq!(created.str_field("status"), Some("pending"));
    assert_eq!(created.created_at(), created.updated_at());

    let reopened = data_dir.open();
    let found = reopened
        .find_by_id(DELIVERIES, created.id().as_str())
        .await
        .expect("find by id");
    assert_eq!(found, Some(created));
}

#[rstest]
#[tokio::test]
async fn updating_a_missing_id_rewrites_nothing(data_dir: DataDir) {
    let store = data_dir.open();
    let before = data_dir.contents();
    data_dir.clock.advance(Duration::minutes(10));

    let updated = store
        .update_one(
            DELIVERIES,
            &Query::by_id("X"),
            &Patch::default().set("status", "submitted"),
        )
        .await
        .expect("update");

    assert!(updated.is_none());
    assert_eq!(data_dir.contents(), before);
    assert_eq!(
        cap_fs::list_files(&data_dir.path).expect("list"),
        vec!["santos.json"]
    );
}

#[rstest]
#[tokio::test]
async fn leftover_temp_files_do_not_affect_reload(data_dir: DataDir) {
    let store = data_dir.open();
    let created = store
        .create(DELIVERIES, fields(json!({ "deliveryNumber": "A1" })))
        .await
        .expect("create");
    let persisted = data_dir.contents();
    drop(store);

    // A crash between writing the temp file and renaming it.
    cap_fs::write_file(&data_dir.path, ".santos.json.tmp.99", b"{\"deliveries\": [{\"_id\"")
        .expect("write partial temp file");

    let reopened = data_dir.open();
    assert_eq!(data_dir.contents(), persisted);
    let found = reopened
        .find(DELIVERIES, &Query::new().equals("deliveryNumber", "A1"))
        .await
        .expect("find");
    assert_eq!(found, vec![created]);
}

#[rstest]
#[tokio::test]
async fn corrupt_files_are_quarantined_and_reseeded(data_dir: DataDir) {
    let store = data_dir.open();
    store
        .create(DELIVERIES, fields(json!({ "deliveryNumber": "LOST-1" })))
        .await
        .expect("create");
    drop(store);
    cap_fs::write_file(&data_dir.path, "santos.json", b"{ not json").expect("corrupt file");

    let reopened = data_dir.open();

    let files = cap_fs::list_files(&data_dir.path).expect("list");
    let quarantined: Vec<&String> = files
        .iter()
        .filter(|name| name.starts_with("santos.json.corrupt."))
        .collect();
    assert_eq!(quarantined.len(), 1, "{files:?}");
    assert_eq!(
        cap_fs::read_file(&data_dir.path, quarantined[0]).expect("read quarantine"),
        "{ not json"
    );

    let deliveries = reopened
        .find(DELIVERIES, &Query::new())
        .await
        .expect("find deliveries");
    assert_eq!(deliveries.len(), 4);
    assert!(
        deliveries
            .iter()
            .all(|delivery| delivery.str_field("deliveryNumber") != Some("LOST-1"))
    );
    let users = reopened
        .find(DRIVERS, &Query::new())
        .await
        .expect("find users");
    assert_eq!(users.len(), 4);
}

#[rstest]
#[tokio::test]
async fn tenants_persist_to_separate_files(data_dir: DataDir) {
    let itajai = TenantPolicy::standard().normalise("itajai");
    let other = FileDocumentStore::open(&data_dir.path, &itajai, data_dir.clock.clone())
        .expect("open itajai");
    other
        .create(DELIVERIES, fields(json!({ "deliveryNumber": "ITJ-1" })))
        .await
        .expect("create");

    let santos = data_dir.open();
    let found = santos
        .find(DELIVERIES, &Query::new().equals("deliveryNumber", "ITJ-1"))
        .await
        .expect("find");
    assert!(found.is_empty());
    assert_eq!(
        cap_fs::list_files(&data_dir.path).expect("list"),
        vec!["itajai.json", "santos.json"]
    );
}
