use shorturl_storage::{FileLog, InMemoryRelational};
use shorturl_store::{
    Backends, DeleteOutcome, PutStatus, Resolution, SingleUserStore, StoreSettings, UrlStore,
    DEFAULT_OWNER,
};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

async fn open_with_log(path: &Path) -> SingleUserStore {
    let log = FileLog::open(path).await.unwrap();
    let backends = Backends::builder().log(Arc::new(log)).build();
    SingleUserStore::new(UrlStore::open(backends, StoreSettings::default()).await)
}

async fn open_with_both(path: &Path, db: &Arc<InMemoryRelational>) -> SingleUserStore {
    let log = FileLog::open(path).await.unwrap();
    let backends = Backends::builder()
        .log(Arc::new(log))
        .relational(db.clone())
        .build();
    SingleUserStore::new(UrlStore::open(backends, StoreSettings::default()).await)
}

#[tokio::test]
async fn restart_restores_mappings_and_deletes() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("urls.jsonl");

    let store = open_with_log(&path).await;
    for url in ["http://a.test", "http://b.test", "http://c.test"] {
        store.put(url).await.unwrap();
    }
    let ticket = store.delete("2").await.unwrap();
    assert_eq!(ticket.wait().await, Some(DeleteOutcome::Deleted));
    store.shutdown().await;

    let store = open_with_log(&path).await;
    assert_eq!(store.get("1").await, Resolution::Active("http://a.test".to_string()));
    assert_eq!(store.get("2").await, Resolution::Deleted("http://b.test".to_string()));
    assert_eq!(store.get("3").await, Resolution::Active("http://c.test".to_string()));

    let (status, key) = store.put("http://d.test").await.unwrap();
    assert_eq!(status, PutStatus::Created);
    assert_eq!(key.as_str(), "4");
}

#[tokio::test]
async fn restart_keeps_listing_per_token() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("urls.jsonl");

    let log = Arc::new(FileLog::open(&path).await.unwrap());
    let store = UrlStore::open(
        Backends::builder().log(log).build(),
        StoreSettings::default(),
    )
    .await;
    store
        .put_for_owner(DEFAULT_OWNER, "alice", "http://a.test")
        .await
        .unwrap();
    store
        .put_for_owner(DEFAULT_OWNER, "bob", "http://b.test")
        .await
        .unwrap();
    store.shutdown().await;

    let store = open_with_log(&path).await;
    let listed = store
        .store()
        .list_for_owner(DEFAULT_OWNER, "bob", "http://s.test")
        .await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].short_url, "http://s.test/2");
    assert_eq!(listed[0].original_url, "http://b.test");
}

#[tokio::test]
async fn relational_backend_survives_lost_log() {
    let dir = TempDir::new().unwrap();
    let db = Arc::new(InMemoryRelational::new());

    let store = open_with_both(&dir.path().join("first.jsonl"), &db).await;
    store.put("http://a.test").await.unwrap();
    store.put("http://b.test").await.unwrap();
    store.delete("1").await.unwrap().wait().await;
    store.shutdown().await;

    let store = open_with_both(&dir.path().join("fresh.jsonl"), &db).await;
    assert_eq!(store.get("1").await, Resolution::Deleted("http://a.test".to_string()));
    assert_eq!(store.get("2").await, Resolution::Active("http://b.test".to_string()));

    let (status, key) = store.put("http://b.test").await.unwrap();
    assert_eq!(status, PutStatus::AlreadyExists);
    assert_eq!(key.as_str(), "2");

    // The conflicting put above still spent sequence 3.
    let (status, key) = store.put("http://c.test").await.unwrap();
    assert_eq!(status, PutStatus::Created);
    assert_eq!(key.as_str(), "4");
}

#[tokio::test]
async fn log_fills_in_what_the_database_missed() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("urls.jsonl");
    let db = Arc::new(InMemoryRelational::new());

    let store = open_with_both(&path, &db).await;
    store.put("http://a.test").await.unwrap();
    db.set_offline(true);
    store.put("http://b.test").await.unwrap();
    store.delete("1").await.unwrap().wait().await;
    store.shutdown().await;

    db.set_offline(false);
    let store = open_with_both(&path, &db).await;
    assert_eq!(store.get("1").await, Resolution::Deleted("http://a.test".to_string()));
    assert_eq!(store.get("2").await, Resolution::Active("http://b.test".to_string()));
    assert_eq!(db.len(), 1);
}

#[tokio::test]
async fn unreachable_database_at_startup_still_serves_log() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("urls.jsonl");

    let store = open_with_log(&path).await;
    store.put("http://a.test").await.unwrap();
    store.shutdown().await;

    let db = Arc::new(InMemoryRelational::new());
    db.set_offline(true);
    let store = open_with_both(&path, &db).await;

    assert!(store.ping().await.is_err());
    assert_eq!(store.get("1").await, Resolution::Active("http://a.test".to_string()));
    let (_, key) = store.put("http://b.test").await.unwrap();
    assert_eq!(key.as_str(), "2");
}

#[tokio::test]
async fn failing_log_does_not_fail_writes() {
    let dir = TempDir::new().unwrap();
    let log = FileLog::lazy(dir.path().join("missing-dir").join("urls.jsonl"));
    let store = SingleUserStore::new(
        UrlStore::open(
            Backends::builder().log(Arc::new(log)).build(),
            StoreSettings::default(),
        )
        .await,
    );

    let (status, key) = store.put("http://a.test").await.unwrap();
    assert_eq!(status, PutStatus::Created);
    assert_eq!(
        store.delete(key.as_str()).await.unwrap().wait().await,
        Some(DeleteOutcome::Deleted)
    );
    assert!(store.get(key.as_str()).await.is_deleted());
}

#[tokio::test]
async fn torn_tail_is_dropped_on_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("urls.jsonl");

    let store = open_with_log(&path).await;
    store.put("http://a.test").await.unwrap();
    store.shutdown().await;

    let mut contents = std::fs::read_to_string(&path).unwrap();
    contents.push_str(r#"{"owner":"default","key":"2","sequ"#);
    std::fs::write(&path, contents).unwrap();

    let store = open_with_log(&path).await;
    assert_eq!(store.get("2").await, Resolution::NotFound);
    let (_, key) = store.put("http://b.test").await.unwrap();
    assert_eq!(key.as_str(), "2");
    store.shutdown().await;

    let store = open_with_log(&path).await;
    assert_eq!(store.get("2").await, Resolution::Active("http://b.test".to_string()));
}
