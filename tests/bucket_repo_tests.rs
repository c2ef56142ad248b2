// BucketRepo tests: put/get/delete, listing, pagination, key validation, events

use bucketwatch::bucket_repo::{BucketError, BucketRepo};
use bucketwatch::models::MutationKind;
use tempfile::TempDir;

#[tokio::test]
async fn put_get_roundtrip_with_content_type() {
    let dir = TempDir::new().unwrap();
    let repo = BucketRepo::new(dir.path());

    repo.put_object("b1", "a.txt", b"Empty Assignment 1", "text/plain")
        .await
        .unwrap();

    let (bytes, content_type) = repo.get_object("b1", "a.txt").await.unwrap().unwrap();
    assert_eq!(bytes, b"Empty Assignment 1");
    assert_eq!(content_type, "text/plain");
}

#[tokio::test]
async fn get_absent_object_is_none() {
    let dir = TempDir::new().unwrap();
    let repo = BucketRepo::new(dir.path());
    assert!(repo.get_object("b1", "missing").await.unwrap().is_none());
}

#[tokio::test]
async fn put_overwrites_existing_object() {
    let dir = TempDir::new().unwrap();
    let repo = BucketRepo::new(dir.path());

    repo.put_object("b1", "a.txt", b"v1", "text/plain").await.unwrap();
    repo.put_object("b1", "a.txt", b"version two", "text/plain")
        .await
        .unwrap();

    let entries = repo.list_all("b1").await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].size, b"version two".len() as u64);
}

#[tokio::test]
async fn delete_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let repo = BucketRepo::new(dir.path());

    repo.put_object("b1", "a.txt", b"x", "text/plain").await.unwrap();
    repo.delete_object("b1", "a.txt").await.unwrap();
    // Second delete of the same key is a no-op
    repo.delete_object("b1", "a.txt").await.unwrap();
    assert!(repo.list_all("b1").await.unwrap().is_empty());
}

#[tokio::test]
async fn list_all_empty_or_missing_bucket() {
    let dir = TempDir::new().unwrap();
    let repo = BucketRepo::new(dir.path());
    assert!(repo.list_all("never-written").await.unwrap().is_empty());
}

#[tokio::test]
async fn list_includes_nested_keys() {
    let dir = TempDir::new().unwrap();
    let repo = BucketRepo::new(dir.path());

    repo.put_object("b1", "logs/2026/app.log", b"abc", "text/plain")
        .await
        .unwrap();
    repo.put_object("b1", "top.txt", b"12", "text/plain").await.unwrap();

    let mut keys: Vec<String> = repo
        .list_all("b1")
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.key)
        .collect();
    keys.sort();
    assert_eq!(keys, vec!["logs/2026/app.log".to_string(), "top.txt".to_string()]);
}

#[tokio::test]
async fn pagination_is_exhaustive_without_duplicates() {
    let dir = TempDir::new().unwrap();
    let repo = BucketRepo::new(dir.path());

    for i in 0..25 {
        let key = format!("obj-{:03}", i);
        repo.put_object("b1", &key, b"0123456789", "text/plain")
            .await
            .unwrap();
    }

    let mut seen = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0;
    loop {
        let page = repo.list_page("b1", cursor.as_deref(), 10).await.unwrap();
        assert!(page.entries.len() <= 10);
        seen.extend(page.entries.into_iter().map(|e| e.key));
        pages += 1;
        match page.next_start_after {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }
    assert_eq!(pages, 3);
    assert_eq!(seen.len(), 25);
    let mut deduped = seen.clone();
    deduped.sort();
    deduped.dedup();
    assert_eq!(deduped, seen, "keys ascending with no duplicates");
}

#[tokio::test]
async fn traversal_keys_are_rejected() {
    let dir = TempDir::new().unwrap();
    let repo = BucketRepo::new(dir.path());

    for key in ["../escape", "/abs", "a/../../b", ""] {
        let err = repo
            .put_object("b1", key, b"x", "text/plain")
            .await
            .unwrap_err();
        assert!(matches!(err, BucketError::InvalidKey(_)), "key {:?}", key);
    }
    // The metadata sidecar tree is not addressable as an object key
    let err = repo
        .put_object("b1", ".meta/sneaky", b"x", "text/plain")
        .await
        .unwrap_err();
    assert!(matches!(err, BucketError::InvalidKey(_)));
}

#[tokio::test]
async fn write_succeeds_and_drops_event_when_channel_is_full() {
    let dir = TempDir::new().unwrap();
    let (tx, mut rx) = tokio::sync::mpsc::channel(1);
    let repo = BucketRepo::new(dir.path()).with_events(tx);

    repo.put_object("b1", "a.txt", b"x", "text/plain").await.unwrap();
    // Channel is now at capacity; the second write must not block or fail.
    repo.put_object("b1", "b.txt", b"y", "text/plain").await.unwrap();
    assert_eq!(repo.list_all("b1").await.unwrap().len(), 2);
    drop(repo);

    assert!(rx.recv().await.is_some());
    assert!(rx.recv().await.is_none(), "overflow event was dropped");
}

#[tokio::test]
async fn mutations_emit_events() {
    let dir = TempDir::new().unwrap();
    let (tx, mut rx) = tokio::sync::mpsc::channel(8);
    let repo = BucketRepo::new(dir.path()).with_events(tx);

    repo.put_object("b1", "a.txt", b"x", "text/plain").await.unwrap();
    repo.delete_object("b1", "a.txt").await.unwrap();
    // Deleting an absent key emits nothing
    repo.delete_object("b1", "a.txt").await.unwrap();
    drop(repo);

    let first = rx.recv().await.unwrap();
    assert_eq!(first.bucket, "b1");
    assert_eq!(first.kind, MutationKind::Created);
    let second = rx.recv().await.unwrap();
    assert_eq!(second.kind, MutationKind::Removed);
    assert!(rx.recv().await.is_none());
}
