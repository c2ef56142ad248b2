// SampleRepo tests: connect, init, append, window reads, all-time max

mod common;

use bucketwatch::models::{MaxScope, RECORD_KIND_BUCKET_OBJECT};
use common::{sample, sample_repo_in};
use tempfile::TempDir;

#[tokio::test]
async fn sample_repo_connect_and_init() {
    let dir = TempDir::new().unwrap();
    let repo = sample_repo_in(dir.path()).await;
    // Second init is no-op (IF NOT EXISTS)
    repo.init().await.unwrap();
}

#[tokio::test]
async fn window_returns_only_samples_in_range_ascending() {
    let dir = TempDir::new().unwrap();
    let repo = sample_repo_in(dir.path()).await;

    // Insert out of order; read imposes ascending timestamp order.
    repo.append_sample(&sample("b1", 9_000, 28, 1)).await.unwrap();
    repo.append_sample(&sample("b1", 3_000, 10, 1)).await.unwrap();
    repo.append_sample(&sample("b1", 6_000, 0, 0)).await.unwrap();
    // Outside the window (too old) and wrong bucket
    repo.append_sample(&sample("b1", 500, 999, 9)).await.unwrap();
    repo.append_sample(&sample("other", 6_500, 777, 7)).await.unwrap();

    let window = repo.get_window("b1", 8_000, 10_000).await.unwrap();
    let timestamps: Vec<u64> = window.iter().map(|s| s.timestamp).collect();
    assert_eq!(timestamps, vec![3_000, 6_000, 9_000]);
    let sizes: Vec<u64> = window.iter().map(|s| s.total_size).collect();
    assert_eq!(sizes, vec![10, 0, 28]);
}

#[tokio::test]
async fn window_excludes_samples_after_now() {
    let dir = TempDir::new().unwrap();
    let repo = sample_repo_in(dir.path()).await;

    repo.append_sample(&sample("b1", 5_000, 1, 1)).await.unwrap();
    repo.append_sample(&sample("b1", 12_000, 2, 1)).await.unwrap();

    let window = repo.get_window("b1", 10_000, 10_000).await.unwrap();
    assert_eq!(window.len(), 1);
    assert_eq!(window[0].timestamp, 5_000);
}

#[tokio::test]
async fn empty_window_is_valid() {
    let dir = TempDir::new().unwrap();
    let repo = sample_repo_in(dir.path()).await;
    let window = repo.get_window("b1", 10_000, 10_000).await.unwrap();
    assert!(window.is_empty());
}

#[tokio::test]
async fn all_time_max_defaults_to_zero() {
    let dir = TempDir::new().unwrap();
    let repo = sample_repo_in(dir.path()).await;
    let max = repo
        .get_all_time_max(RECORD_KIND_BUCKET_OBJECT, MaxScope::Global, "b1")
        .await
        .unwrap();
    assert_eq!(max, 0);
}

#[tokio::test]
async fn all_time_max_covers_every_ingested_size() {
    let dir = TempDir::new().unwrap();
    let repo = sample_repo_in(dir.path()).await;

    for (ts, size) in [(1_000u64, 0u64), (2_000, 28), (3_000, 0)] {
        repo.append_sample(&sample("b1", ts, size, 1)).await.unwrap();
    }
    let max = repo
        .get_all_time_max(RECORD_KIND_BUCKET_OBJECT, MaxScope::Global, "b1")
        .await
        .unwrap();
    assert_eq!(max, 28);
}

#[tokio::test]
async fn all_time_max_ignores_samples_with_other_record_kind() {
    let dir = TempDir::new().unwrap();
    let repo = sample_repo_in(dir.path()).await;

    let mut other = sample("b1", 1_000, 500, 1);
    other.record_kind = "unrelated".into();
    repo.append_sample(&other).await.unwrap();
    repo.append_sample(&sample("b1", 2_000, 28, 1)).await.unwrap();

    let max = repo
        .get_all_time_max(RECORD_KIND_BUCKET_OBJECT, MaxScope::Global, "b1")
        .await
        .unwrap();
    assert_eq!(max, 28);
}

#[tokio::test]
async fn max_scope_global_vs_per_bucket() {
    let dir = TempDir::new().unwrap();
    let repo = sample_repo_in(dir.path()).await;

    repo.append_sample(&sample("b1", 1_000, 28, 1)).await.unwrap();
    repo.append_sample(&sample("b2", 2_000, 500, 3)).await.unwrap();

    // Global scope sees the cross-bucket maximum (the original behavior).
    let global = repo
        .get_all_time_max(RECORD_KIND_BUCKET_OBJECT, MaxScope::Global, "b1")
        .await
        .unwrap();
    assert_eq!(global, 500);

    // Per-bucket scope narrows to the named bucket.
    let per_bucket = repo
        .get_all_time_max(RECORD_KIND_BUCKET_OBJECT, MaxScope::PerBucket, "b1")
        .await
        .unwrap();
    assert_eq!(per_bucket, 28);
}
