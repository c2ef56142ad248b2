// Shared test helpers

use bucketwatch::models::{RECORD_KIND_BUCKET_OBJECT, SizeSample};
use bucketwatch::sample_repo::SampleRepo;

pub fn sample(bucket: &str, timestamp: u64, total_size: u64, object_count: u64) -> SizeSample {
    SizeSample {
        bucket: bucket.into(),
        timestamp,
        total_size,
        object_count,
        record_kind: RECORD_KIND_BUCKET_OBJECT.into(),
    }
}

pub async fn sample_repo_in(dir: &std::path::Path) -> SampleRepo {
    let path = dir.join("samples.db");
    let repo = SampleRepo::connect(path.to_str().unwrap()).await.unwrap();
    repo.init().await.unwrap();
    repo
}
