// Full-recompute ingestion: every mutation notification re-lists the entire
// bucket and appends one sample. O(object count) per event, but each sample is
// an independent point-in-time listing, so missed events never leave the store
// drifting. The listing is not atomic against concurrent mutations; a write
// racing the listing may or may not land in that sample.

use crate::bucket_repo::BucketRepo;
use crate::models::{SizeSample, now_ms};
use crate::sample_repo::SampleRepo;
use std::sync::Arc;
use tracing::instrument;

pub struct Aggregator {
    buckets: Arc<BucketRepo>,
    samples: Arc<SampleRepo>,
    record_kind: String,
}

impl Aggregator {
    pub fn new(buckets: Arc<BucketRepo>, samples: Arc<SampleRepo>, record_kind: String) -> Self {
        Self {
            buckets,
            samples,
            record_kind,
        }
    }

    /// List the full current content of `bucket`, compute aggregate size and
    /// object count, and persist exactly one sample. Any listing or persistence
    /// failure aborts this invocation without a partial write; redelivery is
    /// the trigger source's concern.
    #[instrument(skip(self), fields(operation = "ingest"))]
    pub async fn ingest(&self, bucket: &str) -> anyhow::Result<SizeSample> {
        let entries = self.buckets.list_all(bucket).await?;

        let mut total_size: u64 = 0;
        for entry in &entries {
            tracing::debug!(key = %entry.key, size = entry.size, "listed object");
            total_size += entry.size;
        }
        let object_count = entries.len() as u64;
        if object_count == 0 {
            tracing::debug!(bucket, "bucket is empty");
        }

        let sample = SizeSample {
            bucket: bucket.to_string(),
            timestamp: now_ms(),
            total_size,
            object_count,
            record_kind: self.record_kind.clone(),
        };
        self.samples.append_sample(&sample).await?;
        tracing::debug!(
            bucket,
            total_size,
            object_count,
            "sample appended"
        );
        Ok(sample)
    }
}
