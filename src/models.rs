// Domain models for bucket size tracking

use serde::{Deserialize, Serialize};

/// Constant tag stored on every sample so the size-ordered index has a
/// single partition to query for the all-time maximum.
pub const RECORD_KIND_BUCKET_OBJECT: &str = "bucket_object";

/// One persisted measurement of a bucket's aggregate size at a point in time.
/// Always a full recomputation, never a delta; immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeSample {
    pub bucket: String,
    /// Milliseconds since epoch at aggregation time. Wall-clock based;
    /// not monotonic across concurrent triggers.
    pub timestamp: u64,
    /// Sum of byte sizes of all objects in the bucket at aggregation time.
    pub total_size: u64,
    /// Number of objects in the bucket at aggregation time.
    pub object_count: u64,
    pub record_kind: String,
}

/// One listed object: key plus byte size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectEntry {
    pub key: String,
    pub size: u64,
}

/// One page of a bucket listing. `next_start_after` is the cursor for the
/// following page; `None` means the listing is exhausted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectPage {
    pub entries: Vec<ObjectEntry>,
    pub next_start_after: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationKind {
    Created,
    Removed,
}

/// Mutation notification emitted by the bucket store on every write/delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketEvent {
    pub bucket: String,
    pub kind: MutationKind,
}

/// Scope of the all-time-max query. The original design queried only by the
/// constant record kind, so the maximum is global across every bucket sharing
/// the tag; `PerBucket` narrows it to one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxScope {
    Global,
    PerBucket,
}

/// Current wall-clock time in milliseconds since epoch.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
