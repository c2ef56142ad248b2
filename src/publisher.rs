// Publishes the rendered chart back into the monitored bucket.

use crate::bucket_repo::BucketRepo;
use tracing::instrument;

pub const PLOT_CONTENT_TYPE: &str = "image/png";

/// Write the PNG under the fixed plot key, overwriting any prior artifact.
/// The write goes through the bucket repo, so it emits a mutation event like
/// any other object write. Errors surface to the caller; no retry.
#[instrument(skip(buckets, png), fields(operation = "publish_chart", bytes = png.len()))]
pub async fn publish_chart(
    buckets: &BucketRepo,
    bucket: &str,
    key: &str,
    png: &[u8],
) -> anyhow::Result<()> {
    buckets.put_object(bucket, key, png, PLOT_CONTENT_TYPE).await?;
    tracing::info!(bucket, key, bytes = png.len(), "chart published");
    Ok(())
}
