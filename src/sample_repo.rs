// SQLite time-series store for size samples.
// One row per aggregation event; append-only, no update or delete path.
// idx_samples_kind_size plays the role of a size-ordered secondary index:
// partitioned by the constant record kind, ordered by total_size, so the
// all-time max is a single top-1 lookup instead of a scan.

use crate::models::{MaxScope, SizeSample};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tracing::instrument;

pub struct SampleRepo {
    pool: SqlitePool,
}

impl SampleRepo {
    /// Connect to SQLite at `path`, create parent dir and DB if missing, enable WAL + pragmas.
    pub async fn connect(path: &str) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new().connect_with(opts).await?;
        Ok(Self { pool })
    }

    /// Create the samples table and its indexes if they don't exist.
    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS size_samples (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                bucket TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                total_size INTEGER NOT NULL,
                object_count INTEGER NOT NULL,
                record_kind TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_samples_bucket_created ON size_samples(bucket, created_at)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_samples_kind_size ON size_samples(record_kind, total_size)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Append one sample. No read-modify-write: concurrent appends never conflict.
    #[instrument(skip(self, sample), fields(repo = "samples", operation = "append_sample", bucket = %sample.bucket))]
    pub async fn append_sample(&self, sample: &SizeSample) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO size_samples (bucket, created_at, total_size, object_count, record_kind) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&sample.bucket)
        .bind(sample.timestamp as i64)
        .bind(sample.total_size as i64)
        .bind(sample.object_count as i64)
        .bind(&sample.record_kind)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Samples for `bucket` with created_at in [now_ms - lookback_ms, now_ms],
    /// ascending by created_at. Ordering is imposed here at read time; write
    /// order carries no guarantee. An empty window is a valid result.
    #[instrument(skip(self), fields(repo = "samples", operation = "get_window"))]
    pub async fn get_window(
        &self,
        bucket: &str,
        lookback_ms: u64,
        now_ms: u64,
    ) -> anyhow::Result<Vec<SizeSample>> {
        let from_ts = now_ms.saturating_sub(lookback_ms) as i64;
        let rows = sqlx::query(
            "SELECT bucket, created_at, total_size, object_count, record_kind
             FROM size_samples
             WHERE bucket = $1 AND created_at >= $2 AND created_at <= $3
             ORDER BY created_at ASC",
        )
        .bind(bucket)
        .bind(from_ts)
        .bind(now_ms as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(Self::parse_sample_row(&row)?);
        }
        Ok(out)
    }

    /// Largest total_size ever observed, via the size-ordered index; 0 when no
    /// samples exist. `Global` scope spans every bucket sharing `record_kind`
    /// (the original design); `PerBucket` narrows to the given bucket.
    #[instrument(skip(self), fields(repo = "samples", operation = "get_all_time_max", scope = ?scope))]
    pub async fn get_all_time_max(
        &self,
        record_kind: &str,
        scope: MaxScope,
        bucket: &str,
    ) -> anyhow::Result<u64> {
        let row: Option<i64> = match scope {
            MaxScope::Global => {
                sqlx::query_scalar(
                    "SELECT total_size FROM size_samples WHERE record_kind = $1
                     ORDER BY total_size DESC LIMIT 1",
                )
                .bind(record_kind)
                .fetch_optional(&self.pool)
                .await?
            }
            MaxScope::PerBucket => {
                sqlx::query_scalar(
                    "SELECT total_size FROM size_samples WHERE record_kind = $1 AND bucket = $2
                     ORDER BY total_size DESC LIMIT 1",
                )
                .bind(record_kind)
                .bind(bucket)
                .fetch_optional(&self.pool)
                .await?
            }
        };
        Ok(row.map(|v| v as u64).unwrap_or(0))
    }

    fn parse_sample_row(row: &sqlx::sqlite::SqliteRow) -> anyhow::Result<SizeSample> {
        let bucket: String = row.try_get("bucket")?;
        let created_at: i64 = row.try_get("created_at")?;
        let total_size: i64 = row.try_get("total_size")?;
        let object_count: i64 = row.try_get("object_count")?;
        let record_kind: String = row.try_get("record_kind")?;
        Ok(SizeSample {
            bucket,
            timestamp: created_at as u64,
            total_size: total_size as u64,
            object_count: object_count as u64,
            record_kind,
        })
    }
}
