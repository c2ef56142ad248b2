// Filesystem-backed object store. One subdirectory per bucket; object keys map
// to relative paths (nested prefixes allowed). Content types live in a `.meta`
// sidecar tree excluded from listings. Every successful write/delete emits a
// BucketEvent when an event sender is attached, mirroring storage notifications.

use crate::models::{BucketEvent, MutationKind, ObjectEntry, ObjectPage};
use std::path::{Component, Path, PathBuf};
use tokio::sync::mpsc;

/// Page size used by `list_all` when exhausting a listing.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

const META_DIR: &str = ".meta";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, thiserror::Error)]
pub enum BucketError {
    #[error("invalid object key: {0:?}")]
    InvalidKey(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub struct BucketRepo {
    root: PathBuf,
    events: Option<mpsc::Sender<BucketEvent>>,
}

impl BucketRepo {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            events: None,
        }
    }

    /// Attach a mutation-event sender; every subsequent write/delete notifies it.
    pub fn with_events(mut self, tx: mpsc::Sender<BucketEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Create or overwrite the object at `key` and record its content type.
    pub async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<(), BucketError> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;

        let meta = self.meta_path(bucket, key)?;
        if let Some(parent) = meta.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&meta, content_type.as_bytes()).await?;

        self.notify(bucket, MutationKind::Created);
        Ok(())
    }

    /// Object bytes plus stored content type, or `None` when the key is absent.
    pub async fn get_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<(Vec<u8>, String)>, BucketError> {
        let path = self.object_path(bucket, key)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let content_type = match tokio::fs::read(self.meta_path(bucket, key)?).await {
            Ok(b) => String::from_utf8_lossy(&b).into_owned(),
            Err(_) => DEFAULT_CONTENT_TYPE.to_string(),
        };
        Ok(Some((bytes, content_type)))
    }

    /// Delete the object at `key`. Idempotent: deleting an absent key is a no-op
    /// and emits no event.
    pub async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), BucketError> {
        let path = self.object_path(bucket, key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(bucket, key, "delete of absent object, skipping");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }
        let _ = tokio::fs::remove_file(self.meta_path(bucket, key)?).await;
        self.notify(bucket, MutationKind::Removed);
        Ok(())
    }

    /// One page of the bucket listing: keys strictly after `start_after` in
    /// lexicographic order, at most `page_size` entries. The cursor makes the
    /// listing restartable; a missing bucket directory lists as empty.
    pub async fn list_page(
        &self,
        bucket: &str,
        start_after: Option<&str>,
        page_size: usize,
    ) -> Result<ObjectPage, BucketError> {
        let dir = self.bucket_dir(bucket)?;
        // The walk is blocking fs work; keep it off the async runtime threads.
        let entries = tokio::task::spawn_blocking(move || -> Result<_, std::io::Error> {
            let mut entries = Vec::new();
            if dir.is_dir() {
                walk_objects(&dir, &dir, &mut entries)?;
            }
            entries.sort_by(|a, b| a.key.cmp(&b.key));
            Ok(entries)
        })
        .await
        .map_err(|e| BucketError::Io(std::io::Error::other(e)))??;

        let remaining: Vec<ObjectEntry> = entries
            .into_iter()
            .filter(|e| start_after.is_none_or(|s| e.key.as_str() > s))
            .collect();
        let has_more = remaining.len() > page_size;
        let page: Vec<ObjectEntry> = remaining.into_iter().take(page_size).collect();
        let next_start_after = if has_more {
            page.last().map(|e| e.key.clone())
        } else {
            None
        };
        Ok(ObjectPage {
            entries: page,
            next_start_after,
        })
    }

    /// Exhaust the paginated listing. Empty bucket yields an empty vec.
    pub async fn list_all(&self, bucket: &str) -> Result<Vec<ObjectEntry>, BucketError> {
        let mut out = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = self
                .list_page(bucket, cursor.as_deref(), DEFAULT_PAGE_SIZE)
                .await?;
            out.extend(page.entries);
            match page.next_start_after {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        Ok(out)
    }

    // Non-blocking: the ingestion worker is the sole consumer of this channel
    // and may itself publish through the repo (the render cycle writes the
    // chart back into the bucket). A blocking send here could leave the worker
    // waiting on a channel only it drains. Delivery is best-effort anyway; the
    // next mutation's full recompute covers a dropped event.
    fn notify(&self, bucket: &str, kind: MutationKind) {
        if let Some(tx) = &self.events
            && let Err(e) = tx.try_send(BucketEvent {
                bucket: bucket.to_string(),
                kind,
            })
        {
            tracing::warn!(bucket, error = %e, "mutation event dropped");
        }
    }

    fn bucket_dir(&self, bucket: &str) -> Result<PathBuf, BucketError> {
        validate_segment(bucket)?;
        Ok(self.root.join(bucket))
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, BucketError> {
        Ok(self.bucket_dir(bucket)?.join(validate_key(key)?))
    }

    fn meta_path(&self, bucket: &str, key: &str) -> Result<PathBuf, BucketError> {
        Ok(self
            .bucket_dir(bucket)?
            .join(META_DIR)
            .join(validate_key(key)?))
    }
}

/// Reject keys that would escape the bucket directory or collide with the
/// metadata sidecar tree.
fn validate_key(key: &str) -> Result<&Path, BucketError> {
    if key.is_empty() {
        return Err(BucketError::InvalidKey(key.to_string()));
    }
    let path = Path::new(key);
    let mut first = true;
    for component in path.components() {
        match component {
            Component::Normal(seg) => {
                if first && seg == META_DIR {
                    return Err(BucketError::InvalidKey(key.to_string()));
                }
            }
            _ => return Err(BucketError::InvalidKey(key.to_string())),
        }
        first = false;
    }
    Ok(path)
}

fn validate_segment(bucket: &str) -> Result<(), BucketError> {
    if bucket.is_empty()
        || !Path::new(bucket)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        || bucket.contains('/')
    {
        return Err(BucketError::InvalidKey(bucket.to_string()));
    }
    Ok(())
}

/// Recursive walk collecting (key, size) pairs; skips the `.meta` sidecar tree.
fn walk_objects(
    base: &Path,
    dir: &Path,
    out: &mut Vec<ObjectEntry>,
) -> Result<(), std::io::Error> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            if dir == base && entry.file_name() == META_DIR {
                continue;
            }
            walk_objects(base, &path, out)?;
        } else if file_type.is_file() {
            let key = path
                .strip_prefix(base)
                .map_err(|_| std::io::Error::other("path outside bucket root"))?
                .to_string_lossy()
                .into_owned();
            out.push(ObjectEntry {
                key,
                size: entry.metadata()?.len(),
            });
        }
    }
    Ok(())
}
