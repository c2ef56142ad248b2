// Background ingestion worker: consumes bucket mutation events and runs one
// full-recompute ingest per event. A failed ingest is logged and dropped; the
// trigger source owns redelivery. Optionally also renders + publishes the
// chart on a timer, in addition to the HTTP trigger.

use crate::aggregator::Aggregator;
use crate::bucket_repo::BucketRepo;
use crate::chart::{self, ChartOptions};
use crate::models::{BucketEvent, MaxScope};
use crate::publisher;
use crate::sample_repo::SampleRepo;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Duration, interval};

/// Repos, channels, and shutdown for the worker.
pub struct WorkerDeps {
    pub buckets: Arc<BucketRepo>,
    pub samples: Arc<SampleRepo>,
    pub aggregator: Arc<Aggregator>,
    pub event_rx: mpsc::Receiver<BucketEvent>,
    pub shutdown_rx: oneshot::Receiver<()>,
}

/// Worker timing config. Stats logging uses real-time intervals.
pub struct WorkerConfig {
    pub stats_log_interval_secs: u64,
    /// When set, run a render cycle every N seconds.
    pub render_interval_secs: Option<u64>,
    pub render: RenderSettings,
}

/// Everything one render cycle needs: which bucket and window to read, how to
/// scope the extremum, and where to publish.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub bucket: String,
    pub plot_key: String,
    pub lookback_ms: u64,
    pub record_kind: String,
    pub max_scope: MaxScope,
    pub chart: ChartOptions,
}

/// Outcome of one render cycle, reported back to the trigger.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderSummary {
    pub key: String,
    pub samples: usize,
    pub max_size: u64,
}

/// One full window + extremum + render + publish pass. Used by the worker's
/// render tick and by the GET /plot route. An empty window still publishes a
/// valid, sparse chart.
pub async fn run_render_cycle(
    buckets: &BucketRepo,
    samples: &SampleRepo,
    settings: &RenderSettings,
) -> anyhow::Result<RenderSummary> {
    let now = crate::models::now_ms();
    let window = samples
        .get_window(&settings.bucket, settings.lookback_ms, now)
        .await?;
    let max_size = samples
        .get_all_time_max(&settings.record_kind, settings.max_scope, &settings.bucket)
        .await?;
    let png = chart::render(&window, max_size, &settings.chart)?;
    publisher::publish_chart(buckets, &settings.bucket, &settings.plot_key, &png).await?;
    Ok(RenderSummary {
        key: settings.plot_key.clone(),
        samples: window.len(),
        max_size,
    })
}

pub fn spawn(deps: WorkerDeps, config: WorkerConfig) -> tokio::task::JoinHandle<()> {
    let WorkerDeps {
        buckets,
        samples,
        aggregator,
        mut event_rx,
        mut shutdown_rx,
    } = deps;
    let WorkerConfig {
        stats_log_interval_secs,
        render_interval_secs,
        render,
    } = config;

    tokio::spawn(async move {
        let mut stats_log_tick = interval(Duration::from_secs(stats_log_interval_secs));
        stats_log_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let render_enabled = render_interval_secs.is_some();
        let mut render_tick = interval(Duration::from_secs(render_interval_secs.unwrap_or(3600)));
        render_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut events_seen: u64 = 0;
        let mut samples_ingested: u64 = 0;

        let worker_span = tracing::span!(tracing::Level::DEBUG, "worker", bucket = %render.bucket);
        let _guard = worker_span.enter();

        loop {
            tokio::select! {
                result = event_rx.recv() => {
                    match result {
                        Some(event) => {
                            events_seen += 1;
                            match aggregator.ingest(&event.bucket).await {
                                Ok(sample) => {
                                    samples_ingested += 1;
                                    tracing::debug!(
                                        bucket = %sample.bucket,
                                        kind = ?event.kind,
                                        total_size = sample.total_size,
                                        object_count = sample.object_count,
                                        "ingested sample"
                                    );
                                }
                                Err(e) => {
                                    tracing::warn!(
                                        error = %e,
                                        bucket = %event.bucket,
                                        operation = "ingest",
                                        "ingest failed, event dropped"
                                    );
                                }
                            }
                        }
                        None => {
                            tracing::debug!("event channel closed");
                            break;
                        }
                    }
                }
                _ = &mut shutdown_rx => {
                    tracing::debug!("Worker shutting down");
                    break;
                }
                _ = stats_log_tick.tick() => {
                    tracing::info!(
                        events_seen,
                        samples_ingested,
                        "app stats"
                    );
                }
                _ = render_tick.tick(), if render_enabled => {
                    match run_render_cycle(&buckets, &samples, &render).await {
                        Ok(summary) => tracing::debug!(
                            samples = summary.samples,
                            max_size = summary.max_size,
                            "scheduled render cycle complete"
                        ),
                        Err(e) => tracing::warn!(
                            error = %e,
                            operation = "run_render_cycle",
                            "scheduled render cycle failed"
                        ),
                    }
                }
            }
        }
    })
}
