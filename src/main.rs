use anyhow::Result;
use bucketwatch::*;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;

    let (event_tx, event_rx) =
        tokio::sync::mpsc::channel::<models::BucketEvent>(app_config.bucket.event_capacity);
    let buckets = Arc::new(
        bucket_repo::BucketRepo::new(&app_config.bucket.root).with_events(event_tx),
    );
    let samples = Arc::new(sample_repo::SampleRepo::connect(&app_config.database.path).await?);
    samples.init().await?;
    let aggregator = Arc::new(aggregator::Aggregator::new(
        buckets.clone(),
        samples.clone(),
        app_config.tracking.record_kind.clone(),
    ));

    let render = worker::RenderSettings {
        bucket: app_config.bucket.name.clone(),
        plot_key: app_config.chart.plot_key.clone(),
        lookback_ms: app_config.chart.lookback_ms,
        record_kind: app_config.tracking.record_kind.clone(),
        max_scope: app_config.tracking.max_scope,
        chart: chart::ChartOptions {
            width: app_config.chart.width,
            height: app_config.chart.height,
            lookback_ms: app_config.chart.lookback_ms,
        },
    };

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let worker_handle = worker::spawn(
        worker::WorkerDeps {
            buckets: buckets.clone(),
            samples: samples.clone(),
            aggregator,
            event_rx,
            shutdown_rx,
        },
        worker::WorkerConfig {
            stats_log_interval_secs: app_config.tracking.stats_log_interval_secs,
            render_interval_secs: app_config.chart.render_interval_secs,
            render: render.clone(),
        },
    );

    let app = routes::app(buckets, samples, render);
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    let in_container = std::path::Path::new("/.dockerenv").exists()
        || std::env::var("CONTAINER").as_deref() == Ok("1");

    if in_container {
        // In Docker: run server until error or SIGTERM (no signal handler; avoids immediate exit)
        axum::serve(listener, app).await?;
    } else {
        tokio::select! {
            result = axum::serve(listener, app) => {
                result?;
            }
            _ = async {
                #[cfg(unix)]
                {
                    let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                        Ok(s) => s,
                        Err(_) => {
                            let _ = tokio::signal::ctrl_c().await;
                            return;
                        }
                    };
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {}
                        _ = sigterm.recv() => {}
                    }
                }
                #[cfg(not(unix))]
                {
                    tokio::signal::ctrl_c().await
                }
            } => {
                tracing::info!("Received shutdown signal");
                let _ = shutdown_tx.send(());
                let _ = worker_handle.await;
            }
        }
    }

    Ok(())
}
