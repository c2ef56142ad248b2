use crate::models::MaxScope;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub bucket: BucketConfig,
    pub chart: ChartConfig,
    pub tracking: TrackingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BucketConfig {
    /// Name of the monitored bucket (subdirectory under `root`).
    pub name: String,
    /// Root directory holding bucket subdirectories.
    pub root: String,
    /// Max number of pending mutation events (slow ingestion backpressures writers).
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_event_capacity() -> usize {
    64
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartConfig {
    /// Trailing window plotted on the chart, in milliseconds.
    #[serde(default = "default_lookback_ms")]
    pub lookback_ms: u64,
    #[serde(default = "default_chart_width")]
    pub width: u32,
    #[serde(default = "default_chart_height")]
    pub height: u32,
    /// Fixed object key the rendered chart is published under (overwritten each cycle).
    #[serde(default = "default_plot_key")]
    pub plot_key: String,
    /// When set, render + publish on this interval in addition to GET /plot.
    #[serde(default)]
    pub render_interval_secs: Option<u64>,
}

fn default_lookback_ms() -> u64 {
    10_000
}

fn default_chart_width() -> u32 {
    1000
}

fn default_chart_height() -> u32 {
    600
}

fn default_plot_key() -> String {
    "plot".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackingConfig {
    /// Constant tag written on every sample; partition of the size-ordered index.
    #[serde(default = "default_record_kind")]
    pub record_kind: String,
    /// Scope of the all-time max: "global" (original behavior) or "per_bucket".
    #[serde(default = "default_max_scope")]
    pub max_scope: MaxScope,
    /// How often to log app stats (events seen, samples ingested) at INFO level.
    #[serde(default = "default_stats_log_interval_secs")]
    pub stats_log_interval_secs: u64,
}

fn default_record_kind() -> String {
    crate::models::RECORD_KIND_BUCKET_OBJECT.into()
}

fn default_max_scope() -> MaxScope {
    MaxScope::Global
}

fn default_stats_log_interval_secs() -> u64 {
    60
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(!self.bucket.name.is_empty(), "bucket.name must be non-empty");
        anyhow::ensure!(!self.bucket.root.is_empty(), "bucket.root must be non-empty");
        anyhow::ensure!(
            self.bucket.event_capacity > 0,
            "bucket.event_capacity must be > 0, got {}",
            self.bucket.event_capacity
        );
        anyhow::ensure!(
            self.chart.lookback_ms > 0,
            "chart.lookback_ms must be > 0, got {}",
            self.chart.lookback_ms
        );
        anyhow::ensure!(
            self.chart.width >= 100 && self.chart.height >= 100,
            "chart.width/height must be >= 100, got {}x{}",
            self.chart.width,
            self.chart.height
        );
        anyhow::ensure!(
            !self.chart.plot_key.is_empty(),
            "chart.plot_key must be non-empty"
        );
        if let Some(secs) = self.chart.render_interval_secs {
            anyhow::ensure!(
                secs > 0,
                "chart.render_interval_secs must be > 0 when set, got {}",
                secs
            );
        }
        anyhow::ensure!(
            !self.tracking.record_kind.is_empty(),
            "tracking.record_kind must be non-empty"
        );
        anyhow::ensure!(
            self.tracking.stats_log_interval_secs > 0,
            "tracking.stats_log_interval_secs must be > 0, got {}",
            self.tracking.stats_log_interval_secs
        );
        Ok(())
    }
}
