// Chart rendering: the plot is composed as an SVG document in memory and
// rasterized to PNG with resvg (no display surface). Empty or single-point
// windows still produce a valid, sparse chart.

use crate::models::SizeSample;
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg::{Options, Tree};
use std::fmt::Write as _;

const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 60.0;
const GRID_LINES: u32 = 5;

const SERIES_COLOR: &str = "#1f77b4";
const MAX_LINE_COLOR: &str = "#d62728";
const GRID_COLOR: &str = "#d0d0d0";
const AXIS_COLOR: &str = "#333333";

#[derive(Debug, Clone)]
pub struct ChartOptions {
    pub width: u32,
    pub height: u32,
    /// Window length, used only for the series legend label.
    pub lookback_ms: u64,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 600,
            lookback_ms: 10_000,
        }
    }
}

/// Render the window samples plus the all-time-max reference line to PNG bytes.
pub fn render(samples: &[SizeSample], max_size: u64, opts: &ChartOptions) -> anyhow::Result<Vec<u8>> {
    let svg = compose_svg(samples, max_size, opts);
    rasterize(&svg, opts.width, opts.height)
}

fn rasterize(svg: &str, width: u32, height: u32) -> anyhow::Result<Vec<u8>> {
    let mut usvg_opts = Options::default();
    usvg_opts.fontdb_mut().load_system_fonts();
    let tree = Tree::from_data(svg.as_bytes(), &usvg_opts)
        .map_err(|e| anyhow::anyhow!("svg parse: {}", e))?;
    let mut pixmap =
        Pixmap::new(width, height).ok_or_else(|| anyhow::anyhow!("pixmap {}x{}", width, height))?;
    resvg::render(&tree, Transform::default(), &mut pixmap.as_mut());
    pixmap
        .encode_png()
        .map_err(|e| anyhow::anyhow!("png encode: {}", e))
}

fn compose_svg(samples: &[SizeSample], max_size: u64, opts: &ChartOptions) -> String {
    let w = opts.width as f64;
    let h = opts.height as f64;
    let plot_w = w - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_h = h - MARGIN_TOP - MARGIN_BOTTOM;

    // Data domains. A degenerate x range (0 or 1 samples) collapses to a
    // centered point; y always starts at 0 and covers the reference line.
    let (t_min, t_max) = match (samples.first(), samples.last()) {
        (Some(first), Some(last)) if last.timestamp > first.timestamp => {
            (first.timestamp as f64, last.timestamp as f64)
        }
        (Some(only), _) => (only.timestamp as f64 - 1.0, only.timestamp as f64 + 1.0),
        _ => (0.0, 1.0),
    };
    let y_top = samples
        .iter()
        .map(|s| s.total_size)
        .max()
        .unwrap_or(0)
        .max(max_size)
        .max(1) as f64
        * 1.05;

    let x = |t: f64| MARGIN_LEFT + (t - t_min) / (t_max - t_min) * plot_w;
    let y = |v: f64| MARGIN_TOP + plot_h - (v / y_top) * plot_h;

    let mut svg = String::with_capacity(8 * 1024);
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#
    );
    let _ = write!(svg, r#"<rect width="{w}" height="{h}" fill="white"/>"#);

    // Grid
    for i in 0..=GRID_LINES {
        let gy = MARGIN_TOP + plot_h * (i as f64) / (GRID_LINES as f64);
        let gx = MARGIN_LEFT + plot_w * (i as f64) / (GRID_LINES as f64);
        let _ = write!(
            svg,
            r#"<line x1="{x1:.1}" y1="{gy:.1}" x2="{x2:.1}" y2="{gy:.1}" stroke="{GRID_COLOR}" stroke-width="1"/>"#,
            x1 = MARGIN_LEFT,
            x2 = MARGIN_LEFT + plot_w,
        );
        let _ = write!(
            svg,
            r#"<line x1="{gx:.1}" y1="{y1:.1}" x2="{gx:.1}" y2="{y2:.1}" stroke="{GRID_COLOR}" stroke-width="1"/>"#,
            y1 = MARGIN_TOP,
            y2 = MARGIN_TOP + plot_h,
        );
        // Tick labels
        let y_value = y_top * (1.0 - (i as f64) / (GRID_LINES as f64));
        let _ = write!(
            svg,
            r#"<text x="{tx:.1}" y="{ty:.1}" font-size="11" text-anchor="end" fill="{AXIS_COLOR}">{v:.0}</text>"#,
            tx = MARGIN_LEFT - 6.0,
            ty = gy + 4.0,
            v = y_value,
        );
        let t_value = t_min + (t_max - t_min) * (i as f64) / (GRID_LINES as f64);
        let _ = write!(
            svg,
            r#"<text x="{tx:.1}" y="{ty:.1}" font-size="11" text-anchor="middle" fill="{AXIS_COLOR}">{v:.0}</text>"#,
            tx = gx,
            ty = MARGIN_TOP + plot_h + 18.0,
            v = t_value,
        );
    }

    // Axes
    let _ = write!(
        svg,
        r#"<line x1="{l:.1}" y1="{t:.1}" x2="{l:.1}" y2="{b:.1}" stroke="{AXIS_COLOR}" stroke-width="1.5"/>"#,
        l = MARGIN_LEFT,
        t = MARGIN_TOP,
        b = MARGIN_TOP + plot_h,
    );
    let _ = write!(
        svg,
        r#"<line x1="{l:.1}" y1="{b:.1}" x2="{r:.1}" y2="{b:.1}" stroke="{AXIS_COLOR}" stroke-width="1.5"/>"#,
        l = MARGIN_LEFT,
        r = MARGIN_LEFT + plot_w,
        b = MARGIN_TOP + plot_h,
    );

    // All-time-max reference line, labeled with the numeric value
    let my = y(max_size as f64);
    let _ = write!(
        svg,
        r#"<line x1="{l:.1}" y1="{my:.1}" x2="{r:.1}" y2="{my:.1}" stroke="{MAX_LINE_COLOR}" stroke-width="1.5" stroke-dasharray="6,4"/>"#,
        l = MARGIN_LEFT,
        r = MARGIN_LEFT + plot_w,
    );
    let _ = write!(
        svg,
        r#"<text x="{tx:.1}" y="{ty:.1}" font-size="12" fill="{MAX_LINE_COLOR}">Max Size Ever: {max_size} bytes</text>"#,
        tx = MARGIN_LEFT + 8.0,
        ty = my - 6.0,
    );

    // Series: connecting line plus point markers
    if samples.len() > 1 {
        let mut points = String::new();
        for s in samples {
            let _ = write!(
                points,
                "{:.1},{:.1} ",
                x(s.timestamp as f64),
                y(s.total_size as f64)
            );
        }
        let _ = write!(
            svg,
            r#"<polyline points="{points}" fill="none" stroke="{SERIES_COLOR}" stroke-width="2"/>"#,
        );
    }
    for s in samples {
        let _ = write!(
            svg,
            r#"<circle cx="{cx:.1}" cy="{cy:.1}" r="4" fill="{SERIES_COLOR}"/>"#,
            cx = x(s.timestamp as f64),
            cy = y(s.total_size as f64),
        );
    }

    // Title and axis labels
    let _ = write!(
        svg,
        r#"<text x="{tx:.1}" y="28" font-size="17" text-anchor="middle" fill="{AXIS_COLOR}">Bucket Size Over Time</text>"#,
        tx = w / 2.0,
    );
    let _ = write!(
        svg,
        r#"<text x="{tx:.1}" y="{ty:.1}" font-size="13" text-anchor="middle" fill="{AXIS_COLOR}">Timestamp (milliseconds)</text>"#,
        tx = MARGIN_LEFT + plot_w / 2.0,
        ty = h - 14.0,
    );
    let _ = write!(
        svg,
        r#"<text x="20" y="{ty:.1}" font-size="13" text-anchor="middle" fill="{AXIS_COLOR}" transform="rotate(-90 20 {ty:.1})">Size (bytes)</text>"#,
        ty = MARGIN_TOP + plot_h / 2.0,
    );

    // Legend (top-right inside the plot area)
    let lx = MARGIN_LEFT + plot_w - 260.0;
    let ly = MARGIN_TOP + 12.0;
    let _ = write!(
        svg,
        r#"<rect x="{rx:.1}" y="{ry:.1}" width="252" height="44" fill="white" stroke="{GRID_COLOR}"/>"#,
        rx = lx - 6.0,
        ry = ly - 10.0,
    );
    let _ = write!(
        svg,
        r#"<line x1="{lx:.1}" y1="{ly:.1}" x2="{x2:.1}" y2="{ly:.1}" stroke="{SERIES_COLOR}" stroke-width="2"/>"#,
        x2 = lx + 24.0,
    );
    let _ = write!(
        svg,
        r#"<text x="{tx:.1}" y="{ty:.1}" font-size="12" fill="{AXIS_COLOR}">Bucket Size (Last {secs} seconds)</text>"#,
        tx = lx + 30.0,
        ty = ly + 4.0,
        secs = opts.lookback_ms / 1000,
    );
    let ly2 = ly + 20.0;
    let _ = write!(
        svg,
        r#"<line x1="{lx:.1}" y1="{ly2:.1}" x2="{x2:.1}" y2="{ly2:.1}" stroke="{MAX_LINE_COLOR}" stroke-width="2" stroke-dasharray="6,4"/>"#,
        x2 = lx + 24.0,
    );
    let _ = write!(
        svg,
        r#"<text x="{tx:.1}" y="{ty:.1}" font-size="12" fill="{AXIS_COLOR}">Max Size Ever: {max_size} bytes</text>"#,
        tx = lx + 30.0,
        ty = ly2 + 4.0,
    );

    svg.push_str("</svg>");
    svg
}
