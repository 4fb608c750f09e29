// src/chart.rs - Metric-over-time line chart
use crate::error::{AnalysisError, AnalysisResult};
use crate::metrics::{Metric, MetricsTimeline};
use crate::overlay::{draw_line, fill_rect, put_pixel_checked};
use image::{Rgb, RgbImage};
use std::path::{Path, PathBuf};
use tracing::info;

pub const CHART_WIDTH: u32 = 1000;
pub const CHART_HEIGHT: u32 = 600;
const MARGIN: i64 = 60;
const GRID_LINES: i64 = 6;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const AXIS: Rgb<u8> = Rgb([40, 40, 40]);
const GRID: Rgb<u8> = Rgb([220, 220, 220]);
const SERIES: Rgb<u8> = Rgb([31, 119, 180]);
const IMPACT: Rgb<u8> = Rgb([214, 39, 40]);

/// Plot area in pixel space.
struct Plot {
    left: i64,
    top: i64,
    right: i64,
    bottom: i64,
    x_range: (f64, f64),
    y_range: (f64, f64),
}

impl Plot {
    fn new(width: u32, height: u32, x_range: (f64, f64), y_range: (f64, f64)) -> Self {
        Self {
            left: MARGIN,
            top: MARGIN / 2,
            right: width as i64 - MARGIN / 2,
            bottom: height as i64 - MARGIN,
            x_range,
            y_range,
        }
    }

    fn x(&self, value: f64) -> i64 {
        let (lo, hi) = self.x_range;
        let t = if hi > lo { (value - lo) / (hi - lo) } else { 0.5 };
        self.left + (t * (self.right - self.left) as f64).round() as i64
    }

    fn y(&self, value: f64) -> i64 {
        let (lo, hi) = self.y_range;
        let t = if hi > lo { (value - lo) / (hi - lo) } else { 0.5 };
        self.bottom - (t.clamp(0.0, 1.0) * (self.bottom - self.top) as f64).round() as i64
    }
}

/// Renders `values` against `frames` with a dashed vertical marker at `marker_frame`.
pub fn render_line_chart(
    frames: &[usize],
    values: &[f64],
    marker_frame: Option<usize>,
    y_range: (f64, f64),
) -> RgbImage {
    let mut img = RgbImage::from_pixel(CHART_WIDTH, CHART_HEIGHT, BACKGROUND);
    let x_range = match (frames.first(), frames.last()) {
        (Some(first), Some(last)) => (*first as f64, *last as f64),
        _ => (0.0, 1.0),
    };
    let plot = Plot::new(CHART_WIDTH, CHART_HEIGHT, x_range, y_range);

    for i in 0..=GRID_LINES {
        let gy = plot.top + (plot.bottom - plot.top) * i / GRID_LINES;
        let gx = plot.left + (plot.right - plot.left) * i / GRID_LINES;
        draw_line(&mut img, (plot.left, gy), (plot.right, gy), 1, GRID);
        draw_line(&mut img, (gx, plot.top), (gx, plot.bottom), 1, GRID);
    }
    draw_line(&mut img, (plot.left, plot.bottom), (plot.right, plot.bottom), 2, AXIS);
    draw_line(&mut img, (plot.left, plot.top), (plot.left, plot.bottom), 2, AXIS);

    let points: Vec<(i64, i64)> = frames
        .iter()
        .zip(values)
        .map(|(f, v)| (plot.x(*f as f64), plot.y(*v)))
        .collect();
    for pair in points.windows(2) {
        draw_line(&mut img, pair[0], pair[1], 2, SERIES);
    }
    if let [single] = points.as_slice() {
        fill_rect(&mut img, single.0 - 2, single.1 - 2, 5, 5, SERIES);
    }

    if let Some(frame) = marker_frame {
        let x = plot.x(frame as f64);
        let mut y = plot.top;
        while y < plot.bottom {
            for dash in 0..8 {
                put_pixel_checked(&mut img, x, y + dash, IMPACT);
                put_pixel_checked(&mut img, x + 1, y + dash, IMPACT);
            }
            y += 14;
        }
    }

    img
}

/// Writes the front-elbow-angle chart; `impact` is a timeline position.
pub fn export_temporal_chart(
    timeline: &MetricsTimeline,
    impact: Option<usize>,
    path: impl AsRef<Path>,
) -> AnalysisResult<PathBuf> {
    if timeline.is_empty() {
        return Err(AnalysisError::EmptyTimeline);
    }
    let path = path.as_ref();
    let marker = impact.and_then(|i| timeline.get(i)).map(|e| e.frame_index);
    let chart = render_line_chart(
        &timeline.frame_indices(),
        &timeline.column(Metric::FrontElbowAngle),
        marker,
        (0.0, 180.0),
    );
    chart.save(path)?;
    info!("Temporal consistency chart saved to {}", path.display());
    Ok(path.to_path_buf())
}
