// src/overlay.rs - Skeleton and dashboard drawing for the annotated video
use crate::feedback::FrameFeedback;
use crate::landmarks::{PoseLandmarks, SKELETON_CONNECTIONS};
use crate::metrics::FrameMetrics;
use crate::phases::Phase;
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_text_mut;
use once_cell::sync::Lazy;
use rusttype::{Font, Scale};
use tracing::warn;

const JOINT_COLOR: Rgb<u8> = Rgb([66, 117, 245]);
const BONE_COLOR: Rgb<u8> = Rgb([230, 66, 245]);
const PANEL_SHADE: Rgb<u8> = Rgb([50, 50, 50]);
const GAUGE_TRACK: Rgb<u8> = Rgb([90, 90, 90]);
const GAUGE_FILL: Rgb<u8> = Rgb([255, 255, 255]);
const LABEL_TEXT: Rgb<u8> = Rgb([255, 255, 255]);
const PHASE_TEXT: Rgb<u8> = Rgb([0, 255, 255]);

const PANEL_WIDTH: u32 = 450;
const PANEL_HEIGHT: u32 = 220;

// Dashboard layout, offsets from the panel top.
const METRIC_ROW_Y: i64 = 52;
const ROW_SPACING: i64 = 30;
const ELBOW_CUE_Y: i64 = 150;
const HEAD_CUE_Y: i64 = 180;
const GAUGE_X: i64 = 300;
const TEXT_SIZE: f32 = 22.0;
const PHASE_TEXT_SIZE: f32 = 26.0;

static DASHBOARD_FONT: Lazy<Option<Font<'static>>> = Lazy::new(|| {
    let font = Font::try_from_bytes(include_bytes!("../assets/fonts/DejaVuSans.ttf"));
    if font.is_none() {
        warn!("Bundled dashboard font is unreadable, overlay text disabled");
    }
    font
});

/// Upper bounds used to scale each dashboard gauge.
const ELBOW_GAUGE_MAX: f64 = 180.0;
const SPINE_GAUGE_MAX: f64 = 90.0;
const HEAD_GAUGE_MAX: f64 = 1.5;

pub fn phase_color(phase: Phase) -> Rgb<u8> {
    match phase {
        Phase::Stance => Rgb([180, 180, 180]),
        Phase::Backswing => Rgb([66, 135, 245]),
        Phase::Downswing => Rgb([255, 152, 0]),
        Phase::FollowThrough => Rgb([76, 175, 80]),
        Phase::Analysis => Rgb([255, 255, 0]),
    }
}

pub(crate) fn put_pixel_checked(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, color);
    }
}

pub(crate) fn fill_rect(img: &mut RgbImage, x: i64, y: i64, w: i64, h: i64, color: Rgb<u8>) {
    for py in y..y + h {
        for px in x..x + w {
            put_pixel_checked(img, px, py, color);
        }
    }
}

pub(crate) fn draw_disc(img: &mut RgbImage, cx: i64, cy: i64, radius: i64, color: Rgb<u8>) {
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                put_pixel_checked(img, cx + dx, cy + dy, color);
            }
        }
    }
}

/// Bresenham line; `thickness` > 1 stamps a disc at each step.
pub(crate) fn draw_line(
    img: &mut RgbImage,
    from: (i64, i64),
    to: (i64, i64),
    thickness: i64,
    color: Rgb<u8>,
) {
    let (mut x0, mut y0) = from;
    let (x1, y1) = to;
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let radius = (thickness / 2).max(0);

    loop {
        if radius == 0 {
            put_pixel_checked(img, x0, y0, color);
        } else {
            draw_disc(img, x0, y0, radius, color);
        }
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

/// Mixes `shade` into the region at 50% opacity.
fn shade_rect(img: &mut RgbImage, x: u32, y: u32, w: u32, h: u32, shade: Rgb<u8>) {
    let x_end = (x + w).min(img.width());
    let y_end = (y + h).min(img.height());
    for py in y..y_end {
        for px in x..x_end {
            let pixel = img.get_pixel_mut(px, py);
            for c in 0..3 {
                pixel.0[c] = ((pixel.0[c] as u16 + shade.0[c] as u16) / 2) as u8;
            }
        }
    }
}

fn draw_skeleton(img: &mut RgbImage, landmarks: &PoseLandmarks) {
    let (w, h) = img.dimensions();
    let to_px = |lm: &crate::landmarks::Landmark| {
        let p = lm.to_pixel(w, h);
        (p.x.round() as i64, p.y.round() as i64)
    };

    for (from, to) in SKELETON_CONNECTIONS.iter() {
        if let (Some(a), Some(b)) = (landmarks.get(*from), landmarks.get(*to)) {
            draw_line(img, to_px(a), to_px(b), 2, BONE_COLOR);
        }
    }
    for (_, lm) in landmarks.iter() {
        let (x, y) = to_px(lm);
        draw_disc(img, x, y, 3, JOINT_COLOR);
    }
}

fn draw_gauge(img: &mut RgbImage, x: i64, y: i64, width: i64, fraction: f64) {
    fill_rect(img, x, y, width, 12, GAUGE_TRACK);
    let filled = (fraction.clamp(0.0, 1.0) * width as f64).round() as i64;
    fill_rect(img, x, y, filled, 12, GAUGE_FILL);
}

/// Draws one line of dashboard text with its top-left corner at (x, y).
fn draw_label(img: &mut RgbImage, x: i64, y: i64, size: f32, color: Rgb<u8>, text: &str) {
    if let Some(font) = DASHBOARD_FONT.as_ref() {
        draw_text_mut(img, color, x as i32, y as i32, Scale::uniform(size), font, text);
    }
}

fn draw_dashboard(
    img: &mut RgbImage,
    metrics: &FrameMetrics,
    feedback: &FrameFeedback,
    phase: Option<Phase>,
) {
    let (w, h) = img.dimensions();
    let panel_w = PANEL_WIDTH.min(w);
    let panel_h = PANEL_HEIGHT.min(h);
    let top = h - panel_h;
    shade_rect(img, 0, top, panel_w, panel_h, PANEL_SHADE);

    let top = top as i64;
    if let Some(phase) = phase {
        fill_rect(img, 0, top, panel_w as i64, 6, phase_color(phase));
        draw_label(img, 10, top + 12, PHASE_TEXT_SIZE, PHASE_TEXT, &format!("Phase: {}", phase));
    }

    let rows = [
        (
            format!("Elbow Angle: {} deg", metrics.front_elbow_angle as i64),
            metrics.front_elbow_angle / ELBOW_GAUGE_MAX,
        ),
        (
            format!("Spine Lean: {} deg", metrics.spine_lean as i64),
            metrics.spine_lean / SPINE_GAUGE_MAX,
        ),
        (
            format!("Head Align: {:.2} (ratio)", metrics.head_knee_alignment),
            metrics.head_knee_alignment / HEAD_GAUGE_MAX,
        ),
    ];
    let gauge_width = panel_w as i64 - GAUGE_X - 10;
    for (i, (label, fraction)) in rows.iter().enumerate() {
        let y = top + METRIC_ROW_Y + ROW_SPACING * i as i64;
        draw_label(img, 10, y, TEXT_SIZE, LABEL_TEXT, label);
        draw_gauge(img, GAUGE_X, y + 5, gauge_width, *fraction);
    }

    draw_label(img, 10, top + ELBOW_CUE_Y, TEXT_SIZE, feedback.elbow.color(), feedback.elbow.message);
    draw_label(img, 10, top + HEAD_CUE_Y, TEXT_SIZE, feedback.head.color(), feedback.head.message);
}

/// Draws the pose and the metrics dashboard onto a copy of `frame`.
pub fn render_frame(
    frame: &DynamicImage,
    landmarks: &PoseLandmarks,
    metrics: &FrameMetrics,
    feedback: &FrameFeedback,
    phase: Option<Phase>,
) -> DynamicImage {
    let mut img = frame.to_rgb8();
    draw_skeleton(&mut img, landmarks);
    draw_dashboard(&mut img, metrics, feedback, phase);
    DynamicImage::ImageRgb8(img)
}
