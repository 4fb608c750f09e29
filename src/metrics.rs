// src/metrics.rs
use crate::error::{AnalysisError, AnalysisResult};
use crate::landmarks::{PoseLandmark, PoseLandmarks};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use strum::Display;
use thiserror::Error;

/// Horizontal offset of the synthetic reference point used for foot direction.
const FOOT_REFERENCE_OFFSET: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    FrontElbowAngle,
    SpineLean,
    HeadKneeAlignment,
    FrontFootDirection,
    WristY,
    HipY,
}

/// Biomechanical measurements for one detected frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameMetrics {
    /// Shoulder-elbow-wrist angle on the front arm, degrees in [0, 180].
    pub front_elbow_angle: f64,
    /// Deviation of the hip->shoulder line from vertical, degrees.
    pub spine_lean: f64,
    /// Horizontal nose-to-knee distance over shoulder width.
    pub head_knee_alignment: f64,
    /// Angle between the heel->toe vector and the horizontal, degrees.
    pub front_foot_direction: f64,
    pub wrist_y: f64,
    pub hip_y: f64,
}

impl FrameMetrics {
    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::FrontElbowAngle => self.front_elbow_angle,
            Metric::SpineLean => self.spine_lean,
            Metric::HeadKneeAlignment => self.head_knee_alignment,
            Metric::FrontFootDirection => self.front_foot_direction,
            Metric::WristY => self.wrist_y,
            Metric::HipY => self.hip_y,
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("landmark {0} not detected")]
    MissingLandmark(PoseLandmark),
}

/// Angle at vertex `b` formed by `a` and `c`, in degrees within [0, 180].
///
/// Uses the difference of the two ray headings rather than the law of cosines,
/// so a reflex result is folded back as `360 - angle`.
pub fn calculate_angle(a: Vector2<f64>, b: Vector2<f64>, c: Vector2<f64>) -> f64 {
    let radians = (c.y - b.y).atan2(c.x - b.x) - (a.y - b.y).atan2(a.x - b.x);
    let angle = (radians.to_degrees()).abs();
    if angle > 180.0 {
        360.0 - angle
    } else {
        angle
    }
}

fn midpoint(a: Vector2<f64>, b: Vector2<f64>) -> Vector2<f64> {
    (a + b) / 2.0
}

/// Converts one frame's landmarks into [`FrameMetrics`]. The left side is
/// treated as the front side (right-handed batter).
pub fn extract_metrics(
    landmarks: &PoseLandmarks,
    frame_width: u32,
    frame_height: u32,
) -> Result<FrameMetrics, ExtractionError> {
    let point = |name: PoseLandmark| {
        landmarks
            .get(name)
            .map(|lm| lm.to_pixel(frame_width, frame_height))
            .ok_or(ExtractionError::MissingLandmark(name))
    };

    let shoulder_l = point(PoseLandmark::LeftShoulder)?;
    let shoulder_r = point(PoseLandmark::RightShoulder)?;
    let elbow = point(PoseLandmark::LeftElbow)?;
    let wrist = point(PoseLandmark::LeftWrist)?;
    let hip_l = point(PoseLandmark::LeftHip)?;
    let hip_r = point(PoseLandmark::RightHip)?;
    let nose = point(PoseLandmark::Nose)?;
    let knee = point(PoseLandmark::LeftKnee)?;
    let heel = point(PoseLandmark::LeftHeel)?;
    let foot_index = point(PoseLandmark::LeftFootIndex)?;

    let hip_mid = midpoint(hip_l, hip_r);
    let shoulder_mid = midpoint(shoulder_l, shoulder_r);

    let front_elbow_angle = calculate_angle(shoulder_l, elbow, wrist);
    let spine_lean = calculate_angle(
        hip_mid,
        shoulder_mid,
        Vector2::new(shoulder_mid.x, hip_mid.y),
    );

    let shoulder_width = (shoulder_l.x - shoulder_r.x).abs();
    let head_knee_alignment = if shoulder_width > 0.0 {
        (nose.x - knee.x).abs() / shoulder_width
    } else {
        0.0
    };

    let front_foot_direction = calculate_angle(
        Vector2::new(heel.x + FOOT_REFERENCE_OFFSET, heel.y),
        heel,
        foot_index,
    );

    Ok(FrameMetrics {
        front_elbow_angle,
        spine_lean,
        head_knee_alignment,
        front_foot_direction,
        wrist_y: wrist.y,
        hip_y: hip_mid.y,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// Index of the source frame in the video.
    pub frame_index: usize,
    pub metrics: FrameMetrics,
}

/// Accumulates metrics during the first pass.
#[derive(Debug, Default)]
pub struct TimelineBuilder {
    entries: Vec<TimelineEntry>,
}

impl TimelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame_index: usize, metrics: FrameMetrics) -> AnalysisResult<()> {
        if let Some(last) = self.entries.last() {
            if frame_index <= last.frame_index {
                return Err(AnalysisError::InvalidTimeline(format!(
                    "frame {} recorded after frame {}",
                    frame_index, last.frame_index
                )));
            }
        }
        self.entries.push(TimelineEntry {
            frame_index,
            metrics,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn finish(self) -> MetricsTimeline {
        MetricsTimeline {
            entries: self.entries,
        }
    }
}

/// Per-frame metrics for the whole clip, ordered by frame index. Frames with
/// no detection are simply absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsTimeline {
    entries: Vec<TimelineEntry>,
}

impl MetricsTimeline {
    /// Timeline for consecutive frames starting at 0.
    pub fn from_metrics(metrics: impl IntoIterator<Item = FrameMetrics>) -> Self {
        Self {
            entries: metrics
                .into_iter()
                .enumerate()
                .map(|(frame_index, metrics)| TimelineEntry {
                    frame_index,
                    metrics,
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    pub fn get(&self, position: usize) -> Option<&TimelineEntry> {
        self.entries.get(position)
    }

    /// Timeline position of the given video frame, if it had a detection.
    pub fn position_of_frame(&self, frame_index: usize) -> Option<usize> {
        self.entries
            .binary_search_by_key(&frame_index, |e| e.frame_index)
            .ok()
    }

    pub fn column(&self, metric: Metric) -> Vec<f64> {
        self.entries.iter().map(|e| e.metrics.value(metric)).collect()
    }

    pub fn frame_indices(&self) -> Vec<usize> {
        self.entries.iter().map(|e| e.frame_index).collect()
    }
}
