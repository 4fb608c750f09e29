// src/feedback.rs
use crate::config::FeedbackThresholds;
use crate::metrics::FrameMetrics;
use image::Rgb;

pub const GOOD_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const BAD_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

#[derive(Debug, Clone, PartialEq)]
pub struct Cue {
    pub message: &'static str,
    pub good: bool,
}

impl Cue {
    fn new(good: bool, good_message: &'static str, bad_message: &'static str) -> Self {
        Self {
            message: if good { good_message } else { bad_message },
            good,
        }
    }

    pub fn color(&self) -> Rgb<u8> {
        if self.good {
            GOOD_COLOR
        } else {
            BAD_COLOR
        }
    }
}

/// Live coaching cues shown for a single frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameFeedback {
    pub elbow: Cue,
    pub head: Cue,
}

pub fn frame_feedback(metrics: &FrameMetrics, thresholds: &FeedbackThresholds) -> FrameFeedback {
    FrameFeedback {
        elbow: Cue::new(
            metrics.front_elbow_angle > thresholds.good_elbow_angle,
            "Good elbow extension",
            "Bend elbow more",
        ),
        head: Cue::new(
            metrics.head_knee_alignment < thresholds.head_alignment_ratio,
            "Head over front knee",
            "Lean head forward",
        ),
    }
}
