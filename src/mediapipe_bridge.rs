// src/mediapipe_bridge.rs - Landmark oracles and per-pass detector sessions
use crate::error::{AnalysisError, AnalysisResult};
use crate::landmarks::{PoseLandmark, PoseLandmarks};
use crate::video::FrameSource;
use image::DynamicImage;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Fewer rows than this cannot even cover both wrists.
const MIN_POSE_ROWS: usize = 17;

/// Source of per-frame body landmarks.
pub trait LandmarkOracle {
    /// Landmarks for one frame, `Ok(None)` when nobody was detected.
    fn detect(&mut self, frame_index: usize, frame: &DynamicImage)
        -> AnalysisResult<Option<PoseLandmarks>>;

    /// Releases model resources. Called exactly once by [`DetectorSession`].
    fn close(&mut self) {}
}

/// Hands out a fresh oracle for each pass over the video.
pub trait OracleFactory {
    fn open(&self) -> AnalysisResult<Box<dyn LandmarkOracle>>;
}

/// Scoped detector handle; the oracle is closed when the session drops,
/// including on early returns and panics.
pub struct DetectorSession {
    oracle: Option<Box<dyn LandmarkOracle>>,
    label: &'static str,
}

impl DetectorSession {
    pub fn open(factory: &dyn OracleFactory, label: &'static str) -> AnalysisResult<Self> {
        let oracle = factory.open()?;
        debug!("Detector session opened for {}", label);
        Ok(Self {
            oracle: Some(oracle),
            label,
        })
    }

    pub fn detect(
        &mut self,
        frame_index: usize,
        frame: &DynamicImage,
    ) -> AnalysisResult<Option<PoseLandmarks>> {
        match self.oracle.as_mut() {
            Some(oracle) => oracle.detect(frame_index, frame),
            None => Err(AnalysisError::Detector(format!(
                "{} session already closed",
                self.label
            ))),
        }
    }

    pub fn close(&mut self) {
        if let Some(mut oracle) = self.oracle.take() {
            oracle.close();
            debug!("Detector session closed for {}", self.label);
        }
    }
}

impl Drop for DetectorSession {
    fn drop(&mut self) {
        self.close();
    }
}

/// Landmarks exported by an external MediaPipe Pose run, one entry per frame.
#[derive(Debug, Deserialize)]
struct LandmarkDump {
    frames: Vec<Option<Vec<Vec<f64>>>>,
}

/// Oracle backed by a MediaPipe landmark dump (`{"frames": [null, [[x, y, z, v], ...], ...]}`).
pub struct MediaPipeBridge {
    frames: Vec<Option<Vec<Vec<f64>>>>,
}

impl MediaPipeBridge {
    pub fn from_json(json: &str) -> AnalysisResult<Self> {
        let dump: LandmarkDump = serde_json::from_str(json)
            .map_err(|e| AnalysisError::Detector(format!("invalid landmark dump: {}", e)))?;
        Ok(Self { frames: dump.frames })
    }

    pub fn from_file(path: impl AsRef<Path>) -> AnalysisResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AnalysisError::Detector(format!("cannot read {}: {}", path.display(), e))
        })?;
        let bridge = Self::from_json(&content)?;
        info!(
            "MediaPipe landmarks loaded: {} frames from {}",
            bridge.frames.len(),
            path.display()
        );
        Ok(bridge)
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

impl LandmarkOracle for MediaPipeBridge {
    fn detect(
        &mut self,
        frame_index: usize,
        _frame: &DynamicImage,
    ) -> AnalysisResult<Option<PoseLandmarks>> {
        let Some(Some(rows)) = self.frames.get(frame_index) else {
            return Ok(None);
        };
        if rows.len() < MIN_POSE_ROWS {
            debug!(
                "Frame {}: only {} pose rows, treating as no detection",
                frame_index,
                rows.len()
            );
            return Ok(None);
        }
        Ok(Some(PoseLandmarks::from_rows(rows)))
    }

    fn close(&mut self) {
        self.frames.clear();
    }
}

/// Opens a [`MediaPipeBridge`] over the same dump for every pass.
pub struct MediaPipeSource {
    path: PathBuf,
}

impl MediaPipeSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl OracleFactory for MediaPipeSource {
    fn open(&self) -> AnalysisResult<Box<dyn LandmarkOracle>> {
        Ok(Box::new(MediaPipeBridge::from_file(&self.path)?))
    }
}

/// Deterministic synthetic cover drive for demos and pipeline checks. The
/// wrist settles, rises into the backswing, drops through impact and lifts
/// again in the follow-through.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedPose {
    total_frames: usize,
}

impl SimulatedPose {
    pub fn new(total_frames: usize) -> Self {
        Self { total_frames }
    }

    /// Spans every frame `source` currently reports. Call after `rewind` so
    /// sources that only learn their length while decoding are sized correctly.
    pub fn for_source(source: &dyn FrameSource) -> Self {
        Self::new(source.info().frame_count.max(2))
    }

    fn ease(from: f64, to: f64, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        let eased = 0.5 - 0.5 * (std::f64::consts::PI * t).cos();
        from + (to - from) * eased
    }

    fn wrist_at(progress: f64) -> (f64, f64) {
        const STANCE: (f64, f64) = (0.44, 0.56);
        const TOP: (f64, f64) = (0.36, 0.2);
        const IMPACT: (f64, f64) = (0.56, 0.62);
        const FINISH: (f64, f64) = (0.6, 0.24);

        let segment = |a: (f64, f64), b: (f64, f64), start: f64, end: f64| {
            let t = (progress - start) / (end - start);
            (Self::ease(a.0, b.0, t), Self::ease(a.1, b.1, t))
        };

        if progress < 0.15 {
            STANCE
        } else if progress < 0.45 {
            segment(STANCE, TOP, 0.15, 0.45)
        } else if progress < 0.6 {
            segment(TOP, IMPACT, 0.45, 0.6)
        } else {
            segment(IMPACT, FINISH, 0.6, 1.0)
        }
    }

    pub fn pose_at(&self, frame_index: usize) -> PoseLandmarks {
        let span = self.total_frames.saturating_sub(1).max(1) as f64;
        let progress = (frame_index as f64 / span).min(1.0);
        let (wx, wy) = Self::wrist_at(progress);

        let shoulder = (0.42, 0.32);
        let elbow = (
            (shoulder.0 + wx) / 2.0 - 0.03,
            (shoulder.1 + wy) / 2.0 + 0.02,
        );
        let lean = 0.02 * (progress * std::f64::consts::PI).sin();

        PoseLandmarks::new()
            .with(PoseLandmark::Nose, 0.47 + lean, 0.18)
            .with(PoseLandmark::LeftShoulder, shoulder.0, shoulder.1)
            .with(PoseLandmark::RightShoulder, 0.56, 0.31)
            .with(PoseLandmark::LeftElbow, elbow.0, elbow.1)
            .with(PoseLandmark::RightElbow, 0.58, 0.44)
            .with(PoseLandmark::LeftWrist, wx, wy)
            .with(PoseLandmark::RightWrist, wx + 0.02, wy + 0.01)
            .with(PoseLandmark::LeftHip, 0.44, 0.56)
            .with(PoseLandmark::RightHip, 0.55, 0.56)
            .with(PoseLandmark::LeftKnee, 0.43, 0.75)
            .with(PoseLandmark::RightKnee, 0.57, 0.76)
            .with(PoseLandmark::LeftAnkle, 0.42, 0.9)
            .with(PoseLandmark::RightAnkle, 0.58, 0.91)
            .with(PoseLandmark::LeftHeel, 0.41, 0.93)
            .with(PoseLandmark::RightHeel, 0.59, 0.94)
            .with(PoseLandmark::LeftFootIndex, 0.46, 0.87)
            .with(PoseLandmark::RightFootIndex, 0.63, 0.93)
    }
}

impl LandmarkOracle for SimulatedPose {
    fn detect(
        &mut self,
        frame_index: usize,
        _frame: &DynamicImage,
    ) -> AnalysisResult<Option<PoseLandmarks>> {
        if frame_index >= self.total_frames {
            return Ok(None);
        }
        Ok(Some(self.pose_at(frame_index)))
    }
}

impl OracleFactory for SimulatedPose {
    fn open(&self) -> AnalysisResult<Box<dyn LandmarkOracle>> {
        Ok(Box::new(*self))
    }
}
