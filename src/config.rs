// src/config.rs
use crate::error::{AnalysisError, AnalysisResult};
use crate::metrics::Metric;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const CONFIG_FILE_NAME: &str = "config.json";

/// Thresholds for the live per-frame feedback drawn on the overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackThresholds {
    pub good_elbow_angle: f64,
    pub head_alignment_ratio: f64,
}

impl Default for FeedbackThresholds {
    fn default() -> Self {
        Self {
            good_elbow_angle: 160.0,
            head_alignment_ratio: 0.5,
        }
    }
}

/// Ideal range of one metric at the impact frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRange {
    pub min: f64,
    pub max: f64,
    pub weight: f64,
}

impl ReferenceRange {
    /// Distance from `value` to the nearer bound, 0 inside the range.
    pub fn deviation(&self, value: f64) -> f64 {
        if self.min <= value && value <= self.max {
            0.0
        } else {
            (value - self.min).abs().min((value - self.max).abs())
        }
    }
}

/// Metric name -> ideal impact range. Weights need not sum to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceProfile(pub BTreeMap<Metric, ReferenceRange>);

impl Default for ReferenceProfile {
    fn default() -> Self {
        let mut ranges = BTreeMap::new();
        ranges.insert(
            Metric::FrontElbowAngle,
            ReferenceRange {
                min: 165.0,
                max: 180.0,
                weight: 0.4,
            },
        );
        ranges.insert(
            Metric::SpineLean,
            ReferenceRange {
                min: 10.0,
                max: 25.0,
                weight: 0.3,
            },
        );
        Self(ranges)
    }
}

impl ReferenceProfile {
    pub fn get(&self, metric: Metric) -> Option<&ReferenceRange> {
        self.0.get(&metric)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Metric, &ReferenceRange)> {
        self.0.iter()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceDrive {
    pub impact_metrics: ReferenceProfile,
}

/// Heuristic constants for phase segmentation and benchmark scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    /// Largest elbow-angle miss (degrees) still considered meaningful.
    pub elbow_deviation_scale: f64,
    /// Largest spine-lean miss (degrees) still considered meaningful.
    pub spine_deviation_scale: f64,
    /// A leading frame stays in Stance while its wrist is below this fraction of the backswing peak.
    pub stance_ratio: f64,
    /// Number of leading frames eligible for the Stance relabel.
    pub stance_window: usize,
    /// Head-knee alignment below which a frame counts toward the Head Position score.
    pub head_position_ratio: f64,
}

impl Calibration {
    pub const ELBOW_DEVIATION_SCALE: f64 = 20.0;
    pub const SPINE_DEVIATION_SCALE: f64 = 15.0;
    pub const STANCE_RATIO: f64 = 0.95;
    pub const STANCE_WINDOW: usize = 10;
    pub const HEAD_POSITION_RATIO: f64 = 0.5;

    pub fn deviation_scale(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::FrontElbowAngle => Some(self.elbow_deviation_scale),
            Metric::SpineLean => Some(self.spine_deviation_scale),
            _ => None,
        }
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            elbow_deviation_scale: Self::ELBOW_DEVIATION_SCALE,
            spine_deviation_scale: Self::SPINE_DEVIATION_SCALE,
            stance_ratio: Self::STANCE_RATIO,
            stance_window: Self::STANCE_WINDOW,
            head_position_ratio: Self::HEAD_POSITION_RATIO,
        }
    }
}

/// The settings document (`config.json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub feedback_thresholds: FeedbackThresholds,
    pub reference_drive: ReferenceDrive,
    pub calibration: Calibration,
}

impl Settings {
    pub fn from_json(json: &str) -> AnalysisResult<Self> {
        let settings: Settings = serde_json::from_str(json)
            .map_err(|e| AnalysisError::Config(format!("malformed settings: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> AnalysisResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AnalysisError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let settings = Self::from_json(&content)?;
        info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Resolves the settings document. An explicit path must exist; otherwise
    /// `./config.json` and the platform config directory are tried before
    /// falling back to the built-in defaults.
    pub fn load(explicit: Option<&Path>) -> AnalysisResult<Self> {
        if let Some(path) = explicit {
            return Self::load_from_file(path);
        }

        for candidate in Self::search_paths() {
            if candidate.is_file() {
                return Self::load_from_file(&candidate);
            }
        }

        warn!("{} not found. Using default values.", CONFIG_FILE_NAME);
        Ok(Self::default())
    }

    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
        if let Some(dirs) = directories::ProjectDirs::from("", "", "cover_drive") {
            paths.push(dirs.config_dir().join(CONFIG_FILE_NAME));
        }
        paths
    }

    fn validate(&self) -> AnalysisResult<()> {
        for (metric, range) in self.reference_drive.impact_metrics.iter() {
            if range.min > range.max {
                return Err(AnalysisError::Config(format!(
                    "reference range for {} has min {} above max {}",
                    metric, range.min, range.max
                )));
            }
            if range.weight < 0.0 {
                return Err(AnalysisError::Config(format!(
                    "reference weight for {} is negative",
                    metric
                )));
            }
        }
        let cal = &self.calibration;
        if cal.elbow_deviation_scale <= 0.0 || cal.spine_deviation_scale <= 0.0 {
            return Err(AnalysisError::Config(
                "calibration deviation scales must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Everything one `analyze` run needs besides the video itself.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub settings: Settings,
    pub output_root: PathBuf,
    pub enable_extended_scoring: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            output_root: PathBuf::from("output"),
            enable_extended_scoring: false,
        }
    }
}
