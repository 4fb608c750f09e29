// src/lib.rs
pub mod chart;
pub mod config;
pub mod data;
pub mod error;
pub mod events;
pub mod feedback;
pub mod landmarks;
pub mod mediapipe_bridge;
pub mod metrics;
pub mod overlay;
pub mod phases;
pub mod pipeline;
pub mod scoring;
pub mod video;

pub use config::{AnalysisConfig, Settings};
pub use error::{AnalysisError, AnalysisResult};
pub use pipeline::{analyze, AnalysisOutputs, Analyzer};
pub use scoring::{Category, Evaluation};
