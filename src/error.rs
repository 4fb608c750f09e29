// src/error.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV Error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image Error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Video Error: {0:#}")]
    Video(#[from] anyhow::Error),

    #[error("Landmark detector error: {0}")]
    Detector(String),

    #[error("Invalid timeline: {0}")]
    InvalidTimeline(String),

    #[error("No data collected, cannot generate report")]
    EmptyTimeline,
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
