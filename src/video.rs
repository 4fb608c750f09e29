// src/video.rs - ffmpeg-backed frame decoding and annotated video encoding
use crate::error::AnalysisResult;
use anyhow::{anyhow, Context};
use image::DynamicImage;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

const FRAME_PATTERN: &str = "frame_%05d.png";

fn frame_file_name(index: usize) -> String {
    // ffmpeg numbers extracted images from 1.
    format!("frame_{:05}.png", index + 1)
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    pub path: PathBuf,
    pub fps: f64,
    pub frame_count: usize,
    pub width: u32,
    pub height: u32,
}

/// Sequential frame access, restartable so the pipeline can make two passes.
pub trait FrameSource {
    fn info(&self) -> &VideoInfo;

    /// Positions the source before the first frame.
    fn rewind(&mut self) -> AnalysisResult<()>;

    fn next_frame(&mut self) -> AnalysisResult<Option<DynamicImage>>;
}

/// Consumer of rendered frames.
pub trait FrameSink {
    fn write_frame(&mut self, frame: &DynamicImage) -> AnalysisResult<()>;

    /// Flushes everything written so far and returns the output location.
    fn finish(&mut self) -> AnalysisResult<PathBuf>;
}

fn require_tool(tool: &str) -> anyhow::Result<()> {
    Command::new(tool)
        .arg("-version")
        .output()
        .map(|_| ())
        .map_err(|_| {
            anyhow!(
                "{} is not installed or not in PATH. Please install FFmpeg to process videos.",
                tool
            )
        })
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: u32,
    height: u32,
    r_frame_rate: String,
    #[serde(default)]
    nb_frames: Option<String>,
}

/// Parses ffprobe rates such as `30000/1001` or `25`.
pub fn parse_frame_rate(rate: &str) -> Option<f64> {
    let fps = match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => rate.trim().parse().ok()?,
    };
    (fps.is_finite() && fps > 0.0).then_some(fps)
}

pub fn probe_video(path: &Path) -> anyhow::Result<VideoInfo> {
    if !path.exists() {
        return Err(anyhow!("Video file does not exist: {}", path.display()));
    }
    fs::File::open(path)
        .with_context(|| format!("Cannot read video file: {}", path.display()))?;
    require_tool("ffprobe")?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,r_frame_rate,nb_frames",
            "-of",
            "json",
        ])
        .arg(path)
        .output()
        .context("Failed to run ffprobe")?;
    if !output.status.success() {
        return Err(anyhow!(
            "ffprobe rejected {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }

    let probe: ProbeOutput =
        serde_json::from_slice(&output.stdout).context("Unreadable ffprobe output")?;
    let stream = probe
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("Invalid video format or corrupted file"))?;

    let fps = parse_frame_rate(&stream.r_frame_rate).unwrap_or_else(|| {
        warn!("Unknown frame rate '{}', assuming 30", stream.r_frame_rate);
        30.0
    });
    let frame_count = stream
        .nb_frames
        .as_deref()
        .and_then(|n| n.parse().ok())
        .unwrap_or(0);

    Ok(VideoInfo {
        path: path.to_path_buf(),
        fps,
        frame_count,
        width: stream.width,
        height: stream.height,
    })
}

/// Decodes a video file into a temporary PNG sequence once and then streams
/// frames from disk on every pass.
pub struct VideoFileReader {
    info: VideoInfo,
    frames_dir: Option<PathBuf>,
    current_frame: usize,
}

impl VideoFileReader {
    pub fn new(path: impl AsRef<Path>) -> AnalysisResult<Self> {
        let info = probe_video(path.as_ref())?;
        info!(
            "Opened {} ({}x{} @ {:.2} fps)",
            info.path.display(),
            info.width,
            info.height,
            info.fps
        );
        Ok(Self {
            info,
            frames_dir: None,
            current_frame: 0,
        })
    }

    fn extract_frames(&mut self) -> anyhow::Result<()> {
        if self.frames_dir.is_some() {
            return Ok(());
        }
        require_tool("ffmpeg")?;

        let temp_dir = std::env::temp_dir().join(format!("cover_drive_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&temp_dir)
            .with_context(|| format!("Cannot create temporary directory {}", temp_dir.display()))?;

        info!("Extracting frames from {}", self.info.path.display());
        let status = Command::new("ffmpeg")
            .args(["-v", "error", "-i"])
            .arg(&self.info.path)
            .arg(temp_dir.join(FRAME_PATTERN))
            .status()
            .context("Failed to extract frames with ffmpeg")?;

        if !status.success() {
            let _ = fs::remove_dir_all(&temp_dir);
            return Err(anyhow!(
                "FFmpeg frame extraction failed. The video format may be unsupported."
            ));
        }

        let extracted = fs::read_dir(&temp_dir)?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "png"))
            .count();
        if extracted == 0 {
            let _ = fs::remove_dir_all(&temp_dir);
            return Err(anyhow!("No frames could be extracted from the video"));
        }
        if extracted != self.info.frame_count {
            debug!(
                "Container reported {} frames, decoded {}",
                self.info.frame_count, extracted
            );
            self.info.frame_count = extracted;
        }

        self.frames_dir = Some(temp_dir);
        Ok(())
    }
}

impl FrameSource for VideoFileReader {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn rewind(&mut self) -> AnalysisResult<()> {
        self.extract_frames()?;
        self.current_frame = 0;
        Ok(())
    }

    fn next_frame(&mut self) -> AnalysisResult<Option<DynamicImage>> {
        let Some(dir) = &self.frames_dir else {
            return Ok(None);
        };
        if self.current_frame >= self.info.frame_count {
            return Ok(None);
        }
        let frame_path = dir.join(frame_file_name(self.current_frame));
        self.current_frame += 1;
        Ok(Some(image::open(&frame_path)?))
    }
}

impl Drop for VideoFileReader {
    fn drop(&mut self) {
        if let Some(dir) = self.frames_dir.take() {
            let _ = fs::remove_dir_all(dir);
        }
    }
}

/// Stages rendered frames as PNGs and encodes them with ffmpeg on `finish`.
pub struct VideoRecorder {
    output_path: PathBuf,
    staging_dir: PathBuf,
    fps: f64,
    frame_count: usize,
}

impl VideoRecorder {
    pub fn new(output_path: impl AsRef<Path>, fps: f64) -> AnalysisResult<Self> {
        let output_path = output_path.as_ref().to_path_buf();
        let staging_dir = output_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(format!("temp_frames_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&staging_dir)?;

        Ok(Self {
            output_path,
            staging_dir,
            fps,
            frame_count: 0,
        })
    }
}

impl FrameSink for VideoRecorder {
    fn write_frame(&mut self, frame: &DynamicImage) -> AnalysisResult<()> {
        let frame_path = self.staging_dir.join(frame_file_name(self.frame_count));
        frame.to_rgb8().save(&frame_path)?;
        self.frame_count += 1;
        Ok(())
    }

    fn finish(&mut self) -> AnalysisResult<PathBuf> {
        if self.frame_count == 0 {
            return Err(anyhow!("No frames were written to {}", self.output_path.display()).into());
        }
        require_tool("ffmpeg")?;

        info!(
            "Encoding {} frames to {}",
            self.frame_count,
            self.output_path.display()
        );
        let status = Command::new("ffmpeg")
            .args(["-y", "-v", "error", "-framerate"])
            .arg(self.fps.to_string())
            .arg("-i")
            .arg(self.staging_dir.join(FRAME_PATTERN))
            .args([
                "-c:v", "libx264", "-preset", "medium", "-crf", "23", "-pix_fmt", "yuv420p",
                // libx264 needs even dimensions.
                "-vf", "pad=ceil(iw/2)*2:ceil(ih/2)*2",
            ])
            .arg(&self.output_path)
            .status()
            .context("Failed to run ffmpeg")?;

        let _ = fs::remove_dir_all(&self.staging_dir);

        if !status.success() {
            return Err(anyhow!("FFmpeg video encoding failed").into());
        }
        Ok(self.output_path.clone())
    }
}

impl Drop for VideoRecorder {
    fn drop(&mut self) {
        if self.staging_dir.exists() {
            let _ = fs::remove_dir_all(&self.staging_dir);
        }
    }
}
