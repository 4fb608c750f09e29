// src/pipeline.rs - metrics pass, scoring stage, render/report pass
use crate::chart::export_temporal_chart;
use crate::config::{AnalysisConfig, Settings};
use crate::data::{DataExporter, ANNOTATED_VIDEO_FILE, CHART_FILE};
use crate::error::{AnalysisError, AnalysisResult};
use crate::events::find_impact_frame;
use crate::feedback::frame_feedback;
use crate::mediapipe_bridge::{DetectorSession, MediaPipeSource, OracleFactory};
use crate::metrics::{extract_metrics, Metric, MetricsTimeline, TimelineBuilder};
use crate::overlay::render_frame;
use crate::phases::{segment_shot_phases, Phase};
use crate::scoring::{Evaluation, Scorer};
use crate::video::{FrameSink, FrameSource, VideoFileReader, VideoRecorder};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Everything produced by one `analyze` run.
#[derive(Debug, Clone)]
pub struct AnalysisOutputs {
    pub video_path: PathBuf,
    pub report_path: PathBuf,
    pub metrics_csv_path: PathBuf,
    pub chart_path: Option<PathBuf>,
    pub evaluation: Evaluation,
    pub html_report_path: Option<PathBuf>,
}

/// Files written by the reporting stage.
#[derive(Debug, Clone)]
pub struct ReportPaths {
    pub report_path: PathBuf,
    pub metrics_csv_path: PathBuf,
    pub chart_path: Option<PathBuf>,
    pub html_report_path: Option<PathBuf>,
}

impl AnalysisOutputs {
    fn assemble(reports: ReportPaths, video_path: PathBuf, evaluation: Evaluation) -> Self {
        Self {
            video_path,
            report_path: reports.report_path,
            metrics_csv_path: reports.metrics_csv_path,
            chart_path: reports.chart_path,
            evaluation,
            html_report_path: reports.html_report_path,
        }
    }
}

/// Result of the scoring stage; read-only input to rendering and reporting.
#[derive(Debug, Clone)]
pub struct ShotAnalysis {
    pub timeline: MetricsTimeline,
    pub impact: Option<usize>,
    /// Empty unless extended scoring ran; otherwise aligned with `timeline`.
    pub phases: Vec<Phase>,
    pub evaluation: Evaluation,
}

pub struct Analyzer {
    config: AnalysisConfig,
}

impl Analyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    fn settings(&self) -> &Settings {
        &self.config.settings
    }

    /// Pass one: landmarks -> metrics for every frame, no rendering.
    pub fn collect_metrics(
        &self,
        source: &mut dyn FrameSource,
        oracles: &dyn OracleFactory,
    ) -> AnalysisResult<MetricsTimeline> {
        info!("Starting first pass: Data gathering...");
        source.rewind()?;
        let (width, height) = (source.info().width, source.info().height);
        let mut session = DetectorSession::open(oracles, "metrics pass")?;
        let mut builder = TimelineBuilder::new();

        let mut frame_index = 0;
        while let Some(frame) = source.next_frame()? {
            match session.detect(frame_index, &frame) {
                Ok(Some(landmarks)) => match extract_metrics(&landmarks, width, height) {
                    Ok(metrics) => builder.push(frame_index, metrics)?,
                    Err(e) => debug!("Frame {} skipped: {}", frame_index, e),
                },
                Ok(None) => debug!("Frame {}: no pose detected", frame_index),
                Err(e) => warn!("Frame {}: detection failed: {}", frame_index, e),
            }
            frame_index += 1;
        }
        session.close();

        info!(
            "First pass complete: {} of {} frames usable",
            builder.len(),
            frame_index
        );
        Ok(builder.finish())
    }

    /// Scoring stage. Pure function of the timeline and settings.
    pub fn score(&self, timeline: MetricsTimeline) -> AnalysisResult<ShotAnalysis> {
        if timeline.is_empty() {
            return Err(AnalysisError::EmptyTimeline);
        }
        let extended = self.config.enable_extended_scoring;

        let (impact, phases) = if extended {
            let wrist_y = timeline.column(Metric::WristY);
            let impact = find_impact_frame(&wrist_y);
            let phases = segment_shot_phases(&wrist_y, impact, &self.settings().calibration);
            (impact, phases)
        } else {
            (None, Vec::new())
        };

        let evaluation = Scorer::new(self.settings()).score(&timeline, impact, extended)?;
        Ok(ShotAnalysis {
            timeline,
            impact,
            phases,
            evaluation,
        })
    }

    /// Pass two: re-detects each frame for drawing and reads metrics from the
    /// finished timeline. Frames without a usable detection pass through untouched.
    pub fn render(
        &self,
        source: &mut dyn FrameSource,
        oracles: &dyn OracleFactory,
        analysis: &ShotAnalysis,
        sink: &mut dyn FrameSink,
    ) -> AnalysisResult<PathBuf> {
        info!("Writing annotated video...");
        source.rewind()?;
        let thresholds = &self.settings().feedback_thresholds;
        let mut session = DetectorSession::open(oracles, "render pass")?;

        let mut frame_index = 0;
        while let Some(frame) = source.next_frame()? {
            let landmarks = match session.detect(frame_index, &frame) {
                Ok(landmarks) => landmarks,
                Err(e) => {
                    warn!("Frame {}: detection failed: {}", frame_index, e);
                    None
                }
            };
            let position = analysis.timeline.position_of_frame(frame_index);

            match (landmarks, position) {
                (Some(landmarks), Some(pos)) => {
                    let metrics = &analysis.timeline.entries()[pos].metrics;
                    let feedback = frame_feedback(metrics, thresholds);
                    let phase = analysis.phases.get(pos).copied();
                    sink.write_frame(&render_frame(&frame, &landmarks, metrics, &feedback, phase))?;
                }
                _ => sink.write_frame(&frame)?,
            }
            frame_index += 1;
        }
        session.close();

        let video_path = sink.finish()?;
        info!("Annotated video saved.");
        Ok(video_path)
    }

    /// Writes every report artifact for a scored shot.
    pub fn write_reports(
        &self,
        exporter: &DataExporter,
        analysis: &ShotAnalysis,
    ) -> AnalysisResult<ReportPaths> {
        let report_path = exporter.export_evaluation(&analysis.evaluation)?;
        let csv_path = exporter.export_csv(
            &analysis.timeline,
            &analysis.phases,
            &self.settings().feedback_thresholds,
        )?;

        if !self.config.enable_extended_scoring {
            return Ok(ReportPaths {
                report_path,
                metrics_csv_path: csv_path,
                chart_path: None,
                html_report_path: None,
            });
        }

        let chart_path = export_temporal_chart(
            &analysis.timeline,
            analysis.impact,
            exporter.path_for(CHART_FILE),
        )?;
        let html_path = exporter.generate_report(&analysis.evaluation, Some(&chart_path))?;
        Ok(ReportPaths {
            report_path,
            metrics_csv_path: csv_path,
            chart_path: Some(chart_path),
            html_report_path: Some(html_path),
        })
    }

    /// Runs both passes with a caller-supplied sink.
    pub fn run(
        &self,
        source: &mut dyn FrameSource,
        oracles: &dyn OracleFactory,
        exporter: &DataExporter,
        sink: &mut dyn FrameSink,
    ) -> AnalysisResult<AnalysisOutputs> {
        let timeline = self.collect_metrics(source, oracles)?;
        let analysis = self.score(timeline)?;
        let reports = self.write_reports(exporter, &analysis)?;
        let video_path = self.render(source, oracles, &analysis, sink)?;

        Ok(AnalysisOutputs::assemble(reports, video_path, analysis.evaluation))
    }

    /// Full analysis of a video file with ffmpeg decoding and encoding.
    pub fn analyze_video(
        &self,
        video_path: impl AsRef<Path>,
        oracles: &dyn OracleFactory,
    ) -> AnalysisResult<AnalysisOutputs> {
        let mut source = VideoFileReader::new(video_path)?;
        self.analyze_source(&mut source, oracles)
    }

    /// Analyzes an opened source into a fresh session directory, encoding the
    /// annotated frames with ffmpeg.
    pub fn analyze_source(
        &self,
        source: &mut dyn FrameSource,
        oracles: &dyn OracleFactory,
    ) -> AnalysisResult<AnalysisOutputs> {
        // Output directory is only created once there is something to report.
        let timeline = self.collect_metrics(source, oracles)?;
        let analysis = self.score(timeline)?;

        let exporter = DataExporter::new(&self.config.output_root, None)?;
        info!(
            "Session {} writing to {}",
            exporter.session_name(),
            exporter.output_dir().display()
        );
        let reports = self.write_reports(&exporter, &analysis)?;

        let mut recorder =
            VideoRecorder::new(exporter.path_for(ANNOTATED_VIDEO_FILE), source.info().fps)?;
        let video_path = self.render(source, oracles, &analysis, &mut recorder)?;

        Ok(AnalysisOutputs::assemble(reports, video_path, analysis.evaluation))
    }
}

/// Landmark dump expected next to a video: `clip.mp4` -> `clip.landmarks.json`.
pub fn default_landmarks_path(video_path: &Path) -> PathBuf {
    video_path.with_extension("landmarks.json")
}

/// Analyzes `video_path` with settings from the default search path and the
/// MediaPipe landmark dump stored beside the video.
pub fn analyze(
    video_path: impl AsRef<Path>,
    enable_extended_scoring: bool,
) -> AnalysisResult<AnalysisOutputs> {
    let video_path = video_path.as_ref();
    let config = AnalysisConfig {
        settings: Settings::load(None)?,
        enable_extended_scoring,
        ..AnalysisConfig::default()
    };
    let oracles = MediaPipeSource::new(default_landmarks_path(video_path));
    Analyzer::new(config).analyze_video(video_path, &oracles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_landmarks_path() {
        assert_eq!(
            default_landmarks_path(Path::new("clips/drive.mp4")),
            PathBuf::from("clips/drive.landmarks.json")
        );
    }
}
