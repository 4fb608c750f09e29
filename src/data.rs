// src/data.rs - evaluation.json, per-frame CSV and the HTML report
use crate::config::FeedbackThresholds;
use crate::error::AnalysisResult;
use crate::feedback::frame_feedback;
use crate::metrics::MetricsTimeline;
use crate::phases::Phase;
use crate::scoring::{Category, Evaluation};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Local;
use csv::Writer;
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const EVALUATION_FILE: &str = "evaluation.json";
pub const FRAME_METRICS_FILE: &str = "frame_metrics.csv";
pub const CHART_FILE: &str = "elbow_angle_chart.png";
pub const HTML_REPORT_FILE: &str = "analysis_report.html";
pub const ANNOTATED_VIDEO_FILE: &str = "annotated_video.mp4";

#[derive(Debug, Serialize)]
struct FrameRecord {
    frame: usize,
    front_elbow_angle: f64,
    spine_lean: f64,
    head_knee_alignment: f64,
    front_foot_direction: f64,
    wrist_y: f64,
    hip_y: f64,
    phase: Option<Phase>,
    elbow_feedback: &'static str,
    head_feedback: &'static str,
}

/// Owns one analysis output directory.
pub struct DataExporter {
    output_dir: PathBuf,
    session_name: String,
}

impl DataExporter {
    /// Creates `<output_root>/<session_name>`, defaulting the session name to
    /// `analysis_<timestamp>`.
    pub fn new(output_root: impl AsRef<Path>, session_name: Option<String>) -> AnalysisResult<Self> {
        let session_name = session_name.unwrap_or_else(|| {
            format!("analysis_{}", Local::now().format("%Y%m%d_%H%M%S"))
        });
        let output_dir = output_root.as_ref().join(&session_name);
        std::fs::create_dir_all(&output_dir)?;
        info!("Saving results to: {}", output_dir.display());

        Ok(Self {
            output_dir,
            session_name,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    pub fn path_for(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }

    pub fn export_evaluation(&self, evaluation: &Evaluation) -> AnalysisResult<PathBuf> {
        let report_path = self.path_for(EVALUATION_FILE);
        let json = serde_json::to_string_pretty(evaluation)?;
        std::fs::write(&report_path, json)?;
        Ok(report_path)
    }

    pub fn load_evaluation(path: impl AsRef<Path>) -> AnalysisResult<Evaluation> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// One row per detected frame. `phases` is either empty or aligned with the timeline.
    pub fn export_csv(
        &self,
        timeline: &MetricsTimeline,
        phases: &[Phase],
        thresholds: &FeedbackThresholds,
    ) -> AnalysisResult<PathBuf> {
        let csv_path = self.path_for(FRAME_METRICS_FILE);
        let mut writer = Writer::from_writer(File::create(&csv_path)?);

        for (i, entry) in timeline.entries().iter().enumerate() {
            let m = &entry.metrics;
            let feedback = frame_feedback(m, thresholds);
            writer.serialize(FrameRecord {
                frame: entry.frame_index,
                front_elbow_angle: m.front_elbow_angle,
                spine_lean: m.spine_lean,
                head_knee_alignment: m.head_knee_alignment,
                front_foot_direction: m.front_foot_direction,
                wrist_y: m.wrist_y,
                hip_y: m.hip_y,
                phase: phases.get(i).copied(),
                elbow_feedback: feedback.elbow.message,
                head_feedback: feedback.head.message,
            })?;
        }

        writer.flush()?;
        Ok(csv_path)
    }

    /// Self-contained HTML report; the chart is inlined when it can be read.
    pub fn generate_report(
        &self,
        evaluation: &Evaluation,
        chart_path: Option<&Path>,
    ) -> AnalysisResult<PathBuf> {
        let chart_base64 = chart_path.and_then(|path| match std::fs::read(path) {
            Ok(bytes) => Some(STANDARD.encode(bytes)),
            Err(e) => {
                warn!("Could not embed chart in HTML report: {}", e);
                None
            }
        });

        let report_path = self.path_for(HTML_REPORT_FILE);
        std::fs::write(&report_path, create_html_report(evaluation, chart_base64.as_deref()))?;
        info!("HTML report saved to {}", report_path.display());
        Ok(report_path)
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn create_html_report(evaluation: &Evaluation, chart_base64: Option<&str>) -> String {
    let mut html = String::from(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Cricket Shot Analysis Report</title>
    <style>
        body { font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif; margin: 0; padding: 0; background-color: #f4f7f6; }
        .container { max-width: 800px; margin: 20px auto; padding: 20px; background-color: #fff; border-radius: 8px; box-shadow: 0 2px 10px rgba(0,0,0,0.1); }
        h1, h2 { color: #1a2a3a; border-bottom: 2px solid #e1e8ed; padding-bottom: 10px; }
        .grade { text-align: center; margin: 20px 0; }
        .grade-value { font-size: 4em; font-weight: bold; color: #4682EA; }
        .grade-label { font-size: 1.2em; color: #5a7894; }
        .metrics-grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(200px, 1fr)); gap: 20px; margin-top: 20px; }
        .metric { background-color: #f8f9fa; padding: 15px; border-radius: 5px; border-left: 5px solid #4682EA; }
        .metric h3 { margin: 0 0 5px 0; color: #1a2a3a; }
        .metric .score { font-size: 2em; font-weight: bold; color: #343a40; }
        .metric .feedback { font-size: 0.9em; color: #6c757d; margin-top: 10px; }
        .chart { text-align: center; margin-top: 30px; }
        img { max-width: 100%; border-radius: 5px; }
    </style>
</head>
<body>
    <div class="container">
        <h1>Cover Drive Analysis Report</h1>
"#,
    );

    if let Some(overall) = evaluation.get(Category::OverallGrade) {
        let grade = overall
            .grade
            .map(|g| g.to_string())
            .unwrap_or_else(|| "N/A".to_string());
        html.push_str(&format!(
            r#"        <div class="grade">
            <div class="grade-value">{}</div>
            <div class="grade-label">Overall Grade (Avg Score: {})</div>
        </div>
"#,
            escape_html(&grade),
            overall.score
        ));
    }

    html.push_str("        <h2>Performance Metrics</h2>\n        <div class=\"metrics-grid\">\n");
    for (category, assessment) in evaluation.iter() {
        if *category == Category::OverallGrade {
            continue;
        }
        html.push_str(&format!(
            r#"            <div class="metric">
                <h3>{}</h3>
                <div class="score">{}/10</div>
                <p class="feedback">{}</p>
            </div>
"#,
            escape_html(&category.to_string()),
            assessment.score,
            escape_html(&assessment.feedback)
        ));
    }
    html.push_str("        </div>\n");

    if let Some(encoded) = chart_base64 {
        html.push_str(&format!(
            r#"        <div class="chart">
            <h2>Temporal Analysis</h2>
            <img src="data:image/png;base64,{}" alt="Elbow Angle Chart">
        </div>
"#,
            encoded
        ));
    }

    html.push_str("    </div>\n</body>\n</html>\n");
    html
}
