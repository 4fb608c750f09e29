// tests/pipeline_tests.rs
use cover_drive::chart::{CHART_HEIGHT, CHART_WIDTH};
use cover_drive::data::{DataExporter, FRAME_METRICS_FILE};
use cover_drive::error::{AnalysisError, AnalysisResult};
use cover_drive::landmarks::{PoseLandmark, PoseLandmarks};
use cover_drive::mediapipe_bridge::{LandmarkOracle, OracleFactory, SimulatedPose};
use cover_drive::phases::Phase;
use cover_drive::scoring::SkillGrade;
use cover_drive::video::{FrameSink, FrameSource, VideoInfo};
use cover_drive::{AnalysisConfig, Analyzer, Category};
use image::DynamicImage;
use std::cell::Cell;
use std::collections::HashSet;
use std::path::PathBuf;
use std::rc::Rc;
use tempfile::TempDir;

const SIZE: u32 = 1024;
const FRAMES: usize = 20;

/// Blank frames of a fixed size, regenerated on every pass.
struct BlankClip {
    info: VideoInfo,
    frames: usize,
    cursor: usize,
}

impl BlankClip {
    fn new(frames: usize) -> Self {
        let mut clip = Self::unprobed(frames);
        clip.info.frame_count = frames;
        clip
    }

    /// A container that reports no frame count until it has been decoded.
    fn unprobed(frames: usize) -> Self {
        Self {
            info: VideoInfo {
                path: PathBuf::from("synthetic.mkv"),
                fps: 30.0,
                frame_count: 0,
                width: SIZE,
                height: SIZE,
            },
            frames,
            cursor: 0,
        }
    }
}

impl FrameSource for BlankClip {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn rewind(&mut self) -> AnalysisResult<()> {
        self.info.frame_count = self.frames;
        self.cursor = 0;
        Ok(())
    }

    fn next_frame(&mut self) -> AnalysisResult<Option<DynamicImage>> {
        if self.cursor >= self.frames {
            return Ok(None);
        }
        self.cursor += 1;
        Ok(Some(DynamicImage::new_rgb8(SIZE, SIZE)))
    }
}

/// Records whether each written frame was drawn on.
#[derive(Default)]
struct RecordingSink {
    annotated: Vec<bool>,
    finished: bool,
}

impl FrameSink for RecordingSink {
    fn write_frame(&mut self, frame: &DynamicImage) -> AnalysisResult<()> {
        self.annotated.push(frame.as_bytes().iter().any(|b| *b != 0));
        Ok(())
    }

    fn finish(&mut self) -> AnalysisResult<PathBuf> {
        self.finished = true;
        Ok(PathBuf::from("memory://annotated"))
    }
}

fn norm(px: f64) -> f64 {
    px / SIZE as f64
}

/// Wrist drops from y=100 to y=55 over ten frames, then rises back to 105.
fn wrist_y(frame: usize) -> f64 {
    if frame < 10 {
        100.0 - 5.0 * frame as f64
    } else {
        60.0 + 5.0 * (frame - 10) as f64
    }
}

/// A pose whose metrics are exact in pixel space:
/// elbow 90°, spine lean 0°, head alignment 0.25 or 0.75, foot about 63°.
fn scripted_pose(frame: usize) -> PoseLandmarks {
    let knee_x = if frame % 2 == 0 { 450.0 } else { 650.0 };
    let lm = |pose: PoseLandmarks, name: PoseLandmark, x: f64, y: f64| pose.with(name, norm(x), norm(y));

    let pose = PoseLandmarks::new();
    let pose = lm(pose, PoseLandmark::Nose, 500.0, 30.0);
    let pose = lm(pose, PoseLandmark::LeftShoulder, 400.0, 82.0);
    let pose = lm(pose, PoseLandmark::RightShoulder, 600.0, 82.0);
    let pose = lm(pose, PoseLandmark::LeftElbow, 500.0, 82.0);
    let pose = lm(pose, PoseLandmark::LeftWrist, 500.0, wrist_y(frame));
    let pose = lm(pose, PoseLandmark::LeftHip, 450.0, 600.0);
    let pose = lm(pose, PoseLandmark::RightHip, 550.0, 600.0);
    let pose = lm(pose, PoseLandmark::LeftKnee, knee_x, 780.0);
    let pose = lm(pose, PoseLandmark::LeftHeel, 450.0, 950.0);
    lm(pose, PoseLandmark::LeftFootIndex, 500.0, 850.0)
}

#[derive(Clone, Default)]
struct Script {
    missing: HashSet<usize>,
    failing: bool,
    opens: Rc<Cell<usize>>,
    closes: Rc<Cell<usize>>,
}

struct ScriptedOracle {
    script: Script,
}

impl LandmarkOracle for ScriptedOracle {
    fn detect(
        &mut self,
        frame_index: usize,
        _frame: &DynamicImage,
    ) -> AnalysisResult<Option<PoseLandmarks>> {
        if self.script.failing {
            return Err(AnalysisError::Detector("scripted failure".to_string()));
        }
        if self.script.missing.contains(&frame_index) {
            return Ok(None);
        }
        Ok(Some(scripted_pose(frame_index)))
    }

    fn close(&mut self) {
        self.script.closes.set(self.script.closes.get() + 1);
    }
}

impl OracleFactory for Script {
    fn open(&self) -> AnalysisResult<Box<dyn LandmarkOracle>> {
        self.opens.set(self.opens.get() + 1);
        Ok(Box::new(ScriptedOracle {
            script: self.clone(),
        }))
    }
}

fn analyzer(extended: bool, output_root: PathBuf) -> Analyzer {
    Analyzer::new(AnalysisConfig {
        output_root,
        enable_extended_scoring: extended,
        ..AnalysisConfig::default()
    })
}

#[test]
fn extended_run_scores_synthetic_drive() {
    let dir = TempDir::new().unwrap();
    let analyzer = analyzer(true, dir.path().to_path_buf());
    let exporter = DataExporter::new(dir.path(), Some("session".to_string())).unwrap();
    let script = Script::default();
    let mut clip = BlankClip::new(FRAMES);
    let mut sink = RecordingSink::default();

    let outputs = analyzer
        .run(&mut clip, &script, &exporter, &mut sink)
        .unwrap();
    let evaluation = &outputs.evaluation;

    assert_eq!(evaluation.score(Category::Footwork), Some(8.5));
    assert_eq!(evaluation.score(Category::HeadPosition), Some(5.0));
    assert_eq!(evaluation.score(Category::SwingControl), Some(5.0));
    assert_eq!(evaluation.score(Category::Balance), Some(10.0));
    assert_eq!(evaluation.score(Category::FollowThrough), Some(7.5));
    assert!(evaluation
        .get(Category::SwingControl)
        .unwrap()
        .feedback
        .starts_with("Elbow angle at impact was"));

    let overall = evaluation.get(Category::OverallGrade).unwrap();
    assert_eq!(overall.score, 7.2);
    assert_eq!(overall.grade, Some(SkillGrade::Intermediate));
    assert_eq!(evaluation.score(Category::BenchmarkComparison), Some(0.0));

    // Both passes opened and closed their own detector.
    assert_eq!(script.opens.get(), 2);
    assert_eq!(script.closes.get(), 2);

    assert!(sink.finished);
    assert_eq!(sink.annotated.len(), FRAMES);
    assert!(sink.annotated.iter().all(|drawn| *drawn));
    assert_eq!(outputs.video_path, PathBuf::from("memory://annotated"));

    let chart_path = outputs.chart_path.as_ref().unwrap();
    let chart = image::open(chart_path).unwrap();
    assert_eq!((chart.width(), chart.height()), (CHART_WIDTH, CHART_HEIGHT));

    let html = std::fs::read_to_string(outputs.html_report_path.as_ref().unwrap()).unwrap();
    assert!(html.contains("Intermediate"));
    assert!(html.contains("data:image/png;base64,"));

    let reloaded = DataExporter::load_evaluation(&outputs.report_path).unwrap();
    assert_eq!(&reloaded, evaluation);
}

#[test]
fn extended_run_writes_phases_to_csv() {
    let dir = TempDir::new().unwrap();
    let analyzer = analyzer(true, dir.path().to_path_buf());
    let exporter = DataExporter::new(dir.path(), Some("phases".to_string())).unwrap();
    let mut clip = BlankClip::new(FRAMES);

    let timeline = analyzer.collect_metrics(&mut clip, &Script::default()).unwrap();
    let analysis = analyzer.score(timeline).unwrap();
    assert_eq!(analysis.impact, Some(10));

    // Every frame before impact sits below the 0.95 stance limit on screen.
    let mut expected = vec![Phase::Stance; 10];
    expected.extend(vec![Phase::FollowThrough; 10]);
    assert_eq!(analysis.phases, expected);

    let reports = analyzer.write_reports(&exporter, &analysis).unwrap();
    assert_eq!(reports.metrics_csv_path, exporter.path_for(FRAME_METRICS_FILE));

    let mut reader = csv::Reader::from_path(&reports.metrics_csv_path).unwrap();
    let headers = reader.headers().unwrap().clone();
    let phase_col = headers.iter().position(|h| h == "phase").unwrap();
    let frame_col = headers.iter().position(|h| h == "frame").unwrap();
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), FRAMES);
    assert_eq!(&rows[0][phase_col], "Stance");
    assert_eq!(&rows[19][phase_col], "Follow-through");
    assert_eq!(&rows[19][frame_col], "19");
}

#[test]
fn basic_run_skips_extended_outputs() {
    let dir = TempDir::new().unwrap();
    let analyzer = analyzer(false, dir.path().to_path_buf());
    let exporter = DataExporter::new(dir.path(), Some("basic".to_string())).unwrap();
    let mut clip = BlankClip::new(FRAMES);
    let mut sink = RecordingSink::default();

    let outputs = analyzer
        .run(&mut clip, &Script::default(), &exporter, &mut sink)
        .unwrap();

    assert_eq!(outputs.evaluation.len(), 5);
    assert!(!outputs.evaluation.contains(Category::OverallGrade));
    assert!(!outputs.evaluation.contains(Category::BenchmarkComparison));
    // No impact: swing control falls back to the widest elbow angle.
    assert_eq!(outputs.evaluation.score(Category::SwingControl), Some(5.0));
    assert!(outputs.chart_path.is_none());
    assert!(outputs.html_report_path.is_none());
    assert!(outputs.report_path.exists());
    assert!(outputs.metrics_csv_path.exists());
}

#[test]
fn undetected_frames_pass_through_unannotated() {
    let dir = TempDir::new().unwrap();
    let analyzer = analyzer(false, dir.path().to_path_buf());
    let exporter = DataExporter::new(dir.path(), Some("gaps".to_string())).unwrap();
    let script = Script {
        missing: HashSet::from([4, 11]),
        ..Script::default()
    };
    let mut clip = BlankClip::new(FRAMES);

    let timeline = analyzer.collect_metrics(&mut clip, &script).unwrap();
    assert_eq!(timeline.len(), FRAMES - 2);
    assert!(!timeline.frame_indices().contains(&4));
    assert_eq!(timeline.position_of_frame(12), Some(10));

    let analysis = analyzer.score(timeline).unwrap();
    analyzer.write_reports(&exporter, &analysis).unwrap();

    let mut sink = RecordingSink::default();
    analyzer
        .render(&mut clip, &script, &analysis, &mut sink)
        .unwrap();
    assert_eq!(sink.annotated.len(), FRAMES);
    for (frame, drawn) in sink.annotated.iter().enumerate() {
        assert_eq!(*drawn, frame != 4 && frame != 11, "frame {}", frame);
    }
}

#[test]
fn no_detections_is_an_empty_timeline() {
    let dir = TempDir::new().unwrap();
    let analyzer = analyzer(true, dir.path().to_path_buf());
    let script = Script {
        missing: (0..FRAMES).collect(),
        ..Script::default()
    };
    let mut clip = BlankClip::new(FRAMES);

    let timeline = analyzer.collect_metrics(&mut clip, &script).unwrap();
    assert!(timeline.is_empty());
    assert!(matches!(
        analyzer.score(timeline),
        Err(AnalysisError::EmptyTimeline)
    ));
    assert_eq!(script.closes.get(), 1);
}

#[test]
fn detector_errors_skip_frames() {
    let dir = TempDir::new().unwrap();
    let analyzer = analyzer(false, dir.path().to_path_buf());
    let script = Script {
        failing: true,
        ..Script::default()
    };
    let mut clip = BlankClip::new(3);

    let timeline = analyzer.collect_metrics(&mut clip, &script).unwrap();
    assert!(timeline.is_empty());
}

#[test]
fn simulated_pose_sized_after_decoding_covers_every_frame() {
    let dir = TempDir::new().unwrap();
    let analyzer = analyzer(false, dir.path().to_path_buf());
    let mut clip = BlankClip::unprobed(12);
    assert_eq!(clip.info().frame_count, 0);

    clip.rewind().unwrap();
    let simulated = SimulatedPose::for_source(&clip);
    let timeline = analyzer.collect_metrics(&mut clip, &simulated).unwrap();
    assert_eq!(timeline.len(), 12);
    assert_eq!(timeline.frame_indices().last(), Some(&11));
}
