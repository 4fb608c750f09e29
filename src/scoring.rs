// src/scoring.rs
use crate::config::Settings;
use crate::error::{AnalysisError, AnalysisResult};
use crate::metrics::{Metric, MetricsTimeline};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::Display;
use tracing::{info, warn};

const FOOTWORK_GOOD: f64 = 8.5;
const FOOTWORK_POOR: f64 = 4.0;
const FOOTWORK_RANGE: (f64, f64) = (45.0, 90.0);
const FOLLOW_THROUGH_SCORE: f64 = 7.5;
const ADVANCED_AVERAGE: f64 = 8.0;
const INTERMEDIATE_AVERAGE: f64 = 6.0;

/// Evaluation categories, ordered as they appear in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize, Deserialize)]
pub enum Category {
    Footwork,
    #[strum(serialize = "Head Position")]
    #[serde(rename = "Head Position")]
    HeadPosition,
    #[strum(serialize = "Swing Control")]
    #[serde(rename = "Swing Control")]
    SwingControl,
    Balance,
    #[strum(serialize = "Follow-through")]
    #[serde(rename = "Follow-through")]
    FollowThrough,
    #[strum(serialize = "Overall Grade")]
    #[serde(rename = "Overall Grade")]
    OverallGrade,
    #[strum(serialize = "Benchmark Comparison")]
    #[serde(rename = "Benchmark Comparison")]
    BenchmarkComparison,
}

impl Category {
    /// Categories derived directly from the timeline.
    pub fn is_base(self) -> bool {
        !matches!(self, Category::OverallGrade | Category::BenchmarkComparison)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum SkillGrade {
    Beginner,
    Intermediate,
    Advanced,
}

impl SkillGrade {
    pub fn from_average(average: f64) -> Self {
        if average >= ADVANCED_AVERAGE {
            SkillGrade::Advanced
        } else if average >= INTERMEDIATE_AVERAGE {
            SkillGrade::Intermediate
        } else {
            SkillGrade::Beginner
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    /// 0 to 10.
    pub score: f64,
    pub feedback: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<SkillGrade>,
}

impl Assessment {
    pub fn new(score: f64, feedback: impl Into<String>) -> Self {
        Self {
            score,
            feedback: feedback.into(),
            grade: None,
        }
    }
}

/// Final per-category scores. Serializes as a JSON object keyed by category name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Evaluation(BTreeMap<Category, Assessment>);

impl Evaluation {
    pub fn get(&self, category: Category) -> Option<&Assessment> {
        self.0.get(&category)
    }

    pub fn score(&self, category: Category) -> Option<f64> {
        self.get(category).map(|a| a.score)
    }

    pub fn contains(&self, category: Category) -> bool {
        self.0.contains_key(&category)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Category, &Assessment)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn insert(&mut self, category: Category, assessment: Assessment) {
        self.0.insert(category, assessment);
    }
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
fn std_dev(values: &[f64]) -> f64 {
    let avg = mean(values);
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Turns a finished timeline into an [`Evaluation`].
pub struct Scorer<'a> {
    settings: &'a Settings,
}

impl<'a> Scorer<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// Full scoring step. Extended scoring appends the Overall Grade (averaged
    /// over the base categories only) and then the Benchmark Comparison.
    pub fn score(
        &self,
        timeline: &MetricsTimeline,
        impact: Option<usize>,
        extended: bool,
    ) -> AnalysisResult<Evaluation> {
        let mut evaluation = self.evaluate(timeline, impact)?;
        if extended {
            self.add_skill_grade(&mut evaluation);
            self.add_reference_comparison(&mut evaluation, timeline, impact);
        }
        Ok(evaluation)
    }

    /// Base categories. The timeline must not be empty.
    pub fn evaluate(
        &self,
        timeline: &MetricsTimeline,
        impact: Option<usize>,
    ) -> AnalysisResult<Evaluation> {
        if timeline.is_empty() {
            return Err(AnalysisError::EmptyTimeline);
        }

        let mut evaluation = Evaluation::default();
        evaluation.insert(
            Category::Footwork,
            self.footwork(&timeline.column(Metric::FrontFootDirection)),
        );
        evaluation.insert(
            Category::HeadPosition,
            self.head_position(&timeline.column(Metric::HeadKneeAlignment)),
        );
        evaluation.insert(
            Category::SwingControl,
            self.swing_control(&timeline.column(Metric::FrontElbowAngle), impact),
        );
        evaluation.insert(
            Category::Balance,
            self.balance(&timeline.column(Metric::SpineLean)),
        );
        evaluation.insert(
            Category::FollowThrough,
            Assessment::new(
                FOLLOW_THROUGH_SCORE,
                "A high and complete follow-through ensures commitment.",
            ),
        );
        Ok(evaluation)
    }

    fn footwork(&self, foot_direction: &[f64]) -> Assessment {
        let avg = mean(foot_direction);
        let (low, high) = FOOTWORK_RANGE;
        let score = if low < avg && avg < high {
            FOOTWORK_GOOD
        } else {
            FOOTWORK_POOR
        };
        Assessment::new(
            score,
            "Ensure the front foot points towards the cover region.",
        )
    }

    fn head_position(&self, alignment: &[f64]) -> Assessment {
        let ratio = self.settings.calibration.head_position_ratio;
        let good = alignment.iter().filter(|a| **a < ratio).count();
        let score = round_to(good as f64 / alignment.len() as f64 * 10.0, 1);
        Assessment::new(
            score,
            "A stable head over the front knee is crucial for balance.",
        )
    }

    fn swing_control(&self, elbow: &[f64], impact: Option<usize>) -> Assessment {
        match impact.and_then(|i| elbow.get(i)) {
            Some(at_impact) => Assessment::new(
                round_to(at_impact / 180.0 * 10.0, 1),
                format!(
                    "Elbow angle at impact was {}°. Aim for full extension.",
                    *at_impact as i64
                ),
            ),
            None => {
                let max_angle = elbow.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                Assessment::new(
                    round_to(max_angle / 180.0 * 10.0, 1),
                    "Aim for a full extension of the front arm through the shot.",
                )
            }
        }
    }

    fn balance(&self, spine_lean: &[f64]) -> Assessment {
        let spread = std_dev(spine_lean);
        let score = (10.0 - (spread / 10.0) * 10.0).clamp(1.0, 10.0);
        Assessment::new(
            round_to(score, 1),
            "Maintain a consistent and stable posture.",
        )
    }

    /// Adds the Overall Grade computed from the base categories present.
    pub fn add_skill_grade(&self, evaluation: &mut Evaluation) {
        let scores: Vec<f64> = evaluation
            .iter()
            .filter(|(category, _)| category.is_base())
            .map(|(_, assessment)| assessment.score)
            .collect();
        if scores.is_empty() {
            return;
        }

        let average = mean(&scores);
        let grade = SkillGrade::from_average(average);
        info!("Overall Skill Grade: {} (Avg Score: {:.2})", grade, average);

        evaluation.insert(
            Category::OverallGrade,
            Assessment {
                score: round_to(average, 2),
                feedback: format!("Overall skill level: {} (Avg Score: {:.2})", grade, average),
                grade: Some(grade),
            },
        );
    }

    /// Compares the impact-frame metrics against the reference profile.
    pub fn add_reference_comparison(
        &self,
        evaluation: &mut Evaluation,
        timeline: &MetricsTimeline,
        impact: Option<usize>,
    ) {
        let Some(entry) = impact.and_then(|i| timeline.get(i)) else {
            return;
        };

        let calibration = &self.settings.calibration;
        let mut weighted_deviation = 0.0;
        let mut total_weight = 0.0;

        for (metric, range) in self.settings.reference_drive.impact_metrics.iter() {
            let Some(scale) = calibration.deviation_scale(*metric) else {
                warn!("No deviation scale for reference metric {}, skipping", metric);
                continue;
            };
            let deviation = range.deviation(entry.metrics.value(*metric));
            weighted_deviation += (deviation / scale) * range.weight;
            total_weight += range.weight;
        }

        if total_weight <= 0.0 {
            warn!("Reference profile has no usable weight, skipping benchmark comparison");
            return;
        }

        let benchmark = (10.0 * (1.0 - weighted_deviation / total_weight)).max(0.0);
        evaluation.insert(
            Category::BenchmarkComparison,
            Assessment::new(
                round_to(benchmark, 1),
                format!(
                    "Your shot matched the ideal form with a score of {:.1}/10.",
                    benchmark
                ),
            ),
        );
    }
}
