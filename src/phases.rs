// src/phases.rs
use crate::config::Calibration;
use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum Phase {
    Stance,
    Backswing,
    Downswing,
    #[strum(serialize = "Follow-through")]
    #[serde(rename = "Follow-through")]
    FollowThrough,
    /// Used for every frame when no impact could be found.
    Analysis,
}

/// First index of the smallest value, i.e. the highest wrist position.
fn argmin(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, value) in values.iter().enumerate() {
        if *value < values[best] {
            best = i;
        }
    }
    best
}

/// Labels each timeline entry with a shot phase, aligned 1:1 with `wrist_y`.
pub fn segment_shot_phases(
    wrist_y: &[f64],
    impact: Option<usize>,
    calibration: &Calibration,
) -> Vec<Phase> {
    let Some(impact) = impact else {
        return vec![Phase::Analysis; wrist_y.len()];
    };
    if wrist_y.is_empty() {
        return Vec::new();
    }

    let peak = if impact > 0 {
        argmin(&wrist_y[..impact.min(wrist_y.len())])
    } else {
        0
    };

    let mut phases: Vec<Phase> = (0..wrist_y.len())
        .map(|i| {
            if i < peak {
                Phase::Backswing
            } else if i < impact {
                Phase::Downswing
            } else {
                Phase::FollowThrough
            }
        })
        .collect();

    // Contiguous prefix only: the first frame that has risen stops the relabel.
    let stance_limit = wrist_y[peak] * calibration.stance_ratio;
    for i in 0..calibration.stance_window.min(phases.len()) {
        if wrist_y[i] > stance_limit {
            phases[i] = Phase::Stance;
        } else {
            break;
        }
    }

    info!(
        "Shot phases segmented (backswing peak {}, impact {})",
        peak, impact
    );
    phases
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_impact_falls_back_to_analysis() {
        let phases = segment_shot_phases(&[1.0, 2.0, 3.0], None, &Calibration::default());
        assert_eq!(phases, vec![Phase::Analysis; 3]);
    }

    #[test]
    fn test_impact_at_zero_uses_first_frame_as_peak() {
        let wrist_y = [100.0, 120.0, 140.0];
        let phases = segment_shot_phases(&wrist_y, Some(0), &Calibration::default());
        // Every frame sits below 0.95 * wrist_y[0] on screen, so all stay in Stance.
        assert_eq!(phases, vec![Phase::Stance; 3]);

        let wrist_y = [100.0, 50.0, 140.0];
        let phases = segment_shot_phases(&wrist_y, Some(0), &Calibration::default());
        assert_eq!(
            phases,
            vec![Phase::Stance, Phase::FollowThrough, Phase::FollowThrough]
        );
    }

    #[test]
    fn test_phase_display_names() {
        assert_eq!(Phase::FollowThrough.to_string(), "Follow-through");
        assert_eq!(Phase::Stance.to_string(), "Stance");
    }
}
