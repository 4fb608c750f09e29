// src/events.rs
use tracing::info;

/// Locates the bat-ball impact as the frame right after the largest downward
/// wrist movement (image y grows downward). Ties resolve to the earliest step.
///
/// Assumes one dominant downswing per clip; a later, stronger downward motion
/// would be picked instead.
pub fn find_impact_frame(wrist_y: &[f64]) -> Option<usize> {
    if wrist_y.len() < 2 {
        return None;
    }

    let mut best_step = 0;
    let mut best_velocity = f64::NEG_INFINITY;
    for (step, pair) in wrist_y.windows(2).enumerate() {
        let velocity = pair[1] - pair[0];
        if velocity > best_velocity {
            best_velocity = velocity;
            best_step = step;
        }
    }

    let impact = best_step + 1;
    info!("Impact detected at timeline index {}", impact);
    Some(impact)
}
