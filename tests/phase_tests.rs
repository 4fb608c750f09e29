// tests/phase_tests.rs
use cover_drive::config::Calibration;
use cover_drive::events::find_impact_frame;
use cover_drive::phases::{segment_shot_phases, Phase};
use rstest::rstest;

use Phase::{Backswing, Downswing, FollowThrough, Stance};

#[rstest]
#[case::empty(vec![], None)]
#[case::single(vec![120.0], None)]
#[case::accelerating(vec![0.0, 1.0, 4.0, 9.0, 16.0, 25.0], Some(5))]
#[case::inflection(vec![100.0, 80.0, 60.0, 70.0, 90.0], Some(4))]
#[case::flat(vec![50.0, 50.0, 50.0], Some(1))]
fn impact_detection(#[case] wrist_y: Vec<f64>, #[case] expected: Option<usize>) {
    assert_eq!(find_impact_frame(&wrist_y), expected);
}

#[test]
fn strictly_increasing_with_growing_steps_hits_last_frame() {
    for n in 2..30 {
        let wrist_y: Vec<f64> = (0..n).map(|i| (i * i) as f64).collect();
        assert_eq!(find_impact_frame(&wrist_y), Some(n - 1));
    }
}

#[test]
fn without_impact_every_frame_is_analysis() {
    let wrist_y = vec![10.0; 17];
    let phases = segment_shot_phases(&wrist_y, None, &Calibration::default());
    assert_eq!(phases.len(), 17);
    assert!(phases.iter().all(|p| *p == Phase::Analysis));
}

#[test]
fn phases_split_at_peak_and_impact() {
    let wrist_y = [30.0, 35.0, 40.0, 38.0, 20.0, 10.0, 60.0, 90.0, 80.0];
    let impact = find_impact_frame(&wrist_y);
    assert_eq!(impact, Some(6));

    let no_stance = Calibration {
        stance_window: 0,
        ..Calibration::default()
    };
    let phases = segment_shot_phases(&wrist_y, impact, &no_stance);
    assert_eq!(
        phases,
        vec![
            Backswing,
            Backswing,
            Backswing,
            Backswing,
            Backswing,
            Downswing,
            FollowThrough,
            FollowThrough,
            FollowThrough,
        ]
    );
}

#[test]
fn stance_covers_at_most_the_window() {
    // Sixteen frames of descent: everything before the peak sits lower on
    // screen than the peak, so the relabel runs for the whole window.
    let mut wrist_y: Vec<f64> = (0..16).map(|i| 200.0 - 10.0 * i as f64).collect();
    wrist_y.extend([100.0, 170.0]);
    let impact = find_impact_frame(&wrist_y);
    assert_eq!(impact, Some(17));

    let phases = segment_shot_phases(&wrist_y, impact, &Calibration::default());
    assert!(phases[..10].iter().all(|p| *p == Stance));
    assert!(phases[10..15].iter().all(|p| *p == Backswing));
    assert_eq!(phases[15], Downswing);
    assert_eq!(phases[16], Downswing);
    assert_eq!(phases[17], FollowThrough);
}

#[test]
fn stance_prefix_stops_at_first_risen_frame() {
    // Peak y = 60, limit 57. Frame 4 (30) breaks the prefix even though
    // frame 5 (95) would qualify again.
    let wrist_y = [100.0, 80.0, 60.0, 90.0, 30.0, 95.0];
    let phases = segment_shot_phases(&wrist_y, Some(3), &Calibration::default());
    assert_eq!(
        phases,
        vec![Stance, Stance, Stance, Stance, FollowThrough, FollowThrough]
    );
}

#[test]
fn peak_is_searched_only_before_impact() {
    // Frame 3 is higher than anything before impact but must not be the peak;
    // with it as the reference every frame would stay in Stance.
    let wrist_y = [80.0, 60.0, 90.0, 5.0];
    let phases = segment_shot_phases(&wrist_y, Some(2), &Calibration::default());
    assert_eq!(phases, vec![Stance, Stance, Stance, FollowThrough]);
}

#[rstest]
#[case(1, vec![Stance, Backswing, Downswing, FollowThrough])]
#[case(0, vec![Backswing, Backswing, Downswing, FollowThrough])]
fn stance_window_is_configurable(#[case] window: usize, #[case] expected: Vec<Phase>) {
    let wrist_y = [100.0, 100.0, 50.0, 120.0];
    let calibration = Calibration {
        stance_window: window,
        ..Calibration::default()
    };
    assert_eq!(segment_shot_phases(&wrist_y, Some(3), &calibration), expected);
}

#[test]
fn stance_ratio_is_configurable() {
    let wrist_y = [52.0, 50.0, 70.0];
    let strict = Calibration {
        stance_ratio: 1.1,
        ..Calibration::default()
    };
    assert_eq!(
        segment_shot_phases(&wrist_y, Some(2), &strict),
        vec![Backswing, Downswing, FollowThrough]
    );
    assert_eq!(
        segment_shot_phases(&wrist_y, Some(2), &Calibration::default()),
        vec![Stance, Stance, Stance]
    );
}
