// tests/angle_properties.rs
use cover_drive::metrics::calculate_angle;
use nalgebra::Vector2;
use proptest::prelude::*;

fn point() -> impl Strategy<Value = Vector2<f64>> {
    (-2000.0f64..2000.0, -2000.0f64..2000.0).prop_map(|(x, y)| Vector2::new(x, y))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn angle_is_symmetric(a in point(), b in point(), c in point()) {
        prop_assert_eq!(calculate_angle(a, b, c), calculate_angle(c, b, a));
    }

    #[test]
    fn angle_stays_in_half_turn(a in point(), b in point(), c in point()) {
        let angle = calculate_angle(a, b, c);
        prop_assert!(angle >= -1e-9 && angle <= 180.0 + 1e-9, "angle {} out of range", angle);
    }

    #[test]
    fn repeated_arm_is_zero(a in point(), b in point()) {
        prop_assert_eq!(calculate_angle(a, b, a), 0.0);
    }

    #[test]
    fn opposite_arms_are_straight(
        bx in -500i32..500,
        by in -500i32..500,
        dx in 1i32..50,
        dy in -50i32..50,
        near in 1i32..10,
        far in 1i32..10,
    ) {
        let b = Vector2::new(bx as f64, by as f64);
        let dir = Vector2::new(dx as f64, dy as f64);
        let a = b - dir * near as f64;
        let c = b + dir * far as f64;
        prop_assert!((calculate_angle(a, b, c) - 180.0).abs() < 1e-6);
    }
}

#[test]
fn vertex_on_a_point_still_folds_reflex() {
    // atan2(0, 0) is 0, so this is the heading of `c` alone.
    let b = Vector2::new(1.0, 1.0);
    let c = Vector2::new(0.0, 1.0);
    assert!((calculate_angle(b, b, c) - 180.0).abs() < 1e-9);
}
