use crate::constants::DEGENERATE_EPSILON;
use crate::geometry::{EgoFrame, Vec2};

/// Signed angle in degrees from the ego heading to `target`, positive toward
/// the ego's left (counter-clockwise), normalized into (-180, 180].
///
/// A target on top of the ego has no direction and yields `0.0`.
pub fn turn_angle(frame: &EgoFrame, target: Vec2) -> f64 {
    let local = frame.to_local(target);
    if local.forward.hypot(local.lateral) <= DEGENERATE_EPSILON {
        return 0.0;
    }
    normalize_degrees(local.lateral.atan2(local.forward).to_degrees())
}

pub fn normalize_degrees(degrees: f64) -> f64 {
    if !degrees.is_finite() {
        return 0.0;
    }
    let wrapped = degrees.rem_euclid(360.0);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> EgoFrame {
        EgoFrame::new(Vec2::ZERO, Vec2::new(1.0, 0.0)).expect("frame")
    }

    #[test]
    fn straight_ahead_is_zero() {
        assert_eq!(turn_angle(&frame(), Vec2::new(100.0, 0.0)), 0.0);
    }

    #[test]
    fn left_is_positive_right_is_negative() {
        assert!((turn_angle(&frame(), Vec2::new(0.0, 10.0)) - 90.0).abs() < 1e-9);
        assert!((turn_angle(&frame(), Vec2::new(0.0, -10.0)) + 90.0).abs() < 1e-9);
        assert!((turn_angle(&frame(), Vec2::new(10.0, 10.0)) - 45.0).abs() < 1e-9);
    }

    #[test]
    fn directly_behind_is_plus_180() {
        for target in [Vec2::new(-10.0, 0.0), Vec2::new(-10.0, -0.0)] {
            let angle = turn_angle(&frame(), target);
            assert!((angle - 180.0).abs() < 1e-9, "got {angle}");
        }
    }

    #[test]
    fn coincident_target_is_zero() {
        assert_eq!(turn_angle(&frame(), Vec2::ZERO), 0.0);
    }

    #[test]
    fn normalization_wraps_into_half_open_range() {
        assert_eq!(normalize_degrees(-180.0), 180.0);
        assert_eq!(normalize_degrees(540.0), 180.0);
        assert_eq!(normalize_degrees(-190.0), 170.0);
        assert_eq!(normalize_degrees(f64::NAN), 0.0);
    }
}
