//! Canonical tuning defaults for the decision core.
//!
//! These seed `DecisionConfig::default()`; callers override them through the
//! config surface rather than editing the values here.

// Reaction buffers
pub const SAFETY_TIME_MARGIN_S: f64 = 2.0;
pub const SAFETY_DISTANCE_MARGIN_M: f64 = 2.0;

// Speed handling
pub const NEAR_ZERO_SPEED_MPS: f64 = 0.1;
pub const SPEED_LIMIT_MPS: f64 = 6.0;
pub const SPEED_STEP_MPS: f64 = 1.0;

// Steering
pub const SHARP_TURN_DEG: f64 = 45.0;
pub const SHARP_TURN_HAZARD_RANGE_M: f64 = 50.0;
pub const RED_LIGHT_TURN_LEAD_M: f64 = 10.0;

// Path swath
pub const LATERAL_SAFETY_PAD_M: f64 = 0.25;
pub const PEDESTRIAN_STOP_DISTANCE_M: f64 = 0.0;

// Target handling
pub const ARRIVAL_RADIUS_M: f64 = 0.5;

// Numeric guards
pub const MIN_CLOSING_SPEED_MPS: f64 = 0.1;
pub const DEGENERATE_EPSILON: f64 = 1e-9;
