use serde::{Deserialize, Serialize};

use crate::constants::{
    ARRIVAL_RADIUS_M, LATERAL_SAFETY_PAD_M, NEAR_ZERO_SPEED_MPS, PEDESTRIAN_STOP_DISTANCE_M,
    RED_LIGHT_TURN_LEAD_M, SAFETY_DISTANCE_MARGIN_M, SAFETY_TIME_MARGIN_S, SHARP_TURN_DEG,
    SHARP_TURN_HAZARD_RANGE_M, SPEED_LIMIT_MPS, SPEED_STEP_MPS,
};
use crate::error::DecisionError;

/// Tunables for one decision policy. Missing fields deserialize to the
/// canonical defaults in [`crate::constants`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    pub safety_time_margin_s: f64,
    pub safety_distance_margin_m: f64,
    pub near_zero_speed_mps: f64,
    pub speed_limit_mps: f64,
    pub speed_step_mps: f64,
    pub sharp_turn_deg: f64,
    pub sharp_turn_hazard_range_m: f64,
    pub red_light_turn_lead_m: f64,
    pub lateral_safety_pad_m: f64,
    pub pedestrian_stop_distance_m: f64,
    pub arrival_radius_m: f64,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            safety_time_margin_s: SAFETY_TIME_MARGIN_S,
            safety_distance_margin_m: SAFETY_DISTANCE_MARGIN_M,
            near_zero_speed_mps: NEAR_ZERO_SPEED_MPS,
            speed_limit_mps: SPEED_LIMIT_MPS,
            speed_step_mps: SPEED_STEP_MPS,
            sharp_turn_deg: SHARP_TURN_DEG,
            sharp_turn_hazard_range_m: SHARP_TURN_HAZARD_RANGE_M,
            red_light_turn_lead_m: RED_LIGHT_TURN_LEAD_M,
            lateral_safety_pad_m: LATERAL_SAFETY_PAD_M,
            pedestrian_stop_distance_m: PEDESTRIAN_STOP_DISTANCE_M,
            arrival_radius_m: ARRIVAL_RADIUS_M,
        }
    }
}

impl DecisionConfig {
    pub fn validate(&self) -> Result<(), DecisionError> {
        let non_negative = [
            ("safety_time_margin_s", self.safety_time_margin_s),
            ("safety_distance_margin_m", self.safety_distance_margin_m),
            ("near_zero_speed_mps", self.near_zero_speed_mps),
            ("sharp_turn_hazard_range_m", self.sharp_turn_hazard_range_m),
            ("red_light_turn_lead_m", self.red_light_turn_lead_m),
            ("lateral_safety_pad_m", self.lateral_safety_pad_m),
            ("pedestrian_stop_distance_m", self.pedestrian_stop_distance_m),
            ("arrival_radius_m", self.arrival_radius_m),
        ];
        for (parameter, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(DecisionError::InvalidConfig { parameter, value });
            }
        }

        let positive = [
            ("speed_limit_mps", self.speed_limit_mps),
            ("speed_step_mps", self.speed_step_mps),
        ];
        for (parameter, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(DecisionError::InvalidConfig { parameter, value });
            }
        }

        if !(self.sharp_turn_deg > 0.0 && self.sharp_turn_deg <= 180.0) {
            return Err(DecisionError::InvalidConfig {
                parameter: "sharp_turn_deg",
                value: self.sharp_turn_deg,
            });
        }

        Ok(())
    }

    /// Distance reserved ahead of the ego for braking on traffic controls.
    #[inline]
    pub fn control_margin(&self, ego_speed: f64) -> f64 {
        ego_speed * self.safety_time_margin_s + self.safety_distance_margin_m
    }
}
