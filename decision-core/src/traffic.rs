use serde::{Deserialize, Serialize};

use crate::config::DecisionConfig;
use crate::decision::SpeedLevel;
use crate::scene::SceneSnapshot;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlSource {
    RedLight,
    StopSign,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrafficOutcome {
    pub demand: SpeedLevel,
    pub source: Option<ControlSource>,
    /// Stop-sign completion state to hand back to the caller.
    pub stop_sign_cleared: bool,
}

/// Speed demand from static traffic controls.
///
/// Both controls are tested against the same margin, `speed * time_margin +
/// distance_margin`. An active red light always wins over a stop sign.
pub fn evaluate_traffic_controls(
    scene: &SceneSnapshot,
    turn_angle: f64,
    cfg: &DecisionConfig,
) -> TrafficOutcome {
    let speed = scene.ego.speed;
    let margin = cfg.control_margin(speed);
    let stopped = speed < cfg.near_zero_speed_mps;

    let (sign_demand, stop_sign_cleared) = match scene.distance_to_stop_sign {
        Some(distance) if distance <= margin => {
            if scene.stop_sign_cleared || stopped {
                (SpeedLevel::Move, true)
            } else if distance <= 0.0 {
                (SpeedLevel::Stop, false)
            } else {
                (SpeedLevel::Slow, false)
            }
        }
        // Out of the zone (or no sign): any earlier completion is forgotten.
        _ => (SpeedLevel::Move, false),
    };

    if let Some(distance) = scene.distance_to_red_light.filter(|d| *d <= margin) {
        let turning = turn_angle.abs() > cfg.sharp_turn_deg && distance <= cfg.red_light_turn_lead_m;
        let demand = if stopped || distance <= 0.0 || turning {
            SpeedLevel::Stop
        } else {
            SpeedLevel::Slow
        };
        return TrafficOutcome {
            demand,
            source: Some(ControlSource::RedLight),
            stop_sign_cleared,
        };
    }

    TrafficOutcome {
        demand: sign_demand,
        source: (sign_demand != SpeedLevel::Move).then_some(ControlSource::StopSign),
        stop_sign_cleared,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::geometry::Vec2;
    use crate::scene::EgoState;

    fn scene(speed: f64, red: Option<f64>, sign: Option<f64>, cleared: bool) -> SceneSnapshot {
        SceneSnapshot {
            ego: EgoState {
                position: Vec2::ZERO,
                orientation: Vec2::new(1.0, 0.0),
                speed,
                length: 4.0,
                width: 2.0,
            },
            target_position: Vec2::new(100.0, 0.0),
            distance_to_red_light: red,
            distance_to_stop_sign: sign,
            actors: BTreeMap::new(),
            stop_sign_cleared: cleared,
        }
    }

    fn eval(s: &SceneSnapshot, turn: f64) -> TrafficOutcome {
        evaluate_traffic_controls(s, turn, &DecisionConfig::default())
    }

    #[test]
    fn no_controls_permit_move() {
        let out = eval(&scene(4.0, None, None, false), 0.0);
        assert_eq!(out.demand, SpeedLevel::Move);
        assert_eq!(out.source, None);
        assert!(!out.stop_sign_cleared);
    }

    #[test]
    fn red_light_outside_margin_is_ignored() {
        // margin at 4 m/s = 10 m
        assert_eq!(eval(&scene(4.0, Some(10.5), None, false), 0.0).demand, SpeedLevel::Move);
        assert_eq!(eval(&scene(4.0, Some(10.0), None, false), 0.0).demand, SpeedLevel::Slow);
    }

    #[test]
    fn red_light_stops_a_stopped_ego_and_slows_a_moving_one() {
        assert_eq!(eval(&scene(0.05, Some(1.5), None, false), 0.0).demand, SpeedLevel::Stop);
        let out = eval(&scene(3.0, Some(6.0), None, false), 0.0);
        assert_eq!(out.demand, SpeedLevel::Slow);
        assert_eq!(out.source, Some(ControlSource::RedLight));
    }

    #[test]
    fn red_light_at_the_line_stops() {
        assert_eq!(eval(&scene(2.0, Some(0.0), None, false), 0.0).demand, SpeedLevel::Stop);
    }

    #[test]
    fn turning_into_a_near_red_light_stops() {
        assert_eq!(eval(&scene(3.0, Some(6.0), None, false), 60.0).demand, SpeedLevel::Stop);
        assert_eq!(eval(&scene(3.0, Some(6.0), None, false), -60.0).demand, SpeedLevel::Stop);
        // Too far for the turn lead distance: just slow.
        assert_eq!(eval(&scene(6.0, Some(12.0), None, false), 60.0).demand, SpeedLevel::Slow);
    }

    #[test]
    fn stop_sign_slows_on_approach_and_stops_at_the_line() {
        let approach = eval(&scene(3.0, None, Some(5.0), false), 0.0);
        assert_eq!(approach.demand, SpeedLevel::Slow);
        assert_eq!(approach.source, Some(ControlSource::StopSign));
        assert_eq!(eval(&scene(1.0, None, Some(0.0), false), 0.0).demand, SpeedLevel::Stop);
    }

    #[test]
    fn stop_sign_completes_once_stopped_and_stays_completed() {
        let halted = eval(&scene(0.05, None, Some(0.4), false), 0.0);
        assert_eq!(halted.demand, SpeedLevel::Move);
        assert!(halted.stop_sign_cleared);

        let pulling_away = eval(&scene(1.0, None, Some(0.2), halted.stop_sign_cleared), 0.0);
        assert_eq!(pulling_away.demand, SpeedLevel::Move);
        assert!(pulling_away.stop_sign_cleared);

        let crossing = eval(&scene(2.0, None, Some(-0.5), pulling_away.stop_sign_cleared), 0.0);
        assert_eq!(crossing.demand, SpeedLevel::Move);
    }

    #[test]
    fn completion_resets_outside_the_zone() {
        let out = eval(&scene(1.0, None, Some(30.0), true), 0.0);
        assert!(!out.stop_sign_cleared);
        assert!(!eval(&scene(1.0, None, None, true), 0.0).stop_sign_cleared);
    }

    #[test]
    fn red_light_overrides_completed_stop_sign() {
        let out = eval(&scene(0.05, Some(1.0), Some(1.0), false), 0.0);
        assert_eq!(out.demand, SpeedLevel::Stop);
        assert_eq!(out.source, Some(ControlSource::RedLight));
        assert!(out.stop_sign_cleared);
    }
}
