use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::DecisionConfig;
use crate::error::DecisionError;
use crate::geometry::EgoFrame;
use crate::hazard::{assess_hazards, hazard_demand, ControllingHazard};
use crate::heading::turn_angle;
use crate::scene::SceneSnapshot;
use crate::traffic::{evaluate_traffic_controls, ControlSource};

/// Discrete speed command. Ordered by severity so the strictest demand wins
/// under `max`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SpeedLevel {
    #[serde(rename = "MOVE")]
    Move,
    #[serde(rename = "SLOW")]
    Slow,
    #[serde(rename = "STOP")]
    Stop,
}

impl SpeedLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Move => "MOVE",
            Self::Slow => "SLOW",
            Self::Stop => "STOP",
        }
    }
}

impl fmt::Display for SpeedLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpeedLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "MOVE" => Ok(Self::Move),
            "SLOW" => Ok(Self::Slow),
            "STOP" => Ok(Self::Stop),
            other => Err(format!("unknown speed level: {other}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub speed_level: SpeedLevel,
    /// Degrees in (-180, 180], positive toward the ego's left.
    pub turn_angle: f64,
    /// Feed back as `SceneSnapshot::stop_sign_cleared` on the next tick.
    pub stop_sign_cleared: bool,
    pub hazard: Option<ControllingHazard>,
    pub traffic_control: Option<ControlSource>,
}

impl Decision {
    pub fn as_tuple(&self) -> (&'static str, f64) {
        (self.speed_level.as_str(), self.turn_angle)
    }
}

pub fn decide(scene: &SceneSnapshot) -> Result<Decision, DecisionError> {
    decide_with(scene, &DecisionConfig::default())
}

/// Decides the speed level and turn angle for one tick.
///
/// Everything is validated up front; past that point the computation is pure
/// arithmetic and cannot fail.
pub fn decide_with(scene: &SceneSnapshot, cfg: &DecisionConfig) -> Result<Decision, DecisionError> {
    cfg.validate()?;
    scene.validate()?;

    let ego = &scene.ego;
    let frame = EgoFrame::new(ego.position, ego.orientation).ok_or(
        DecisionError::DegenerateOrientation {
            magnitude: ego.orientation.length(),
        },
    )?;

    let turn = turn_angle(&frame, scene.target_position);
    let traffic = evaluate_traffic_controls(scene, turn, cfg);

    let to_target = (scene.target_position - ego.position).length();
    if to_target <= cfg.arrival_radius_m {
        tracing::debug!(to_target, "target reached");
        return Ok(Decision {
            speed_level: SpeedLevel::Stop,
            turn_angle: turn,
            stop_sign_cleared: traffic.stop_sign_cleared,
            hazard: None,
            traffic_control: None,
        });
    }

    let hazards = assess_hazards(scene, &frame, cfg);
    let from_hazard = hazard_demand(&hazards, ego.speed, turn, cfg);
    let speed_level = from_hazard.max(traffic.demand);

    tracing::trace!(
        hazard = %from_hazard,
        traffic = %traffic.demand,
        actors = scene.actors.len(),
        "arbitrated speed level"
    );
    tracing::debug!(
        level = %speed_level,
        turn_angle = turn,
        controlling = hazards
            .controlling
            .as_ref()
            .map(|h| h.actor_id.as_str())
            .unwrap_or("-"),
        "decision"
    );

    Ok(Decision {
        speed_level,
        turn_angle: turn,
        stop_sign_cleared: traffic.stop_sign_cleared,
        hazard: hazards.controlling,
        traffic_control: traffic.source,
    })
}

/// Speed the ego should carry into the next tick after obeying `level`.
pub fn next_speed(level: SpeedLevel, speed: f64, cfg: &DecisionConfig) -> f64 {
    match level {
        SpeedLevel::Move => (speed + cfg.speed_step_mps).min(cfg.speed_limit_mps),
        SpeedLevel::Slow => {
            if speed < cfg.near_zero_speed_mps {
                0.0
            } else {
                (speed - cfg.speed_step_mps).max(0.0)
            }
        }
        SpeedLevel::Stop => 0.0,
    }
}
