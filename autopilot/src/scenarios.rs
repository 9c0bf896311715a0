use anyhow::{anyhow, Context, Result};
use drive_decision_core::constants::ARRIVAL_RADIUS_M;
use drive_decision_core::geometry::Vec2;
use drive_decision_core::{Actor, ActorKind, EgoState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

pub const SCENARIO_FILE_PREFIX: &str = "file:";

const DEFAULT_TICK_S: f64 = 0.2;
const DEFAULT_MAX_TICKS: u32 = 400;
const DEFAULT_TURN_RATE_DEG_S: f64 = 45.0;
const DEFAULT_LANE_HALF_WIDTH_M: f64 = 3.5;
const DEFAULT_SENSING_RANGE_M: f64 = 60.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlKind {
    RedLight,
    StopSign,
}

/// A stop line. Red lights stay red for `red_ticks` (forever when absent).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrafficControl {
    pub kind: ControlKind,
    pub position: Vec2,
    #[serde(default)]
    pub red_ticks: Option<u32>,
}

impl TrafficControl {
    pub fn is_active(&self, tick: u32) -> bool {
        match self.kind {
            ControlKind::StopSign => true,
            ControlKind::RedLight => self.red_ticks.map_or(true, |red| tick < red),
        }
    }
}

/// An actor moving in a straight line along its heading, halting for good
/// once it has covered `travel_limit_m`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActorTrack {
    pub id: String,
    pub actor: Actor,
    #[serde(default)]
    pub travel_limit_m: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub ego: EgoState,
    pub target: Vec2,
    #[serde(default)]
    pub actors: Vec<ActorTrack>,
    #[serde(default)]
    pub controls: Vec<TrafficControl>,
    #[serde(default = "default_tick_s")]
    pub tick_s: f64,
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u32,
    #[serde(default = "default_arrival_radius_m")]
    pub arrival_radius_m: f64,
    #[serde(default = "default_turn_rate_deg_s")]
    pub turn_rate_deg_s: f64,
    /// Controls further than this off the ego's centreline are not reported.
    #[serde(default = "default_lane_half_width_m")]
    pub lane_half_width_m: f64,
    #[serde(default = "default_sensing_range_m")]
    pub sensing_range_m: f64,
}

fn default_tick_s() -> f64 {
    DEFAULT_TICK_S
}

fn default_max_ticks() -> u32 {
    DEFAULT_MAX_TICKS
}

fn default_arrival_radius_m() -> f64 {
    ARRIVAL_RADIUS_M
}

fn default_turn_rate_deg_s() -> f64 {
    DEFAULT_TURN_RATE_DEG_S
}

fn default_lane_half_width_m() -> f64 {
    DEFAULT_LANE_HALF_WIDTH_M
}

fn default_sensing_range_m() -> f64 {
    DEFAULT_SENSING_RANGE_M
}

impl Scenario {
    fn base(id: &str, description: &str, ego: EgoState, target: Vec2) -> Self {
        Self {
            id: id.to_string(),
            description: description.to_string(),
            ego,
            target,
            actors: Vec::new(),
            controls: Vec::new(),
            tick_s: DEFAULT_TICK_S,
            max_ticks: DEFAULT_MAX_TICKS,
            arrival_radius_m: ARRIVAL_RADIUS_M,
            turn_rate_deg_s: DEFAULT_TURN_RATE_DEG_S,
            lane_half_width_m: DEFAULT_LANE_HALF_WIDTH_M,
            sensing_range_m: DEFAULT_SENSING_RANGE_M,
        }
    }

    fn with_actor(mut self, id: &str, actor: Actor, travel_limit_m: Option<f64>) -> Self {
        self.actors.push(ActorTrack {
            id: id.to_string(),
            actor,
            travel_limit_m,
        });
        self
    }

    fn with_control(mut self, kind: ControlKind, position: Vec2, red_ticks: Option<u32>) -> Self {
        self.controls.push(TrafficControl {
            kind,
            position,
            red_ticks,
        });
        self
    }

    /// Harness-level checks. Scene contents (ego and actor geometry) are left
    /// to the decision core so its errors surface unchanged.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("tick_s", self.tick_s),
            ("turn_rate_deg_s", self.turn_rate_deg_s),
            ("lane_half_width_m", self.lane_half_width_m),
            ("sensing_range_m", self.sensing_range_m),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(anyhow!("scenario '{}': {name} must be > 0, got {value}", self.id));
            }
        }
        if !(self.arrival_radius_m.is_finite() && self.arrival_radius_m >= 0.0) {
            return Err(anyhow!(
                "scenario '{}': arrival_radius_m must be >= 0, got {}",
                self.id,
                self.arrival_radius_m
            ));
        }
        if self.max_ticks == 0 {
            return Err(anyhow!("scenario '{}': max_ticks must be > 0", self.id));
        }
        let mut seen = BTreeSet::new();
        for track in &self.actors {
            if !seen.insert(track.id.as_str()) {
                return Err(anyhow!(
                    "scenario '{}': duplicate actor id '{}'",
                    self.id,
                    track.id
                ));
            }
            if let Some(limit) = track.travel_limit_m {
                if !(limit.is_finite() && limit >= 0.0) {
                    return Err(anyhow!(
                        "scenario '{}': travel_limit_m of '{}' must be >= 0, got {limit}",
                        self.id,
                        track.id
                    ));
                }
            }
        }
        Ok(())
    }
}

fn ego_at(speed: f64) -> EgoState {
    EgoState {
        position: Vec2::ZERO,
        orientation: Vec2::new(1.0, 0.0),
        speed,
        length: 4.0,
        width: 2.0,
    }
}

fn vehicle(x: f64, y: f64, heading: Vec2, speed: f64) -> Actor {
    Actor {
        kind: ActorKind::Vehicle,
        position: Vec2::new(x, y),
        orientation: heading,
        speed,
        length: 4.0,
        width: 2.0,
    }
}

fn pedestrian(x: f64, y: f64, heading: Vec2, speed: f64) -> Actor {
    Actor {
        kind: ActorKind::Pedestrian,
        position: Vec2::new(x, y),
        orientation: heading,
        speed,
        length: 0.5,
        width: 0.5,
    }
}

pub fn builtin_scenarios() -> Vec<Scenario> {
    let east = Vec2::new(1.0, 0.0);
    let west = Vec2::new(-1.0, 0.0);
    let north = Vec2::new(0.0, 1.0);
    vec![
        Scenario::base(
            "open-road",
            "Empty straight road to a target 60 m ahead.",
            ego_at(0.0),
            Vec2::new(60.0, 0.0),
        ),
        Scenario::base(
            "oncoming-blocker",
            "Oncoming car 10 m ahead in the ego lane that pulls up after 3 m.",
            ego_at(5.0),
            Vec2::new(60.0, 0.0),
        )
        .with_actor("vehicle-1", vehicle(10.0, 0.0, west, 3.0), Some(3.0)),
        Scenario::base(
            "stalled-vehicle",
            "Broken-down car blocking the lane 40 m ahead.",
            ego_at(0.0),
            Vec2::new(80.0, 0.0),
        )
        .with_actor("stalled", vehicle(40.0, 0.0, east, 0.0), None),
        Scenario::base(
            "pedestrian-crossing",
            "Slow pedestrian crossing the lane 40 m ahead.",
            ego_at(0.0),
            Vec2::new(70.0, 0.0),
        )
        .with_actor("walker", pedestrian(40.0, -3.0, north, 0.8), Some(12.0)),
        Scenario::base(
            "red-light",
            "Red light 30 m ahead that turns green after 30 s.",
            ego_at(0.0),
            Vec2::new(80.0, 0.0),
        )
        .with_control(ControlKind::RedLight, Vec2::new(30.0, 0.0), Some(150)),
        Scenario::base(
            "stop-sign",
            "Stop sign 30 m ahead on an otherwise empty road.",
            ego_at(0.0),
            Vec2::new(80.0, 0.0),
        )
        .with_control(ControlKind::StopSign, Vec2::new(30.0, 0.0), None),
        Scenario::base(
            "left-turn",
            "Sharp left toward a target behind a red light 10 m ahead.",
            ego_at(4.0),
            Vec2::new(14.0, 30.0),
        )
        .with_control(ControlKind::RedLight, Vec2::new(10.0, 0.0), Some(50)),
        Scenario::base(
            "trailing-vehicle",
            "Slower car 15 m ahead travelling the same way.",
            ego_at(0.0),
            Vec2::new(90.0, 0.0),
        )
        .with_actor("lead", vehicle(15.0, 0.0, east, 3.0), None),
    ]
}

pub fn scenario_ids() -> Vec<String> {
    builtin_scenarios().into_iter().map(|s| s.id).collect()
}

pub fn load_scenario_file(path: &Path) -> Result<Scenario> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed reading scenario {}", path.display()))?;
    let scenario: Scenario = serde_json::from_str(&raw)
        .with_context(|| format!("failed parsing scenario {}", path.display()))?;
    scenario.validate()?;
    Ok(scenario)
}

/// Resolves a built-in id or `file:<path>`.
pub fn resolve_scenario(id: &str) -> Result<Scenario> {
    if let Some(path) = id.strip_prefix(SCENARIO_FILE_PREFIX) {
        return load_scenario_file(Path::new(path));
    }
    builtin_scenarios()
        .into_iter()
        .find(|s| s.id == id)
        .ok_or_else(|| {
            let available = scenario_ids().join(", ");
            anyhow!("unknown scenario '{id}'. available: {available}, {SCENARIO_FILE_PREFIX}<path>")
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_valid_and_uniquely_named() -> Result<()> {
        let scenarios = builtin_scenarios();
        let ids: BTreeSet<&str> = scenarios.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids.len(), scenarios.len());
        for scenario in &scenarios {
            scenario.validate()?;
        }
        Ok(())
    }

    #[test]
    fn red_light_turns_green_after_its_red_window() {
        let light = TrafficControl {
            kind: ControlKind::RedLight,
            position: Vec2::ZERO,
            red_ticks: Some(3),
        };
        assert!(light.is_active(2));
        assert!(!light.is_active(3));
        let forever = TrafficControl {
            red_ticks: None,
            ..light
        };
        assert!(forever.is_active(u32::MAX));
    }

    #[test]
    fn scenario_file_fills_harness_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("mini.json");
        fs::write(
            &path,
            r#"{
                "id": "mini",
                "ego": {"position": {"x": 0, "y": 0}, "orientation": {"x": 1, "y": 0},
                        "speed": 0, "length": 4, "width": 2},
                "target": {"x": 20, "y": 0},
                "controls": [{"kind": "stop_sign", "position": {"x": 10, "y": 0}}]
            }"#,
        )?;
        let scenario = resolve_scenario(&format!("{SCENARIO_FILE_PREFIX}{}", path.display()))?;
        assert_eq!(scenario.tick_s, DEFAULT_TICK_S);
        assert_eq!(scenario.max_ticks, DEFAULT_MAX_TICKS);
        assert_eq!(scenario.controls[0].kind, ControlKind::StopSign);
        assert!(scenario.actors.is_empty());
        Ok(())
    }

    #[test]
    fn duplicate_actor_ids_are_rejected() {
        let scenario = builtin_scenarios()
            .into_iter()
            .find(|s| s.id == "stalled-vehicle")
            .expect("builtin")
            .with_actor("stalled", vehicle(60.0, 0.0, Vec2::new(1.0, 0.0), 0.0), None);
        let err = scenario.validate().expect_err("duplicate id");
        assert!(err.to_string().contains("duplicate actor id 'stalled'"), "{err}");
    }

    #[test]
    fn unknown_scenario_lists_builtins() {
        let err = resolve_scenario("highway").expect_err("unknown");
        assert!(err.to_string().contains("open-road"), "{err}");
    }
}
