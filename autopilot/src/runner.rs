use crate::policies::{create_policy, policy_fingerprint, DrivingPolicy};
use crate::scenarios::{resolve_scenario, Scenario};
use crate::sim::World;
use crate::util::write_json_pretty;
use anyhow::{anyhow, Context, Result};
use drive_decision_core::geometry::Vec2;
use drive_decision_core::traffic::ControlSource;
use drive_decision_core::{next_speed, Decision, SceneSnapshot, SpeedLevel};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CollisionRecord {
    pub tick: u32,
    pub actor_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunMetrics {
    pub policy_id: String,
    pub policy_fingerprint: String,
    pub scenario_id: String,
    pub max_ticks: u32,
    pub ticks: u32,
    pub arrived: bool,
    pub arrival_tick: Option<u32>,
    pub collision: Option<CollisionRecord>,
    pub red_light_violations: u32,
    pub stop_sign_violations: u32,
    pub move_ticks: u32,
    pub slow_ticks: u32,
    pub stop_ticks: u32,
    /// Smallest box-to-box gap seen against any actor; `None` without actors.
    pub min_separation_m: Option<f64>,
    pub distance_travelled_m: f64,
    pub initial_distance_to_target_m: f64,
    pub final_distance_to_target_m: f64,
}

impl RunMetrics {
    pub fn violations(&self) -> u32 {
        self.red_light_violations + self.stop_sign_violations
    }

    /// Share of the initial distance to the target that was closed, in [0, 1].
    pub fn progress(&self) -> f64 {
        if self.arrived {
            return 1.0;
        }
        if self.initial_distance_to_target_m <= 0.0 {
            return 0.0;
        }
        ((self.initial_distance_to_target_m - self.final_distance_to_target_m)
            / self.initial_distance_to_target_m)
            .clamp(0.0, 1.0)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TraceFrame {
    pub tick: u32,
    pub position: Vec2,
    pub heading: Vec2,
    pub speed: f64,
    pub speed_level: SpeedLevel,
    pub turn_angle: f64,
    pub stop_sign_cleared: bool,
    pub controlling_actor: Option<String>,
    pub traffic_control: Option<ControlSource>,
    pub distance_to_red_light: Option<f64>,
    pub distance_to_stop_sign: Option<f64>,
}

impl TraceFrame {
    fn new(tick: u32, scene: &SceneSnapshot, decision: &Decision) -> Self {
        Self {
            tick,
            position: scene.ego.position,
            heading: scene.ego.orientation,
            speed: scene.ego.speed,
            speed_level: decision.speed_level,
            turn_angle: decision.turn_angle,
            stop_sign_cleared: decision.stop_sign_cleared,
            controlling_actor: decision.hazard.as_ref().map(|h| h.actor_id.clone()),
            traffic_control: decision.traffic_control,
            distance_to_red_light: scene.distance_to_red_light,
            distance_to_stop_sign: scene.distance_to_stop_sign,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunArtifact {
    pub metrics: RunMetrics,
    pub trace: Vec<TraceFrame>,
}

pub fn run_policy(policy_id: &str, scenario_id: &str, max_ticks: Option<u32>) -> Result<RunArtifact> {
    let policy = create_policy(policy_id)?;
    let scenario = resolve_scenario(scenario_id)?;
    run_policy_instance(policy.as_ref(), &scenario, max_ticks)
}

/// Rolls `policy` through `scenario` until arrival, a collision, or the tick
/// budget runs out. `max_ticks` overrides the scenario's own budget.
pub fn run_policy_instance(
    policy: &dyn DrivingPolicy,
    scenario: &Scenario,
    max_ticks: Option<u32>,
) -> Result<RunArtifact> {
    scenario.validate()?;
    let max_ticks = max_ticks.unwrap_or(scenario.max_ticks);
    if max_ticks == 0 {
        return Err(anyhow!("max_ticks must be > 0"));
    }

    let mut world = World::new(scenario);
    let initial_distance = world.distance_to_target();
    let mut trace = Vec::new();
    let mut stop_sign_cleared = false;
    let mut metrics = RunMetrics {
        policy_id: policy.id().to_string(),
        policy_fingerprint: policy_fingerprint(policy)?,
        scenario_id: scenario.id.clone(),
        max_ticks,
        ticks: 0,
        arrived: false,
        arrival_tick: None,
        collision: None,
        red_light_violations: 0,
        stop_sign_violations: 0,
        move_ticks: 0,
        slow_ticks: 0,
        stop_ticks: 0,
        min_separation_m: None,
        distance_travelled_m: 0.0,
        initial_distance_to_target_m: initial_distance,
        final_distance_to_target_m: initial_distance,
    };

    while world.tick() < max_ticks {
        let tick = world.tick();
        let scene = world.snapshot(stop_sign_cleared);
        let decision = policy.decide(&scene).with_context(|| {
            format!(
                "policy '{}' rejected scene at tick {tick} of scenario '{}'",
                policy.id(),
                scenario.id
            )
        })?;
        match decision.speed_level {
            SpeedLevel::Move => metrics.move_ticks += 1,
            SpeedLevel::Slow => metrics.slow_ticks += 1,
            SpeedLevel::Stop => metrics.stop_ticks += 1,
        }
        let speed = next_speed(decision.speed_level, scene.ego.speed, policy.config());
        let outcome = world.step(decision.turn_angle, speed)?;
        tracing::debug!(
            tick,
            level = %decision.speed_level,
            turn_angle = decision.turn_angle,
            speed,
            "tick"
        );

        if outcome.red_light_crossed {
            metrics.red_light_violations += 1;
            tracing::debug!(tick, "red light crossed");
        }
        if outcome.stop_sign_crossed && !decision.stop_sign_cleared {
            metrics.stop_sign_violations += 1;
            tracing::debug!(tick, "stop sign crossed without stopping");
        }
        if let Some(separation) = outcome.min_separation_m {
            metrics.min_separation_m = Some(
                metrics
                    .min_separation_m
                    .map_or(separation, |current| current.min(separation)),
            );
        }
        metrics.distance_travelled_m += outcome.moved_m;
        stop_sign_cleared = decision.stop_sign_cleared;
        trace.push(TraceFrame::new(tick, &scene, &decision));

        if let Some(actor_id) = outcome.collision {
            metrics.collision = Some(CollisionRecord { tick, actor_id });
            break;
        }
        if outcome.arrived {
            metrics.arrived = true;
            metrics.arrival_tick = Some(tick);
            break;
        }
    }

    metrics.ticks = world.tick();
    metrics.final_distance_to_target_m = world.distance_to_target();
    tracing::info!(
        policy = %metrics.policy_id,
        scenario = %metrics.scenario_id,
        ticks = metrics.ticks,
        arrived = metrics.arrived,
        collision = metrics.collision.as_ref().map(|c| c.actor_id.as_str()).unwrap_or("-"),
        violations = metrics.violations(),
        "run finished"
    );
    Ok(RunArtifact { metrics, trace })
}

/// Reads one scene from JSON and runs it through `policy`.
pub fn decide_scene_file(path: &Path, policy: &dyn DrivingPolicy) -> Result<Decision> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed reading scene {}", path.display()))?;
    let scene: SceneSnapshot = serde_json::from_str(&raw)
        .with_context(|| format!("failed parsing scene {}", path.display()))?;
    policy
        .decide(&scene)
        .with_context(|| format!("scene {} violates the input contract", path.display()))
}

pub fn write_trace(path: &Path, artifact: &RunArtifact) -> Result<()> {
    write_json_pretty(path, artifact)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_budget_override_is_respected() -> Result<()> {
        let artifact = run_policy("canonical", "stalled-vehicle", Some(25))?;
        assert_eq!(artifact.metrics.ticks, 25);
        assert_eq!(artifact.trace.len(), 25);
        assert!(!artifact.metrics.arrived);
        Ok(())
    }

    #[test]
    fn level_counts_cover_every_tick() -> Result<()> {
        let metrics = run_policy("canonical", "trailing-vehicle", None)?.metrics;
        assert_eq!(
            metrics.move_ticks + metrics.slow_ticks + metrics.stop_ticks,
            metrics.ticks
        );
        Ok(())
    }

    #[test]
    fn cruise_runs_into_the_stalled_car() -> Result<()> {
        let metrics = run_policy("cruise", "stalled-vehicle", None)?.metrics;
        assert_eq!(
            metrics.collision.map(|c| c.actor_id),
            Some("stalled".to_string())
        );
        assert!(metrics.min_separation_m.is_some_and(|gap| gap < 0.0));
        Ok(())
    }

    #[test]
    fn zero_tick_budget_is_rejected() {
        assert!(run_policy("canonical", "open-road", Some(0)).is_err());
    }
}
