//! Kinematic world used to roll a policy forward through a scenario.
//!
//! The ego moves along its heading at the speed the harness chose for the
//! tick; actors move in straight lines. Collisions are tested on oriented
//! boxes with the separating-axis test.

use crate::scenarios::{ControlKind, Scenario};
use anyhow::{anyhow, Result};
use drive_decision_core::geometry::{EgoFrame, LocalOffset, Vec2};
use drive_decision_core::{Actor, EgoState, SceneSnapshot};
use std::collections::BTreeMap;

const FALLBACK_AXIS: Vec2 = Vec2::new(1.0, 0.0);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrientedBox {
    pub center: Vec2,
    axis: Vec2,
    half_length: f64,
    half_width: f64,
}

impl OrientedBox {
    /// A zero heading gets an arbitrary axis; the footprint still counts.
    pub fn new(center: Vec2, heading: Vec2, length: f64, width: f64) -> Self {
        Self {
            center,
            axis: heading.normalized().unwrap_or(FALLBACK_AXIS),
            half_length: length * 0.5,
            half_width: width * 0.5,
        }
    }

    pub fn for_ego(ego: &EgoState) -> Self {
        Self::new(ego.position, ego.orientation, ego.length, ego.width)
    }

    pub fn for_actor(actor: &Actor) -> Self {
        Self::new(actor.position, actor.orientation, actor.length, actor.width)
    }

    fn radius_along(&self, axis: Vec2) -> f64 {
        self.half_length * self.axis.dot(axis).abs() + self.half_width * self.axis.perp().dot(axis).abs()
    }

    /// Largest gap over the four candidate separating axes. Negative means
    /// the boxes overlap.
    pub fn separation(&self, other: &Self) -> f64 {
        let offset = other.center - self.center;
        [self.axis, self.axis.perp(), other.axis, other.axis.perp()]
            .into_iter()
            .map(|axis| offset.dot(axis).abs() - self.radius_along(axis) - other.radius_along(axis))
            .fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn overlaps(&self, other: &Self) -> bool {
        self.separation(other) < 0.0
    }
}

pub fn distance_to_segment(point: Vec2, start: Vec2, end: Vec2) -> f64 {
    let span = end - start;
    let len_sq = span.dot(span);
    if len_sq <= 0.0 {
        return (point - start).length();
    }
    let t = ((point - start).dot(span) / len_sq).clamp(0.0, 1.0);
    (point - (start + span * t)).length()
}

#[derive(Clone, Debug)]
struct ActorState {
    id: String,
    actor: Actor,
    travelled: f64,
    limit: Option<f64>,
}

impl ActorState {
    fn advance(&mut self, dt: f64) {
        let Some(heading) = self.actor.orientation.normalized() else {
            return;
        };
        let mut step = self.actor.speed.abs() * dt;
        if let Some(limit) = self.limit {
            let remaining = (limit - self.travelled).max(0.0);
            if step >= remaining {
                step = remaining;
                self.actor.speed = 0.0;
            }
        }
        if step > 0.0 {
            self.actor.position = self.actor.position + heading * step;
            self.travelled += step;
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StepOutcome {
    pub moved_m: f64,
    pub arrived: bool,
    /// First actor (in id order) whose box overlaps the ego after the move.
    pub collision: Option<String>,
    pub min_separation_m: Option<f64>,
    pub red_light_crossed: bool,
    pub stop_sign_crossed: bool,
}

#[derive(Clone, Debug)]
pub struct World {
    scenario: Scenario,
    ego: EgoState,
    actors: Vec<ActorState>,
    tick: u32,
}

impl World {
    pub fn new(scenario: &Scenario) -> Self {
        let mut actors: Vec<ActorState> = scenario
            .actors
            .iter()
            .map(|track| ActorState {
                id: track.id.clone(),
                actor: track.actor,
                travelled: 0.0,
                limit: track.travel_limit_m,
            })
            .collect();
        actors.sort_by(|a, b| a.id.cmp(&b.id));
        Self {
            scenario: scenario.clone(),
            ego: scenario.ego,
            actors,
            tick: 0,
        }
    }

    pub fn tick(&self) -> u32 {
        self.tick
    }

    pub fn ego(&self) -> &EgoState {
        &self.ego
    }

    pub fn distance_to_target(&self) -> f64 {
        (self.scenario.target - self.ego.position).length()
    }

    /// Builds what the policy sees this tick. `stop_sign_cleared` is the
    /// flag returned by the previous decision.
    pub fn snapshot(&self, stop_sign_cleared: bool) -> SceneSnapshot {
        SceneSnapshot {
            ego: self.ego,
            target_position: self.scenario.target,
            distance_to_red_light: self.sensed_control(ControlKind::RedLight),
            distance_to_stop_sign: self.sensed_control(ControlKind::StopSign),
            actors: self
                .actors
                .iter()
                .map(|state| (state.id.clone(), state.actor))
                .collect::<BTreeMap<_, _>>(),
            stop_sign_cleared,
        }
    }

    /// Forward distance to the nearest active control of `kind` inside the
    /// ego lane, including one the ego front is still straddling.
    pub fn sensed_control(&self, kind: ControlKind) -> Option<f64> {
        let frame = EgoFrame::new(self.ego.position, self.ego.orientation)?;
        self.scenario
            .controls
            .iter()
            .filter(|control| control.kind == kind && control.is_active(self.tick))
            .map(|control| frame.to_local(control.position))
            .filter(|offset| self.in_lane(offset))
            .map(|offset| offset.forward)
            .min_by(f64::total_cmp)
    }

    fn in_lane(&self, offset: &LocalOffset) -> bool {
        offset.lateral.abs() <= self.scenario.lane_half_width_m
            && offset.forward >= -self.ego.length * 0.5
            && offset.forward <= self.scenario.sensing_range_m
    }

    fn control_offsets(&self) -> Vec<Option<LocalOffset>> {
        let frame = EgoFrame::new(self.ego.position, self.ego.orientation);
        self.scenario
            .controls
            .iter()
            .map(|control| frame.map(|f| f.to_local(control.position)))
            .collect()
    }

    /// Advances one tick: the ego turns toward `turn_angle` (rate-limited,
    /// only while rolling) and moves at `speed`, then every actor moves.
    pub fn step(&mut self, turn_angle: f64, speed: f64) -> Result<StepOutcome> {
        let dt = self.scenario.tick_s;
        let before = self.control_offsets();

        let mut heading = self.ego.orientation.normalized().ok_or_else(|| {
            anyhow!("ego heading degenerated at tick {}", self.tick)
        })?;
        if speed > 0.0 {
            let max_turn = self.scenario.turn_rate_deg_s * dt;
            heading = heading.rotated_deg(turn_angle.clamp(-max_turn, max_turn));
        }
        let start = self.ego.position;
        let moved_m = speed * dt;
        self.ego.position = start + heading * moved_m;
        self.ego.orientation = heading;
        self.ego.speed = speed;

        for actor in &mut self.actors {
            actor.advance(dt);
        }

        let mut outcome = StepOutcome {
            moved_m,
            arrived: distance_to_segment(self.scenario.target, start, self.ego.position)
                <= self.scenario.arrival_radius_m,
            ..StepOutcome::default()
        };

        let after = self.control_offsets();
        for ((control, prev), next) in self.scenario.controls.iter().zip(&before).zip(&after) {
            let (Some(prev), Some(next)) = (prev, next) else {
                continue;
            };
            let crossed = prev.forward > 0.0
                && next.forward <= 0.0
                && prev.lateral.abs() <= self.scenario.lane_half_width_m;
            if !crossed || !control.is_active(self.tick) {
                continue;
            }
            match control.kind {
                ControlKind::RedLight => outcome.red_light_crossed = true,
                ControlKind::StopSign => outcome.stop_sign_crossed = true,
            }
        }

        let ego_box = OrientedBox::for_ego(&self.ego);
        for state in &self.actors {
            let separation = ego_box.separation(&OrientedBox::for_actor(&state.actor));
            outcome.min_separation_m = Some(
                outcome
                    .min_separation_m
                    .map_or(separation, |current| current.min(separation)),
            );
            if separation < 0.0 && outcome.collision.is_none() {
                outcome.collision = Some(state.id.clone());
            }
        }

        self.tick += 1;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenarios::builtin_scenarios;

    fn scenario(id: &str) -> Scenario {
        builtin_scenarios()
            .into_iter()
            .find(|s| s.id == id)
            .expect("builtin scenario")
    }

    #[test]
    fn boxes_nose_to_tail_separate_by_the_gap() {
        let a = OrientedBox::new(Vec2::ZERO, Vec2::new(1.0, 0.0), 4.0, 2.0);
        let b = OrientedBox::new(Vec2::new(5.0, 0.0), Vec2::new(1.0, 0.0), 4.0, 2.0);
        assert!((a.separation(&b) - 1.0).abs() < 1e-12);
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn rotated_box_overlap_is_detected() {
        let a = OrientedBox::new(Vec2::ZERO, Vec2::new(1.0, 0.0), 4.0, 2.0);
        let crossing = OrientedBox::new(Vec2::new(2.5, 0.0), Vec2::new(1.0, 1.0), 4.0, 2.0);
        assert!(a.overlaps(&crossing));
        // Bounding circles overlap here; the boxes do not.
        let diagonal = OrientedBox::new(Vec2::new(4.1, 1.5), Vec2::new(1.0, 0.0), 4.0, 2.0);
        assert!(!a.overlaps(&diagonal));
    }

    #[test]
    fn segment_distance_covers_endpoints_and_interior() {
        let start = Vec2::ZERO;
        let end = Vec2::new(2.0, 0.0);
        assert_eq!(distance_to_segment(Vec2::new(1.0, 0.4), start, end), 0.4);
        assert_eq!(distance_to_segment(Vec2::new(-3.0, 0.0), start, end), 3.0);
        assert!((distance_to_segment(Vec2::new(5.0, 4.0), start, start) - 41f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn controls_are_sensed_only_in_lane_and_range() {
        let mut scenario = scenario("stop-sign");
        scenario.controls[0].position = Vec2::new(30.0, 5.0);
        assert_eq!(World::new(&scenario).sensed_control(ControlKind::StopSign), None);
        scenario.controls[0].position = Vec2::new(30.0, 1.0);
        assert_eq!(
            World::new(&scenario).sensed_control(ControlKind::StopSign),
            Some(30.0)
        );
        scenario.controls[0].position = Vec2::new(90.0, 0.0);
        assert_eq!(World::new(&scenario).sensed_control(ControlKind::StopSign), None);
    }

    #[test]
    fn actors_halt_at_their_travel_limit() -> Result<()> {
        let mut world = World::new(&scenario("oncoming-blocker"));
        for _ in 0..20 {
            world.step(0.0, 0.0)?;
        }
        let snapshot = world.snapshot(false);
        let actor = snapshot.actors.get("vehicle-1").expect("actor");
        assert!((actor.position.x - 7.0).abs() < 1e-9);
        assert_eq!(actor.speed, 0.0);
        Ok(())
    }

    #[test]
    fn running_a_red_light_is_reported() -> Result<()> {
        let mut world = World::new(&scenario("red-light"));
        let mut crossed = false;
        for _ in 0..40 {
            crossed |= world.step(0.0, 6.0)?.red_light_crossed;
        }
        assert!(crossed);
        Ok(())
    }

    #[test]
    fn heading_holds_while_stationary() -> Result<()> {
        let mut world = World::new(&scenario("left-turn"));
        world.step(60.0, 0.0)?;
        assert_eq!(world.ego().orientation, Vec2::new(1.0, 0.0));
        world.step(60.0, 1.0)?;
        let turned = world.ego().orientation;
        assert!((turned.y.atan2(turned.x).to_degrees() - 9.0).abs() < 1e-9);
        Ok(())
    }
}
