//! Collision-course screening of the actors around the ego.
//!
//! Each actor is moved into the ego frame and tested against the ego's
//! forward swath. Survivors get a closing distance: the widened
//! distance-to-contact `sqrt(fwd² + lat² + ego_width²)` minus both half
//! lengths and the safety distance. The actor with the smallest closing
//! distance controls the hazard response.

use serde::{Deserialize, Serialize};

use crate::config::DecisionConfig;
use crate::constants::{DEGENERATE_EPSILON, MIN_CLOSING_SPEED_MPS};
use crate::decision::SpeedLevel;
use crate::geometry::EgoFrame;
use crate::scene::{ActorKind, EgoState, SceneSnapshot};

/// An actor expressed relative to the ego for the current tick only.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RelativeActor<'a> {
    pub id: &'a str,
    pub kind: ActorKind,
    pub forward: f64,
    pub lateral: f64,
    /// Ego speed minus the actor's velocity component along the ego heading.
    pub closing_speed: f64,
    pub length: f64,
    pub width: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ControllingHazard {
    pub actor_id: String,
    pub kind: ActorKind,
    pub forward: f64,
    pub lateral: f64,
    pub closing_distance: f64,
    pub closing_speed: f64,
    pub time_to_contact: Option<f64>,
    pub within_margin: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct HazardAssessment {
    pub controlling: Option<ControllingHazard>,
    /// An in-path actor is inside its kind-specific stop distance.
    pub kind_stop: bool,
}

/// Projects every actor with a usable heading into the ego frame. Actors with
/// a zero-magnitude orientation are dropped as non-hazards.
pub fn relative_actors<'a>(scene: &'a SceneSnapshot, frame: &EgoFrame) -> Vec<RelativeActor<'a>> {
    let ego_forward = frame.forward_axis();
    scene
        .actors
        .iter()
        .filter_map(|(id, actor)| {
            let velocity = actor.velocity()?;
            let offset = frame.to_local(actor.position);
            Some(RelativeActor {
                id: id.as_str(),
                kind: actor.kind,
                forward: offset.forward,
                lateral: offset.lateral,
                closing_speed: scene.ego.speed - velocity.dot(ego_forward),
                length: actor.length,
                width: actor.width,
            })
        })
        .collect()
}

/// Closing distance for an actor on the ego's forward path, `None` when the
/// actor cannot be hit by continuing straight ahead.
pub fn closing_distance(actor: &RelativeActor<'_>, ego: &EgoState, cfg: &DecisionConfig) -> Option<f64> {
    // Offsets between far-apart finite coordinates can overflow.
    if !actor.forward.is_finite() || !actor.lateral.is_finite() || actor.forward <= 0.0 {
        return None;
    }

    let lateral_limit = (ego.width + actor.width) / 2.0 + cfg.lateral_safety_pad_m;
    if actor.lateral.abs() > lateral_limit {
        return None;
    }

    let reach = (actor.forward * actor.forward
        + actor.lateral * actor.lateral
        + ego.width * ego.width)
        .sqrt();
    // Footprints longer than the reach are malformed input, not obstacles.
    if actor.length > reach + ego.length / 2.0 {
        return None;
    }

    let closing = reach - (actor.length / 2.0 + ego.length / 2.0 + cfg.safety_distance_margin_m);
    closing.is_finite().then_some(closing)
}

#[inline]
pub fn within_safety_margin(closing: f64, ego: &EgoState, cfg: &DecisionConfig) -> bool {
    closing <= ego.speed * cfg.safety_time_margin_s + ego.width / 2.0 + cfg.safety_distance_margin_m
}

fn stop_distance(kind: ActorKind, cfg: &DecisionConfig) -> f64 {
    match kind {
        ActorKind::Vehicle => 0.0,
        ActorKind::Pedestrian => cfg.pedestrian_stop_distance_m,
    }
}

pub fn assess_hazards(scene: &SceneSnapshot, frame: &EgoFrame, cfg: &DecisionConfig) -> HazardAssessment {
    let ego = &scene.ego;
    let mut best: Option<(RelativeActor<'_>, f64)> = None;
    let mut kind_stop = false;

    for actor in relative_actors(scene, frame) {
        let Some(closing) = closing_distance(&actor, ego, cfg) else {
            continue;
        };
        if closing <= stop_distance(actor.kind, cfg) {
            kind_stop = true;
        }
        // Strict comparison keeps the lowest id on ties.
        if best.map_or(true, |(_, current)| closing < current) {
            best = Some((actor, closing));
        }
    }

    let controlling = best.map(|(actor, closing)| ControllingHazard {
        actor_id: actor.id.to_string(),
        kind: actor.kind,
        forward: actor.forward,
        lateral: actor.lateral,
        closing_distance: closing,
        closing_speed: actor.closing_speed,
        time_to_contact: time_to_contact(closing, actor.closing_speed),
        within_margin: within_safety_margin(closing, ego, cfg),
    });

    HazardAssessment {
        controlling,
        kind_stop,
    }
}

fn time_to_contact(closing: f64, closing_speed: f64) -> Option<f64> {
    if closing_speed < MIN_CLOSING_SPEED_MPS {
        return None;
    }
    Some(closing.max(0.0) / closing_speed)
}

/// Speed level demanded by the hazard picture alone.
pub fn hazard_demand(
    assessment: &HazardAssessment,
    ego_speed: f64,
    turn_angle: f64,
    cfg: &DecisionConfig,
) -> SpeedLevel {
    if assessment.kind_stop {
        return SpeedLevel::Stop;
    }
    let Some(hazard) = &assessment.controlling else {
        return SpeedLevel::Move;
    };
    if !hazard.within_margin {
        return SpeedLevel::Move;
    }

    let closing = hazard.closing_distance;
    if closing <= 0.0 {
        return SpeedLevel::Stop;
    }

    let braking = (ego_speed * ego_speed
        / (2.0 * cfg.safety_distance_margin_m.max(DEGENERATE_EPSILON)))
    .max(cfg.safety_time_margin_s * ego_speed);
    if closing <= braking {
        return SpeedLevel::Slow;
    }

    if turn_angle.abs() > cfg.sharp_turn_deg && closing < cfg.sharp_turn_hazard_range_m {
        return SpeedLevel::Stop;
    }

    SpeedLevel::Slow
}
