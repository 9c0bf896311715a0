use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{DecisionError, Field};
use crate::geometry::Vec2;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EgoState {
    pub position: Vec2,
    pub orientation: Vec2,
    pub speed: f64,
    pub length: f64,
    pub width: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    #[default]
    Vehicle,
    Pedestrian,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    #[serde(default)]
    pub kind: ActorKind,
    pub position: Vec2,
    pub orientation: Vec2,
    /// Signed in some feeds; only the magnitude along `orientation` is used.
    pub speed: f64,
    pub length: f64,
    pub width: f64,
}

impl Actor {
    /// World-frame velocity, or `None` when the heading is degenerate.
    pub fn velocity(&self) -> Option<Vec2> {
        self.orientation
            .normalized()
            .map(|heading| heading * self.speed.abs())
    }
}

/// One tick's view of the world, supplied fresh by the harness.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneSnapshot {
    pub ego: EgoState,
    pub target_position: Vec2,
    #[serde(default)]
    pub distance_to_red_light: Option<f64>,
    #[serde(default)]
    pub distance_to_stop_sign: Option<f64>,
    #[serde(default)]
    pub actors: BTreeMap<String, Actor>,
    /// Caller's copy of the previous tick's `Decision::stop_sign_cleared`.
    #[serde(default)]
    pub stop_sign_cleared: bool,
}

impl SceneSnapshot {
    /// Rejects snapshots the geometry code cannot reason about.
    pub fn validate(&self) -> Result<(), DecisionError> {
        let ego = &self.ego;
        check_finite(ego.position.is_finite(), Field::EgoPosition, None)?;
        check_finite(ego.orientation.is_finite(), Field::EgoOrientation, None)?;
        check_finite(ego.speed.is_finite(), Field::EgoSpeed, None)?;
        check_finite(ego.length.is_finite(), Field::EgoLength, None)?;
        check_finite(ego.width.is_finite(), Field::EgoWidth, None)?;

        if ego.speed < 0.0 {
            return Err(DecisionError::NegativeSpeed { value: ego.speed });
        }
        for (field, value) in [(Field::EgoLength, ego.length), (Field::EgoWidth, ego.width)] {
            if value <= 0.0 {
                return Err(DecisionError::NonPositiveDimension { field, value });
            }
        }
        if ego.orientation.normalized().is_none() {
            return Err(DecisionError::DegenerateOrientation {
                magnitude: ego.orientation.length(),
            });
        }

        check_finite(self.target_position.is_finite(), Field::TargetPosition, None)?;
        if let Some(distance) = self.distance_to_red_light {
            check_finite(distance.is_finite(), Field::DistanceToRedLight, None)?;
        }
        if let Some(distance) = self.distance_to_stop_sign {
            check_finite(distance.is_finite(), Field::DistanceToStopSign, None)?;
        }

        for (id, actor) in &self.actors {
            check_finite(actor.position.is_finite(), Field::ActorPosition, Some(id))?;
            check_finite(actor.orientation.is_finite(), Field::ActorOrientation, Some(id))?;
            check_finite(actor.speed.is_finite(), Field::ActorSpeed, Some(id))?;
            check_finite(actor.length.is_finite(), Field::ActorLength, Some(id))?;
            check_finite(actor.width.is_finite(), Field::ActorWidth, Some(id))?;
            for (field, value) in [
                (Field::ActorLength, actor.length),
                (Field::ActorWidth, actor.width),
            ] {
                if value < 0.0 {
                    return Err(DecisionError::NegativeDimension {
                        field,
                        actor: id.clone(),
                        value,
                    });
                }
            }
        }

        Ok(())
    }
}

fn check_finite(finite: bool, field: Field, actor: Option<&String>) -> Result<(), DecisionError> {
    if finite {
        Ok(())
    } else {
        Err(DecisionError::NonFinite {
            field,
            actor: actor.cloned(),
        })
    }
}
