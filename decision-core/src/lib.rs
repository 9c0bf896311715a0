pub mod config;
pub mod constants;
pub mod decision;
pub mod error;
pub mod geometry;
pub mod hazard;
pub mod heading;
pub mod scene;
pub mod traffic;

pub use config::DecisionConfig;
pub use decision::{decide, decide_with, next_speed, Decision, SpeedLevel};
pub use error::{DecisionError, Field};
pub use scene::{Actor, ActorKind, EgoState, SceneSnapshot};
