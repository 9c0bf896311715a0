use core::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    EgoPosition,
    EgoOrientation,
    EgoSpeed,
    EgoLength,
    EgoWidth,
    TargetPosition,
    DistanceToRedLight,
    DistanceToStopSign,
    ActorPosition,
    ActorOrientation,
    ActorSpeed,
    ActorLength,
    ActorWidth,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EgoPosition => write!(f, "EGO_POSITION"),
            Self::EgoOrientation => write!(f, "EGO_ORIENTATION"),
            Self::EgoSpeed => write!(f, "EGO_SPEED"),
            Self::EgoLength => write!(f, "EGO_LENGTH"),
            Self::EgoWidth => write!(f, "EGO_WIDTH"),
            Self::TargetPosition => write!(f, "TARGET_POSITION"),
            Self::DistanceToRedLight => write!(f, "DISTANCE_TO_RED_LIGHT"),
            Self::DistanceToStopSign => write!(f, "DISTANCE_TO_STOP_SIGN"),
            Self::ActorPosition => write!(f, "ACTOR_POSITION"),
            Self::ActorOrientation => write!(f, "ACTOR_ORIENTATION"),
            Self::ActorSpeed => write!(f, "ACTOR_SPEED"),
            Self::ActorLength => write!(f, "ACTOR_LENGTH"),
            Self::ActorWidth => write!(f, "ACTOR_WIDTH"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DecisionError {
    NonFinite {
        field: Field,
        actor: Option<String>,
    },
    NonPositiveDimension {
        field: Field,
        value: f64,
    },
    NegativeDimension {
        field: Field,
        actor: String,
        value: f64,
    },
    NegativeSpeed {
        value: f64,
    },
    DegenerateOrientation {
        magnitude: f64,
    },
    InvalidConfig {
        parameter: &'static str,
        value: f64,
    },
}

impl DecisionError {
    /// The snapshot field at fault, if the error came from snapshot validation.
    pub fn field(&self) -> Option<Field> {
        match self {
            Self::NonFinite { field, .. }
            | Self::NonPositiveDimension { field, .. }
            | Self::NegativeDimension { field, .. } => Some(*field),
            Self::NegativeSpeed { .. } => Some(Field::EgoSpeed),
            Self::DegenerateOrientation { .. } => Some(Field::EgoOrientation),
            Self::InvalidConfig { .. } => None,
        }
    }
}

impl fmt::Display for DecisionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonFinite { field, actor: None } => {
                write!(f, "{field} must be finite")
            }
            Self::NonFinite {
                field,
                actor: Some(id),
            } => write!(f, "{field} of actor '{id}' must be finite"),
            Self::NonPositiveDimension { field, value } => {
                write!(f, "{field} must be > 0, got {value}")
            }
            Self::NegativeDimension { field, actor, value } => {
                write!(f, "{field} of actor '{actor}' must be >= 0, got {value}")
            }
            Self::NegativeSpeed { value } => {
                write!(f, "{} must be >= 0, got {value}", Field::EgoSpeed)
            }
            Self::DegenerateOrientation { magnitude } => write!(
                f,
                "{} must be a non-zero vector, got magnitude {magnitude}",
                Field::EgoOrientation
            ),
            Self::InvalidConfig { parameter, value } => {
                write!(f, "invalid decision config: {parameter}={value}")
            }
        }
    }
}

impl std::error::Error for DecisionError {}
