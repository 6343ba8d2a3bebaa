use thiserror::Error;

/// Top-level error type for the quadnav planning and flight stack.
#[derive(Debug, Error)]
pub enum QuadnavError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Planning(#[from] PlanningError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors related to geometric inputs.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("invalid bounds: min {min:?} exceeds max {max:?} on some axis")]
    InvalidBounds { min: [f64; 3], max: [f64; 3] },

    #[error("non-finite coordinate in {0}")]
    NonFinite(&'static str),
}

/// Errors surfaced by the path planner.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlanningError {
    /// The open set was exhausted before the goal node was reached.
    #[error("no path from node {start} to node {goal}")]
    NoPath { start: usize, goal: usize },

    #[error("roadmap has no nodes")]
    EmptyRoadmap,

    #[error("edge ({from}, {to}) is invalid for a roadmap of {nodes} nodes")]
    InvalidEdge { from: usize, to: usize, nodes: usize },
}

/// Errors related to configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("limit {name} = {value} must be {requirement}")]
    InvalidLimit {
        name: &'static str,
        value: f64,
        requirement: &'static str,
    },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

impl ConfigError {
    /// Rejects values that are not strictly positive and finite.
    pub(crate) fn check_positive(name: &'static str, value: f64) -> std::result::Result<(), Self> {
        if value.is_finite() && value > 0.0 {
            Ok(())
        } else {
            Err(Self::InvalidLimit {
                name,
                value,
                requirement: "positive and finite",
            })
        }
    }

    /// Rejects values that are negative or not finite.
    pub(crate) fn check_non_negative(name: &'static str, value: f64) -> std::result::Result<(), Self> {
        if value.is_finite() && value >= 0.0 {
            Ok(())
        } else {
            Err(Self::InvalidLimit {
                name,
                value,
                requirement: "non-negative and finite",
            })
        }
    }
}

/// Convenience type alias for results using [`QuadnavError`].
pub type Result<T> = std::result::Result<T, QuadnavError>;
