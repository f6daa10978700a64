//! Error types for joint container operations.

use thiserror::Error;

use super::handles::{BodyHandle, JointHandle};

/// Errors returned when the joint container is used incorrectly.
///
/// Numerical trouble inside the solvers is never reported here; degenerate cases are skipped
/// silently so the simulation state stays finite.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum JointError {
    /// The handle does not refer to a live joint.
    #[error("joint not found: {0}")]
    JointNotFound(JointHandle),

    /// A constrained body is missing from the body store.
    #[error("body not found: {0}")]
    BodyNotFound(BodyHandle),

    /// Both ends of a joint reference the same body.
    #[error("joint connects {0} to itself")]
    SelfConstraint(BodyHandle),

    /// Settings failed validation.
    #[error("invalid joint settings: {0}")]
    InvalidSettings(String),

    /// The joint set cannot change shape while per-joint solvers are prepared.
    #[error("cannot {0} while constraints are prepared")]
    ConstraintsPrepared(&'static str),

    /// Solving requires per-joint solvers created by `prepare_constraints`.
    #[error("constraints are not prepared")]
    NotPrepared,
}

impl JointError {
    /// Creates an invalid settings error.
    pub fn invalid_settings(reason: impl Into<String>) -> Self {
        Self::InvalidSettings(reason.into())
    }
}
