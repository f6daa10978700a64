//! Two-body joint constraints solved with position based dynamics.
//!
//! Joints limit the relative motion of a parent and a child body through linear and angular
//! motion types, soft limits, drives and projection. The [`JointConstraints`] container solves
//! them against any body store implementing [`IJointBodyStore`], using either the sequential
//! Gauss-Seidel solver or the block Cholesky solver.
//!
//! [`JointConstraints`]: physics::JointConstraints
//! [`IJointBodyStore`]: physics::IJointBodyStore

pub mod physics;
pub mod utilities;
