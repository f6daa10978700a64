use super::cholesky_solver::CholeskyJointSolver;
use super::gauss_seidel_solver::GaussSeidelJointSolver;
use super::joint_settings::JointSettings;
use super::joint_solver_state::JointSolverState;
use super::solver_settings::{JointSolverSettings, JointSolverType};
use crate::physics::body_properties::{BodyInertia, MotionState, RigidPose};

/// Per-joint solver driven by the joint container once per substep:
/// `init` once per step, then `update` followed by `apply_*` for every substep.
///
/// The `apply_*` functions return the number of corrections that were actually applied, which lets
/// the caller stop iterating early and lets tests observe which branches ran.
pub trait IJointSolver {
    /// Stores the frames and the conditioned mass properties, resets the accumulated impulses and
    /// records the connector state at the start of the step.
    fn init(
        &mut self,
        dt: f32,
        solver_settings: &JointSolverSettings,
        joint_settings: &JointSettings,
        previous_poses: [RigidPose; 2],
        inertias: [BodyInertia; 2],
        connector_frames: [RigidPose; 2],
    );

    /// Scales the inverse mass of the body nearer the anchor before the next `update`.
    fn set_freeze_scale(&mut self, frozen_body: Option<usize>, scale: f32);

    /// Loads the current pose and velocity of both bodies.
    fn update(&mut self, dt: f32, bodies: [MotionState; 2]);

    fn apply_constraints(&mut self, dt: f32, solver_settings: &JointSolverSettings, joint_settings: &JointSettings)
        -> u32;

    fn apply_drives(&mut self, dt: f32, solver_settings: &JointSolverSettings, joint_settings: &JointSettings) -> u32;

    fn apply_projections(&mut self, dt: f32, solver_settings: &JointSolverSettings, joint_settings: &JointSettings)
        -> u32;

    fn state(&self) -> &JointSolverState;
}

/// Creates the solver selected by the container configuration.
pub fn create_joint_solver(solver_type: JointSolverType) -> Box<dyn IJointSolver> {
    match solver_type {
        JointSolverType::GaussSeidel => Box::new(GaussSeidelJointSolver::default()),
        JointSolverType::Cholesky => Box::new(CholeskyJointSolver::default()),
    }
}
