use super::joint_settings::JointSettings;
use super::joint_shape::JointShape;
use super::joint_solver::IJointSolver;
use super::joint_solver_state::JointSolverState;
use super::solver_settings::JointSolverSettings;
use crate::physics::body_properties::{BodyInertia, MotionState, RigidPose};

/// Sequential joint solver. Every constraint row is solved on its own and its correction is visible
/// to the next row solved in the same pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct GaussSeidelJointSolver {
    state: JointSolverState,
    shape: JointShape,
}

impl GaussSeidelJointSolver {
    pub fn shape(&self) -> &JointShape {
        &self.shape
    }
}

impl IJointSolver for GaussSeidelJointSolver {
    fn init(
        &mut self,
        _dt: f32,
        solver_settings: &JointSolverSettings,
        joint_settings: &JointSettings,
        previous_poses: [RigidPose; 2],
        inertias: [BodyInertia; 2],
        connector_frames: [RigidPose; 2],
    ) {
        self.shape = JointShape::classify(solver_settings, joint_settings);
        self.state
            .init(solver_settings, joint_settings, previous_poses, inertias, connector_frames);
    }

    fn set_freeze_scale(&mut self, frozen_body: Option<usize>, scale: f32) {
        self.state.set_freeze_scale(frozen_body, scale);
    }

    fn update(&mut self, _dt: f32, bodies: [MotionState; 2]) {
        self.state.update(bodies);
    }

    fn apply_constraints(&mut self, dt: f32, solver_settings: &JointSolverSettings, joint_settings: &JointSettings) -> u32 {
        let shape = self.shape;
        self.state
            .apply_rotation_constraints(dt, solver_settings, joint_settings, shape.twist, shape.swing)
            + self
                .state
                .apply_position_constraints(dt, solver_settings, joint_settings, shape.linear)
    }

    fn apply_drives(&mut self, dt: f32, solver_settings: &JointSolverSettings, joint_settings: &JointSettings) -> u32 {
        let shape = self.shape;
        self.state.apply_drives(
            dt,
            solver_settings,
            joint_settings,
            shape.linear_drive,
            shape.angular_drive,
        )
    }

    fn apply_projections(&mut self, _dt: f32, solver_settings: &JointSolverSettings, joint_settings: &JointSettings) -> u32 {
        let shape = self.shape;
        self.state
            .apply_projections(solver_settings, joint_settings, shape.twist, shape.swing)
    }

    fn state(&self) -> &JointSolverState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::body_properties::BodyVelocity;
    use crate::physics::constraints::joint_settings::JointMotionType::Limited;
    use approx::assert_abs_diff_eq;
    use glam::Vec3;

    #[test]
    fn test_hinge_pair_converges() {
        let solver_settings = JointSolverSettings::default();
        let joint_settings = JointSettings::hinge();
        let poses = [
            RigidPose::IDENTITY,
            RigidPose::new(
                Vec3::new(0.2, -0.1, 0.3),
                glam::Quat::from_axis_angle(Vec3::new(0.0, 1.0, 1.0).normalize(), 0.3),
            ),
        ];
        let inertias = [BodyInertia::KINEMATIC, BodyInertia::from_mass(1.0, Vec3::ONE)];
        let mut solver = GaussSeidelJointSolver::default();
        solver.init(1.0 / 60.0, &solver_settings, &joint_settings, poses, inertias, [RigidPose::IDENTITY; 2]);
        solver.update(
            1.0 / 60.0,
            poses.map(|pose| MotionState {
                pose,
                velocity: BodyVelocity::default(),
            }),
        );
        for _ in 0..20 {
            solver.apply_constraints(1.0 / 60.0, &solver_settings, &joint_settings);
        }
        let state = solver.state();
        assert_abs_diff_eq!(state.connector_separation(), Vec3::ZERO, epsilon = 1e-3);
        let angles = crate::physics::constraints::joint_utilities::get_angles(
            state.connector_rotations[0],
            state.connector_rotations[1],
            1e-6,
        );
        assert!(angles[1].abs() < 1e-2 && angles[2].abs() < 1e-2, "{:?}", angles);
    }

    #[test]
    fn test_shape_follows_settings() {
        let solver_settings = JointSolverSettings::default();
        let joint_settings = JointSettings {
            linear_motion_types: [Limited; 3],
            linear_limit: 1.0,
            ..JointSettings::default()
        };
        let mut solver = GaussSeidelJointSolver::default();
        solver.init(
            1.0 / 60.0,
            &solver_settings,
            &joint_settings,
            [RigidPose::IDENTITY; 2],
            [BodyInertia::from_mass(1.0, Vec3::ONE); 2],
            [RigidPose::IDENTITY; 2],
        );
        assert_eq!(
            solver.shape().linear,
            crate::physics::constraints::joint_shape::LinearConstraintShape::Spherical
        );
    }
}
