use glam::Vec3;

use super::joint_settings::{AngularAxis, JointMotionType, JointSettings};
use super::joint_shape::{AngularLimitKind, SwingConstraintShape};
use super::joint_solver_state::{JointLambda, JointSolverState, SoftConstraint};
use super::joint_utilities;
use super::solver_settings::JointSolverSettings;
use crate::utilities::math_helper;

impl JointSolverState {
    pub fn soft_twist_limit(solver_settings: &JointSolverSettings, joint_settings: &JointSettings) -> SoftConstraint {
        SoftConstraint {
            stiffness: joint_utilities::get_soft_twist_stiffness(solver_settings, joint_settings),
            damping: joint_utilities::get_soft_twist_damping(solver_settings, joint_settings),
            acceleration_mode: joint_settings.soft_twist_limit.is_acceleration_mode(),
            target_velocity: 0.0,
            lambda: JointLambda::TwistSoft,
        }
    }

    pub fn soft_swing_limit(solver_settings: &JointSolverSettings, joint_settings: &JointSettings) -> SoftConstraint {
        SoftConstraint {
            stiffness: joint_utilities::get_soft_swing_stiffness(solver_settings, joint_settings),
            damping: joint_utilities::get_soft_swing_damping(solver_settings, joint_settings),
            acceleration_mode: joint_settings.soft_swing_limit.is_acceleration_mode(),
            target_velocity: 0.0,
            lambda: JointLambda::SwingSoft,
        }
    }

    /// Limit of an angular axis: zero when locked.
    #[inline(always)]
    pub fn angular_limit(joint_settings: &JointSettings, axis: AngularAxis) -> f32 {
        match joint_settings.angular_motion(axis) {
            JointMotionType::Limited => joint_settings.angular_limit(axis),
            JointMotionType::Free | JointMotionType::Locked => 0.0,
        }
    }

    /// Resolves the twist and swing constraints. Returns the number of corrections applied.
    pub fn apply_rotation_constraints(
        &mut self,
        dt: f32,
        solver_settings: &JointSolverSettings,
        joint_settings: &JointSettings,
        twist: AngularLimitKind,
        swing: SwingConstraintShape,
    ) -> u32 {
        let mut count = self.apply_twist_constraint(dt, solver_settings, joint_settings, twist);
        count += match swing {
            SwingConstraintShape::None => 0,
            SwingConstraintShape::Cone { soft } => self.apply_cone_constraint(dt, solver_settings, joint_settings, soft),
            SwingConstraintShape::Separate(kinds) => {
                self.apply_swing_constraint(dt, solver_settings, joint_settings, AngularAxis::Swing1, kinds[0])
                    + self.apply_swing_constraint(dt, solver_settings, joint_settings, AngularAxis::Swing2, kinds[1])
            }
        };
        count
    }

    /// Keeps the twist angle within its limit, or at zero when locked.
    pub fn apply_twist_constraint(
        &mut self,
        dt: f32,
        solver_settings: &JointSolverSettings,
        joint_settings: &JointSettings,
        kind: AngularLimitKind,
    ) -> u32 {
        if kind == AngularLimitKind::Free {
            return 0;
        }
        let (axis0, axis1, angle) =
            joint_utilities::get_twist_axis_angle(self.connector_rotations[0], self.connector_rotations[1]);
        let error = math_helper::excess_beyond_limit(angle, Self::angular_limit(joint_settings, AngularAxis::Twist));
        if error == 0.0 {
            return 0;
        }
        let applied = match kind {
            AngularLimitKind::Soft => {
                let soft = Self::soft_twist_limit(solver_settings, joint_settings);
                soft.is_active() && self.solve_rotation_constraint_soft(dt, axis0, axis1, error, &soft)
            }
            _ => {
                let stiffness = joint_utilities::get_twist_stiffness(solver_settings, joint_settings);
                self.solve_rotation_constraint_hard(axis0, axis1, error, stiffness)
            }
        };
        applied as u32
    }

    /// Keeps the swing within a circular or elliptical cone.
    pub fn apply_cone_constraint(
        &mut self,
        dt: f32,
        solver_settings: &JointSolverSettings,
        joint_settings: &JointSettings,
        soft: bool,
    ) -> u32 {
        let (axis_local, angle) = joint_utilities::get_cone_axis_angle_local(
            self.connector_rotations[0],
            self.connector_rotations[1],
            self.swing_twist_angle_tolerance,
        );
        let error = joint_utilities::get_cone_angle_error(joint_settings, axis_local, angle);
        if error == 0.0 {
            return 0;
        }
        let axis = self.connector_rotations[0] * axis_local;
        self.solve_swing_limit(dt, solver_settings, joint_settings, soft, axis, error)
    }

    /// Limits the swing about a single swing axis, independent of the other.
    pub fn apply_swing_constraint(
        &mut self,
        dt: f32,
        solver_settings: &JointSolverSettings,
        joint_settings: &JointSettings,
        swing_axis: AngularAxis,
        kind: AngularLimitKind,
    ) -> u32 {
        if kind == AngularLimitKind::Free {
            return 0;
        }
        let (axis, angle) = joint_utilities::get_swing_axis_angle(
            self.connector_rotations[0],
            self.connector_rotations[1],
            swing_axis,
            self.swing_twist_angle_tolerance,
        );
        let error = math_helper::excess_beyond_limit(angle, Self::angular_limit(joint_settings, swing_axis));
        if error == 0.0 {
            return 0;
        }
        self.solve_swing_limit(dt, solver_settings, joint_settings, kind == AngularLimitKind::Soft, axis, error)
    }

    #[inline(always)]
    fn solve_swing_limit(
        &mut self,
        dt: f32,
        solver_settings: &JointSolverSettings,
        joint_settings: &JointSettings,
        soft: bool,
        axis: Vec3,
        error: f32,
    ) -> u32 {
        let applied = if soft {
            let soft = Self::soft_swing_limit(solver_settings, joint_settings);
            soft.is_active() && self.solve_rotation_constraint_soft(dt, axis, axis, error, &soft)
        } else {
            let stiffness = joint_utilities::get_swing_stiffness(solver_settings, joint_settings);
            self.solve_rotation_constraint_hard(axis, axis, error, stiffness)
        };
        applied as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::body_properties::{BodyInertia, BodyVelocity, MotionState, RigidPose};
    use crate::physics::constraints::joint_settings::JointMotionType::{Free, Limited, Locked};
    use crate::physics::constraints::joint_shape::JointShape;
    use crate::utilities::quaternion_ex;
    use glam::Quat;

    fn solve(settings: &JointSettings, child: Quat, iterations: usize) -> [f32; 3] {
        let solver_settings = JointSolverSettings::default();
        let poses = [RigidPose::IDENTITY, RigidPose::new(Vec3::ZERO, child)];
        let mut state = JointSolverState::default();
        state.init(
            &solver_settings,
            settings,
            poses,
            [BodyInertia::KINEMATIC, BodyInertia::from_mass(1.0, Vec3::ONE)],
            [RigidPose::IDENTITY; 2],
        );
        state.update(poses.map(|pose| MotionState {
            pose,
            velocity: BodyVelocity::default(),
        }));
        let shape = JointShape::classify(&solver_settings, settings);
        for _ in 0..iterations {
            state.apply_rotation_constraints(1.0 / 60.0, &solver_settings, settings, shape.twist, shape.swing);
        }
        joint_utilities::get_angles(state.connector_rotations[0], state.connector_rotations[1], 1e-6)
    }

    #[test]
    fn test_twist_limit() {
        let settings = JointSettings {
            angular_motion_types: [Limited, Free, Free],
            angular_limits: [0.5, 0.0, 0.0],
            ..JointSettings::default()
        };
        let angles = solve(&settings, quaternion_ex::create_from_axis_angle(Vec3::X, 0.9), 4);
        assert!((angles[0] - 0.5).abs() < 1e-3, "twist {}", angles[0]);

        let angles = solve(&settings, quaternion_ex::create_from_axis_angle(Vec3::X, -0.9), 4);
        assert!((angles[0] + 0.5).abs() < 1e-3, "twist {}", angles[0]);

        let angles = solve(&settings, quaternion_ex::create_from_axis_angle(Vec3::X, 0.3), 4);
        assert!((angles[0] - 0.3).abs() < 1e-5);
    }

    #[test]
    fn test_cone_limit() {
        let settings = JointSettings {
            angular_motion_types: [Free, Limited, Limited],
            angular_limits: [0.0, 0.4, 0.4],
            ..JointSettings::default()
        };
        let swing_axis = Vec3::new(0.0, 1.0, 1.0).normalize();
        let child = quaternion_ex::create_from_axis_angle(swing_axis, 1.0);

        let solver_settings = JointSolverSettings::default();
        let poses = [RigidPose::IDENTITY, RigidPose::new(Vec3::ZERO, child)];
        let mut state = JointSolverState::default();
        state.init(
            &solver_settings,
            &settings,
            poses,
            [BodyInertia::KINEMATIC, BodyInertia::from_mass(1.0, Vec3::ONE)],
            [RigidPose::IDENTITY; 2],
        );
        state.update(poses.map(|pose| MotionState {
            pose,
            velocity: BodyVelocity::default(),
        }));
        for _ in 0..4 {
            state.apply_cone_constraint(1.0 / 60.0, &solver_settings, &settings, false);
        }
        let (axis, angle) =
            joint_utilities::get_cone_axis_angle_local(state.connector_rotations[0], state.connector_rotations[1], 1e-6);
        assert!((angle - 0.4).abs() < 1e-3, "swing {}", angle);
        assert!(axis.dot(swing_axis) > 0.999);
    }

    #[test]
    fn test_locked_swing() {
        let settings = JointSettings::hinge();
        let child = quaternion_ex::create_from_axis_angle(Vec3::Z, 0.3)
            * quaternion_ex::create_from_axis_angle(Vec3::X, 0.7);
        let angles = solve(&settings, child, 8);
        assert!(angles[1].abs() < 1e-3, "swing1 {}", angles[1]);
        assert!(angles[2].abs() < 1e-3, "swing2 {}", angles[2]);
        // Twist is free on a hinge.
        assert!((angles[0] - 0.7).abs() < 0.05, "twist {}", angles[0]);
    }

    #[test]
    fn test_locked_twist() {
        let settings = JointSettings {
            angular_motion_types: [Locked, Free, Free],
            ..JointSettings::default()
        };
        let angles = solve(&settings, quaternion_ex::create_from_axis_angle(Vec3::X, 1.2), 4);
        assert!(angles[0].abs() < 1e-3);
    }
}
