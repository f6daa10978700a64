use glam::{Quat, Vec3};

use super::joint_settings::{AngularAxis, JointForceMode, JointSettings};
use super::joint_shape::{AngularDriveShape, LinearDriveShape, SwingDriveShape};
use super::joint_solver_state::{JointLambda, JointSolverState, SoftConstraint};
use super::joint_utilities;
use super::solver_settings::JointSolverSettings;
use crate::utilities::math_helper::{self, SMALL_NUMBER};
use crate::utilities::quaternion_ex;

/// Motor routines: soft constraints that pull the connectors toward a target position, rotation
/// or velocity.
impl JointSolverState {
    fn linear_drive(
        solver_settings: &JointSolverSettings,
        joint_settings: &JointSettings,
        position_enabled: bool,
        velocity_enabled: bool,
        target_velocity: f32,
    ) -> SoftConstraint {
        let drive = &joint_settings.linear_drive;
        SoftConstraint {
            stiffness: if position_enabled {
                joint_utilities::get_linear_drive_stiffness(solver_settings, joint_settings)
            } else {
                0.0
            },
            damping: if velocity_enabled {
                joint_utilities::get_linear_drive_damping(solver_settings, joint_settings)
            } else {
                0.0
            },
            acceleration_mode: drive.force_mode == JointForceMode::Acceleration,
            target_velocity,
            lambda: JointLambda::LinearDrive,
        }
    }

    fn angular_drive(
        solver_settings: &JointSolverSettings,
        joint_settings: &JointSettings,
        position_enabled: bool,
        velocity_enabled: bool,
        target_velocity: f32,
        lambda: JointLambda,
    ) -> SoftConstraint {
        let drive = &joint_settings.angular_drive;
        SoftConstraint {
            stiffness: if position_enabled {
                joint_utilities::get_angular_drive_stiffness(solver_settings, joint_settings)
            } else {
                0.0
            },
            damping: if velocity_enabled {
                joint_utilities::get_angular_drive_damping(solver_settings, joint_settings)
            } else {
                0.0
            },
            acceleration_mode: drive.force_mode == JointForceMode::Acceleration,
            target_velocity,
            lambda,
        }
    }

    /// Target rotation of the child connector in world space, on the same arc as the current one.
    #[inline(always)]
    fn angular_drive_target(&self, joint_settings: &JointSettings) -> Quat {
        let target = self.connector_rotations[0] * joint_settings.angular_drive.position_target;
        quaternion_ex::enforce_shortest_arc_with(target, self.connector_rotations[1])
    }

    /// Runs the linear and angular drives. Returns the number of corrections applied.
    pub fn apply_drives(
        &mut self,
        dt: f32,
        solver_settings: &JointSolverSettings,
        joint_settings: &JointSettings,
        linear: LinearDriveShape,
        angular: AngularDriveShape,
    ) -> u32 {
        if !solver_settings.enable_drives {
            return 0;
        }
        self.apply_angular_drive(dt, solver_settings, joint_settings, angular)
            + self.apply_linear_drive(dt, solver_settings, joint_settings, linear)
    }

    pub fn apply_linear_drive(
        &mut self,
        dt: f32,
        solver_settings: &JointSolverSettings,
        joint_settings: &JointSettings,
        shape: LinearDriveShape,
    ) -> u32 {
        let drive = &joint_settings.linear_drive;
        let r0 = self.connector_rotations[0];
        let local_delta =
            quaternion_ex::conjugate(r0) * self.connector_separation() - drive.position_target;

        match shape {
            LinearDriveShape::None => 0,
            LinearDriveShape::Spherical | LinearDriveShape::Circular { .. } => {
                let mut mask = Vec3::ONE;
                if let LinearDriveShape::Circular { axis } = shape {
                    mask[axis] = 0.0;
                }
                let delta = r0 * (local_delta * mask);
                let target_velocity = r0 * (drive.velocity_target * mask);
                let distance = delta.length();
                let axis = if distance > SMALL_NUMBER {
                    delta / distance
                } else {
                    let speed = target_velocity.length();
                    if speed <= SMALL_NUMBER {
                        return 0;
                    }
                    target_velocity / speed
                };
                let enabled = |flags: &[bool; 3]| (0..3).any(|i| mask[i] > 0.0 && flags[i]);
                let soft = Self::linear_drive(
                    solver_settings,
                    joint_settings,
                    enabled(&drive.position_enabled),
                    enabled(&drive.velocity_enabled),
                    target_velocity.dot(axis),
                );
                (soft.is_active() && self.solve_position_constraint_soft(dt, axis, distance, &soft)) as u32
            }
            LinearDriveShape::Axial(enabled) => {
                let mut count = 0;
                for axis in 0..3 {
                    if !enabled[axis] {
                        continue;
                    }
                    let soft = Self::linear_drive(
                        solver_settings,
                        joint_settings,
                        drive.position_enabled[axis],
                        drive.velocity_enabled[axis],
                        drive.velocity_target[axis],
                    );
                    let world_axis = r0 * Vec3::AXES[axis];
                    if soft.is_active() && self.solve_position_constraint_soft(dt, world_axis, local_delta[axis], &soft) {
                        count += 1;
                    }
                }
                count
            }
        }
    }

    pub fn apply_angular_drive(
        &mut self,
        dt: f32,
        solver_settings: &JointSolverSettings,
        joint_settings: &JointSettings,
        shape: AngularDriveShape,
    ) -> u32 {
        match shape {
            AngularDriveShape::None => 0,
            AngularDriveShape::Slerp => self.apply_slerp_drive(dt, solver_settings, joint_settings),
            AngularDriveShape::TwistSwing { twist, swing } => {
                let mut count = 0;
                if twist {
                    count += self.apply_twist_drive(dt, solver_settings, joint_settings);
                }
                count += match swing {
                    SwingDriveShape::None => 0,
                    SwingDriveShape::Cone => self.apply_cone_drive(dt, solver_settings, joint_settings),
                    SwingDriveShape::Single(axis) => self.apply_swing_drive(dt, solver_settings, joint_settings, axis),
                };
                count
            }
        }
    }

    /// Drives the whole relative rotation toward the target about the shortest axis.
    pub fn apply_slerp_drive(
        &mut self,
        dt: f32,
        solver_settings: &JointSolverSettings,
        joint_settings: &JointSettings,
    ) -> u32 {
        let drive = &joint_settings.angular_drive;
        let target = self.angular_drive_target(joint_settings);
        let error_rotation = self.connector_rotations[1] * quaternion_ex::conjugate(target);
        let target_velocity = self.connector_rotations[0] * drive.velocity_target;
        let (axis, angle) = quaternion_ex::to_axis_and_signed_angle_safe(
            error_rotation,
            Vec3::X,
            self.swing_twist_angle_tolerance,
        );
        let axis = if angle.abs() > self.swing_twist_angle_tolerance {
            axis
        } else {
            let speed = target_velocity.length();
            if speed <= SMALL_NUMBER {
                return 0;
            }
            target_velocity / speed
        };
        let soft = Self::angular_drive(
            solver_settings,
            joint_settings,
            drive.slerp_position_enabled,
            drive.slerp_velocity_enabled,
            target_velocity.dot(axis),
            JointLambda::SwingDrive,
        );
        (soft.is_active() && self.solve_rotation_constraint_soft(dt, axis, axis, angle, &soft)) as u32
    }

    /// Drives the twist angle toward the twist of the target rotation.
    pub fn apply_twist_drive(
        &mut self,
        dt: f32,
        solver_settings: &JointSolverSettings,
        joint_settings: &JointSettings,
    ) -> u32 {
        let drive = &joint_settings.angular_drive;
        let (axis0, axis1, angle) =
            joint_utilities::get_twist_axis_angle(self.connector_rotations[0], self.connector_rotations[1]);
        let (_, target_twist) = joint_utilities::decompose_swing_twist(Quat::IDENTITY, drive.position_target);
        let error = math_helper::get_signed_angle_difference(joint_utilities::twist_angle(target_twist), angle);
        let soft = Self::angular_drive(
            solver_settings,
            joint_settings,
            drive.twist_position_enabled,
            drive.twist_velocity_enabled,
            AngularAxis::Twist.component(drive.velocity_target),
            JointLambda::TwistDrive,
        );
        (soft.is_active() && self.solve_rotation_constraint_soft(dt, axis0, axis1, error, &soft)) as u32
    }

    /// Drives both swing angles together toward the swing of the target rotation.
    pub fn apply_cone_drive(
        &mut self,
        dt: f32,
        solver_settings: &JointSolverSettings,
        joint_settings: &JointSettings,
    ) -> u32 {
        let drive = &joint_settings.angular_drive;
        let target = self.angular_drive_target(joint_settings);
        let (axis_local, angle) =
            joint_utilities::get_cone_axis_angle_local(target, self.connector_rotations[1], self.swing_twist_angle_tolerance);
        let swing_velocity = Vec3::new(0.0, drive.velocity_target.y, drive.velocity_target.z);
        let target_velocity = self.connector_rotations[0] * swing_velocity;
        let axis = if angle.abs() > self.swing_twist_angle_tolerance {
            target * axis_local
        } else {
            let speed = target_velocity.length();
            if speed <= SMALL_NUMBER {
                return 0;
            }
            target_velocity / speed
        };
        let soft = Self::angular_drive(
            solver_settings,
            joint_settings,
            drive.swing_position_enabled,
            drive.swing_velocity_enabled,
            target_velocity.dot(axis),
            JointLambda::SwingDrive,
        );
        (soft.is_active() && self.solve_rotation_constraint_soft(dt, axis, axis, angle, &soft)) as u32
    }

    /// Drives a single swing angle toward the same swing angle of the target rotation.
    pub fn apply_swing_drive(
        &mut self,
        dt: f32,
        solver_settings: &JointSolverSettings,
        joint_settings: &JointSettings,
        swing_axis: AngularAxis,
    ) -> u32 {
        let drive = &joint_settings.angular_drive;
        let (axis, angle) = joint_utilities::get_swing_axis_angle(
            self.connector_rotations[0],
            self.connector_rotations[1],
            swing_axis,
            self.swing_twist_angle_tolerance,
        );
        let (_, target_angle) = joint_utilities::get_swing_axis_angle(
            Quat::IDENTITY,
            drive.position_target,
            swing_axis,
            self.swing_twist_angle_tolerance,
        );
        let error = math_helper::get_signed_angle_difference(target_angle, angle);
        let soft = Self::angular_drive(
            solver_settings,
            joint_settings,
            drive.swing_position_enabled,
            drive.swing_velocity_enabled,
            swing_axis.component(drive.velocity_target),
            JointLambda::SwingDrive,
        );
        (soft.is_active() && self.solve_rotation_constraint_soft(dt, axis, axis, error, &soft)) as u32
    }
}
