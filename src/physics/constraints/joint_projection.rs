use glam::Vec3;

use super::joint_settings::{AngularAxis, JointSettings};
use super::joint_shape::{AngularLimitKind, SwingConstraintShape};
use super::joint_solver_state::JointSolverState;
use super::joint_utilities;
use super::solver_settings::JointSolverSettings;
use crate::utilities::math_helper::{self, SMALL_NUMBER};
use crate::utilities::symmetric3x3::Symmetric3x3;

/// Post-stabilization. Projection removes the residual hard constraint error in a single step,
/// letting the parent take only `1 - projection` of its share of the correction, and then removes the
/// relative velocity that would reintroduce the error.
impl JointSolverState {
    /// Runs the angular then the linear projection. Returns the number of corrections applied.
    pub fn apply_projections(
        &mut self,
        solver_settings: &JointSolverSettings,
        joint_settings: &JointSettings,
        twist: AngularLimitKind,
        swing: SwingConstraintShape,
    ) -> u32 {
        self.apply_angular_projection(solver_settings, joint_settings, twist, swing)
            + self.apply_linear_projection(solver_settings, joint_settings)
    }

    pub fn apply_linear_projection(&mut self, solver_settings: &JointSolverSettings, joint_settings: &JointSettings) -> u32 {
        let projection = joint_utilities::get_linear_projection(solver_settings, joint_settings);
        if projection <= 0.0 {
            return 0;
        }
        let parent_scale = math_helper::max(0.0, 1.0 - projection);

        let error = joint_utilities::get_limited_position_error(
            joint_settings,
            self.connector_rotations[0],
            self.connector_separation(),
        );
        let error_length = error.length();
        if error_length <= self.position_tolerance.max(SMALL_NUMBER) {
            return 0;
        }

        let offset0 = self.connector_offset(0);
        let offset1 = self.connector_offset(1);
        let factor0 = joint_utilities::compute_joint_factor_matrix(
            offset0,
            &self.world_inverse_inertias[0],
            self.inverse_masses[0],
        );
        let factor1 = joint_utilities::compute_joint_factor_matrix(
            offset1,
            &self.world_inverse_inertias[1],
            self.inverse_masses[1],
        );
        let factor = factor0 * parent_scale + factor1;
        let mut factor_inverse = Symmetric3x3::ZERO;
        if !Symmetric3x3::invert(&factor, &mut factor_inverse) {
            return 0;
        }

        let impulse = Symmetric3x3::transform(error, &factor_inverse);
        let dp0 = impulse * (parent_scale * self.inverse_masses[0]);
        let dr0 = Symmetric3x3::transform(offset0.cross(impulse), &self.world_inverse_inertias[0]) * parent_scale;
        let dp1 = impulse * -self.inverse_masses[1];
        let dr1 = Symmetric3x3::transform(offset1.cross(-impulse), &self.world_inverse_inertias[1]);
        self.apply_delta(dp0, dr0, dp1, dr1);

        self.remove_linear_error_velocity(error / error_length, parent_scale);
        1
    }

    /// Removes the relative velocity of the connectors along `normal` if it is increasing the error.
    fn remove_linear_error_velocity(&mut self, normal: Vec3, parent_scale: f32) {
        let offset0 = self.connector_offset(0);
        let offset1 = self.connector_offset(1);
        let velocity0 = self.linear_velocities[0] + self.angular_velocities[0].cross(offset0);
        let velocity1 = self.linear_velocities[1] + self.angular_velocities[1].cross(offset1);
        let relative_velocity = (velocity1 - velocity0).dot(normal);
        if relative_velocity <= 0.0 {
            return;
        }

        let arm0 = offset0.cross(normal);
        let arm1 = offset1.cross(normal);
        let angular0 = Symmetric3x3::transform(arm0, &self.world_inverse_inertias[0]);
        let angular1 = Symmetric3x3::transform(arm1, &self.world_inverse_inertias[1]);
        let inverse_mass = parent_scale * (self.inverse_masses[0] + arm0.dot(angular0))
            + self.inverse_masses[1]
            + arm1.dot(angular1);
        if inverse_mass <= SMALL_NUMBER {
            return;
        }
        let impulse = relative_velocity / inverse_mass;
        self.linear_velocities[0] += normal * (parent_scale * self.inverse_masses[0] * impulse);
        self.angular_velocities[0] += angular0 * (parent_scale * impulse);
        self.linear_velocities[1] -= normal * (self.inverse_masses[1] * impulse);
        self.angular_velocities[1] -= angular1 * impulse;
    }

    /// Projects the hard twist and swing limits. Soft limits are left to their springs.
    pub fn apply_angular_projection(
        &mut self,
        solver_settings: &JointSolverSettings,
        joint_settings: &JointSettings,
        twist: AngularLimitKind,
        swing: SwingConstraintShape,
    ) -> u32 {
        let projection = joint_utilities::get_angular_projection(solver_settings, joint_settings);
        if projection <= 0.0 {
            return 0;
        }
        let parent_scale = math_helper::max(0.0, 1.0 - projection);
        let mut count = 0;

        if twist == AngularLimitKind::Hard {
            let (axis0, axis1, angle) =
                joint_utilities::get_twist_axis_angle(self.connector_rotations[0], self.connector_rotations[1]);
            let error = math_helper::excess_beyond_limit(angle, Self::angular_limit(joint_settings, AngularAxis::Twist));
            count += self.project_rotation(axis0, axis1, error, parent_scale) as u32;
        }

        match swing {
            SwingConstraintShape::Cone { soft: false } => {
                let (axis_local, angle) = joint_utilities::get_cone_axis_angle_local(
                    self.connector_rotations[0],
                    self.connector_rotations[1],
                    self.swing_twist_angle_tolerance,
                );
                let error = joint_utilities::get_cone_angle_error(joint_settings, axis_local, angle);
                let axis = self.connector_rotations[0] * axis_local;
                count += self.project_rotation(axis, axis, error, parent_scale) as u32;
            }
            SwingConstraintShape::Separate(kinds) => {
                for (swing_axis, kind) in [AngularAxis::Swing1, AngularAxis::Swing2].into_iter().zip(kinds) {
                    if kind != AngularLimitKind::Hard {
                        continue;
                    }
                    let (axis, angle) = joint_utilities::get_swing_axis_angle(
                        self.connector_rotations[0],
                        self.connector_rotations[1],
                        swing_axis,
                        self.swing_twist_angle_tolerance,
                    );
                    let error = math_helper::excess_beyond_limit(angle, Self::angular_limit(joint_settings, swing_axis));
                    count += self.project_rotation(axis, axis, error, parent_scale) as u32;
                }
            }
            SwingConstraintShape::Cone { soft: true } | SwingConstraintShape::None => {}
        }
        count
    }

    fn project_rotation(&mut self, axis0: Vec3, axis1: Vec3, error: f32, parent_scale: f32) -> bool {
        if error.abs() <= self.angle_tolerance.max(SMALL_NUMBER) {
            return false;
        }
        let angular0 = Symmetric3x3::transform(axis0, &self.world_inverse_inertias[0]);
        let angular1 = Symmetric3x3::transform(axis1, &self.world_inverse_inertias[1]);
        let inverse_inertia0 = axis0.dot(angular0);
        let inverse_inertia1 = axis1.dot(angular1);
        let inverse_inertia = parent_scale * inverse_inertia0 + inverse_inertia1;
        if inverse_inertia <= SMALL_NUMBER {
            return false;
        }
        let delta = error / inverse_inertia;
        self.apply_rotation_delta(0, angular0 * (parent_scale * delta));
        self.apply_rotation_delta(1, angular1 * -delta);

        let relative_velocity = axis1.dot(self.angular_velocities[1]) - axis0.dot(self.angular_velocities[0]);
        if relative_velocity * error > 0.0 {
            let impulse = relative_velocity / inverse_inertia;
            self.angular_velocities[0] += angular0 * (parent_scale * impulse);
            self.angular_velocities[1] -= angular1 * impulse;
        }
        true
    }
}
