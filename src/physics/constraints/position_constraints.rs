use glam::Vec3;

use super::joint_settings::{JointMotionType, JointSettings};
use super::joint_shape::LinearConstraintShape;
use super::joint_solver_state::{JointLambda, JointSolverState, SoftConstraint};
use super::joint_utilities;
use super::solver_settings::JointSolverSettings;
use crate::utilities::math_helper::{self, SMALL_NUMBER};

/// Translational constraint routines of the sequential solver.
impl JointSolverState {
    /// Spring used by soft linear limits.
    pub fn soft_linear_limit(solver_settings: &JointSolverSettings, joint_settings: &JointSettings) -> SoftConstraint {
        SoftConstraint {
            stiffness: joint_utilities::get_soft_linear_stiffness(solver_settings, joint_settings),
            damping: joint_utilities::get_soft_linear_damping(solver_settings, joint_settings),
            acceleration_mode: joint_settings.soft_linear_limit.is_acceleration_mode(),
            target_velocity: 0.0,
            lambda: JointLambda::LinearSoft,
        }
    }

    /// Resolves the linear constraints of the given shape. Returns the number of corrections applied.
    pub fn apply_position_constraints(
        &mut self,
        dt: f32,
        solver_settings: &JointSolverSettings,
        joint_settings: &JointSettings,
        shape: LinearConstraintShape,
    ) -> u32 {
        match shape {
            LinearConstraintShape::Free => 0,
            LinearConstraintShape::Point => self.apply_point_position_constraint(solver_settings, joint_settings),
            LinearConstraintShape::Spherical => {
                self.apply_spherical_position_constraint(dt, solver_settings, joint_settings)
            }
            LinearConstraintShape::Cylindrical {
                axis,
                axial_motion,
                radial_motion,
            } => self.apply_cylindrical_position_constraint(
                dt,
                solver_settings,
                joint_settings,
                axis,
                axial_motion,
                radial_motion,
            ),
            LinearConstraintShape::Planar(motion_types) => {
                let mut count = 0;
                for (axis, motion) in motion_types.iter().enumerate() {
                    count += self.apply_planar_position_constraint(dt, solver_settings, joint_settings, axis, *motion);
                }
                count
            }
        }
    }

    /// Pulls the connectors onto each other.
    pub fn apply_point_position_constraint(
        &mut self,
        solver_settings: &JointSolverSettings,
        joint_settings: &JointSettings,
    ) -> u32 {
        let separation = self.connector_separation();
        let distance = separation.length();
        if distance <= SMALL_NUMBER {
            return 0;
        }
        let stiffness = joint_utilities::get_linear_stiffness(solver_settings, joint_settings);
        self.solve_position_constraint_hard(separation / distance, distance, stiffness) as u32
    }

    /// Keeps the child connector inside a sphere of radius `linear_limit` around the parent connector.
    pub fn apply_spherical_position_constraint(
        &mut self,
        dt: f32,
        solver_settings: &JointSolverSettings,
        joint_settings: &JointSettings,
    ) -> u32 {
        let separation = self.connector_separation();
        let distance = separation.length();
        if distance <= SMALL_NUMBER {
            return 0;
        }
        let error = distance - joint_settings.linear_limit;
        if error <= 0.0 {
            return 0;
        }
        self.solve_limited_position(dt, solver_settings, joint_settings, separation / distance, error)
    }

    /// Constrains the motion along `axis` according to `axial_motion` and the distance from that axis
    /// according to `radial_motion`.
    pub fn apply_cylindrical_position_constraint(
        &mut self,
        dt: f32,
        solver_settings: &JointSolverSettings,
        joint_settings: &JointSettings,
        axis: usize,
        axial_motion: JointMotionType,
        radial_motion: JointMotionType,
    ) -> u32 {
        let mut count = self.apply_planar_position_constraint(dt, solver_settings, joint_settings, axis, axial_motion);

        let world_axis = self.connector_rotations[0] * Vec3::AXES[axis];
        let separation = self.connector_separation();
        let radial = separation - world_axis * separation.dot(world_axis);
        let radial_distance = radial.length();
        if radial_distance <= SMALL_NUMBER {
            return count;
        }
        let radial_axis = radial / radial_distance;
        count += match radial_motion {
            JointMotionType::Free => 0,
            JointMotionType::Locked => {
                let stiffness = joint_utilities::get_linear_stiffness(solver_settings, joint_settings);
                self.solve_position_constraint_hard(radial_axis, radial_distance, stiffness) as u32
            }
            JointMotionType::Limited => {
                let error = radial_distance - joint_settings.linear_limit;
                if error > 0.0 {
                    self.solve_limited_position(dt, solver_settings, joint_settings, radial_axis, error)
                } else {
                    0
                }
            }
        };
        count
    }

    /// Constrains the separation along one connector axis of the parent.
    pub fn apply_planar_position_constraint(
        &mut self,
        dt: f32,
        solver_settings: &JointSolverSettings,
        joint_settings: &JointSettings,
        axis: usize,
        motion: JointMotionType,
    ) -> u32 {
        if motion == JointMotionType::Free {
            return 0;
        }
        let world_axis = self.connector_rotations[0] * Vec3::AXES[axis];
        let distance = self.connector_separation().dot(world_axis);
        match motion {
            JointMotionType::Free => 0,
            JointMotionType::Locked => {
                let stiffness = joint_utilities::get_linear_stiffness(solver_settings, joint_settings);
                self.solve_position_constraint_hard(world_axis, distance, stiffness) as u32
            }
            JointMotionType::Limited => {
                let error = math_helper::excess_beyond_limit(distance, joint_settings.linear_limit);
                if error != 0.0 {
                    self.solve_limited_position(dt, solver_settings, joint_settings, world_axis, error)
                } else {
                    0
                }
            }
        }
    }

    #[inline(always)]
    fn solve_limited_position(
        &mut self,
        dt: f32,
        solver_settings: &JointSolverSettings,
        joint_settings: &JointSettings,
        axis: Vec3,
        error: f32,
    ) -> u32 {
        let applied = if joint_settings.soft_linear_limit.enabled {
            let soft = Self::soft_linear_limit(solver_settings, joint_settings);
            soft.is_active() && self.solve_position_constraint_soft(dt, axis, error, &soft)
        } else {
            let stiffness = joint_utilities::get_linear_stiffness(solver_settings, joint_settings);
            self.solve_position_constraint_hard(axis, error, stiffness)
        };
        applied as u32
    }
}
