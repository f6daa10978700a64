use glam::{Quat, Vec3};

use super::joint_settings::JointSettings;
use super::joint_shape::LinearConstraintShape;
use super::joint_utilities::{self, InverseMassProperties};
use super::solver_settings::JointSolverSettings;
use crate::physics::body_properties::{BodyInertia, BodyVelocity, MotionState, RigidPose};
use crate::utilities::math_helper::{KINDA_SMALL_NUMBER, SMALL_NUMBER};
use crate::utilities::quaternion_ex;
use crate::utilities::symmetric3x3::Symmetric3x3;

/// Constraint groups that carry an accumulated compliant impulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JointLambda {
    LinearSoft = 0,
    LinearDrive = 1,
    TwistSoft = 2,
    TwistDrive = 3,
    SwingSoft = 4,
    SwingDrive = 5,
}

/// Accumulated compliant impulses, one per constraint group. Reset once per step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct JointLambdas {
    values: [f32; 6],
}

impl JointLambdas {
    #[inline(always)]
    pub fn get(&self, lambda: JointLambda) -> f32 {
        self.values[lambda as usize]
    }

    #[inline(always)]
    pub fn get_mut(&mut self, lambda: JointLambda) -> &mut f32 {
        &mut self.values[lambda as usize]
    }

    #[inline(always)]
    pub fn reset(&mut self) {
        self.values = [0.0; 6];
    }
}

/// Parameters of a compliant constraint solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoftConstraint {
    pub stiffness: f32,
    pub damping: f32,
    /// Scales stiffness and damping by the effective mass of the constraint.
    pub acceleration_mode: bool,
    /// Desired rate of change of the constrained separation or angle.
    pub target_velocity: f32,
    pub lambda: JointLambda,
}

impl SoftConstraint {
    #[inline(always)]
    pub fn is_active(&self) -> bool {
        self.stiffness > SMALL_NUMBER || self.damping > SMALL_NUMBER
    }
}

/// Per-joint working state of the joint solvers.
///
/// Index 0 is the parent body, index 1 the child. Connector values are the joint frames expressed in
/// world space. The state is reset by [`init`](Self::init) once per step and refreshed from the body
/// store by [`update`](Self::update) before each round of solving.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct JointSolverState {
    /// Joint frames relative to each body's center of mass.
    pub connector_frames: [RigidPose; 2],
    /// Inverse masses after parent scaling and conditioning.
    pub conditioned_inverse_masses: [f32; 2],
    /// Local diagonal inverse inertias after parent scaling and conditioning.
    pub conditioned_local_inverse_inertias: [Vec3; 2],
    /// Inverse masses used by the solve: the conditioned values with the freeze scale applied.
    pub inverse_masses: [f32; 2],
    pub local_inverse_inertias: [Vec3; 2],

    /// Connector positions at the start of the step. Used to estimate velocities for damping.
    pub initial_connector_positions: [Vec3; 2],
    /// Connector rotations at the start of the step. Used to estimate velocities for damping.
    pub initial_connector_rotations: [Quat; 2],

    pub positions: [Vec3; 2],
    pub orientations: [Quat; 2],
    pub linear_velocities: [Vec3; 2],
    pub angular_velocities: [Vec3; 2],

    pub connector_positions: [Vec3; 2],
    pub connector_rotations: [Quat; 2],
    pub world_inverse_inertias: [Symmetric3x3; 2],

    pub lambdas: JointLambdas,

    /// Fraction of the drift caused by rotation corrections that is moved back onto the connectors.
    /// Zero unless the connectors are locked together.
    pub angular_position_correction: f32,
    pub position_tolerance: f32,
    pub angle_tolerance: f32,
    pub swing_twist_angle_tolerance: f32,
}

impl JointSolverState {
    /// Prepares the state for a new step from the poses at the start of the step.
    pub fn init(
        &mut self,
        solver_settings: &JointSolverSettings,
        joint_settings: &JointSettings,
        previous_poses: [RigidPose; 2],
        inertias: [BodyInertia; 2],
        connector_frames: [RigidPose; 2],
    ) {
        self.connector_frames = connector_frames;

        let mut parent = InverseMassProperties {
            inverse_mass: inertias[0].inverse_mass * joint_settings.parent_inverse_mass_scale,
            inverse_inertia: inertias[0].inverse_inertia * joint_settings.parent_inverse_mass_scale,
        };
        let mut child = InverseMassProperties {
            inverse_mass: inertias[1].inverse_mass,
            inverse_inertia: inertias[1].inverse_inertia,
        };
        joint_utilities::condition_inverse_mass_and_inertia(
            &mut parent,
            &mut child,
            solver_settings.min_parent_mass_ratio,
            solver_settings.max_inertia_ratio,
        );
        self.conditioned_inverse_masses = [parent.inverse_mass, child.inverse_mass];
        self.conditioned_local_inverse_inertias = [parent.inverse_inertia, child.inverse_inertia];
        self.set_freeze_scale(None, 1.0);

        for body in 0..2 {
            let pose = previous_poses[body];
            self.initial_connector_positions[body] = RigidPose::transform(connector_frames[body].position, &pose);
            self.initial_connector_rotations[body] = pose.orientation * connector_frames[body].orientation;
        }
        self.initial_connector_rotations[1] =
            quaternion_ex::enforce_shortest_arc_with(self.initial_connector_rotations[1], self.initial_connector_rotations[0]);

        self.lambdas.reset();

        let point_locked =
            LinearConstraintShape::classify(joint_settings.linear_motion_types) == LinearConstraintShape::Point;
        self.angular_position_correction = if point_locked {
            solver_settings.angular_constraint_position_correction
        } else {
            0.0
        };
        self.position_tolerance = solver_settings.position_tolerance;
        self.angle_tolerance = solver_settings.angle_tolerance;
        self.swing_twist_angle_tolerance = solver_settings.swing_twist_angle_tolerance;
    }

    /// Scales the inverse mass and inertia of `frozen_body` for the following solves. The other body
    /// keeps its conditioned values; `None` restores both. Takes effect with the next
    /// [`update`](Self::update).
    pub fn set_freeze_scale(&mut self, frozen_body: Option<usize>, scale: f32) {
        self.inverse_masses = self.conditioned_inverse_masses;
        self.local_inverse_inertias = self.conditioned_local_inverse_inertias;
        if let Some(body) = frozen_body {
            self.inverse_masses[body] *= scale;
            self.local_inverse_inertias[body] *= scale;
        }
    }

    /// Loads the current body state and recomputes the world-space connectors.
    pub fn update(&mut self, bodies: [MotionState; 2]) {
        for (body, state) in bodies.iter().enumerate() {
            self.positions[body] = state.pose.position;
            self.orientations[body] = quaternion_ex::normalize(state.pose.orientation);
            self.linear_velocities[body] = state.velocity.linear;
            self.angular_velocities[body] = state.velocity.angular;
        }
        self.orientations[1] = quaternion_ex::enforce_shortest_arc_with(self.orientations[1], self.orientations[0]);
        self.update_derived_state();
    }

    pub fn update_derived_state(&mut self) {
        self.update_derived_state_for(0);
        self.update_derived_state_for(1);
    }

    #[inline(always)]
    fn update_derived_state_for(&mut self, body: usize) {
        let frame = self.connector_frames[body];
        self.connector_positions[body] = self.positions[body] + self.orientations[body] * frame.position;
        self.connector_rotations[body] = self.orientations[body] * frame.orientation;
        self.world_inverse_inertias[body] =
            BodyInertia::compute_world_inverse_inertia(self.orientations[body], self.local_inverse_inertias[body]);
    }

    #[inline(always)]
    pub fn is_dynamic(&self, body: usize) -> bool {
        self.inverse_masses[body] > 0.0
    }

    /// Current pose of a body.
    #[inline(always)]
    pub fn pose(&self, body: usize) -> RigidPose {
        RigidPose::new(self.positions[body], self.orientations[body])
    }

    /// Current velocity of a body.
    #[inline(always)]
    pub fn velocity(&self, body: usize) -> BodyVelocity {
        BodyVelocity::new(self.linear_velocities[body], self.angular_velocities[body])
    }

    /// Offset from a body's center of mass to its connector.
    #[inline(always)]
    pub fn connector_offset(&self, body: usize) -> Vec3 {
        self.connector_positions[body] - self.positions[body]
    }

    /// Separation of the child connector from the parent connector.
    #[inline(always)]
    pub fn connector_separation(&self) -> Vec3 {
        self.connector_positions[1] - self.connector_positions[0]
    }

    #[inline(always)]
    pub fn apply_position_delta(&mut self, body: usize, delta: Vec3) {
        self.positions[body] += delta;
        self.connector_positions[body] += delta;
    }

    #[inline(always)]
    pub fn apply_rotation_delta(&mut self, body: usize, delta: Vec3) {
        self.orientations[body] = quaternion_ex::integrate_rotation(self.orientations[body], delta);
        self.update_derived_state_for(body);
    }

    /// Applies position and rotation corrections to both bodies.
    pub fn apply_delta(&mut self, dp0: Vec3, dr0: Vec3, dp1: Vec3, dr1: Vec3) {
        self.apply_position_delta(0, dp0);
        self.apply_rotation_delta(0, dr0);
        self.apply_position_delta(1, dp1);
        self.apply_rotation_delta(1, dr1);
    }

    /// Applies rotation corrections, then moves the bodies so that the connector drift the rotation
    /// introduced is removed again, split by inverse mass.
    pub fn apply_rotation_delta_with_correction(&mut self, dr0: Vec3, dr1: Vec3) {
        let separation_before = self.connector_separation();
        self.apply_rotation_delta(0, dr0);
        self.apply_rotation_delta(1, dr1);
        if self.angular_position_correction <= 0.0 {
            return;
        }
        let inverse_mass_sum = self.inverse_masses[0] + self.inverse_masses[1];
        if inverse_mass_sum <= SMALL_NUMBER {
            return;
        }
        let drift = (self.connector_separation() - separation_before) * self.angular_position_correction;
        let inverse_mass_sum_inverse = 1.0 / inverse_mass_sum;
        self.apply_position_delta(0, drift * (self.inverse_masses[0] * inverse_mass_sum_inverse));
        self.apply_position_delta(1, -drift * (self.inverse_masses[1] * inverse_mass_sum_inverse));
    }

    /// Angular impulse response `InvI * (offset x axis)` and its projection on the constraint,
    /// for a linear constraint through both connectors.
    #[inline(always)]
    fn linear_constraint_response(&self, axis: Vec3) -> ([Vec3; 2], f32) {
        let mut angular = [Vec3::ZERO; 2];
        let mut inverse_mass = self.inverse_masses[0] + self.inverse_masses[1];
        for (body, angular) in angular.iter_mut().enumerate() {
            let arm = self.connector_offset(body).cross(axis);
            *angular = Symmetric3x3::transform(arm, &self.world_inverse_inertias[body]);
            inverse_mass += arm.dot(*angular);
        }
        (angular, inverse_mass)
    }

    /// Angular impulse response `InvI * axis` of each body and the combined inverse inertia.
    #[inline(always)]
    fn angular_constraint_response(&self, axis0: Vec3, axis1: Vec3) -> ([Vec3; 2], f32) {
        let angular0 = Symmetric3x3::transform(axis0, &self.world_inverse_inertias[0]);
        let angular1 = Symmetric3x3::transform(axis1, &self.world_inverse_inertias[1]);
        ([angular0, angular1], axis0.dot(angular0) + axis1.dot(angular1))
    }

    /// Distance the parent connector moved relative to the child along `axis` since the step began.
    #[inline(always)]
    pub fn linear_soft_velocity_dt(&self, axis: Vec3) -> f32 {
        let displacement0 = self.connector_positions[0] - self.initial_connector_positions[0];
        let displacement1 = self.connector_positions[1] - self.initial_connector_positions[1];
        (displacement0 - displacement1).dot(axis)
    }

    /// Angle the parent connector turned relative to the child about the given axes since the step
    /// began.
    #[inline(always)]
    pub fn angular_soft_velocity_dt(&self, axis0: Vec3, axis1: Vec3) -> f32 {
        let rotation0 = quaternion_ex::calculate_angular_velocity(
            self.initial_connector_rotations[0],
            self.connector_rotations[0],
            1.0,
        );
        let rotation1 = quaternion_ex::calculate_angular_velocity(
            self.initial_connector_rotations[1],
            self.connector_rotations[1],
            1.0,
        );
        axis0.dot(rotation0) - axis1.dot(rotation1)
    }

    /// Mass scale of an acceleration mode linear constraint.
    #[inline(always)]
    pub fn linear_acceleration_mass_scale(&self) -> f32 {
        let inverse_mass_sum = self.inverse_masses[0] + self.inverse_masses[1];
        if inverse_mass_sum > SMALL_NUMBER {
            1.0 / inverse_mass_sum
        } else {
            0.0
        }
    }

    /// Runs one compliant update of the given lambda and returns the impulse increment, or `None`
    /// when the spring is inactive.
    #[inline(always)]
    fn solve_soft_lambda(
        &mut self,
        dt: f32,
        soft: &SoftConstraint,
        mass_scale: f32,
        inverse_mass: f32,
        error: f32,
        velocity_dt: impl FnOnce(&Self) -> f32,
    ) -> Option<f32> {
        let spring_stiffness = mass_scale * soft.stiffness * dt * dt;
        let spring_damping = mass_scale * soft.damping * dt;
        if spring_stiffness + spring_damping <= SMALL_NUMBER {
            return None;
        }
        let velocity = if soft.damping > KINDA_SMALL_NUMBER {
            soft.target_velocity * dt + velocity_dt(&*self)
        } else {
            0.0
        };
        let multiplier = 1.0 / ((spring_stiffness + spring_damping) * inverse_mass + 1.0);
        let lambda = self.lambdas.get_mut(soft.lambda);
        let delta_lambda = multiplier * (spring_stiffness * error - spring_damping * velocity - *lambda);
        *lambda += delta_lambda;
        Some(delta_lambda)
    }

    /// Moves the connectors together along `axis` by `stiffness * error`. Positive error means the
    /// child connector lies beyond the parent along `axis`. Returns whether a correction was applied.
    pub fn solve_position_constraint_hard(&mut self, axis: Vec3, error: f32, stiffness: f32) -> bool {
        if error.abs() <= self.position_tolerance {
            return false;
        }
        let (angular, inverse_mass) = self.linear_constraint_response(axis);
        if inverse_mass <= SMALL_NUMBER {
            return false;
        }
        let delta_lambda = stiffness * error / inverse_mass;
        self.apply_linear_impulse(axis, &angular, delta_lambda);
        true
    }

    /// Compliant version of [`solve_position_constraint_hard`](Self::solve_position_constraint_hard).
    pub fn solve_position_constraint_soft(&mut self, dt: f32, axis: Vec3, error: f32, soft: &SoftConstraint) -> bool {
        let (angular, inverse_mass) = self.linear_constraint_response(axis);
        if inverse_mass <= SMALL_NUMBER {
            return false;
        }
        let mass_scale = if soft.acceleration_mode {
            self.linear_acceleration_mass_scale()
        } else {
            1.0
        };
        match self.solve_soft_lambda(dt, soft, mass_scale, inverse_mass, error, |state| {
            state.linear_soft_velocity_dt(axis)
        }) {
            Some(delta_lambda) => {
                self.apply_linear_impulse(axis, &angular, delta_lambda);
                true
            }
            None => false,
        }
    }

    #[inline(always)]
    fn apply_linear_impulse(&mut self, axis: Vec3, angular: &[Vec3; 2], delta_lambda: f32) {
        let dp0 = axis * (self.inverse_masses[0] * delta_lambda);
        let dp1 = axis * (-self.inverse_masses[1] * delta_lambda);
        let dr0 = angular[0] * delta_lambda;
        let dr1 = angular[1] * -delta_lambda;
        self.apply_delta(dp0, dr0, dp1, dr1);
    }

    /// Rotates the bodies against each other by `stiffness * error` about `axis0` (parent) and `axis1`
    /// (child). Positive error means the child is rotated beyond the parent about the axis.
    pub fn solve_rotation_constraint_hard(&mut self, axis0: Vec3, axis1: Vec3, error: f32, stiffness: f32) -> bool {
        if error.abs() <= self.angle_tolerance {
            return false;
        }
        let (angular, inverse_inertia) = self.angular_constraint_response(axis0, axis1);
        if inverse_inertia <= SMALL_NUMBER {
            return false;
        }
        let delta = stiffness * error / inverse_inertia;
        self.apply_rotation_delta_with_correction(angular[0] * delta, angular[1] * -delta);
        true
    }

    /// Compliant version of [`solve_rotation_constraint_hard`](Self::solve_rotation_constraint_hard).
    pub fn solve_rotation_constraint_soft(
        &mut self,
        dt: f32,
        axis0: Vec3,
        axis1: Vec3,
        error: f32,
        soft: &SoftConstraint,
    ) -> bool {
        let (angular, inverse_inertia) = self.angular_constraint_response(axis0, axis1);
        if inverse_inertia <= SMALL_NUMBER {
            return false;
        }
        let mass_scale = if soft.acceleration_mode {
            1.0 / inverse_inertia
        } else {
            1.0
        };
        match self.solve_soft_lambda(dt, soft, mass_scale, inverse_inertia, error, |state| {
            state.angular_soft_velocity_dt(axis0, axis1)
        }) {
            Some(delta_lambda) => {
                self.apply_rotation_delta_with_correction(angular[0] * delta_lambda, angular[1] * -delta_lambda);
                true
            }
            None => false,
        }
    }
}
