use glam::Vec3;

use super::joint_settings::{AngularAxis, JointMotionType, JointSettings};
use super::joint_shape::{AngularLimitKind, JointShape, LinearConstraintShape, SwingConstraintShape};
use super::joint_solver::IJointSolver;
use super::joint_solver_state::{JointSolverState, SoftConstraint};
use super::joint_utilities;
use super::solver_settings::JointSolverSettings;
use crate::physics::body_properties::{BodyInertia, MotionState, RigidPose};
use crate::utilities::dense_matrix::{DenseMatrix61, DenseMatrix66, DenseMatrixSolver};
use crate::utilities::math_helper::{self, KINDA_SMALL_NUMBER, SMALL_NUMBER};
use crate::utilities::symmetric3x3::Symmetric3x3;

/// Maximum number of rows a joint can produce: three linear and three angular.
const MAX_ROWS: usize = 6;

/// One scalar constraint of the block system. The parent moves along `+J0`, the child along `-J1`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ConstraintRow {
    linear0: Vec3,
    angular0: Vec3,
    linear1: Vec3,
    angular1: Vec3,
    error: f32,
    soft: Option<SoftConstraint>,
}

impl ConstraintRow {
    fn linear(offsets: [Vec3; 2], axis: Vec3, error: f32, soft: Option<SoftConstraint>) -> Self {
        Self {
            linear0: axis,
            angular0: offsets[0].cross(axis),
            linear1: axis,
            angular1: offsets[1].cross(axis),
            error,
            soft,
        }
    }

    fn angular(axis0: Vec3, axis1: Vec3, error: f32, soft: Option<SoftConstraint>) -> Self {
        Self {
            linear0: Vec3::ZERO,
            angular0: axis0,
            linear1: Vec3::ZERO,
            angular1: axis1,
            error,
            soft,
        }
    }

    fn is_angular(&self) -> bool {
        self.linear0 == Vec3::ZERO && self.linear1 == Vec3::ZERO
    }
}

/// Active rows of one iteration.
#[derive(Debug, Clone, Copy)]
struct ConstraintRows {
    rows: [Option<ConstraintRow>; MAX_ROWS],
    count: usize,
}

impl ConstraintRows {
    fn new() -> Self {
        Self {
            rows: [None; MAX_ROWS],
            count: 0,
        }
    }

    fn push(&mut self, row: ConstraintRow) {
        debug_assert!(self.count < MAX_ROWS, "A joint cannot have more than {} rows.", MAX_ROWS);
        if self.count < MAX_ROWS {
            self.rows[self.count] = Some(row);
            self.count += 1;
        }
    }

    fn iter(&self) -> impl Iterator<Item = &ConstraintRow> {
        self.rows[..self.count].iter().flatten()
    }
}

/// Block joint solver. All active constraint rows of a joint are solved together with one
/// Cholesky factorization per iteration, which handles strongly coupled rows (a nearly locked cone
/// next to a position limit, for example) better than the sequential solver.
///
/// Drives and projections are not coupled and run through the sequential routines.
///
/// Unlike [`GaussSeidelJointSolver`](super::gauss_seidel_solver::GaussSeidelJointSolver), no
/// angular position correction follows the rotation rows of point joints: the position and rotation
/// rows are solved together, so the drift a rotation correction introduces is already accounted for
/// in the same solve. Both solvers converge to the same configuration, but their intermediate poses
/// on ball-socket chains differ slightly.
#[derive(Debug, Clone, Copy, Default)]
pub struct CholeskyJointSolver {
    state: JointSolverState,
    shape: JointShape,
}

impl CholeskyJointSolver {
    pub fn shape(&self) -> &JointShape {
        &self.shape
    }

    fn build_rows(&self, solver_settings: &JointSolverSettings, joint_settings: &JointSettings) -> ConstraintRows {
        let mut rows = ConstraintRows::new();
        self.add_linear_rows(&mut rows, solver_settings, joint_settings);
        self.add_twist_row(&mut rows, solver_settings, joint_settings);
        self.add_swing_rows(&mut rows, solver_settings, joint_settings);
        rows
    }

    fn add_linear_rows(
        &self,
        rows: &mut ConstraintRows,
        solver_settings: &JointSolverSettings,
        joint_settings: &JointSettings,
    ) {
        let state = &self.state;
        let offsets = [state.connector_offset(0), state.connector_offset(1)];
        let separation = state.connector_separation();
        let stiffness = joint_utilities::get_linear_stiffness(solver_settings, joint_settings);
        let limit = joint_settings.linear_limit;
        let limited_soft = if joint_settings.soft_linear_limit.enabled {
            Some(JointSolverState::soft_linear_limit(solver_settings, joint_settings))
        } else {
            None
        };
        let world_axis = |axis: usize| state.connector_rotations[0] * Vec3::AXES[axis];

        let add_axis = |rows: &mut ConstraintRows, axis: Vec3, motion: JointMotionType| {
            let distance = separation.dot(axis);
            match motion {
                JointMotionType::Free => {}
                JointMotionType::Locked => rows.push(ConstraintRow::linear(offsets, axis, stiffness * distance, None)),
                JointMotionType::Limited => {
                    let error = math_helper::excess_beyond_limit(distance, limit);
                    if error != 0.0 {
                        rows.push(Self::limited_linear_row(offsets, axis, error, stiffness, limited_soft));
                    }
                }
            }
        };

        match self.shape.linear {
            LinearConstraintShape::Free => {}
            LinearConstraintShape::Point => {
                for axis in 0..3 {
                    add_axis(rows, world_axis(axis), JointMotionType::Locked);
                }
            }
            LinearConstraintShape::Spherical => {
                let distance = separation.length();
                if distance > SMALL_NUMBER && distance > limit {
                    rows.push(Self::limited_linear_row(
                        offsets,
                        separation / distance,
                        distance - limit,
                        stiffness,
                        limited_soft,
                    ));
                }
            }
            LinearConstraintShape::Cylindrical {
                axis,
                axial_motion,
                radial_motion,
            } => {
                add_axis(rows, world_axis(axis), axial_motion);
                match radial_motion {
                    JointMotionType::Free => {}
                    JointMotionType::Locked => {
                        add_axis(rows, world_axis((axis + 1) % 3), JointMotionType::Locked);
                        add_axis(rows, world_axis((axis + 2) % 3), JointMotionType::Locked);
                    }
                    JointMotionType::Limited => {
                        let axial = world_axis(axis);
                        let radial = separation - axial * separation.dot(axial);
                        let radial_distance = radial.length();
                        if radial_distance > SMALL_NUMBER && radial_distance > limit {
                            rows.push(Self::limited_linear_row(
                                offsets,
                                radial / radial_distance,
                                radial_distance - limit,
                                stiffness,
                                limited_soft,
                            ));
                        }
                    }
                }
            }
            LinearConstraintShape::Planar(motion_types) => {
                for (axis, motion) in motion_types.iter().enumerate() {
                    add_axis(rows, world_axis(axis), *motion);
                }
            }
        }
    }

    fn limited_linear_row(
        offsets: [Vec3; 2],
        axis: Vec3,
        error: f32,
        stiffness: f32,
        soft: Option<SoftConstraint>,
    ) -> ConstraintRow {
        match soft {
            Some(soft) => ConstraintRow::linear(offsets, axis, error, Some(soft)),
            None => ConstraintRow::linear(offsets, axis, stiffness * error, None),
        }
    }

    fn add_twist_row(
        &self,
        rows: &mut ConstraintRows,
        solver_settings: &JointSolverSettings,
        joint_settings: &JointSettings,
    ) {
        let kind = self.shape.twist;
        if kind == AngularLimitKind::Free {
            return;
        }
        let (axis0, axis1, angle) = joint_utilities::get_twist_axis_angle(
            self.state.connector_rotations[0],
            self.state.connector_rotations[1],
        );
        let motion = joint_settings.angular_motion(AngularAxis::Twist);
        let error =
            math_helper::excess_beyond_limit(angle, JointSolverState::angular_limit(joint_settings, AngularAxis::Twist));
        if error == 0.0 && motion != JointMotionType::Locked {
            return;
        }
        let row = match kind {
            AngularLimitKind::Soft => ConstraintRow::angular(
                axis0,
                axis1,
                error,
                Some(JointSolverState::soft_twist_limit(solver_settings, joint_settings)),
            ),
            _ => {
                let stiffness = joint_utilities::get_twist_stiffness(solver_settings, joint_settings);
                ConstraintRow::angular(axis0, axis1, stiffness * error, None)
            }
        };
        rows.push(row);
    }

    fn add_swing_rows(
        &self,
        rows: &mut ConstraintRows,
        solver_settings: &JointSolverSettings,
        joint_settings: &JointSettings,
    ) {
        let rotations = self.state.connector_rotations;
        let tolerance = self.state.swing_twist_angle_tolerance;
        let swing_row = |axis: Vec3, error: f32, soft: bool| {
            if soft {
                ConstraintRow::angular(
                    axis,
                    axis,
                    error,
                    Some(JointSolverState::soft_swing_limit(solver_settings, joint_settings)),
                )
            } else {
                let stiffness = joint_utilities::get_swing_stiffness(solver_settings, joint_settings);
                ConstraintRow::angular(axis, axis, stiffness * error, None)
            }
        };

        match self.shape.swing {
            SwingConstraintShape::None => {}
            SwingConstraintShape::Cone { soft } => {
                let (axis_local, angle) = joint_utilities::get_cone_axis_angle_local(rotations[0], rotations[1], tolerance);
                let error = joint_utilities::get_cone_angle_error(joint_settings, axis_local, angle);
                if error != 0.0 {
                    rows.push(swing_row(rotations[0] * axis_local, error, soft));
                }
            }
            SwingConstraintShape::Separate(kinds) => {
                for (swing_axis, kind) in [AngularAxis::Swing1, AngularAxis::Swing2].into_iter().zip(kinds) {
                    if kind == AngularLimitKind::Free {
                        continue;
                    }
                    let (axis, angle) =
                        joint_utilities::get_swing_axis_angle(rotations[0], rotations[1], swing_axis, tolerance);
                    let error =
                        math_helper::excess_beyond_limit(angle, JointSolverState::angular_limit(joint_settings, swing_axis));
                    let locked = joint_settings.angular_motion(swing_axis) == JointMotionType::Locked;
                    if error != 0.0 || locked {
                        rows.push(swing_row(axis, error, kind == AngularLimitKind::Soft));
                    }
                }
            }
        }
    }

    /// Diagonal entry of the joint-space effective mass for one row.
    fn row_inverse_mass(&self, row: &ConstraintRow) -> f32 {
        let state = &self.state;
        state.inverse_masses[0] * row.linear0.length_squared()
            + row
                .angular0
                .dot(Symmetric3x3::transform(row.angular0, &state.world_inverse_inertias[0]))
            + state.inverse_masses[1] * row.linear1.length_squared()
            + row
                .angular1
                .dot(Symmetric3x3::transform(row.angular1, &state.world_inverse_inertias[1]))
    }

    /// Compliance and right-hand side of a soft row: the diagonal term `1 / (S + D)` and the
    /// scaled residual `(S * C - D * v - lambda) / (S + D)`. `None` when the spring is inactive.
    fn soft_row_terms(&self, dt: f32, row: &ConstraintRow, soft: &SoftConstraint, inverse_mass: f32) -> Option<(f32, f32)> {
        let state = &self.state;
        let mass_scale = if !soft.acceleration_mode {
            1.0
        } else if row.is_angular() {
            1.0 / inverse_mass
        } else {
            state.linear_acceleration_mass_scale()
        };
        let spring_stiffness = mass_scale * soft.stiffness * dt * dt;
        let spring_damping = mass_scale * soft.damping * dt;
        let spring = spring_stiffness + spring_damping;
        if spring <= SMALL_NUMBER {
            return None;
        }
        let velocity = if soft.damping > KINDA_SMALL_NUMBER {
            let velocity_dt = if row.is_angular() {
                state.angular_soft_velocity_dt(row.angular0, row.angular1)
            } else {
                state.linear_soft_velocity_dt(row.linear0)
            };
            soft.target_velocity * dt + velocity_dt
        } else {
            0.0
        };
        let lambda = state.lambdas.get(soft.lambda);
        Some((
            1.0 / spring,
            (spring_stiffness * row.error - spring_damping * velocity - lambda) / spring,
        ))
    }

    fn body_inverse_mass_matrix(&self, body: usize) -> DenseMatrix66 {
        let mut m = DenseMatrix66::make(6, 6);
        m.set_diagonal_block(0, &Symmetric3x3::from_scaled_identity(self.state.inverse_masses[body]));
        m.set_diagonal_block(3, &self.state.world_inverse_inertias[body]);
        m
    }

    fn solve_block(&mut self, dt: f32, solver_settings: &JointSolverSettings, joint_settings: &JointSettings) -> u32 {
        let candidates = self.build_rows(solver_settings, joint_settings);

        // Rows that cannot move either body, inactive springs and hard rows within tolerance drop out.
        let mut rows = [None; MAX_ROWS];
        let mut compliance = [0.0; MAX_ROWS];
        let mut residual = [0.0; MAX_ROWS];
        let mut count = 0;
        for row in candidates.iter() {
            let inverse_mass = self.row_inverse_mass(row);
            if inverse_mass <= SMALL_NUMBER {
                continue;
            }
            let (row_compliance, row_residual) = match &row.soft {
                Some(soft) => match self.soft_row_terms(dt, row, soft, inverse_mass) {
                    Some(terms) => terms,
                    None => continue,
                },
                None => {
                    let tolerance = if row.is_angular() {
                        self.state.angle_tolerance
                    } else {
                        self.state.position_tolerance
                    };
                    if tolerance > 0.0 && row.error.abs() <= tolerance {
                        continue;
                    }
                    (0.0, row.error)
                }
            };
            rows[count] = Some(*row);
            compliance[count] = row_compliance;
            residual[count] = row_residual;
            count += 1;
        }
        if count == 0 {
            return 0;
        }

        let mut j0 = DenseMatrix66::make(count, 6);
        let mut j1 = DenseMatrix66::make(count, 6);
        let mut c = DenseMatrix61::make(count, 1);
        for (index, row) in rows[..count].iter().flatten().enumerate() {
            j0.set_row_vector(index, 0, row.linear0);
            j0.set_row_vector(index, 3, row.angular0);
            j1.set_row_vector(index, 0, row.linear1);
            j1.set_row_vector(index, 3, row.angular1);
            c.set_at(index, 0, residual[index]);
        }

        let j0m0 = DenseMatrix66::multiply_ab(&j0, &self.body_inverse_mass_matrix(0));
        let j1m1 = DenseMatrix66::multiply_ab(&j1, &self.body_inverse_mass_matrix(1));
        let mut f = DenseMatrix66::add(
            &DenseMatrix66::multiply_abt(&j0m0, &j0),
            &DenseMatrix66::multiply_abt(&j1m1, &j1),
        );
        for (index, row_compliance) in compliance[..count].iter().enumerate() {
            *f.at_mut(index, index) += row_compliance;
        }

        let l = match DenseMatrixSolver::solve_positive_definite(&f, &c) {
            Some(l) => l,
            None => {
                tracing::trace!(rows = count, "joint block system is not positive definite, skipping iteration");
                return 0;
            }
        };

        for (index, row) in rows[..count].iter().flatten().enumerate() {
            if let Some(soft) = &row.soft {
                *self.state.lambdas.get_mut(soft.lambda) += l.at(index, 0);
            }
        }

        let d0 = DenseMatrix61::multiply_atb(&j0m0, &l);
        let d1 = DenseMatrix61::multiply_atb(&j1m1, &l);
        self.state.apply_delta(
            d0.column_vector(0, 0),
            d0.column_vector(3, 0),
            -d1.column_vector(0, 0),
            -d1.column_vector(3, 0),
        );
        count as u32
    }
}

impl IJointSolver for CholeskyJointSolver {
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
        self.solve_block(dt, solver_settings, joint_settings)
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
    use crate::physics::constraints::gauss_seidel_solver::GaussSeidelJointSolver;
    use crate::physics::constraints::joint_settings::JointMotionType::{Free, Limited};
    use crate::physics::constraints::joint_solver_state::JointLambda;
    use approx::assert_abs_diff_eq;
    use glam::Quat;

    const DT: f32 = 1.0 / 60.0;

    fn prepare(
        solver: &mut dyn IJointSolver,
        joint_settings: &JointSettings,
        poses: [RigidPose; 2],
        inertias: [BodyInertia; 2],
        frames: [RigidPose; 2],
    ) {
        let solver_settings = JointSolverSettings::default();
        solver.init(DT, &solver_settings, joint_settings, poses, inertias, frames);
        solver.update(
            DT,
            poses.map(|pose| MotionState {
                pose,
                velocity: BodyVelocity::default(),
            }),
        );
    }

    #[test]
    fn test_point_constraint_solves_in_one_iteration() {
        let joint_settings = JointSettings::default();
        let inertias = [
            BodyInertia::from_mass(2.0, Vec3::ONE),
            BodyInertia::from_mass(1.0, Vec3::ONE),
        ];
        let poses = [RigidPose::IDENTITY, RigidPose::from_position(Vec3::new(0.3, -0.6, 0.9))];
        let mut solver = CholeskyJointSolver::default();
        prepare(&mut solver, &joint_settings, poses, inertias, [RigidPose::IDENTITY; 2]);
        assert_eq!(solver.apply_constraints(DT, &JointSolverSettings::default(), &joint_settings), 3);
        let state = solver.state();
        assert_abs_diff_eq!(state.connector_separation(), Vec3::ZERO, epsilon = 1e-5);
        // Lighter child absorbs two thirds of the correction.
        assert_abs_diff_eq!(state.positions[1], Vec3::new(0.3, -0.6, 0.9) / 3.0, epsilon = 1e-5);
    }

    #[test]
    fn test_matches_sequential_solution_for_coupled_joint() {
        let joint_settings = JointSettings {
            angular_motion_types: [Free, Limited, Limited],
            angular_limits: [0.0, 0.3, 0.3],
            ..JointSettings::default()
        };
        let inertias = [BodyInertia::KINEMATIC, BodyInertia::from_mass(1.0, Vec3::new(0.2, 0.3, 0.4))];
        let frames = [
            RigidPose::IDENTITY,
            RigidPose::from_position(Vec3::new(-0.5, 0.0, 0.0)),
        ];
        let child_rotation = Quat::from_axis_angle(Vec3::new(0.0, 1.0, 0.5).normalize(), 0.8);
        let poses = [
            RigidPose::IDENTITY,
            RigidPose::new(Vec3::new(0.6, 0.1, 0.0), child_rotation),
        ];
        let solver_settings = JointSolverSettings::default();

        let mut block = CholeskyJointSolver::default();
        prepare(&mut block, &joint_settings, poses, inertias, frames);
        let mut sequential = GaussSeidelJointSolver::default();
        prepare(&mut sequential, &joint_settings, poses, inertias, frames);
        for _ in 0..30 {
            block.apply_constraints(DT, &solver_settings, &joint_settings);
            sequential.apply_constraints(DT, &solver_settings, &joint_settings);
        }

        for solver in [block.state(), sequential.state()] {
            assert_abs_diff_eq!(solver.connector_separation(), Vec3::ZERO, epsilon = 1e-3);
            let (_, angle) = joint_utilities::get_cone_axis_angle_local(
                solver.connector_rotations[0],
                solver.connector_rotations[1],
                1e-6,
            );
            assert!(angle < 0.3 + 1e-2, "swing {}", angle);
        }
    }

    #[test]
    fn test_kinematic_pair_produces_no_rows() {
        let joint_settings = JointSettings::fixed();
        let poses = [RigidPose::IDENTITY, RigidPose::from_position(Vec3::X)];
        let mut solver = CholeskyJointSolver::default();
        prepare(&mut solver, &joint_settings, poses, [BodyInertia::KINEMATIC; 2], [RigidPose::IDENTITY; 2]);
        assert_eq!(solver.apply_constraints(DT, &JointSolverSettings::default(), &joint_settings), 0);
        assert_eq!(solver.state().positions[1], Vec3::X);
    }

    #[test]
    fn test_soft_row_accumulates_lambda() {
        let mut joint_settings = JointSettings {
            linear_motion_types: [Limited; 3],
            linear_limit: 0.5,
            ..JointSettings::default()
        };
        joint_settings.soft_linear_limit.enabled = true;
        joint_settings.soft_linear_limit.stiffness = 3600.0;
        joint_settings.soft_linear_limit.damping = 0.0;
        let poses = [RigidPose::IDENTITY, RigidPose::from_position(Vec3::new(0.0, 1.5, 0.0))];
        let inertias = [BodyInertia::KINEMATIC, BodyInertia::from_mass(1.0, Vec3::ONE)];
        let mut solver = CholeskyJointSolver::default();
        prepare(&mut solver, &joint_settings, poses, inertias, [RigidPose::IDENTITY; 2]);
        assert_eq!(solver.apply_constraints(DT, &JointSolverSettings::default(), &joint_settings), 1);
        // Acceleration mode, S = 1: lambda = S * C / (S * II + 1) = 0.5.
        let state = solver.state();
        assert_abs_diff_eq!(state.lambdas.get(JointLambda::LinearSoft), 0.5, epsilon = 1e-4);
        assert_abs_diff_eq!(state.positions[1].y, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_hinge_rows() {
        let joint_settings = JointSettings::hinge();
        let inertias = [BodyInertia::KINEMATIC, BodyInertia::from_mass(1.0, Vec3::ONE)];
        let poses = [
            RigidPose::IDENTITY,
            RigidPose::new(Vec3::ZERO, Quat::from_axis_angle(Vec3::Y, 0.2)),
        ];
        let mut solver = CholeskyJointSolver::default();
        prepare(&mut solver, &joint_settings, poses, inertias, [RigidPose::IDENTITY; 2]);
        // Three point rows plus both locked swings.
        assert_eq!(solver.apply_constraints(DT, &JointSolverSettings::default(), &joint_settings), 5);
        assert_eq!(solver.shape().swing, SwingConstraintShape::Separate([AngularLimitKind::Hard; 2]));
    }
}
