use std::cmp::Ordering;

use glam::{Quat, Vec3};
use tracing::{debug, trace};

use super::bodies::{IJointBodyStore, RigidBodyRef};
use super::body_properties::RigidPose;
use super::constraints::constraint_checker::ConstraintChecker;
use super::constraints::joint_settings::{JointFrames, JointSettings};
use super::constraints::joint_solver::{create_joint_solver, IJointSolver};
use super::constraints::joint_solver_state::JointSolverState;
use super::constraints::joint_utilities;
use super::constraints::solver_settings::JointSolverSettings;
use super::errors::JointError;
use super::handles::{BodyHandle, JointHandle};
use crate::utilities::quaternion_ex;

/// Invoked with the step duration and the joint handles in solve order.
pub type JointCallback = Box<dyn FnMut(f32, &[JointHandle])>;

/// Relative placement of a joint's connectors, for inspection and debugging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstraintSpace {
    /// World positions of the parent and child connectors.
    pub connector_positions: [Vec3; 2],
    /// World rotations of the parent and child connectors. The child rotation is on the same
    /// hemisphere as the parent's.
    pub connector_rotations: [Quat; 2],
    /// Twist, swing 1 and swing 2 angles of the child connector relative to the parent's.
    pub angles: [f32; 3],
}

/// Container of two-body joints.
///
/// Joint data lives in parallel arrays indexed by solve order; [`JointHandle`]s stay valid across
/// removals and sorting. A step looks like:
///
/// 1. [`prepare_constraints`](Self::prepare_constraints) once, after the bodies were integrated,
/// 2. [`apply`](Self::apply) once per solver iteration,
/// 3. [`apply_push_out`](Self::apply_push_out) after velocities were derived from the solved poses,
/// 4. [`unprepare_constraints`](Self::unprepare_constraints).
///
/// The joint set cannot be restructured between prepare and unprepare.
pub struct JointConstraints {
    solver_settings: JointSolverSettings,

    constrained_bodies: Vec<[BodyHandle; 2]>,
    settings: Vec<JointSettings>,
    frames: Vec<JointFrames>,
    levels: Vec<[i32; 2]>,
    index_to_handle: Vec<JointHandle>,

    /// Maps a handle's value to the joint's index, or -1 for unused handles.
    handle_to_index: Vec<i32>,
    free_handles: Vec<i32>,

    /// One solver per joint while prepared, empty otherwise.
    solvers: Vec<Box<dyn IJointSolver>>,
    prepared: bool,

    pre_apply_callback: Option<JointCallback>,
    post_apply_callback: Option<JointCallback>,
}

impl Default for JointConstraints {
    fn default() -> Self {
        Self::new(JointSolverSettings::default())
    }
}

impl std::fmt::Debug for JointConstraints {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("JointConstraints")
            .field("solver_settings", &self.solver_settings)
            .field("count", &self.len())
            .field("prepared", &self.prepared)
            .finish()
    }
}

impl JointConstraints {
    pub fn new(solver_settings: JointSolverSettings) -> Self {
        Self {
            solver_settings,
            constrained_bodies: Vec::new(),
            settings: Vec::new(),
            frames: Vec::new(),
            levels: Vec::new(),
            index_to_handle: Vec::new(),
            handle_to_index: Vec::new(),
            free_handles: Vec::new(),
            solvers: Vec::new(),
            prepared: false,
            pre_apply_callback: None,
            post_apply_callback: None,
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.settings.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    #[inline(always)]
    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// Handles of all joints in solve order.
    #[inline(always)]
    pub fn handles(&self) -> &[JointHandle] {
        &self.index_to_handle
    }

    pub fn solver_settings(&self) -> &JointSolverSettings {
        &self.solver_settings
    }

    /// Replaces the solver settings. The solver type cannot change while prepared.
    pub fn set_solver_settings(&mut self, solver_settings: JointSolverSettings) -> Result<(), JointError> {
        if !JointSolverSettings::validate(&solver_settings) {
            return Err(JointError::invalid_settings("solver settings out of range"));
        }
        if self.prepared && solver_settings.solver_type != self.solver_settings.solver_type {
            return Err(JointError::ConstraintsPrepared("change the solver type"));
        }
        self.solver_settings = solver_settings;
        Ok(())
    }

    #[inline(always)]
    pub fn contains(&self, handle: JointHandle) -> bool {
        self.index_of(handle).is_ok()
    }

    /// Gets the current solve order index of a joint.
    pub fn index_of(&self, handle: JointHandle) -> Result<usize, JointError> {
        usize::try_from(handle.0)
            .ok()
            .and_then(|value| self.handle_to_index.get(value))
            .and_then(|index| usize::try_from(*index).ok())
            .ok_or(JointError::JointNotFound(handle))
    }

    /// Adds a joint between a parent (`bodies[0]`) and a child (`bodies[1]`).
    ///
    /// `frames` are the joint frames relative to each body's center of mass. The settings are
    /// validated and then sanitized before they are stored.
    pub fn add_constraint(
        &mut self,
        bodies: [BodyHandle; 2],
        frames: JointFrames,
        settings: JointSettings,
    ) -> Result<JointHandle, JointError> {
        if self.prepared {
            return Err(JointError::ConstraintsPrepared("add joints"));
        }
        if bodies[0] == bodies[1] {
            return Err(JointError::SelfConstraint(bodies[0]));
        }
        Self::validate_frames(&frames)?;
        if !JointSettings::validate(&settings) {
            return Err(JointError::invalid_settings("joint settings out of range"));
        }

        let index = self.settings.len();
        let handle = match self.free_handles.pop() {
            Some(value) => value,
            None => {
                self.handle_to_index.push(-1);
                self.handle_to_index.len() as i32 - 1
            }
        };
        self.handle_to_index[handle as usize] = index as i32;

        self.constrained_bodies.push(bodies);
        self.settings.push(settings.sanitized());
        self.frames.push(frames);
        self.levels.push([0; 2]);
        self.index_to_handle.push(JointHandle(handle));

        debug!(handle, parent = bodies[0].0, child = bodies[1].0, "Added joint");
        Ok(JointHandle(handle))
    }

    fn validate_frames(frames: &JointFrames) -> Result<(), JointError> {
        for frame in frames.iter() {
            if !ConstraintChecker::is_finite_vec3(frame.position) {
                return Err(JointError::invalid_settings("joint frame position must be finite"));
            }
            if !ConstraintChecker::is_unit_length_quat(frame.orientation) {
                return Err(JointError::invalid_settings("joint frame orientation must be unit length"));
            }
        }
        Ok(())
    }

    /// Removes a joint. The last joint in solve order takes its slot.
    pub fn remove_constraint(&mut self, handle: JointHandle) -> Result<(), JointError> {
        if self.prepared {
            return Err(JointError::ConstraintsPrepared("remove joints"));
        }
        let index = self.index_of(handle)?;

        self.constrained_bodies.swap_remove(index);
        self.settings.swap_remove(index);
        self.frames.swap_remove(index);
        self.levels.swap_remove(index);
        self.index_to_handle.swap_remove(index);
        if let Some(moved) = self.index_to_handle.get(index) {
            self.handle_to_index[moved.0 as usize] = index as i32;
        }

        self.handle_to_index[handle.0 as usize] = -1;
        self.free_handles.push(handle.0);
        debug!(handle = handle.0, remaining = self.len(), "Removed joint");
        Ok(())
    }

    pub fn constrained_bodies(&self, handle: JointHandle) -> Result<[BodyHandle; 2], JointError> {
        Ok(self.constrained_bodies[self.index_of(handle)?])
    }

    pub fn joint_settings(&self, handle: JointHandle) -> Result<&JointSettings, JointError> {
        Ok(&self.settings[self.index_of(handle)?])
    }

    pub fn joint_frames(&self, handle: JointHandle) -> Result<&JointFrames, JointError> {
        Ok(&self.frames[self.index_of(handle)?])
    }

    /// Replaces the settings of a joint. The prepared solvers classify their joints once per step,
    /// so settings can only change between steps.
    pub fn set_joint_settings(&mut self, handle: JointHandle, settings: JointSettings) -> Result<(), JointError> {
        if self.prepared {
            return Err(JointError::ConstraintsPrepared("change joint settings"));
        }
        let index = self.index_of(handle)?;
        if !JointSettings::validate(&settings) {
            return Err(JointError::invalid_settings("joint settings out of range"));
        }
        self.settings[index] = settings.sanitized();
        Ok(())
    }

    /// Sets the graph levels of the joint's parent and child: their distance from a kinematic
    /// anchor through the joint graph.
    pub fn set_constraint_levels(&mut self, handle: JointHandle, levels: [i32; 2]) -> Result<(), JointError> {
        let index = self.index_of(handle)?;
        self.levels[index] = levels;
        Ok(())
    }

    /// The level a joint is sorted by: the lower of its bodies' levels.
    pub fn constraint_level(&self, handle: JointHandle) -> Result<i32, JointError> {
        let levels = self.levels[self.index_of(handle)?];
        Ok(levels[0].min(levels[1]))
    }

    /// Orders joints by ascending level so that joints near an anchor are solved first. Joints on
    /// the same level keep their relative order.
    pub fn sort_constraints(&mut self) -> Result<(), JointError> {
        if self.prepared {
            return Err(JointError::ConstraintsPrepared("sort joints"));
        }
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by_key(|index| self.levels[*index][0].min(self.levels[*index][1]));

        self.constrained_bodies = order.iter().map(|index| self.constrained_bodies[*index]).collect();
        self.settings = order.iter().map(|index| self.settings[*index]).collect();
        self.frames = order.iter().map(|index| self.frames[*index]).collect();
        self.levels = order.iter().map(|index| self.levels[*index]).collect();
        self.index_to_handle = order.iter().map(|index| self.index_to_handle[*index]).collect();
        for (index, handle) in self.index_to_handle.iter().enumerate() {
            self.handle_to_index[handle.0 as usize] = index as i32;
        }
        debug!(count = self.len(), "Sorted joints by level");
        Ok(())
    }

    fn load_bodies<S: IJointBodyStore + ?Sized>(
        store: &S,
        bodies: [BodyHandle; 2],
    ) -> Result<[RigidBodyRef; 2], JointError> {
        let parent = store.body(bodies[0]).ok_or(JointError::BodyNotFound(bodies[0]))?;
        let child = store.body(bodies[1]).ok_or(JointError::BodyNotFound(bodies[1]))?;
        Ok([parent, child])
    }

    /// Creates and initializes one solver per joint from the body state at the start of the step,
    /// then loads the current body state so that [`solver_state`](Self::solver_state) is valid
    /// before the first [`apply`](Self::apply).
    pub fn prepare_constraints<S: IJointBodyStore + ?Sized>(&mut self, dt: f32, store: &S) -> Result<(), JointError> {
        self.solvers.clear();
        self.prepared = false;
        let mut solvers = Vec::with_capacity(self.len());
        for index in 0..self.len() {
            let bodies = Self::load_bodies(store, self.constrained_bodies[index])?;
            let mut solver = create_joint_solver(self.solver_settings.solver_type);
            solver.init(
                dt,
                &self.solver_settings,
                &self.settings[index],
                bodies.map(|body| body.previous_pose),
                bodies.map(|body| body.inertia),
                self.frames[index],
            );
            solver.update(dt, bodies.map(|body| body.motion));
            solvers.push(solver);
        }
        self.solvers = solvers;
        self.prepared = true;
        debug!(count = self.len(), solver = ?self.solver_settings.solver_type, "Prepared joints");
        Ok(())
    }

    /// Releases the per-joint solvers.
    pub fn unprepare_constraints(&mut self) {
        self.solvers.clear();
        self.prepared = false;
        debug!(count = self.len(), "Unprepared joints");
    }

    /// Runs solver iteration `iteration` of `num_iterations` over all joints in order: limits, then
    /// drives. Corrected poses of dynamic bodies are written back before the next joint is solved.
    ///
    /// During the freeze iterations configured in the solver settings, the body of each joint with
    /// the lower level is made progressively heavier so that the last iterations only move bodies
    /// away from the anchors.
    pub fn apply<S: IJointBodyStore + ?Sized>(
        &mut self,
        dt: f32,
        store: &mut S,
        iteration: u32,
        num_iterations: u32,
    ) -> Result<(), JointError> {
        if !self.prepared {
            return Err(JointError::NotPrepared);
        }
        if let Some(callback) = self.pre_apply_callback.as_mut() {
            callback(dt, &self.index_to_handle);
        }

        let freeze_scale = self.solver_settings.freeze_scale(iteration, num_iterations);
        if freeze_scale < 1.0 {
            trace!(iteration, freeze_scale, "Freezing joints");
        }
        let pair_iterations = self.solver_settings.apply_pair_iterations;
        for index in 0..self.solvers.len() {
            let bodies = self.constrained_bodies[index];
            let state = Self::load_bodies(store, bodies)?;
            let frozen_body = if freeze_scale < 1.0 {
                Self::frozen_body(self.levels[index])
            } else {
                None
            };
            let solver = &mut self.solvers[index];
            solver.set_freeze_scale(frozen_body, freeze_scale);
            solver.update(dt, state.map(|body| body.motion));

            let mut corrections = 0;
            for _ in 0..pair_iterations {
                corrections += solver.apply_constraints(dt, &self.solver_settings, &self.settings[index]);
            }
            for _ in 0..pair_iterations {
                corrections += solver.apply_drives(dt, &self.solver_settings, &self.settings[index]);
            }
            if corrections == 0 {
                continue;
            }

            let solved = solver.state();
            for (body, handle) in bodies.iter().enumerate() {
                if solved.is_dynamic(body) {
                    store.write_pose(*handle, solved.pose(body));
                }
            }
        }

        if let Some(callback) = self.post_apply_callback.as_mut() {
            callback(dt, &self.index_to_handle);
        }
        Ok(())
    }

    /// The body nearer the anchor, which is the one frozen. Joints between bodies on the same level
    /// are never frozen.
    fn frozen_body(levels: [i32; 2]) -> Option<usize> {
        match levels[0].cmp(&levels[1]) {
            Ordering::Less => Some(0),
            Ordering::Greater => Some(1),
            Ordering::Equal => None,
        }
    }

    /// Runs the projection pass over all joints, writing back both pose and velocity. Returns
    /// whether any joint was corrected.
    pub fn apply_push_out<S: IJointBodyStore + ?Sized>(&mut self, dt: f32, store: &mut S) -> Result<bool, JointError> {
        if !self.prepared {
            return Err(JointError::NotPrepared);
        }
        let mut active = false;
        for index in 0..self.solvers.len() {
            let bodies = self.constrained_bodies[index];
            let state = Self::load_bodies(store, bodies)?;
            let solver = &mut self.solvers[index];
            solver.set_freeze_scale(None, 1.0);
            solver.update(dt, state.map(|body| body.motion));

            let mut corrections = 0;
            for _ in 0..self.solver_settings.apply_push_out_pair_iterations {
                corrections += solver.apply_projections(dt, &self.solver_settings, &self.settings[index]);
            }
            if corrections == 0 {
                continue;
            }
            active = true;
            trace!(joint = self.index_to_handle[index].0, corrections, "Projected joint");

            let solved = solver.state();
            for (body, handle) in bodies.iter().enumerate() {
                if solved.is_dynamic(body) {
                    store.write_pose(*handle, solved.pose(body));
                    store.write_velocity(*handle, solved.velocity(body));
                }
            }
        }
        Ok(active)
    }

    /// Measures the current connector placement of a joint from the body store.
    pub fn calculate_constraint_space<S: IJointBodyStore + ?Sized>(
        &self,
        handle: JointHandle,
        store: &S,
    ) -> Result<ConstraintSpace, JointError> {
        let index = self.index_of(handle)?;
        let bodies = Self::load_bodies(store, self.constrained_bodies[index])?;
        let frames = &self.frames[index];

        let mut connector_positions = [Vec3::ZERO; 2];
        let mut connector_rotations = [Quat::IDENTITY; 2];
        for body in 0..2 {
            let pose = bodies[body].motion.pose;
            let connector = RigidPose::multiply(&frames[body], &pose);
            connector_positions[body] = connector.position;
            connector_rotations[body] = quaternion_ex::normalize(connector.orientation);
        }
        connector_rotations[1] = quaternion_ex::enforce_shortest_arc_with(connector_rotations[1], connector_rotations[0]);

        Ok(ConstraintSpace {
            connector_positions,
            connector_rotations,
            angles: joint_utilities::get_angles(
                connector_rotations[0],
                connector_rotations[1],
                self.solver_settings.swing_twist_angle_tolerance,
            ),
        })
    }

    /// Solver state of a joint while prepared.
    pub fn solver_state(&self, handle: JointHandle) -> Result<&JointSolverState, JointError> {
        if !self.prepared {
            return Err(JointError::NotPrepared);
        }
        Ok(self.solvers[self.index_of(handle)?].state())
    }

    pub fn set_pre_apply_callback(&mut self, callback: JointCallback) {
        self.pre_apply_callback = Some(callback);
    }

    pub fn set_post_apply_callback(&mut self, callback: JointCallback) {
        self.post_apply_callback = Some(callback);
    }

    pub fn clear_pre_apply_callback(&mut self) {
        self.pre_apply_callback = None;
    }

    pub fn clear_post_apply_callback(&mut self) {
        self.post_apply_callback = None;
    }
}
