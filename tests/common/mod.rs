//! Shared scene setup for the joint integration tests.
#![allow(dead_code)]

use glam::{Quat, Vec3};
use rust_pbd_joints::physics::constraints::{JointSettings, JointSolverSettings};
use rust_pbd_joints::physics::{
    BodyHandle, BodyInertia, BodySet, JointConstraints, JointError, JointHandle, RigidBodyRef, RigidPose,
};

pub const DT: f32 = 1.0 / 60.0;
pub const GRAVITY: Vec3 = Vec3::new(0.0, -9.8, 0.0);

pub struct Scene {
    pub bodies: BodySet,
    pub joints: JointConstraints,
}

impl Scene {
    pub fn new(solver_settings: JointSolverSettings) -> Self {
        Self {
            bodies: BodySet::new(),
            joints: JointConstraints::new(solver_settings),
        }
    }

    pub fn add_anchor(&mut self, position: Vec3) -> BodyHandle {
        self.bodies
            .add(RigidBodyRef::new(RigidPose::from_position(position), BodyInertia::KINEMATIC))
    }

    /// Adds a dynamic box-like body with the given mass and principal moments scaled by it.
    pub fn add_body(&mut self, position: Vec3, orientation: Quat, mass: f32) -> BodyHandle {
        self.bodies.add(RigidBodyRef::new(
            RigidPose::new(position, orientation),
            BodyInertia::from_mass(mass, Vec3::splat(mass / 6.0)),
        ))
    }

    /// Joins `parent` and `child` at a world position with both connector frames aligned to the
    /// world axes.
    pub fn add_joint_at(
        &mut self,
        parent: BodyHandle,
        child: BodyHandle,
        world_position: Vec3,
        settings: JointSettings,
    ) -> Result<JointHandle, JointError> {
        let frames = [parent, child].map(|body| {
            let pose = self.bodies.get(body).map(|body| body.motion.pose).unwrap_or_default();
            RigidPose::new(
                RigidPose::transform_by_inverse(world_position, &pose),
                pose.orientation.conjugate(),
            )
        });
        self.joints.add_constraint([parent, child], frames, settings)
    }

    /// Runs one step: integrate, solve, derive velocities, project.
    pub fn step(&mut self, iterations: usize, gravity: Vec3) -> Result<(), JointError> {
        self.bodies.integrate(DT, gravity);
        self.joints.prepare_constraints(DT, &self.bodies)?;
        let num_iterations = iterations as u32;
        for iteration in 0..num_iterations {
            self.joints.apply(DT, &mut self.bodies, iteration, num_iterations)?;
        }
        self.bodies.update_velocities(DT);
        self.joints.apply_push_out(DT, &mut self.bodies)?;
        self.joints.unprepare_constraints();
        Ok(())
    }

    pub fn run(&mut self, steps: usize, iterations: usize, gravity: Vec3) -> Result<(), JointError> {
        for _ in 0..steps {
            self.step(iterations, gravity)?;
        }
        Ok(())
    }

    pub fn pose(&self, body: BodyHandle) -> RigidPose {
        self.bodies.get(body).map(|body| body.motion.pose).unwrap_or_default()
    }

    /// Distance between the two connectors of a joint.
    pub fn joint_separation(&self, joint: JointHandle) -> f32 {
        let space = self
            .joints
            .calculate_constraint_space(joint, &self.bodies)
            .expect("joint and bodies exist");
        (space.connector_positions[1] - space.connector_positions[0]).length()
    }
}
