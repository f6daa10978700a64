use glam::Vec3;

use super::body_properties::{BodyInertia, BodyVelocity, MotionState, RigidPose};
use super::handles::BodyHandle;

/// A body as seen by the joint solvers: the pose at the start of the step, the current
/// (predicted) pose and velocity, and the inverse mass properties.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RigidBodyRef {
    /// Pose at the start of the step, before integration.
    pub previous_pose: RigidPose,
    /// Current pose and velocity.
    pub motion: MotionState,
    /// Inverse mass and local inverse inertia. Zero for kinematic and static bodies.
    pub inertia: BodyInertia,
}

impl RigidBodyRef {
    /// Creates a body at rest.
    pub fn new(pose: RigidPose, inertia: BodyInertia) -> Self {
        Self {
            previous_pose: pose,
            motion: MotionState {
                pose,
                velocity: BodyVelocity::default(),
            },
            inertia,
        }
    }
}

/// Narrow view of the rigid body store used by the joint container.
///
/// The container reads body state before solving each joint and writes back only what changed.
pub trait IJointBodyStore {
    /// Gets the current state of a body, or `None` if the handle is unknown.
    fn body(&self, handle: BodyHandle) -> Option<RigidBodyRef>;

    /// Stores a corrected pose.
    fn write_pose(&mut self, handle: BodyHandle, pose: RigidPose);

    /// Stores a corrected velocity.
    fn write_velocity(&mut self, handle: BodyHandle, velocity: BodyVelocity);
}

/// Minimal contiguous body store. Handles index directly into the backing vector.
#[derive(Debug, Clone, Default)]
pub struct BodySet {
    bodies: Vec<RigidBodyRef>,
}

impl BodySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a body and returns its handle.
    pub fn add(&mut self, body: RigidBodyRef) -> BodyHandle {
        self.bodies.push(body);
        BodyHandle(self.bodies.len() as i32 - 1)
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    #[inline(always)]
    pub fn get(&self, handle: BodyHandle) -> Option<&RigidBodyRef> {
        usize::try_from(handle.0).ok().and_then(|index| self.bodies.get(index))
    }

    #[inline(always)]
    pub fn get_mut(&mut self, handle: BodyHandle) -> Option<&mut RigidBodyRef> {
        usize::try_from(handle.0)
            .ok()
            .and_then(|index| self.bodies.get_mut(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &RigidBodyRef> {
        self.bodies.iter()
    }

    /// Begins a step: records the current pose as the previous pose, applies `gravity` to dynamic
    /// bodies and predicts their poses by integrating velocity over `dt`.
    pub fn integrate(&mut self, dt: f32, gravity: Vec3) {
        for body in self.bodies.iter_mut() {
            body.previous_pose = body.motion.pose;
            if !body.inertia.is_dynamic() {
                continue;
            }
            let velocity = &mut body.motion.velocity;
            velocity.linear += gravity * dt;
            let pose = &mut body.motion.pose;
            pose.position += velocity.linear * dt;
            pose.orientation =
                crate::utilities::quaternion_ex::integrate_rotation(pose.orientation, velocity.angular * dt);
        }
    }

    /// Ends a step: derives velocities of dynamic bodies from the pose change since
    /// [`integrate`](Self::integrate).
    pub fn update_velocities(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        for body in self.bodies.iter_mut() {
            if !body.inertia.is_dynamic() {
                continue;
            }
            let pose = body.motion.pose;
            body.motion.velocity = BodyVelocity::new(
                (pose.position - body.previous_pose.position) / dt,
                crate::utilities::quaternion_ex::calculate_angular_velocity(
                    body.previous_pose.orientation,
                    pose.orientation,
                    dt,
                ),
            );
        }
    }
}

impl IJointBodyStore for BodySet {
    fn body(&self, handle: BodyHandle) -> Option<RigidBodyRef> {
        self.get(handle).copied()
    }

    fn write_pose(&mut self, handle: BodyHandle, pose: RigidPose) {
        if let Some(body) = self.get_mut(handle) {
            body.motion.pose = pose;
        }
    }

    fn write_velocity(&mut self, handle: BodyHandle, velocity: BodyVelocity) {
        if let Some(body) = self.get_mut(handle) {
            body.motion.velocity = velocity;
        }
    }
}
