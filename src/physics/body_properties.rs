use glam::{Quat, Vec3};
use std::fmt;

use crate::utilities::matrix3x3::Matrix3x3;
use crate::utilities::quaternion_ex;
use crate::utilities::symmetric3x3::Symmetric3x3;

/// Represents a rigid transformation.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidPose {
    /// Orientation of the pose.
    pub orientation: Quat,
    /// Position of the pose.
    pub position: Vec3,
}

impl Default for RigidPose {
    #[inline(always)]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl RigidPose {
    /// Returns a pose with a position at (0,0,0) and identity orientation.
    pub const IDENTITY: Self = Self {
        orientation: Quat::IDENTITY,
        position: Vec3::ZERO,
    };

    /// Creates a rigid pose with the given position and orientation.
    #[inline(always)]
    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Creates a rigid pose with the given position and identity orientation.
    #[inline(always)]
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            orientation: Quat::IDENTITY,
        }
    }

    /// Transforms a point from the pose's local space into its parent space.
    #[inline(always)]
    pub fn transform(v: Vec3, pose: &RigidPose) -> Vec3 {
        quaternion_ex::transform(v, pose.orientation) + pose.position
    }

    /// Transforms a point from the pose's parent space into its local space.
    #[inline(always)]
    pub fn transform_by_inverse(v: Vec3, pose: &RigidPose) -> Vec3 {
        quaternion_ex::transform(v - pose.position, quaternion_ex::conjugate(pose.orientation))
    }

    /// Concatenates a local pose onto a parent pose: the result places `local` in the parent's
    /// parent space.
    #[inline(always)]
    pub fn multiply(local: &RigidPose, parent: &RigidPose) -> RigidPose {
        RigidPose {
            orientation: parent.orientation * local.orientation,
            position: Self::transform(local.position, parent),
        }
    }
}

impl From<Vec3> for RigidPose {
    fn from(position: Vec3) -> Self {
        Self::from_position(position)
    }
}

impl From<(Vec3, Quat)> for RigidPose {
    fn from((position, orientation): (Vec3, Quat)) -> Self {
        Self::new(position, orientation)
    }
}

impl fmt::Display for RigidPose {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}, {}", self.position, self.orientation)
    }
}

/// Linear and angular velocity for a body.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BodyVelocity {
    /// Linear velocity associated with the body.
    pub linear: Vec3,
    /// Angular velocity associated with the body.
    pub angular: Vec3,
}

impl BodyVelocity {
    /// Creates a new set of body velocities. Angular velocity is set to zero.
    #[inline(always)]
    pub fn from_linear(linear: Vec3) -> Self {
        Self {
            linear,
            angular: Vec3::ZERO,
        }
    }

    /// Creates a new set of body velocities.
    #[inline(always)]
    pub fn new(linear: Vec3, angular: Vec3) -> Self {
        Self { linear, angular }
    }
}

impl From<Vec3> for BodyVelocity {
    fn from(linear: Vec3) -> Self {
        Self::from_linear(linear)
    }
}

impl fmt::Display for BodyVelocity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}, {}", self.linear, self.angular)
    }
}

/// Stores the inertia for a body.
///
/// Joint solving only ever needs the inverse, and bodies are assumed to be expressed in their
/// principal frame, so the local inverse inertia is diagonal.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BodyInertia {
    /// Diagonal of the body's local inverse inertia tensor.
    pub inverse_inertia: Vec3,
    /// Inverse of the body's mass.
    pub inverse_mass: f32,
}

impl BodyInertia {
    /// Inertia of a body that the solver must never move.
    pub const KINEMATIC: Self = Self {
        inverse_inertia: Vec3::ZERO,
        inverse_mass: 0.0,
    };

    /// Creates the inverse inertia of a body with the given mass and principal moments.
    /// A non-positive mass produces a kinematic body.
    pub fn from_mass(mass: f32, inertia: Vec3) -> Self {
        if mass <= 0.0 {
            return Self::KINEMATIC;
        }
        let invert = |value: f32| if value > 0.0 { 1.0 / value } else { 0.0 };
        Self {
            inverse_inertia: Vec3::new(invert(inertia.x), invert(inertia.y), invert(inertia.z)),
            inverse_mass: 1.0 / mass,
        }
    }

    /// Kinematic and static bodies carry zero inverse mass.
    #[inline(always)]
    pub fn is_dynamic(&self) -> bool {
        self.inverse_mass > 0.0
    }

    /// Rotates the local diagonal inverse inertia into world space: R * diag(invI) * transpose(R).
    #[inline(always)]
    pub fn compute_world_inverse_inertia(orientation: Quat, local_inverse_inertia: Vec3) -> Symmetric3x3 {
        let r = Matrix3x3::create_from_quaternion(orientation);
        let local = Symmetric3x3::from_diagonal(local_inverse_inertia);
        let mut world = Symmetric3x3::ZERO;
        Symmetric3x3::rotation_sandwich(&r, &local, &mut world);
        world
    }
}

impl fmt::Display for BodyInertia {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}, {}", self.inverse_mass, self.inverse_inertia)
    }
}

/// Describes the pose and velocity of a body.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MotionState {
    /// Pose of the body.
    pub pose: RigidPose,
    /// Linear and angular velocity of the body.
    pub velocity: BodyVelocity,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_pose_transform_round_trip() {
        let pose = RigidPose::new(
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_axis_angle(Vec3::new(0.0, 1.0, 1.0).normalize(), 1.2),
        );
        let point = Vec3::new(-0.5, 0.25, 4.0);
        let world = RigidPose::transform(point, &pose);
        let local = RigidPose::transform_by_inverse(world, &pose);
        assert_abs_diff_eq!(local.x, point.x, epsilon = 1e-5);
        assert_abs_diff_eq!(local.y, point.y, epsilon = 1e-5);
        assert_abs_diff_eq!(local.z, point.z, epsilon = 1e-5);
    }

    #[test]
    fn test_world_inverse_inertia_transforms_like_tensor() {
        let orientation = Quat::from_axis_angle(Vec3::X, 0.9);
        let local = Vec3::new(1.0, 0.5, 0.25);
        let world = BodyInertia::compute_world_inverse_inertia(orientation, local);
        // Applying the world tensor equals rotating into local space, scaling, and rotating back.
        let v = Vec3::new(0.3, -1.0, 2.0);
        let expected = orientation * (local * (orientation.inverse() * v));
        let actual = Symmetric3x3::transform(v, &world);
        assert_abs_diff_eq!(actual.x, expected.x, epsilon = 1e-5);
        assert_abs_diff_eq!(actual.y, expected.y, epsilon = 1e-5);
        assert_abs_diff_eq!(actual.z, expected.z, epsilon = 1e-5);
    }

    #[test]
    fn test_from_mass() {
        let inertia = BodyInertia::from_mass(2.0, Vec3::new(4.0, 0.0, 8.0));
        assert_eq!(inertia.inverse_mass, 0.5);
        assert_eq!(inertia.inverse_inertia, Vec3::new(0.25, 0.0, 0.125));
        assert!(!BodyInertia::from_mass(0.0, Vec3::ONE).is_dynamic());
    }
}
