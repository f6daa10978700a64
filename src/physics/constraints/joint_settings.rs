use glam::Vec3;

use super::constraint_checker::ConstraintChecker;
use super::motor_settings::{AngularDriveSettings, LinearDriveSettings};
use super::spring_settings::SoftSpringSettings;
use crate::physics::body_properties::RigidPose;
use crate::utilities::math_helper;

/// Hard angular limits smaller than this are locked instead, since the axis of a near-zero
/// limited rotation is numerically meaningless.
pub const MIN_ANGULAR_LIMIT: f32 = 0.01;

/// How a single degree of freedom of a joint may move.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum JointMotionType {
    #[default]
    Free,
    Limited,
    Locked,
}

/// Units of soft limit and drive stiffness/damping.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum JointForceMode {
    /// Stiffness and damping are scaled by the joint's effective mass, so the response is the
    /// same for light and heavy bodies.
    #[default]
    Acceleration,
    /// Stiffness and damping are forces; heavier bodies respond less.
    Force,
}

/// Angular degrees of freedom, used to index `angular_motion_types` and `angular_limits`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AngularAxis {
    /// Rotation about the connector X axis.
    Twist = 0,
    /// Rotation about the connector Z axis.
    Swing1 = 1,
    /// Rotation about the connector Y axis.
    Swing2 = 2,
}

impl AngularAxis {
    pub const ALL: [AngularAxis; 3] = [AngularAxis::Twist, AngularAxis::Swing1, AngularAxis::Swing2];

    #[inline(always)]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Connector-space axis that this degree of freedom rotates about.
    #[inline(always)]
    pub fn local_axis(self) -> Vec3 {
        match self {
            AngularAxis::Twist => Vec3::X,
            AngularAxis::Swing1 => Vec3::Z,
            AngularAxis::Swing2 => Vec3::Y,
        }
    }

    /// Component of a connector-space angular vector that belongs to this degree of freedom.
    #[inline(always)]
    pub fn component(self, v: Vec3) -> f32 {
        v.dot(self.local_axis())
    }
}

/// Local connector frames of both bodies, relative to each body's center of mass.
/// Body 0 is the parent.
pub type JointFrames = [RigidPose; 2];

/// Per-joint configuration: motion limits, soft limits, drives, projection and mass scaling.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointSettings {
    /// Fraction of the hard constraint error corrected per iteration, in [0, 1].
    pub stiffness: f32,
    /// Strength of the linear projection pass in [0, 1]. 0 disables it; 1 keeps the parent fixed.
    pub linear_projection: f32,
    /// Strength of the angular projection pass in [0, 1]. 0 disables it; 1 keeps the parent fixed.
    pub angular_projection: f32,
    /// Scale applied to the parent's inverse mass and inertia. Values below 1 make the parent
    /// heavier from the joint's point of view.
    pub parent_inverse_mass_scale: f32,

    pub linear_motion_types: [JointMotionType; 3],
    /// Distance limit shared by all `Limited` linear axes.
    pub linear_limit: f32,
    /// Indexed by [`AngularAxis`].
    pub angular_motion_types: [JointMotionType; 3],
    /// Angle limits in radians, indexed by [`AngularAxis`].
    pub angular_limits: [f32; 3],

    pub soft_linear_limit: SoftSpringSettings,
    pub soft_twist_limit: SoftSpringSettings,
    pub soft_swing_limit: SoftSpringSettings,

    pub linear_drive: LinearDriveSettings,
    pub angular_drive: AngularDriveSettings,
}

impl Default for JointSettings {
    fn default() -> Self {
        Self {
            stiffness: 1.0,
            linear_projection: 0.0,
            angular_projection: 0.0,
            parent_inverse_mass_scale: 1.0,
            linear_motion_types: [JointMotionType::Locked; 3],
            linear_limit: 0.0,
            angular_motion_types: [JointMotionType::Free; 3],
            angular_limits: [0.0; 3],
            soft_linear_limit: SoftSpringSettings::DISABLED,
            soft_twist_limit: SoftSpringSettings::DISABLED,
            soft_swing_limit: SoftSpringSettings::DISABLED,
            linear_drive: LinearDriveSettings::default(),
            angular_drive: AngularDriveSettings::default(),
        }
    }
}

impl JointSettings {
    /// Ball and socket: connectors locked together, rotation free.
    pub fn ball_socket() -> Self {
        Self::default()
    }

    /// Hinge about the connector X (twist) axis.
    pub fn hinge() -> Self {
        Self {
            angular_motion_types: [
                JointMotionType::Free,
                JointMotionType::Locked,
                JointMotionType::Locked,
            ],
            ..Self::default()
        }
    }

    /// Prismatic slider along the connector X axis with rotation locked.
    pub fn prismatic() -> Self {
        Self {
            linear_motion_types: [
                JointMotionType::Free,
                JointMotionType::Locked,
                JointMotionType::Locked,
            ],
            angular_motion_types: [JointMotionType::Locked; 3],
            ..Self::default()
        }
    }

    /// All six degrees of freedom locked.
    pub fn fixed() -> Self {
        Self {
            angular_motion_types: [JointMotionType::Locked; 3],
            ..Self::default()
        }
    }

    #[inline(always)]
    pub fn angular_motion(&self, axis: AngularAxis) -> JointMotionType {
        self.angular_motion_types[axis.index()]
    }

    #[inline(always)]
    pub fn angular_limit(&self, axis: AngularAxis) -> f32 {
        self.angular_limits[axis.index()]
    }

    /// Soft limit settings governing the given angular axis.
    #[inline(always)]
    pub fn soft_angular_limit(&self, axis: AngularAxis) -> &SoftSpringSettings {
        match axis {
            AngularAxis::Twist => &self.soft_twist_limit,
            AngularAxis::Swing1 | AngularAxis::Swing2 => &self.soft_swing_limit,
        }
    }

    /// Whether a linear axis is limited by a soft spring rather than a hard constraint.
    #[inline(always)]
    pub fn is_soft_linear_axis(&self, axis: usize) -> bool {
        self.soft_linear_limit.enabled && self.linear_motion_types[axis] == JointMotionType::Limited
    }

    /// Whether an angular axis is limited by a soft spring rather than a hard constraint.
    #[inline(always)]
    pub fn is_soft_angular_axis(&self, axis: AngularAxis) -> bool {
        self.soft_angular_limit(axis).enabled && self.angular_motion(axis) == JointMotionType::Limited
    }

    #[inline(always)]
    pub fn any_angular_locked(&self) -> bool {
        self.angular_motion_types.contains(&JointMotionType::Locked)
    }

    /// Normalizes the settings so the solvers can rely on simple invariants:
    /// * limits of axes that are not `Limited` are zero,
    /// * hard limits too small to resolve an axis are `Locked` instead,
    /// * the SLERP drive is off when any angular axis is locked,
    /// * fractions are clamped to their valid ranges.
    pub fn sanitize(&mut self) {
        let any_linear_limited = self.linear_motion_types.contains(&JointMotionType::Limited);
        if !any_linear_limited {
            self.linear_limit = 0.0;
        } else if self.linear_limit <= 0.0 && !self.soft_linear_limit.enabled {
            self.linear_limit = 0.0;
            for motion in self.linear_motion_types.iter_mut() {
                if *motion == JointMotionType::Limited {
                    *motion = JointMotionType::Locked;
                }
            }
        }

        for axis in AngularAxis::ALL {
            let index = axis.index();
            match self.angular_motion_types[index] {
                JointMotionType::Limited => {
                    let soft = self.soft_angular_limit(axis).enabled;
                    if !soft && self.angular_limits[index] < MIN_ANGULAR_LIMIT {
                        self.angular_motion_types[index] = JointMotionType::Locked;
                        self.angular_limits[index] = 0.0;
                    } else {
                        self.angular_limits[index] = self.angular_limits[index].max(0.0);
                    }
                }
                JointMotionType::Free | JointMotionType::Locked => {
                    self.angular_limits[index] = 0.0;
                }
            }
        }

        if self.any_angular_locked() {
            self.angular_drive.slerp_position_enabled = false;
            self.angular_drive.slerp_velocity_enabled = false;
        }

        self.stiffness = math_helper::clamp(self.stiffness, 0.0, 1.0);
        self.linear_projection = math_helper::clamp(self.linear_projection, 0.0, 1.0);
        self.angular_projection = math_helper::clamp(self.angular_projection, 0.0, 1.0);
        self.parent_inverse_mass_scale = self.parent_inverse_mass_scale.max(0.0);
    }

    /// Returns a sanitized copy.
    pub fn sanitized(mut self) -> Self {
        self.sanitize();
        self
    }

    /// Checks that every value is finite and within its domain.
    pub fn validate(settings: &JointSettings) -> bool {
        ConstraintChecker::is_unit_interval_number(settings.stiffness)
            && ConstraintChecker::is_unit_interval_number(settings.linear_projection)
            && ConstraintChecker::is_unit_interval_number(settings.angular_projection)
            && ConstraintChecker::is_nonnegative_number(settings.parent_inverse_mass_scale)
            && ConstraintChecker::is_nonnegative_number(settings.linear_limit)
            && settings
                .angular_limits
                .iter()
                .all(|limit| ConstraintChecker::is_nonnegative_number(*limit))
            && SoftSpringSettings::validate(&settings.soft_linear_limit)
            && SoftSpringSettings::validate(&settings.soft_twist_limit)
            && SoftSpringSettings::validate(&settings.soft_swing_limit)
            && LinearDriveSettings::validate(&settings.linear_drive)
            && AngularDriveSettings::validate(&settings.angular_drive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::constraints::joint_settings::JointForceMode;

    #[test]
    fn test_sanitize_zeroes_unused_limits() {
        let mut settings = JointSettings {
            linear_limit: 2.0,
            angular_limits: [0.5, 0.5, 0.5],
            angular_motion_types: [
                JointMotionType::Limited,
                JointMotionType::Free,
                JointMotionType::Locked,
            ],
            ..JointSettings::default()
        };
        settings.sanitize();
        assert_eq!(settings.linear_limit, 0.0);
        assert_eq!(settings.angular_limits, [0.5, 0.0, 0.0]);
    }

    #[test]
    fn test_sanitize_locks_zero_hard_limits() {
        let mut settings = JointSettings {
            linear_motion_types: [JointMotionType::Limited; 3],
            linear_limit: 0.0,
            angular_motion_types: [JointMotionType::Limited; 3],
            angular_limits: [0.0, 0.001, 0.2],
            ..JointSettings::default()
        };
        settings.sanitize();
        assert_eq!(settings.linear_motion_types, [JointMotionType::Locked; 3]);
        assert_eq!(
            settings.angular_motion_types,
            [
                JointMotionType::Locked,
                JointMotionType::Locked,
                JointMotionType::Limited
            ]
        );
    }

    #[test]
    fn test_sanitize_keeps_zero_soft_limits() {
        let mut settings = JointSettings {
            linear_motion_types: [JointMotionType::Limited; 3],
            soft_linear_limit: SoftSpringSettings::new(100.0, 0.0, JointForceMode::Force),
            angular_motion_types: [JointMotionType::Limited; 3],
            soft_swing_limit: SoftSpringSettings::new(10.0, 1.0, JointForceMode::Acceleration),
            ..JointSettings::default()
        };
        settings.sanitize();
        assert_eq!(settings.linear_motion_types, [JointMotionType::Limited; 3]);
        assert_eq!(
            settings.angular_motion_types,
            [
                JointMotionType::Locked,
                JointMotionType::Limited,
                JointMotionType::Limited
            ]
        );
    }

    #[test]
    fn test_slerp_drive_disabled_by_locked_axis() {
        let mut settings = JointSettings::hinge();
        settings.angular_drive.slerp_position_enabled = true;
        settings.sanitize();
        assert!(!settings.angular_drive.is_slerp_enabled());
    }

    #[test]
    fn test_prismatic_soft_axis() {
        let mut settings = JointSettings::prismatic();
        settings.linear_motion_types[0] = JointMotionType::Limited;
        settings.linear_limit = 0.5;
        settings.soft_linear_limit = SoftSpringSettings::new(50.0, 5.0, JointForceMode::Acceleration);
        assert!(settings.is_soft_linear_axis(0));
        assert!(!settings.is_soft_linear_axis(1));
        assert!(settings.any_angular_locked());
    }

    #[test]
    fn test_validate() {
        assert!(JointSettings::validate(&JointSettings::default()));
        let invalid = JointSettings {
            linear_limit: f32::NAN,
            ..JointSettings::default()
        };
        assert!(!JointSettings::validate(&invalid));
    }
}
