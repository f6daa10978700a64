use glam::{Quat, Vec3};

use super::constraint_checker::ConstraintChecker;
use super::joint_settings::JointForceMode;

/// Linear drive that pulls the child connector toward a target position and/or velocity,
/// expressed in the parent connector's frame.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearDriveSettings {
    /// Per-axis position drive enable.
    pub position_enabled: [bool; 3],
    /// Per-axis velocity drive enable.
    pub velocity_enabled: [bool; 3],
    /// Target separation of the connectors in the parent connector frame.
    pub position_target: Vec3,
    /// Target rate of change of the separation in the parent connector frame.
    pub velocity_target: Vec3,
    pub stiffness: f32,
    pub damping: f32,
    pub force_mode: JointForceMode,
}

impl Default for LinearDriveSettings {
    fn default() -> Self {
        Self {
            position_enabled: [false; 3],
            velocity_enabled: [false; 3],
            position_target: Vec3::ZERO,
            velocity_target: Vec3::ZERO,
            stiffness: 0.0,
            damping: 0.0,
            force_mode: JointForceMode::Acceleration,
        }
    }
}

impl LinearDriveSettings {
    /// Whether the drive acts on the given axis at all.
    #[inline(always)]
    pub fn is_axis_enabled(&self, axis: usize) -> bool {
        self.position_enabled[axis] || self.velocity_enabled[axis]
    }

    /// Checks if a settings instance has valid values.
    pub fn validate(settings: &LinearDriveSettings) -> bool {
        ConstraintChecker::is_nonnegative_number(settings.stiffness)
            && ConstraintChecker::is_nonnegative_number(settings.damping)
            && ConstraintChecker::is_finite_vec3(settings.position_target)
            && ConstraintChecker::is_finite_vec3(settings.velocity_target)
    }
}

/// Angular drive toward a target relative rotation and/or angular velocity of the child
/// connector with respect to the parent connector.
///
/// The SLERP drive acts on the full rotation error at once; the twist and swing drives act on
/// the decomposed components separately. The two styles are mutually exclusive, SLERP winning
/// when enabled and no angular axis is locked.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngularDriveSettings {
    pub slerp_position_enabled: bool,
    pub slerp_velocity_enabled: bool,
    pub twist_position_enabled: bool,
    pub twist_velocity_enabled: bool,
    pub swing_position_enabled: bool,
    pub swing_velocity_enabled: bool,
    /// Target rotation of the child connector relative to the parent connector.
    pub position_target: Quat,
    /// Target angular velocity in the parent connector frame. X is twist, Z is swing 1 and
    /// Y is swing 2.
    pub velocity_target: Vec3,
    pub stiffness: f32,
    pub damping: f32,
    pub force_mode: JointForceMode,
}

impl Default for AngularDriveSettings {
    fn default() -> Self {
        Self {
            slerp_position_enabled: false,
            slerp_velocity_enabled: false,
            twist_position_enabled: false,
            twist_velocity_enabled: false,
            swing_position_enabled: false,
            swing_velocity_enabled: false,
            position_target: Quat::IDENTITY,
            velocity_target: Vec3::ZERO,
            stiffness: 0.0,
            damping: 0.0,
            force_mode: JointForceMode::Acceleration,
        }
    }
}

impl AngularDriveSettings {
    #[inline(always)]
    pub fn is_slerp_enabled(&self) -> bool {
        self.slerp_position_enabled || self.slerp_velocity_enabled
    }

    #[inline(always)]
    pub fn is_twist_enabled(&self) -> bool {
        self.twist_position_enabled || self.twist_velocity_enabled
    }

    #[inline(always)]
    pub fn is_swing_enabled(&self) -> bool {
        self.swing_position_enabled || self.swing_velocity_enabled
    }

    /// Checks if a settings instance has valid values.
    pub fn validate(settings: &AngularDriveSettings) -> bool {
        ConstraintChecker::is_nonnegative_number(settings.stiffness)
            && ConstraintChecker::is_nonnegative_number(settings.damping)
            && ConstraintChecker::is_unit_length_quat(settings.position_target)
            && ConstraintChecker::is_finite_vec3(settings.velocity_target)
    }
}
