use super::constraint_checker::ConstraintChecker;
use super::joint_settings::JointForceMode;

/// Stiffness and damping of a soft (compliant) joint limit.
///
/// Soft limits behave like a damped spring pushing back once the limit is exceeded, rather than
/// being corrected immediately.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoftSpringSettings {
    /// Whether the limit is soft. When false the limit is solved as a hard constraint.
    pub enabled: bool,
    /// Spring stiffness. Units depend on `force_mode`.
    pub stiffness: f32,
    /// Spring damping. Units depend on `force_mode`.
    pub damping: f32,
    /// Whether stiffness and damping are mass-independent accelerations or forces.
    pub force_mode: JointForceMode,
}

impl Default for SoftSpringSettings {
    fn default() -> Self {
        Self::DISABLED
    }
}

impl SoftSpringSettings {
    /// Hard limit.
    pub const DISABLED: Self = Self {
        enabled: false,
        stiffness: 0.0,
        damping: 0.0,
        force_mode: JointForceMode::Acceleration,
    };

    /// Checks if a spring settings instance contains valid values.
    #[inline(always)]
    pub fn validate(settings: &SoftSpringSettings) -> bool {
        ConstraintChecker::is_nonnegative_number(settings.stiffness)
            && ConstraintChecker::is_nonnegative_number(settings.damping)
    }

    /// Constructs an enabled soft limit.
    ///
    /// * `stiffness`: Spring stiffness, in acceleration or force units depending on the mode.
    /// * `damping`: Spring damping, in the same units.
    /// * `force_mode`: Acceleration mode scales the spring by the joint's effective mass so the
    ///   response does not depend on the attached bodies' masses.
    pub fn new(stiffness: f32, damping: f32, force_mode: JointForceMode) -> Self {
        let settings = Self {
            enabled: true,
            stiffness,
            damping,
            force_mode,
        };
        debug_assert!(
            Self::validate(&settings),
            "Soft spring settings must have nonnegative stiffness and damping."
        );
        settings
    }

    #[inline(always)]
    pub fn is_acceleration_mode(&self) -> bool {
        self.force_mode == JointForceMode::Acceleration
    }
}
