use glam::{Quat, Vec3};

/// Provides helper functions for validating joint parameter values.
pub struct ConstraintChecker;

impl ConstraintChecker {
    /// Checks if a value is a finite number, meaning neither infinite nor NaN.
    #[inline(always)]
    pub fn is_finite_number(value: f32) -> bool {
        value.is_finite()
    }

    /// Checks if a value is a finite value greater than or equal to zero and not NaN.
    #[inline(always)]
    pub fn is_nonnegative_number(value: f32) -> bool {
        Self::is_finite_number(value) && value >= 0.0
    }

    /// Checks if a value is a finite value in [0, 1].
    #[inline(always)]
    pub fn is_unit_interval_number(value: f32) -> bool {
        Self::is_nonnegative_number(value) && value <= 1.0
    }

    /// Checks that an optional override is either absent or a finite number.
    #[inline(always)]
    pub fn is_valid_override(value: Option<f32>) -> bool {
        value.map_or(true, Self::is_finite_number)
    }

    #[inline(always)]
    pub fn is_finite_vec3(v: Vec3) -> bool {
        v.is_finite()
    }

    #[inline(always)]
    pub fn is_unit_length_quat(q: Quat) -> bool {
        let length_squared = q.length_squared();
        Self::is_finite_number(length_squared) && (length_squared - 1.0).abs() <= 1e-4
    }
}
