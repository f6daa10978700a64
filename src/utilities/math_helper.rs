use std::f32::consts::PI;

/// Tolerance used to reject near-zero denominators and degenerate axes.
pub const SMALL_NUMBER: f32 = 1e-8;

/// Coarser tolerance used where a value is effectively zero for solver purposes, e.g. a damping
/// coefficient too small to warrant a velocity estimate.
pub const KINDA_SMALL_NUMBER: f32 = 1e-4;

pub const TWO_PI: f32 = 2.0 * PI;

/// Clamps a value between a minimum and maximum value.
#[inline(always)]
pub fn clamp<T: PartialOrd>(value: T, min: T, max: T) -> T {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

/// Returns the higher value of the two parameters.
#[inline(always)]
pub fn max<T: PartialOrd>(a: T, b: T) -> T {
    if a > b {
        a
    } else {
        b
    }
}

/// Returns -1 if the value is negative and 1 otherwise.
#[inline(always)]
pub fn binary_sign(x: f32) -> f32 {
    if x < 0.0 {
        -1.0
    } else {
        1.0
    }
}

/// Wraps an angle into the [-PI, PI] interval.
#[inline(always)]
pub fn wrap_angle(angle: f32) -> f32 {
    let mut wrapped = angle % TWO_PI;
    if wrapped > PI {
        wrapped -= TWO_PI;
    } else if wrapped < -PI {
        wrapped += TWO_PI;
    }
    wrapped
}

/// Computes the signed difference between two angles, wrapped into [-PI, PI].
#[inline(always)]
pub fn get_signed_angle_difference(a: f32, b: f32) -> f32 {
    wrap_angle(b - a)
}

/// Checks whether two values are within the given tolerance of each other.
#[inline(always)]
pub fn is_nearly_equal(a: f32, b: f32, tolerance: f32) -> bool {
    (a - b).abs() <= tolerance
}

/// Returns the value with its magnitude reduced by `limit`, or 0 when the magnitude is within it.
/// Sign is preserved, so 1.5 against a limit of 1 yields 0.5 and -1.5 yields -0.5.
#[inline(always)]
pub fn excess_beyond_limit(value: f32, limit: f32) -> f32 {
    if value > limit {
        value - limit
    } else if value < -limit {
        value + limit
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_wrap_angle() {
        assert_abs_diff_eq!(wrap_angle(3.0 * PI / 2.0), -PI / 2.0, epsilon = 1e-5);
        assert_abs_diff_eq!(wrap_angle(-3.0 * PI / 2.0), PI / 2.0, epsilon = 1e-5);
        assert_abs_diff_eq!(wrap_angle(0.25), 0.25);
        assert_abs_diff_eq!(get_signed_angle_difference(-3.0, 3.0), 6.0 - TWO_PI, epsilon = 1e-5);
    }

    #[test]
    fn test_excess_beyond_limit() {
        assert_eq!(excess_beyond_limit(0.5, 1.0), 0.0);
        assert_abs_diff_eq!(excess_beyond_limit(1.5, 1.0), 0.5);
        assert_abs_diff_eq!(excess_beyond_limit(-1.5, 1.0), -0.5);
        assert_abs_diff_eq!(excess_beyond_limit(-0.25, 0.0), -0.25);
    }
}
