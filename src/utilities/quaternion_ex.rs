use crate::utilities::math_helper::{self, SMALL_NUMBER, TWO_PI};
use glam::{Quat, Vec3};
use std::f32::consts::PI;

/// Ensures the quaternion has unit length. Degenerate quaternions collapse to identity.
#[inline(always)]
pub fn normalize(quaternion: Quat) -> Quat {
    let length_squared = quaternion.length_squared();
    if length_squared > SMALL_NUMBER {
        quaternion * (1.0 / length_squared.sqrt())
    } else {
        Quat::IDENTITY
    }
}

/// Computes the conjugate of the quaternion.
#[inline(always)]
pub fn conjugate(quaternion: Quat) -> Quat {
    Quat::from_xyzw(-quaternion.x, -quaternion.y, -quaternion.z, quaternion.w)
}

/// Transforms the vector using a quaternion.
#[inline(always)]
pub fn transform(v: Vec3, rotation: Quat) -> Vec3 {
    rotation * v
}

/// Creates a quaternion from an axis and angle.
#[inline(always)]
pub fn create_from_axis_angle(axis: Vec3, angle: f32) -> Quat {
    let half_angle: f64 = angle as f64 * 0.5;
    let s: f64 = half_angle.sin();
    Quat::from_xyzw(
        (axis.x as f64 * s) as f32,
        (axis.y as f64 * s) as f32,
        (axis.z as f64 * s) as f32,
        half_angle.cos() as f32,
    )
}

/// Computes the rotation from the start orientation to the end orientation such that
/// end = start * relative.
#[inline(always)]
pub fn relative_rotation(start: Quat, end: Quat) -> Quat {
    conjugate(start) * end
}

/// Returns `quaternion`, negated if necessary so that it lies in the same hemisphere as `other`.
/// Both signs encode the same orientation; picking the closer one keeps interpolation and
/// relative-rotation math on the short arc.
#[inline(always)]
pub fn enforce_shortest_arc_with(quaternion: Quat, other: Quat) -> Quat {
    if quaternion.dot(other) < 0.0 {
        -quaternion
    } else {
        quaternion
    }
}

/// Computes the axis and angle of a quaternion. The angle lies in [0, 2 * PI].
/// When the rotation axis cannot be resolved (length of the vector part below `tolerance`),
/// `default_axis` is returned together with the angle.
#[inline(always)]
pub fn to_axis_and_angle_safe(q: Quat, default_axis: Vec3, tolerance: f32) -> (Vec3, f32) {
    let vector_part = q.xyz();
    let sin_half_angle = vector_part.length();
    let angle = 2.0 * sin_half_angle.atan2(q.w);
    if sin_half_angle > tolerance {
        (vector_part / sin_half_angle, angle)
    } else {
        (default_axis, angle)
    }
}

/// Computes the axis-angle of a quaternion as a signed angle in [-PI, PI] about the returned axis.
#[inline(always)]
pub fn to_axis_and_signed_angle_safe(q: Quat, default_axis: Vec3, tolerance: f32) -> (Vec3, f32) {
    let (axis, mut angle) = to_axis_and_angle_safe(q, default_axis, tolerance);
    if angle > PI {
        angle -= TWO_PI;
    }
    (axis, angle)
}

/// Splits a rotation into a twist about the X axis and the remaining swing, such that
/// `q = swing * twist`.
///
/// A swing of exactly 180 degrees leaves the twist undefined; in that case the twist is identity
/// and the whole rotation is reported as swing.
#[inline(always)]
pub fn to_swing_twist_x(q: Quat) -> (Quat, Quat) {
    let twist_length_squared = q.x * q.x + q.w * q.w;
    let twist = if twist_length_squared > SMALL_NUMBER {
        let inverse_length = 1.0 / twist_length_squared.sqrt();
        Quat::from_xyzw(q.x * inverse_length, 0.0, 0.0, q.w * inverse_length)
    } else {
        Quat::IDENTITY
    };
    let swing = normalize(q * conjugate(twist));
    (swing, twist)
}

/// Applies a small rotation `delta` (axis scaled by angle) to the orientation using the first-order
/// update `q += 0.5 * (delta, 0) * q`, then renormalizes.
#[inline(always)]
pub fn integrate_rotation(orientation: Quat, delta: Vec3) -> Quat {
    let spin = Quat::from_xyzw(delta.x, delta.y, delta.z, 0.0) * orientation;
    normalize(orientation + spin * 0.5)
}

/// Computes the angular velocity that rotates `start` into `end` over `dt`.
#[inline(always)]
pub fn calculate_angular_velocity(start: Quat, end: Quat, dt: f32) -> Vec3 {
    if dt <= SMALL_NUMBER {
        return Vec3::ZERO;
    }
    let delta = enforce_shortest_arc_with(end * conjugate(start), Quat::IDENTITY);
    let (axis, angle) = to_axis_and_angle_safe(delta, Vec3::X, SMALL_NUMBER);
    axis * (angle / dt)
}

/// Computes the angle change represented by a normalized quaternion, in [0, PI].
#[inline(always)]
pub fn angle_from_quaternion(q: Quat) -> f32 {
    let qw = math_helper::clamp(q.w.abs(), 0.0, 1.0);
    2.0 * q.xyz().length().atan2(qw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_swing_twist_recomposes() {
        let twist = create_from_axis_angle(Vec3::X, 0.7);
        let swing = create_from_axis_angle(Vec3::new(0.0, 0.6, 0.8), -1.1);
        let (decomposed_swing, decomposed_twist) = to_swing_twist_x(swing * twist);
        assert_abs_diff_eq!(decomposed_twist.dot(twist).abs(), 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(decomposed_swing.dot(swing).abs(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_half_turn_swing_has_identity_twist() {
        let swing = create_from_axis_angle(Vec3::Y, PI);
        let (decomposed_swing, decomposed_twist) = to_swing_twist_x(swing);
        assert_eq!(decomposed_twist, Quat::IDENTITY);
        assert_abs_diff_eq!(angle_from_quaternion(decomposed_swing), PI, epsilon = 1e-5);
    }

    #[test]
    fn test_integrate_rotation_matches_small_axis_angle() {
        let start = create_from_axis_angle(Vec3::Z, 0.3);
        let delta = Vec3::new(0.0, 0.0, 1e-3);
        let integrated = integrate_rotation(start, delta);
        let expected = create_from_axis_angle(Vec3::Z, 0.301);
        assert_abs_diff_eq!(integrated.dot(expected), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_angular_velocity_round_trip() {
        let start = create_from_axis_angle(Vec3::new(1.0, 2.0, 3.0).normalize(), 0.4);
        let omega = Vec3::new(0.5, -1.0, 2.0);
        let dt = 1.0 / 60.0;
        let end = create_from_axis_angle(omega.normalize(), omega.length() * dt) * start;
        let recovered = calculate_angular_velocity(start, end, dt);
        assert_abs_diff_eq!(recovered.x, omega.x, epsilon = 1e-2);
        assert_abs_diff_eq!(recovered.y, omega.y, epsilon = 1e-2);
        assert_abs_diff_eq!(recovered.z, omega.z, epsilon = 1e-2);
    }

    #[test]
    fn test_shortest_arc() {
        let q = create_from_axis_angle(Vec3::Y, 0.2);
        assert_eq!(enforce_shortest_arc_with(-q, q), q);
        assert_eq!(enforce_shortest_arc_with(q, q), q);
    }
}
