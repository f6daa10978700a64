use glam::{Quat, Vec3};
use std::f32::consts::PI;

use super::joint_settings::{AngularAxis, JointMotionType, JointSettings};
use super::joint_shape::LinearConstraintShape;
use super::solver_settings::JointSolverSettings;
use crate::utilities::math_helper::{self, KINDA_SMALL_NUMBER, SMALL_NUMBER};
use crate::utilities::quaternion_ex;
use crate::utilities::symmetric3x3::Symmetric3x3;

/// A solver-level override wins whenever it holds a positive value.
#[inline(always)]
pub fn resolve_override(override_value: Option<f32>, value: f32) -> f32 {
    match override_value {
        Some(override_value) if override_value > 0.0 => override_value,
        _ => value,
    }
}

#[inline(always)]
pub fn get_linear_stiffness(solver: &JointSolverSettings, joint: &JointSettings) -> f32 {
    resolve_override(solver.linear_stiffness_override, joint.stiffness)
}

#[inline(always)]
pub fn get_twist_stiffness(solver: &JointSolverSettings, joint: &JointSettings) -> f32 {
    resolve_override(solver.twist_stiffness_override, joint.stiffness)
}

#[inline(always)]
pub fn get_swing_stiffness(solver: &JointSolverSettings, joint: &JointSettings) -> f32 {
    resolve_override(solver.swing_stiffness_override, joint.stiffness)
}

#[inline(always)]
pub fn get_soft_linear_stiffness(solver: &JointSolverSettings, joint: &JointSettings) -> f32 {
    resolve_override(solver.soft_linear_stiffness_override, joint.soft_linear_limit.stiffness)
}

#[inline(always)]
pub fn get_soft_linear_damping(solver: &JointSolverSettings, joint: &JointSettings) -> f32 {
    resolve_override(solver.soft_linear_damping_override, joint.soft_linear_limit.damping)
}

#[inline(always)]
pub fn get_soft_twist_stiffness(solver: &JointSolverSettings, joint: &JointSettings) -> f32 {
    resolve_override(solver.soft_twist_stiffness_override, joint.soft_twist_limit.stiffness)
}

#[inline(always)]
pub fn get_soft_twist_damping(solver: &JointSolverSettings, joint: &JointSettings) -> f32 {
    resolve_override(solver.soft_twist_damping_override, joint.soft_twist_limit.damping)
}

#[inline(always)]
pub fn get_soft_swing_stiffness(solver: &JointSolverSettings, joint: &JointSettings) -> f32 {
    resolve_override(solver.soft_swing_stiffness_override, joint.soft_swing_limit.stiffness)
}

#[inline(always)]
pub fn get_soft_swing_damping(solver: &JointSolverSettings, joint: &JointSettings) -> f32 {
    resolve_override(solver.soft_swing_damping_override, joint.soft_swing_limit.damping)
}

#[inline(always)]
pub fn get_linear_drive_stiffness(solver: &JointSolverSettings, joint: &JointSettings) -> f32 {
    resolve_override(solver.linear_drive_stiffness_override, joint.linear_drive.stiffness)
}

#[inline(always)]
pub fn get_linear_drive_damping(solver: &JointSolverSettings, joint: &JointSettings) -> f32 {
    resolve_override(solver.linear_drive_damping_override, joint.linear_drive.damping)
}

#[inline(always)]
pub fn get_angular_drive_stiffness(solver: &JointSolverSettings, joint: &JointSettings) -> f32 {
    resolve_override(solver.angular_drive_stiffness_override, joint.angular_drive.stiffness)
}

#[inline(always)]
pub fn get_angular_drive_damping(solver: &JointSolverSettings, joint: &JointSettings) -> f32 {
    resolve_override(solver.angular_drive_damping_override, joint.angular_drive.damping)
}

#[inline(always)]
pub fn get_linear_projection(solver: &JointSolverSettings, joint: &JointSettings) -> f32 {
    math_helper::clamp(
        resolve_override(solver.linear_projection_override, joint.linear_projection),
        0.0,
        1.0,
    )
}

#[inline(always)]
pub fn get_angular_projection(solver: &JointSolverSettings, joint: &JointSettings) -> f32 {
    math_helper::clamp(
        resolve_override(solver.angular_projection_override, joint.angular_projection),
        0.0,
        1.0,
    )
}

/// Inverse mass and local inverse inertia of one body, as used by the joint solvers.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InverseMassProperties {
    pub inverse_mass: f32,
    pub inverse_inertia: Vec3,
}

/// Raises the smaller moments of inertia so that no two differ by more than `max_ratio`. The largest
/// moment is kept and the others are remapped linearly between the new minimum and it.
pub fn condition_inertia(inertia: Vec3, max_ratio: f32) -> Vec3 {
    if max_ratio <= 0.0 {
        return inertia;
    }
    let min = inertia.min_element();
    let max = inertia.max_element();
    if min <= 0.0 || max <= max_ratio * min {
        return inertia;
    }
    let min_allowed = max / max_ratio;
    let t = (inertia - Vec3::splat(min)) / (max - min);
    Vec3::splat(min_allowed) + t * (max - min_allowed)
}

/// Scales the parent inertia so that its largest moment is at least `min_ratio` times the child's
/// largest moment.
pub fn condition_parent_inertia(parent: Vec3, child: Vec3, min_ratio: f32) -> Vec3 {
    if min_ratio <= 0.0 {
        return parent;
    }
    let parent_max = parent.max_element();
    let child_max = child.max_element();
    if parent_max <= 0.0 || child_max <= 0.0 {
        return parent;
    }
    let ratio = parent_max / child_max;
    if ratio < min_ratio {
        parent * (min_ratio / ratio)
    } else {
        parent
    }
}

/// Inverse of a diagonal inertia, or `None` when a moment is infinite.
#[inline(always)]
fn invert_diagonal(inverse_inertia: Vec3) -> Option<Vec3> {
    (inverse_inertia.min_element() > 0.0).then(|| inverse_inertia.recip())
}

/// Makes a pair easier to solve with few iterations.
///
/// Each dynamic body's inertia anisotropy is limited to `max_inertia_ratio`. When both bodies are
/// dynamic the parent mass is raised to at least `min_parent_mass_ratio` times the child mass, and
/// the parent's largest moment of inertia to the same multiple of the child's. Ratios of zero
/// disable the corresponding step.
pub fn condition_inverse_mass_and_inertia(
    parent: &mut InverseMassProperties,
    child: &mut InverseMassProperties,
    min_parent_mass_ratio: f32,
    max_inertia_ratio: f32,
) {
    let parent_dynamic = parent.inverse_mass > 0.0;
    let child_dynamic = child.inverse_mass > 0.0;
    let parent_inertia = invert_diagonal(parent.inverse_inertia)
        .filter(|_| parent_dynamic)
        .map(|inertia| condition_inertia(inertia, max_inertia_ratio));
    let child_inertia = invert_diagonal(child.inverse_inertia)
        .filter(|_| child_dynamic)
        .map(|inertia| condition_inertia(inertia, max_inertia_ratio));

    if let Some(inertia) = child_inertia {
        child.inverse_inertia = inertia.recip();
    }
    if let Some(mut inertia) = parent_inertia {
        if child_dynamic {
            if let Some(child_inertia) = child_inertia {
                inertia = condition_parent_inertia(inertia, child_inertia, min_parent_mass_ratio);
            }
        }
        parent.inverse_inertia = inertia.recip();
    }

    if parent_dynamic && child_dynamic && min_parent_mass_ratio > 0.0 {
        // Parent mass / child mass = child inverse mass / parent inverse mass.
        let mass_ratio = child.inverse_mass / parent.inverse_mass;
        if mass_ratio < min_parent_mass_ratio {
            parent.inverse_mass *= mass_ratio / min_parent_mass_ratio;
        }
    }
}

/// Splits the rotation of connector 1 relative to connector 0 into `swing * twist`, where twist is
/// about the connector X axis.
#[inline(always)]
pub fn decompose_swing_twist(r0: Quat, r1: Quat) -> (Quat, Quat) {
    let r01 = quaternion_ex::relative_rotation(r0, r1);
    let (swing, twist) = quaternion_ex::to_swing_twist_x(r01);
    (
        quaternion_ex::enforce_shortest_arc_with(swing, Quat::IDENTITY),
        quaternion_ex::enforce_shortest_arc_with(twist, Quat::IDENTITY),
    )
}

/// Twist angle of a pure X rotation, in [-PI, PI].
#[inline(always)]
pub fn twist_angle(twist: Quat) -> f32 {
    math_helper::wrap_angle(2.0 * twist.x.atan2(twist.w))
}

/// Returns the world twist axes of both connectors and the twist angle between them.
///
/// At a swing of 180 degrees the twist is undefined and reported as zero.
pub fn get_twist_axis_angle(r0: Quat, r1: Quat) -> (Vec3, Vec3, f32) {
    let (_, twist) = decompose_swing_twist(r0, r1);
    (r0 * Vec3::X, r1 * Vec3::X, twist_angle(twist))
}

/// Returns the swing axis in connector 0 space and the signed swing angle.
/// When the swing is too small to define an axis, the swing 1 axis is returned.
pub fn get_cone_axis_angle_local(r0: Quat, r1: Quat, angle_tolerance: f32) -> (Vec3, f32) {
    let (swing, _) = decompose_swing_twist(r0, r1);
    quaternion_ex::to_axis_and_signed_angle_safe(swing, AngularAxis::Swing1.local_axis(), angle_tolerance)
}

/// Measures the swing of connector 1 about a single swing axis, ignoring twist.
///
/// The twist axis is swung, projected into the plane perpendicular to the swing axis and compared
/// with the unswung twist axis. The angle covers the full [-PI, PI] range by flipping through PI
/// when the projected axis points backwards. Returns the world swing axis and the angle.
pub fn get_swing_axis_angle(r0: Quat, r1: Quat, axis: AngularAxis, angle_tolerance: f32) -> (Vec3, f32) {
    let (swing, _) = decompose_swing_twist(r0, r1);
    let local_axis = axis.local_axis();
    let world_axis = r0 * local_axis;

    let swung_twist = swing * Vec3::X;
    let projected = swung_twist - local_axis * swung_twist.dot(local_axis);
    let projected_length = projected.length();
    if projected_length <= angle_tolerance.max(SMALL_NUMBER) {
        return (world_axis, 0.0);
    }
    let projected = projected / projected_length;

    let sin_angle = Vec3::X.cross(projected).dot(local_axis);
    let mut angle = math_helper::clamp(sin_angle, -1.0, 1.0).asin();
    if Vec3::X.dot(projected) < 0.0 {
        angle = math_helper::binary_sign(sin_angle) * PI - angle;
    }
    (world_axis, angle)
}

/// Twist, swing 1 and swing 2 angles of connector 1 relative to connector 0, indexed by
/// [`AngularAxis`].
pub fn get_angles(r0: Quat, r1: Quat, angle_tolerance: f32) -> [f32; 3] {
    let (_, _, twist) = get_twist_axis_angle(r0, r1);
    let (_, swing1) = get_swing_axis_angle(r0, r1, AngularAxis::Swing1, angle_tolerance);
    let (_, swing2) = get_swing_axis_angle(r0, r1, AngularAxis::Swing2, angle_tolerance);
    [twist, swing1, swing2]
}

/// Cone limit about the given swing axis. Equal swing limits describe a circular cone, otherwise
/// the limit is interpolated elliptically between the two swing limits.
pub fn get_cone_angle_limit(settings: &JointSettings, swing_axis_local: Vec3) -> f32 {
    let swing1_limit = settings.angular_limit(AngularAxis::Swing1);
    let swing2_limit = settings.angular_limit(AngularAxis::Swing2);
    if math_helper::is_nearly_equal(swing1_limit, swing2_limit, KINDA_SMALL_NUMBER) {
        return swing1_limit;
    }
    let swing1_part = swing1_limit * swing_axis_local.dot(AngularAxis::Swing1.local_axis()).abs();
    let swing2_part = swing2_limit * swing_axis_local.dot(AngularAxis::Swing2.local_axis()).abs();
    (swing1_part * swing1_part + swing2_part * swing2_part).sqrt()
}

/// Signed amount by which the swing angle exceeds the cone limit, or 0 inside the cone.
#[inline(always)]
pub fn get_cone_angle_error(settings: &JointSettings, swing_axis_local: Vec3, swing_angle: f32) -> f32 {
    math_helper::excess_beyond_limit(swing_angle, get_cone_angle_limit(settings, swing_axis_local))
}

/// Linear motion types with soft limited axes treated as free, as used by the projection pass.
#[inline(always)]
pub fn get_hard_linear_motion_types(settings: &JointSettings) -> [JointMotionType; 3] {
    let mut motion_types = settings.linear_motion_types;
    if settings.soft_linear_limit.enabled {
        for motion in motion_types.iter_mut() {
            if *motion == JointMotionType::Limited {
                *motion = JointMotionType::Free;
            }
        }
    }
    motion_types
}

#[inline(always)]
fn get_limited_axis_error(motion: JointMotionType, axis: Vec3, separation: f32, limit: f32) -> Vec3 {
    match motion {
        JointMotionType::Free => Vec3::ZERO,
        JointMotionType::Limited => axis * math_helper::excess_beyond_limit(separation, limit),
        JointMotionType::Locked => axis * separation,
    }
}

#[inline(always)]
fn get_limited_radial_error(motion: JointMotionType, radial: Vec3, limit: f32) -> Vec3 {
    match motion {
        JointMotionType::Free => Vec3::ZERO,
        JointMotionType::Limited => {
            let distance = radial.length();
            if distance > limit && distance > SMALL_NUMBER {
                radial * ((distance - limit) / distance)
            } else {
                Vec3::ZERO
            }
        }
        JointMotionType::Locked => radial,
    }
}

/// Part of the connector separation `cx = X1 - X0` that violates the hard linear limits, given
/// connector 0's world rotation `r0`. Soft limited axes count as free.
pub fn get_limited_position_error(settings: &JointSettings, r0: Quat, cx: Vec3) -> Vec3 {
    let limit = settings.linear_limit;
    match LinearConstraintShape::classify(get_hard_linear_motion_types(settings)) {
        LinearConstraintShape::Free => Vec3::ZERO,
        LinearConstraintShape::Point => cx,
        LinearConstraintShape::Spherical => get_limited_radial_error(JointMotionType::Limited, cx, limit),
        LinearConstraintShape::Cylindrical {
            axis,
            axial_motion,
            radial_motion,
        } => {
            let world_axis = r0 * Vec3::AXES[axis];
            let axial_distance = cx.dot(world_axis);
            let radial = cx - world_axis * axial_distance;
            get_limited_axis_error(axial_motion, world_axis, axial_distance, limit)
                + get_limited_radial_error(radial_motion, radial, limit)
        }
        LinearConstraintShape::Planar(motion_types) => {
            let mut error = Vec3::ZERO;
            for (axis, motion) in motion_types.iter().enumerate() {
                let world_axis = r0 * Vec3::AXES[axis];
                error += get_limited_axis_error(*motion, world_axis, cx.dot(world_axis), limit);
            }
            error
        }
    }
}

/// Effective inverse mass of a point at `offset` from a body's center of mass:
/// `inverse_mass * I + [offset]x * inverse_inertia * transpose([offset]x)`.
#[inline(always)]
pub fn compute_joint_factor_matrix(offset: Vec3, inverse_inertia: &Symmetric3x3, inverse_mass: f32) -> Symmetric3x3 {
    Symmetric3x3::from_scaled_identity(inverse_mass) + Symmetric3x3::skew_sandwich(offset, inverse_inertia)
}
