//! The push-out pass removes residual hard-limit error and the velocity that would bring it back.

mod common;

use approx::assert_abs_diff_eq;
use common::{Scene, DT};
use glam::{Quat, Vec3};
use rust_pbd_joints::physics::constraints::{JointMotionType, JointSettings, JointSolverSettings, JointSolverType};
use rust_pbd_joints::physics::{BodyVelocity, RigidPose};

fn perturbed_joint(solver_type: JointSolverType) {
    let mut scene = Scene::new(JointSolverSettings::new(solver_type, 1));
    let anchor = scene.add_anchor(Vec3::ZERO);
    let child = scene.add_body(
        Vec3::new(0.1, -0.4, 0.2),
        Quat::from_axis_angle(Vec3::X, 0.7),
        1.0,
    );
    let settings = JointSettings {
        angular_motion_types: [JointMotionType::Limited, JointMotionType::Free, JointMotionType::Free],
        angular_limits: [0.3, 0.0, 0.0],
        linear_projection: 1.0,
        angular_projection: 1.0,
        ..JointSettings::default()
    };
    // Both connectors at the body centers, so the connectors are 0.46 apart.
    let joint = scene
        .joints
        .add_constraint([anchor, child], [RigidPose::IDENTITY; 2], settings)
        .unwrap();
    let error_direction = Vec3::new(0.1, -0.4, 0.2).normalize();
    if let Some(body) = scene.bodies.get_mut(child) {
        // Moving further away while already twisting back toward the limit.
        body.motion.velocity = BodyVelocity::new(error_direction * 3.0, Vec3::new(-2.0, 0.0, 0.0));
    }

    scene.joints.prepare_constraints(DT, &scene.bodies).unwrap();
    assert!(scene.joints.apply_push_out(DT, &mut scene.bodies).unwrap());
    scene.joints.unprepare_constraints();

    assert!(
        scene.joint_separation(joint) <= 1e-5,
        "{:?}: separation {}",
        solver_type,
        scene.joint_separation(joint)
    );
    let space = scene.joints.calculate_constraint_space(joint, &scene.bodies).unwrap();
    assert!((space.angles[0] - 0.3).abs() < 1e-2, "{:?}: twist {}", solver_type, space.angles[0]);

    let body = scene.bodies.get(child).unwrap();
    let anchor_velocity = scene.bodies.get(anchor).unwrap().motion.velocity;
    let relative = body.motion.velocity.linear - anchor_velocity.linear;
    assert!(relative.dot(-error_direction) >= -1e-5, "{:?}: velocity {}", solver_type, relative);
    // Twist velocity already reducing the error is kept.
    assert!((body.motion.velocity.angular.x + 2.0).abs() < 1e-5);
}

#[test]
fn projection_removes_error_and_separating_velocity() {
    perturbed_joint(JointSolverType::GaussSeidel);
    perturbed_joint(JointSolverType::Cholesky);
}

#[test]
fn projection_disabled_leaves_joint_alone() {
    let mut scene = Scene::new(JointSolverSettings::default());
    let anchor = scene.add_anchor(Vec3::ZERO);
    let child = scene.add_body(Vec3::new(0.0, -0.5, 0.0), Quat::IDENTITY, 1.0);
    scene
        .joints
        .add_constraint([anchor, child], [RigidPose::IDENTITY; 2], JointSettings::default())
        .unwrap();
    scene.joints.prepare_constraints(DT, &scene.bodies).unwrap();
    assert!(!scene.joints.apply_push_out(DT, &mut scene.bodies).unwrap());
    scene.joints.unprepare_constraints();
    assert_eq!(scene.pose(child).position, Vec3::new(0.0, -0.5, 0.0));
}

fn projected_child(position_tolerance: f32, child_position: Vec3) -> (bool, Vec3, Vec3) {
    let mut scene = Scene::new(JointSolverSettings {
        position_tolerance,
        ..JointSolverSettings::default()
    });
    let anchor = scene.add_anchor(Vec3::ZERO);
    let child = scene.add_body(child_position, Quat::IDENTITY, 1.0);
    let settings = JointSettings {
        linear_projection: 1.0,
        ..JointSettings::default()
    };
    scene
        .joints
        .add_constraint([anchor, child], [RigidPose::IDENTITY; 2], settings)
        .unwrap();
    if let Some(body) = scene.bodies.get_mut(child) {
        body.motion.velocity = BodyVelocity::from_linear(Vec3::new(0.0, -1.0, 0.0));
    }
    scene.joints.prepare_constraints(DT, &scene.bodies).unwrap();
    let projected = scene.joints.apply_push_out(DT, &mut scene.bodies).unwrap();
    scene.joints.unprepare_constraints();
    let body = scene.bodies.get(child).unwrap().motion;
    (projected, body.pose.position, body.velocity.linear)
}

#[test]
fn projection_skips_error_within_position_tolerance() {
    let (projected, position, velocity) = projected_child(0.05, Vec3::new(0.0, -0.03, 0.0));
    assert!(!projected);
    assert_eq!(position, Vec3::new(0.0, -0.03, 0.0));
    assert_eq!(velocity, Vec3::new(0.0, -1.0, 0.0));

    let (projected, position, velocity) = projected_child(0.05, Vec3::new(0.0, -0.08, 0.0));
    assert!(projected);
    assert_abs_diff_eq!(position, Vec3::ZERO, epsilon = 1e-5);
    assert_abs_diff_eq!(velocity, Vec3::ZERO, epsilon = 1e-5);
}
