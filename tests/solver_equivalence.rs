//! The sequential and block solvers agree on a converged joint chain.

mod common;

use common::{Scene, GRAVITY};
use glam::{Quat, Vec3};
use rust_pbd_joints::physics::constraints::{JointSettings, JointSolverSettings, JointSolverType};
use rust_pbd_joints::physics::{BodyHandle, JointHandle};

fn hinge_chain(solver_type: JointSolverType) -> (Scene, BodyHandle, [JointHandle; 2]) {
    let mut scene = Scene::new(JointSolverSettings::new(solver_type, 1));
    let anchor = scene.add_anchor(Vec3::ZERO);
    let first = scene.add_body(Vec3::new(0.0, 0.0, 0.5), Quat::IDENTITY, 1.0);
    let second = scene.add_body(Vec3::new(0.0, 0.0, 1.5), Quat::IDENTITY, 1.0);
    let joints = [
        scene.add_joint_at(anchor, first, Vec3::ZERO, JointSettings::hinge()).unwrap(),
        scene
            .add_joint_at(first, second, Vec3::new(0.0, 0.0, 1.0), JointSettings::hinge())
            .unwrap(),
    ];
    (scene, second, joints)
}

#[test]
fn solvers_agree_on_hinge_chain() {
    let (mut sequential, tip, joints) = hinge_chain(JointSolverType::GaussSeidel);
    let (mut block, _, _) = hinge_chain(JointSolverType::Cholesky);
    for _ in 0..30 {
        sequential.step(10, GRAVITY).unwrap();
        block.step(10, GRAVITY).unwrap();
    }

    for scene in [&sequential, &block] {
        for joint in joints {
            assert!(scene.joint_separation(joint) < 1e-2);
        }
        // Still in the YZ plane.
        assert!(scene.pose(tip).position.x.abs() < 1e-3);
    }
    let difference = (sequential.pose(tip).position - block.pose(tip).position).length();
    assert!(difference < 0.1, "tip positions differ by {}", difference);
    assert!(sequential.pose(tip).position.y < -0.1);
}
