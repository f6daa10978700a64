use std::hash::Hash;

/// Identifies a rigid body in the external body store.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct BodyHandle(pub i32);

/// Stable identifier of a joint in a [`JointConstraints`](super::joint_constraints::JointConstraints)
/// container. Survives removal of other joints.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct JointHandle(pub i32);

impl std::fmt::Display for BodyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "BodyHandle<{}>", self.0)
    }
}

impl std::fmt::Display for JointHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "JointHandle<{}>", self.0)
    }
}
