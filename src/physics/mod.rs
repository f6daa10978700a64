pub mod bodies;
pub mod body_properties;
pub mod constraints;
pub mod errors;
pub mod handles;
pub mod joint_constraints;

pub use self::bodies::{BodySet, IJointBodyStore, RigidBodyRef};
pub use self::body_properties::{BodyInertia, BodyVelocity, MotionState, RigidPose};
pub use self::errors::JointError;
pub use self::handles::{BodyHandle, JointHandle};
pub use self::joint_constraints::{ConstraintSpace, JointCallback, JointConstraints};
