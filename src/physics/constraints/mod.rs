pub mod cholesky_solver;
pub mod constraint_checker;
pub mod gauss_seidel_solver;
pub mod joint_drives;
pub mod joint_projection;
pub mod joint_settings;
pub mod joint_shape;
pub mod joint_solver;
pub mod joint_solver_state;
pub mod joint_utilities;
pub mod motor_settings;
pub mod position_constraints;
pub mod rotation_constraints;
pub mod solver_settings;
pub mod spring_settings;

pub use self::cholesky_solver::CholeskyJointSolver;
pub use self::gauss_seidel_solver::GaussSeidelJointSolver;
pub use self::joint_settings::{AngularAxis, JointForceMode, JointFrames, JointMotionType, JointSettings};
pub use self::joint_solver::{create_joint_solver, IJointSolver};
pub use self::joint_solver_state::JointSolverState;
pub use self::motor_settings::{AngularDriveSettings, LinearDriveSettings};
pub use self::solver_settings::{JointSolverSettings, JointSolverType};
pub use self::spring_settings::SoftSpringSettings;
