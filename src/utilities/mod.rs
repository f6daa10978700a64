pub mod dense_matrix;
pub mod math_helper;
pub mod matrix3x3;
pub mod quaternion_ex;
pub mod symmetric3x3;

pub use self::dense_matrix::{DenseMatrix, DenseMatrix61, DenseMatrix66, DenseMatrixSolver};
pub use self::matrix3x3::Matrix3x3;
pub use self::symmetric3x3::Symmetric3x3;
