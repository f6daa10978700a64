use glam::{Quat, Vec3};
use std::ops::Mul;

/// 3 row, 3 column matrix. Vectors are treated as rows, so `transform(v, m) = v * m`.
#[derive(Copy, Clone, Debug, PartialEq)]
#[repr(C)]
pub struct Matrix3x3 {
    /// First row of the matrix.
    pub x: Vec3,
    /// Second row of the matrix.
    pub y: Vec3,
    /// Third row of the matrix.
    pub z: Vec3,
}

impl Default for Matrix3x3 {
    #[inline(always)]
    fn default() -> Self {
        Self::identity()
    }
}

impl Matrix3x3 {
    /// Gets the 3x3 identity matrix.
    #[inline(always)]
    pub const fn identity() -> Self {
        Self {
            x: Vec3::new(1.0, 0.0, 0.0),
            y: Vec3::new(0.0, 1.0, 0.0),
            z: Vec3::new(0.0, 0.0, 1.0),
        }
    }

    /// Creates a rotation matrix whose rows are the rotated basis vectors.
    #[inline(always)]
    pub fn create_from_quaternion(q: Quat) -> Self {
        Self {
            x: q * Vec3::X,
            y: q * Vec3::Y,
            z: q * Vec3::Z,
        }
    }

    /// Creates the matrix representing the cross product with `v`, such that
    /// `transform(u, m) = u x v`.
    #[inline(always)]
    pub fn create_cross_product(v: Vec3) -> Self {
        Self {
            x: Vec3::new(0.0, -v.z, v.y),
            y: Vec3::new(v.z, 0.0, -v.x),
            z: Vec3::new(-v.y, v.x, 0.0),
        }
    }

    /// Computes the transposed matrix of a matrix.
    #[inline(always)]
    pub fn transpose(m: &Self) -> Self {
        Self {
            x: Vec3::new(m.x.x, m.y.x, m.z.x),
            y: Vec3::new(m.x.y, m.y.y, m.z.y),
            z: Vec3::new(m.x.z, m.y.z, m.z.z),
        }
    }

    /// Calculates the determinant of the matrix.
    #[inline(always)]
    pub fn determinant(&self) -> f32 {
        self.x.dot(self.y.cross(self.z))
    }

    /// Transforms the row vector by the matrix.
    #[inline(always)]
    pub fn transform(v: Vec3, m: &Self) -> Vec3 {
        m.x * v.x + m.y * v.y + m.z * v.z
    }
}

impl Mul for Matrix3x3 {
    type Output = Self;

    #[inline(always)]
    fn mul(self, other: Self) -> Self {
        Self {
            x: Self::transform(self.x, &other),
            y: Self::transform(self.y, &other),
            z: Self::transform(self.z, &other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_cross_product_matrix() {
        let v = Vec3::new(0.3, -1.2, 2.0);
        let u = Vec3::new(-0.7, 0.4, 1.5);
        let expected = u.cross(v);
        let actual = Matrix3x3::transform(u, &Matrix3x3::create_cross_product(v));
        assert_abs_diff_eq!(actual.x, expected.x, epsilon = 1e-6);
        assert_abs_diff_eq!(actual.y, expected.y, epsilon = 1e-6);
        assert_abs_diff_eq!(actual.z, expected.z, epsilon = 1e-6);
    }

    #[test]
    fn test_rotation_rows_are_orthonormal() {
        let q = Quat::from_axis_angle(Vec3::new(1.0, 1.0, 0.0).normalize(), 0.8);
        let r = Matrix3x3::create_from_quaternion(q);
        let product = r * Matrix3x3::transpose(&r);
        assert_abs_diff_eq!(product.x.x, 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(product.y.y, 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(product.x.z, 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(r.determinant(), 1.0, epsilon = 1e-5);
    }
}
