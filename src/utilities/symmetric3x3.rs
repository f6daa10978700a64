use crate::utilities::math_helper::SMALL_NUMBER;
use crate::utilities::matrix3x3::Matrix3x3;
use core::ops::{Add, Mul, Sub};
use glam::Vec3;

/// Lower left triangle (including diagonal) of a symmetric 3x3 matrix.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Symmetric3x3 {
    /// First row, first column of the matrix.
    pub xx: f32,
    /// Second row, first column of the matrix.
    pub yx: f32,
    /// Second row, second column of the matrix.
    pub yy: f32,
    /// Third row, first column of the matrix.
    pub zx: f32,
    /// Third row, second column of the matrix.
    pub zy: f32,
    /// Third row, third column of the matrix.
    pub zz: f32,
}

impl Symmetric3x3 {
    pub const ZERO: Self = Self {
        xx: 0.0,
        yx: 0.0,
        yy: 0.0,
        zx: 0.0,
        zy: 0.0,
        zz: 0.0,
    };

    /// Creates a diagonal matrix.
    #[inline(always)]
    pub fn from_diagonal(diagonal: Vec3) -> Self {
        Self {
            xx: diagonal.x,
            yx: 0.0,
            yy: diagonal.y,
            zx: 0.0,
            zy: 0.0,
            zz: diagonal.z,
        }
    }

    /// Creates a scaled identity matrix.
    #[inline(always)]
    pub fn from_scaled_identity(scale: f32) -> Self {
        Self::from_diagonal(Vec3::splat(scale))
    }

    /// Computes rT * m * r for a symmetric matrix m and a rotation matrix r.
    #[inline(always)]
    pub fn rotation_sandwich(r: &Matrix3x3, m: &Self, sandwich: &mut Self) {
        let i11 = r.x.x * m.xx + r.y.x * m.yx + r.z.x * m.zx;
        let i12 = r.x.x * m.yx + r.y.x * m.yy + r.z.x * m.zy;
        let i13 = r.x.x * m.zx + r.y.x * m.zy + r.z.x * m.zz;

        let i21 = r.x.y * m.xx + r.y.y * m.yx + r.z.y * m.zx;
        let i22 = r.x.y * m.yx + r.y.y * m.yy + r.z.y * m.zy;
        let i23 = r.x.y * m.zx + r.y.y * m.zy + r.z.y * m.zz;

        let i31 = r.x.z * m.xx + r.y.z * m.yx + r.z.z * m.zx;
        let i32 = r.x.z * m.yx + r.y.z * m.yy + r.z.z * m.zy;
        let i33 = r.x.z * m.zx + r.y.z * m.zy + r.z.z * m.zz;

        sandwich.xx = i11 * r.x.x + i12 * r.y.x + i13 * r.z.x;
        sandwich.yx = i21 * r.x.x + i22 * r.y.x + i23 * r.z.x;
        sandwich.yy = i21 * r.x.y + i22 * r.y.y + i23 * r.z.y;
        sandwich.zx = i31 * r.x.x + i32 * r.y.x + i33 * r.z.x;
        sandwich.zy = i31 * r.x.y + i32 * r.y.y + i33 * r.z.y;
        sandwich.zz = i31 * r.x.z + i32 * r.y.z + i33 * r.z.z;
    }

    /// Computes [v]x * m * transpose([v]x), where [v]x is the cross product matrix of v.
    /// This is the angular contribution of an offset `v` to a point's effective inverse mass.
    #[inline(always)]
    pub fn skew_sandwich(v: Vec3, m: &Self) -> Self {
        // Column j of the result is v x (m * (e_j x v)).
        let column_x = v.cross(Self::transform(Vec3::X.cross(v), m));
        let column_y = v.cross(Self::transform(Vec3::Y.cross(v), m));
        let column_z = v.cross(Self::transform(Vec3::Z.cross(v), m));
        Self {
            xx: column_x.x,
            yx: column_x.y,
            yy: column_y.y,
            zx: column_x.z,
            zy: column_y.z,
            zz: column_z.z,
        }
    }

    /// Computes the determinant of a symmetric matrix.
    #[inline(always)]
    pub fn determinant(m: &Self) -> f32 {
        let m11 = m.yy * m.zz - m.zy * m.zy;
        let m21 = m.zy * m.zx - m.zz * m.yx;
        let m31 = m.yx * m.zy - m.zx * m.yy;
        m11 * m.xx + m21 * m.yx + m31 * m.zx
    }

    /// Inverts the given matrix. Returns false and leaves `inverse` untouched if the matrix is
    /// singular.
    #[inline(always)]
    pub fn invert(m: &Self, inverse: &mut Self) -> bool {
        let m11 = m.yy * m.zz - m.zy * m.zy;
        let m21 = m.zy * m.zx - m.zz * m.yx;
        let m31 = m.yx * m.zy - m.zx * m.yy;
        let determinant = m11 * m.xx + m21 * m.yx + m31 * m.zx;
        if determinant.abs() <= SMALL_NUMBER {
            return false;
        }
        let determinant_inverse = 1.0 / determinant;

        let m22 = m.zz * m.xx - m.zx * m.zx;
        let m32 = m.zx * m.yx - m.xx * m.zy;

        let m33 = m.xx * m.yy - m.yx * m.yx;

        inverse.xx = m11 * determinant_inverse;
        inverse.yx = m21 * determinant_inverse;
        inverse.zx = m31 * determinant_inverse;
        inverse.yy = m22 * determinant_inverse;
        inverse.zy = m32 * determinant_inverse;
        inverse.zz = m33 * determinant_inverse;
        true
    }

    /// Transforms a vector by a symmetric matrix.
    #[inline(always)]
    pub fn transform(v: Vec3, m: &Self) -> Vec3 {
        Vec3::new(
            v.x * m.xx + v.y * m.yx + v.z * m.zx,
            v.x * m.yx + v.y * m.yy + v.z * m.zy,
            v.x * m.zx + v.y * m.zy + v.z * m.zz,
        )
    }

    /// Gets the element at the given row and column.
    #[inline(always)]
    pub fn element(&self, row: usize, column: usize) -> f32 {
        let (row, column) = if row >= column { (row, column) } else { (column, row) };
        match (row, column) {
            (0, 0) => self.xx,
            (1, 0) => self.yx,
            (1, 1) => self.yy,
            (2, 0) => self.zx,
            (2, 1) => self.zy,
            _ => self.zz,
        }
    }
}

impl Add for Symmetric3x3 {
    type Output = Self;

    #[inline(always)]
    fn add(self, other: Self) -> Self {
        Self {
            xx: self.xx + other.xx,
            yx: self.yx + other.yx,
            yy: self.yy + other.yy,
            zx: self.zx + other.zx,
            zy: self.zy + other.zy,
            zz: self.zz + other.zz,
        }
    }
}

impl Sub for Symmetric3x3 {
    type Output = Self;

    #[inline(always)]
    fn sub(self, other: Self) -> Self {
        Self {
            xx: self.xx - other.xx,
            yx: self.yx - other.yx,
            yy: self.yy - other.yy,
            zx: self.zx - other.zx,
            zy: self.zy - other.zy,
            zz: self.zz - other.zz,
        }
    }
}

impl Mul<f32> for Symmetric3x3 {
    type Output = Self;

    #[inline(always)]
    fn mul(self, scale: f32) -> Self {
        Self {
            xx: self.xx * scale,
            yx: self.yx * scale,
            yy: self.yy * scale,
            zx: self.zx * scale,
            zy: self.zy * scale,
            zz: self.zz * scale,
        }
    }
}

impl std::fmt::Display for Symmetric3x3 {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "x: {}, y: {}, {}, z: {}, {}, {}",
            self.xx, self.yx, self.yy, self.zx, self.zy, self.zz
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use glam::Quat;

    #[test]
    fn test_rotation_sandwich_of_diagonal() {
        // Rotating a diagonal tensor 90 degrees about Z swaps the X and Y entries.
        let q = Quat::from_axis_angle(Vec3::Z, std::f32::consts::FRAC_PI_2);
        let r = Matrix3x3::create_from_quaternion(q);
        let m = Symmetric3x3::from_diagonal(Vec3::new(1.0, 2.0, 3.0));
        let mut world = Symmetric3x3::ZERO;
        Symmetric3x3::rotation_sandwich(&r, &m, &mut world);
        assert_abs_diff_eq!(world.xx, 2.0, epsilon = 1e-5);
        assert_abs_diff_eq!(world.yy, 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(world.zz, 3.0, epsilon = 1e-5);
        assert_abs_diff_eq!(world.yx, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_skew_sandwich_matches_explicit_product() {
        let v = Vec3::new(0.5, -0.25, 1.0);
        let m = Symmetric3x3 {
            xx: 2.0,
            yx: 0.1,
            yy: 3.0,
            zx: -0.2,
            zy: 0.3,
            zz: 1.5,
        };
        let skew = Matrix3x3::create_cross_product(v);
        // With row vectors, u * skew = u x v, so the column-vector cross matrix is transpose(skew).
        let dense = Matrix3x3 {
            x: Symmetric3x3::transform(Vec3::X, &m),
            y: Symmetric3x3::transform(Vec3::Y, &m),
            z: Symmetric3x3::transform(Vec3::Z, &m),
        };
        let expected = Matrix3x3::transpose(&skew) * dense * skew;
        let actual = Symmetric3x3::skew_sandwich(v, &m);
        assert_abs_diff_eq!(actual.xx, expected.x.x, epsilon = 1e-5);
        assert_abs_diff_eq!(actual.yx, expected.y.x, epsilon = 1e-5);
        assert_abs_diff_eq!(actual.yy, expected.y.y, epsilon = 1e-5);
        assert_abs_diff_eq!(actual.zx, expected.z.x, epsilon = 1e-5);
        assert_abs_diff_eq!(actual.zy, expected.z.y, epsilon = 1e-5);
        assert_abs_diff_eq!(actual.zz, expected.z.z, epsilon = 1e-5);
    }

    #[test]
    fn test_invert() {
        let m = Symmetric3x3 {
            xx: 4.0,
            yx: 1.0,
            yy: 3.0,
            zx: 0.5,
            zy: 0.25,
            zz: 2.0,
        };
        let mut inverse = Symmetric3x3::ZERO;
        assert!(Symmetric3x3::invert(&m, &mut inverse));
        let v = Vec3::new(1.0, -2.0, 0.5);
        let round_trip = Symmetric3x3::transform(Symmetric3x3::transform(v, &m), &inverse);
        assert_abs_diff_eq!(round_trip.x, v.x, epsilon = 1e-5);
        assert_abs_diff_eq!(round_trip.y, v.y, epsilon = 1e-5);
        assert_abs_diff_eq!(round_trip.z, v.z, epsilon = 1e-5);
        assert!(!Symmetric3x3::invert(&Symmetric3x3::ZERO, &mut inverse));
    }
}
