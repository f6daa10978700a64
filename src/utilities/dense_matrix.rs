use glam::Vec3;

use crate::utilities::symmetric3x3::Symmetric3x3;

/// Row-major matrix with a runtime row/column count and fixed storage capacity of
/// `MAX_ELEMENTS` elements. Never allocates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DenseMatrix<const MAX_ELEMENTS: usize> {
    rows: usize,
    columns: usize,
    elements: [f32; MAX_ELEMENTS],
}

/// Square matrix of at most 6 rows and columns.
pub type DenseMatrix66 = DenseMatrix<36>;
/// Column vector of at most 6 rows.
pub type DenseMatrix61 = DenseMatrix<6>;

impl<const MAX_ELEMENTS: usize> Default for DenseMatrix<MAX_ELEMENTS> {
    fn default() -> Self {
        Self::make(0, 0)
    }
}

impl<const MAX_ELEMENTS: usize> DenseMatrix<MAX_ELEMENTS> {
    /// Creates a zero-filled matrix of the given dimensions.
    #[inline(always)]
    pub fn make(rows: usize, columns: usize) -> Self {
        debug_assert!(
            rows * columns <= MAX_ELEMENTS,
            "A {}x{} matrix does not fit in {} elements.",
            rows,
            columns,
            MAX_ELEMENTS
        );
        Self {
            rows,
            columns,
            elements: [0.0; MAX_ELEMENTS],
        }
    }

    /// Creates a square identity matrix.
    pub fn make_identity(dimension: usize) -> Self {
        let mut m = Self::make(dimension, dimension);
        for index in 0..dimension {
            m.set_at(index, index, 1.0);
        }
        m
    }

    #[inline(always)]
    pub fn num_rows(&self) -> usize {
        self.rows
    }

    #[inline(always)]
    pub fn num_columns(&self) -> usize {
        self.columns
    }

    #[inline(always)]
    fn index(&self, row: usize, column: usize) -> usize {
        debug_assert!(row < self.rows && column < self.columns);
        row * self.columns + column
    }

    #[inline(always)]
    pub fn at(&self, row: usize, column: usize) -> f32 {
        self.elements[self.index(row, column)]
    }

    #[inline(always)]
    pub fn at_mut(&mut self, row: usize, column: usize) -> &mut f32 {
        let index = self.index(row, column);
        &mut self.elements[index]
    }

    #[inline(always)]
    pub fn set_at(&mut self, row: usize, column: usize, value: f32) {
        *self.at_mut(row, column) = value;
    }

    /// Writes a vector into three consecutive columns of a row.
    #[inline(always)]
    pub fn set_row_vector(&mut self, row: usize, column: usize, v: Vec3) {
        self.set_at(row, column, v.x);
        self.set_at(row, column + 1, v.y);
        self.set_at(row, column + 2, v.z);
    }

    /// Reads three consecutive rows of a column as a vector.
    #[inline(always)]
    pub fn column_vector(&self, row: usize, column: usize) -> Vec3 {
        Vec3::new(
            self.at(row, column),
            self.at(row + 1, column),
            self.at(row + 2, column),
        )
    }

    /// Writes a symmetric 3x3 block with its upper-left corner at (start, start).
    pub fn set_diagonal_block(&mut self, start: usize, block: &Symmetric3x3) {
        for row in 0..3 {
            for column in 0..3 {
                self.set_at(start + row, start + column, block.element(row, column));
            }
        }
    }

    /// Computes A * B.
    pub fn multiply_ab<const A: usize, const B: usize>(
        a: &DenseMatrix<A>,
        b: &DenseMatrix<B>,
    ) -> Self {
        debug_assert_eq!(a.columns, b.rows);
        let mut result = Self::make(a.rows, b.columns);
        for row in 0..a.rows {
            for column in 0..b.columns {
                let mut sum = 0.0;
                for k in 0..a.columns {
                    sum += a.at(row, k) * b.at(k, column);
                }
                result.set_at(row, column, sum);
            }
        }
        result
    }

    /// Computes A * transpose(B).
    pub fn multiply_abt<const A: usize, const B: usize>(
        a: &DenseMatrix<A>,
        b: &DenseMatrix<B>,
    ) -> Self {
        debug_assert_eq!(a.columns, b.columns);
        let mut result = Self::make(a.rows, b.rows);
        for row in 0..a.rows {
            for column in 0..b.rows {
                let mut sum = 0.0;
                for k in 0..a.columns {
                    sum += a.at(row, k) * b.at(column, k);
                }
                result.set_at(row, column, sum);
            }
        }
        result
    }

    /// Computes transpose(A) * B.
    pub fn multiply_atb<const A: usize, const B: usize>(
        a: &DenseMatrix<A>,
        b: &DenseMatrix<B>,
    ) -> Self {
        debug_assert_eq!(a.rows, b.rows);
        let mut result = Self::make(a.columns, b.columns);
        for row in 0..a.columns {
            for column in 0..b.columns {
                let mut sum = 0.0;
                for k in 0..a.rows {
                    sum += a.at(k, row) * b.at(k, column);
                }
                result.set_at(row, column, sum);
            }
        }
        result
    }

    /// Computes A + B.
    pub fn add(a: &Self, b: &Self) -> Self {
        debug_assert!(a.rows == b.rows && a.columns == b.columns);
        let mut result = Self::make(a.rows, a.columns);
        for index in 0..a.rows * a.columns {
            result.elements[index] = a.elements[index] + b.elements[index];
        }
        result
    }

    /// Computes A - B.
    pub fn subtract(a: &Self, b: &Self) -> Self {
        debug_assert!(a.rows == b.rows && a.columns == b.columns);
        let mut result = Self::make(a.rows, a.columns);
        for index in 0..a.rows * a.columns {
            result.elements[index] = a.elements[index] - b.elements[index];
        }
        result
    }

    /// Computes A * scale.
    pub fn scale(a: &Self, scale: f32) -> Self {
        let mut result = *a;
        for value in result.elements[..a.rows * a.columns].iter_mut() {
            *value *= scale;
        }
        result
    }
}

/// Solvers for small dense symmetric positive definite systems.
pub struct DenseMatrixSolver;

impl DenseMatrixSolver {
    /// Overwrites the symmetric positive definite matrix `a` with its lower triangular Cholesky
    /// factor G, such that A = G * transpose(G). The upper triangle is zeroed.
    ///
    /// Returns false if a pivot is not positive; `a` is left partially factored in that case and
    /// must not be used.
    pub fn cholesky_factorize<const N: usize>(a: &mut DenseMatrix<N>) -> bool {
        debug_assert_eq!(a.num_rows(), a.num_columns());
        let n = a.num_rows();
        for j in 0..n {
            let mut pivot = a.at(j, j);
            for k in 0..j {
                pivot -= a.at(j, k) * a.at(j, k);
            }
            if pivot <= 0.0 {
                return false;
            }
            let diagonal = pivot.sqrt();
            a.set_at(j, j, diagonal);
            let inverse_diagonal = 1.0 / diagonal;
            for i in (j + 1)..n {
                let mut sum = a.at(i, j);
                for k in 0..j {
                    sum -= a.at(i, k) * a.at(j, k);
                }
                a.set_at(i, j, sum * inverse_diagonal);
                a.set_at(j, i, 0.0);
            }
        }
        true
    }

    /// Solves A * X = B for the column vector X, where A is symmetric positive definite.
    /// Returns `None` if A is not positive definite.
    pub fn solve_positive_definite<const N: usize, const M: usize>(
        a: &DenseMatrix<N>,
        b: &DenseMatrix<M>,
    ) -> Option<DenseMatrix<M>> {
        debug_assert_eq!(a.num_rows(), b.num_rows());
        debug_assert_eq!(b.num_columns(), 1);
        let mut g = *a;
        if !Self::cholesky_factorize(&mut g) {
            return None;
        }
        let n = g.num_rows();

        // G * y = b
        let mut x = DenseMatrix::<M>::make(n, 1);
        for i in 0..n {
            let mut sum = b.at(i, 0);
            for k in 0..i {
                sum -= g.at(i, k) * x.at(k, 0);
            }
            x.set_at(i, 0, sum / g.at(i, i));
        }

        // transpose(G) * x = y
        for i in (0..n).rev() {
            let mut sum = x.at(i, 0);
            for k in (i + 1)..n {
                sum -= g.at(k, i) * x.at(k, 0);
            }
            x.set_at(i, 0, sum / g.at(i, i));
        }
        Some(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn random_matrix(rng: &mut StdRng, rows: usize, columns: usize) -> DenseMatrix66 {
        let mut m = DenseMatrix66::make(rows, columns);
        for row in 0..rows {
            for column in 0..columns {
                m.set_at(row, column, rng.gen_range(-1.0..1.0));
            }
        }
        m
    }

    #[test]
    fn test_multiply_variants_agree() {
        let mut rng = StdRng::seed_from_u64(7);
        let a = random_matrix(&mut rng, 3, 4);
        let b = random_matrix(&mut rng, 3, 4);

        // A * transpose(B) computed two ways.
        let abt = DenseMatrix66::multiply_abt(&a, &b);
        let mut bt = DenseMatrix66::make(4, 3);
        for row in 0..3 {
            for column in 0..4 {
                bt.set_at(column, row, b.at(row, column));
            }
        }
        let ab = DenseMatrix66::multiply_ab(&a, &bt);
        assert_eq!(abt.num_rows(), 3);
        assert_eq!(abt.num_columns(), 3);
        for row in 0..3 {
            for column in 0..3 {
                assert_abs_diff_eq!(abt.at(row, column), ab.at(row, column), epsilon = 1e-5);
            }
        }

        // transpose(A) * B is the transpose of transpose(B) * A.
        let atb = DenseMatrix66::multiply_atb(&a, &b);
        let bta = DenseMatrix66::multiply_atb(&b, &a);
        for row in 0..4 {
            for column in 0..4 {
                assert_abs_diff_eq!(atb.at(row, column), bta.at(column, row), epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn test_add_subtract_scale() {
        let mut rng = StdRng::seed_from_u64(11);
        let a = random_matrix(&mut rng, 2, 5);
        let b = random_matrix(&mut rng, 2, 5);
        let sum = DenseMatrix66::add(&a, &b);
        let back = DenseMatrix66::subtract(&sum, &b);
        let doubled = DenseMatrix66::scale(&a, 2.0);
        for row in 0..2 {
            for column in 0..5 {
                assert_abs_diff_eq!(back.at(row, column), a.at(row, column), epsilon = 1e-6);
                assert_abs_diff_eq!(doubled.at(row, column), 2.0 * a.at(row, column));
            }
        }
    }

    #[test]
    fn test_cholesky_factor_reconstructs_matrix() {
        let mut rng = StdRng::seed_from_u64(3);
        let m = random_matrix(&mut rng, 5, 5);
        let a = DenseMatrix66::add(
            &DenseMatrix66::multiply_atb(&m, &m),
            &DenseMatrix66::make_identity(5),
        );
        let mut g = a;
        assert!(DenseMatrixSolver::cholesky_factorize(&mut g));
        let reconstructed = DenseMatrix66::multiply_abt(&g, &g);
        for row in 0..5 {
            for column in 0..5 {
                if column > row {
                    assert_eq!(g.at(row, column), 0.0);
                }
                assert_abs_diff_eq!(reconstructed.at(row, column), a.at(row, column), epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn test_solve_positive_definite_round_trips() {
        let mut rng = StdRng::seed_from_u64(1234);
        for _ in 0..200 {
            let n = rng.gen_range(1..=6);
            let m = random_matrix(&mut rng, n, n);
            // transpose(M) * M + n * I is comfortably positive definite.
            let a = DenseMatrix66::add(
                &DenseMatrix66::multiply_atb(&m, &m),
                &DenseMatrix66::scale(&DenseMatrix66::make_identity(n), n as f32),
            );
            let mut b = DenseMatrix61::make(n, 1);
            for row in 0..n {
                b.set_at(row, 0, rng.gen_range(-10.0..10.0));
            }
            let x = DenseMatrixSolver::solve_positive_definite(&a, &b)
                .expect("matrix is positive definite");
            let ax = DenseMatrix61::multiply_ab(&a, &x);
            for row in 0..n {
                assert_abs_diff_eq!(ax.at(row, 0), b.at(row, 0), epsilon = 1e-3);
            }
        }
    }

    #[test]
    fn test_non_positive_definite_is_rejected() {
        let mut a = DenseMatrix66::make(2, 2);
        a.set_at(0, 0, 1.0);
        a.set_at(0, 1, 2.0);
        a.set_at(1, 0, 2.0);
        a.set_at(1, 1, 1.0);
        let mut b = DenseMatrix61::make(2, 1);
        b.set_at(0, 0, 1.0);
        assert!(DenseMatrixSolver::solve_positive_definite(&a, &b).is_none());

        let mut zero = DenseMatrix66::make(3, 3);
        assert!(!DenseMatrixSolver::cholesky_factorize(&mut zero));
    }
}
