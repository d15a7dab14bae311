//! Direct dense LU solve using Faer.
//!
//! Used for the coarsest GAMG level, where the matrix is small enough to
//! factorise densely once and reuse for every V-cycle.
//!
//! # References
//! - Faer documentation: https://github.com/sarah-ek/faer-rs

use faer::linalg::solvers::{FullPivLu, SolveCore};
use faer::{Conj, MatMut};

use crate::error::LduError;
use crate::matrix::LduMatrix;

/// Pivot ratio below which the factorisation is treated as rank deficient.
const PIVOT_TOLERANCE: f64 = 1e-12;

/// LU factorisation with full pivoting of a rank-local LDU matrix.
pub struct LuSolver {
    factor: FullPivLu<f64>,
    n: usize,
}

impl LuSolver {
    /// Factorise `matrix`. Interface couplings are not part of the dense
    /// matrix, so coupled matrices are rejected.
    pub fn new(matrix: &LduMatrix) -> Result<Self, LduError> {
        if !matrix.interfaces().is_empty() {
            return Err(LduError::FactorError(format!(
                "cannot factorise a matrix with {} interface couplings densely",
                matrix.interfaces().len()
            )));
        }
        let a = matrix.to_dense();
        Ok(Self { factor: FullPivLu::new(a.as_ref()), n: matrix.n_cells() })
    }

    /// Whether the smallest pivot is negligible against the largest, as for
    /// the Laplacian of a mesh without fixed-value boundaries. Full pivoting
    /// leaves the pivots in non-increasing magnitude.
    pub fn is_singular(&self) -> bool {
        if self.n == 0 {
            return false;
        }
        let u = self.factor.U();
        let first = u.get(0, 0).abs();
        let last = u.get(self.n - 1, self.n - 1).abs();
        !(last > PIVOT_TOLERANCE * first)
    }

    /// Overwrite `x` (holding the right-hand side) with the solution.
    pub fn solve_in_place(&self, x: &mut [f64]) -> Result<(), LduError> {
        LduError::check_len("direct solve", self.n, x.len())?;
        let x_mat = MatMut::from_column_major_slice_mut(x, self.n, 1);
        self.factor.solve_in_place_with_conj(Conj::No, x_mat);
        if x.iter().any(|v| !v.is_finite()) {
            return Err(LduError::FactorError("dense LU produced a non-finite solution".into()));
        }
        Ok(())
    }
}
