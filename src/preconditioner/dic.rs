//! Diagonal incomplete Cholesky for symmetric matrices.
//!
//! Only the diagonal is modified during factorisation:
//! `D*[hi] = diag[hi] − Σ upper²/D*[lo]`, walking faces in triangular order.
//! The preconditioner is `M = (D* + L)·D*⁻¹·(D* + U)` with `L`, `U` taken
//! straight from the matrix.

use crate::error::LduError;
use crate::matrix::LduMatrix;
use crate::preconditioner::Preconditioner;

/// Reciprocal of the factorised diagonal.
pub(crate) fn reciprocal_diagonal(matrix: &LduMatrix) -> Vec<f64> {
    let addr = matrix.addressing();
    let upper = matrix.upper();
    let mut r_d = matrix.diag().to_vec();
    for &f in addr.triangular_order() {
        let (lo, hi) = addr.lo_hi(f);
        r_d[hi] -= upper[f] * upper[f] / r_d[lo];
    }
    for d in r_d.iter_mut() {
        *d = 1.0 / *d;
    }
    r_d
}

/// Forward and backward substitution with the DIC factors.
pub(crate) fn apply(matrix: &LduMatrix, r_d: &[f64], w: &mut [f64], r: &[f64]) {
    let addr = matrix.addressing();
    let upper = matrix.upper();
    let order = addr.triangular_order();

    for ((wi, &ri), &d) in w.iter_mut().zip(r).zip(r_d) {
        *wi = d * ri;
    }
    for &f in order {
        let (lo, hi) = addr.lo_hi(f);
        w[hi] -= r_d[hi] * upper[f] * w[lo];
    }
    for &f in order.iter().rev() {
        let (lo, hi) = addr.lo_hi(f);
        w[lo] -= r_d[lo] * upper[f] * w[hi];
    }
}

pub struct DicPreconditioner<'a> {
    matrix: &'a LduMatrix,
    r_d: Vec<f64>,
}

impl<'a> DicPreconditioner<'a> {
    pub fn new(matrix: &'a LduMatrix) -> Self {
        Self { matrix, r_d: reciprocal_diagonal(matrix) }
    }
}

impl Preconditioner for DicPreconditioner<'_> {
    fn type_name(&self) -> &'static str {
        "DIC"
    }

    fn precondition(&self, w: &mut [f64], r: &[f64], _cmpt: usize) -> Result<(), LduError> {
        LduError::check_len("DIC preconditioner", self.r_d.len(), r.len())?;
        LduError::check_len("DIC preconditioner", self.r_d.len(), w.len())?;
        apply(self.matrix, &self.r_d, w, r);
        Ok(())
    }
}
