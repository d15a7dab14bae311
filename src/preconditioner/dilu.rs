//! Diagonal incomplete LU for asymmetric matrices.

use crate::error::LduError;
use crate::matrix::LduMatrix;
use crate::preconditioner::Preconditioner;

/// `(lo, hi, A[lo][hi], A[hi][lo])` of face `f`, whatever its orientation.
#[inline]
pub(crate) fn triangle_coeffs(matrix: &LduMatrix, f: usize) -> (usize, usize, f64, f64) {
    let addr = matrix.addressing();
    let (o, n) = (addr.owner()[f], addr.neighbour()[f]);
    let (upper, lower) = (matrix.upper()[f], matrix.lower()[f]);
    if o < n { (o, n, upper, lower) } else { (n, o, lower, upper) }
}

pub(crate) fn reciprocal_diagonal(matrix: &LduMatrix) -> Vec<f64> {
    let mut r_d = matrix.diag().to_vec();
    for &f in matrix.addressing().triangular_order() {
        let (lo, hi, u, l) = triangle_coeffs(matrix, f);
        r_d[hi] -= u * l / r_d[lo];
    }
    for d in r_d.iter_mut() {
        *d = 1.0 / *d;
    }
    r_d
}

/// w = M⁻¹·r with `M = (D* + L)·D*⁻¹·(D* + U)`.
pub(crate) fn apply(matrix: &LduMatrix, r_d: &[f64], w: &mut [f64], r: &[f64]) {
    let addr = matrix.addressing();
    for ((wi, &ri), &d) in w.iter_mut().zip(r).zip(r_d) {
        *wi = d * ri;
    }
    for &f in addr.losort_order() {
        let (lo, hi, _, l) = triangle_coeffs(matrix, f);
        w[hi] -= r_d[hi] * l * w[lo];
    }
    for &f in addr.triangular_order().iter().rev() {
        let (lo, hi, u, _) = triangle_coeffs(matrix, f);
        w[lo] -= r_d[lo] * u * w[hi];
    }
}

/// w = M⁻ᵀ·r, the same sweeps with `L` and `U` exchanged.
pub(crate) fn apply_t(matrix: &LduMatrix, r_d: &[f64], w: &mut [f64], r: &[f64]) {
    let addr = matrix.addressing();
    for ((wi, &ri), &d) in w.iter_mut().zip(r).zip(r_d) {
        *wi = d * ri;
    }
    for &f in addr.triangular_order() {
        let (lo, hi, u, _) = triangle_coeffs(matrix, f);
        w[hi] -= r_d[hi] * u * w[lo];
    }
    for &f in addr.losort_order().iter().rev() {
        let (lo, hi, _, l) = triangle_coeffs(matrix, f);
        w[lo] -= r_d[lo] * l * w[hi];
    }
}

pub struct DiluPreconditioner<'a> {
    matrix: &'a LduMatrix,
    r_d: Vec<f64>,
}

impl<'a> DiluPreconditioner<'a> {
    pub fn new(matrix: &'a LduMatrix) -> Self {
        Self { matrix, r_d: reciprocal_diagonal(matrix) }
    }

    fn check(&self, w: &[f64], r: &[f64]) -> Result<(), LduError> {
        LduError::check_len("DILU preconditioner", self.r_d.len(), r.len())?;
        LduError::check_len("DILU preconditioner", self.r_d.len(), w.len())
    }
}

impl Preconditioner for DiluPreconditioner<'_> {
    fn type_name(&self) -> &'static str {
        "DILU"
    }

    fn precondition(&self, w: &mut [f64], r: &[f64], _cmpt: usize) -> Result<(), LduError> {
        self.check(w, r)?;
        apply(self.matrix, &self.r_d, w, r);
        Ok(())
    }

    fn precondition_t(&self, w: &mut [f64], r: &[f64], _cmpt: usize) -> Result<(), LduError> {
        self.check(w, r)?;
        apply_t(self.matrix, &self.r_d, w, r);
        Ok(())
    }
}
