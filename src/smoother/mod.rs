//! Smoothers for the GAMG levels and the smooth solver.
//!
//! A smoother owns whatever it precomputes from the matrix (reciprocal
//! diagonals, row coefficients) and is handed the matrix again on every call,
//! so it can live next to the matrix it was built from.

use bitflags::bitflags;

use crate::error::LduError;
use crate::matrix::LduMatrix;

pub mod gauss_seidel;
pub mod incomplete;

pub use gauss_seidel::GaussSeidelSmoother;
pub use incomplete::{IncompleteGaussSeidelSmoother, IncompleteSmoother};

bitflags! {
    /// Directions of a Gauss–Seidel sweep.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct SweepFlags: u8 {
        const FORWARD   = 0b01;
        const BACKWARD  = 0b10;
        const SYMMETRIC = Self::FORWARD.bits() | Self::BACKWARD.bits();
    }
}

pub trait Smoother {
    fn type_name(&self) -> &'static str;

    /// Apply `n_sweeps` sweeps to `psi` for `A·psi = source`.
    fn smooth(
        &self,
        matrix: &LduMatrix,
        psi: &mut [f64],
        source: &[f64],
        cmpt: usize,
        n_sweeps: usize,
    ) -> Result<(), LduError>;
}

pub(crate) fn check_fields(matrix: &LduMatrix, psi: &[f64], source: &[f64]) -> Result<(), LduError> {
    LduError::check_len("smoother solution", matrix.n_cells(), psi.len())?;
    LduError::check_len("smoother source", matrix.n_cells(), source.len())
}
