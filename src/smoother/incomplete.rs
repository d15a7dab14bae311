//! Smoothers built on the DIC/DILU factorisations, optionally followed by
//! Gauss–Seidel sweeps.

use crate::core::field::axpy;
use crate::error::LduError;
use crate::matrix::LduMatrix;
use crate::preconditioner::{dic, dilu};
use crate::smoother::{GaussSeidelSmoother, Smoother, SweepFlags, check_fields};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Factorisation {
    /// Symmetric matrices.
    Dic,
    /// Asymmetric matrices.
    Dilu,
}

/// `psi += M⁻¹·(source − A·psi)` per sweep.
pub struct IncompleteSmoother {
    kind: Factorisation,
    r_d: Vec<f64>,
}

impl IncompleteSmoother {
    pub fn new(matrix: &LduMatrix, kind: Factorisation) -> Self {
        let r_d = match kind {
            Factorisation::Dic => dic::reciprocal_diagonal(matrix),
            Factorisation::Dilu => dilu::reciprocal_diagonal(matrix),
        };
        Self { kind, r_d }
    }
}

impl Smoother for IncompleteSmoother {
    fn type_name(&self) -> &'static str {
        match self.kind {
            Factorisation::Dic => "DIC",
            Factorisation::Dilu => "DILU",
        }
    }

    fn smooth(
        &self,
        matrix: &LduMatrix,
        psi: &mut [f64],
        source: &[f64],
        cmpt: usize,
        n_sweeps: usize,
    ) -> Result<(), LduError> {
        check_fields(matrix, psi, source)?;
        let n = matrix.n_cells();
        let mut r = vec![0.0; n];
        let mut w = vec![0.0; n];
        for _ in 0..n_sweeps {
            matrix.residual(psi, source, cmpt, &mut r)?;
            match self.kind {
                Factorisation::Dic => dic::apply(matrix, &self.r_d, &mut w, &r),
                Factorisation::Dilu => dilu::apply(matrix, &self.r_d, &mut w, &r),
            }
            axpy(1.0, &w, psi);
        }
        Ok(())
    }
}

/// DIC or DILU sweeps followed by the same number of Gauss–Seidel sweeps.
pub struct IncompleteGaussSeidelSmoother {
    incomplete: IncompleteSmoother,
    gauss_seidel: GaussSeidelSmoother,
}

impl IncompleteGaussSeidelSmoother {
    pub fn new(matrix: &LduMatrix, kind: Factorisation) -> Self {
        Self {
            incomplete: IncompleteSmoother::new(matrix, kind),
            gauss_seidel: GaussSeidelSmoother::new(matrix, SweepFlags::FORWARD),
        }
    }
}

impl Smoother for IncompleteGaussSeidelSmoother {
    fn type_name(&self) -> &'static str {
        match self.incomplete.kind {
            Factorisation::Dic => "DICGaussSeidel",
            Factorisation::Dilu => "DILUGaussSeidel",
        }
    }

    fn smooth(
        &self,
        matrix: &LduMatrix,
        psi: &mut [f64],
        source: &[f64],
        cmpt: usize,
        n_sweeps: usize,
    ) -> Result<(), LduError> {
        self.incomplete.smooth(matrix, psi, source, cmpt, n_sweeps)?;
        self.gauss_seidel.smooth(matrix, psi, source, cmpt, n_sweeps)
    }
}
