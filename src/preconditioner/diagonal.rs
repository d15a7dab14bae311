// Diagonal (Jacobi) preconditioner

use crate::error::LduError;
use crate::matrix::LduMatrix;
use crate::preconditioner::Preconditioner;

/// M⁻¹ = D⁻¹
#[derive(Debug, Clone)]
pub struct DiagonalPreconditioner {
    pub(crate) r_d: Vec<f64>,
}

impl DiagonalPreconditioner {
    pub fn new(matrix: &LduMatrix) -> Self {
        Self { r_d: matrix.diag().iter().map(|&d| 1.0 / d).collect() }
    }
}

impl Preconditioner for DiagonalPreconditioner {
    fn type_name(&self) -> &'static str {
        "diagonal"
    }

    fn precondition(&self, w: &mut [f64], r: &[f64], _cmpt: usize) -> Result<(), LduError> {
        LduError::check_len("diagonal preconditioner", self.r_d.len(), r.len())?;
        LduError::check_len("diagonal preconditioner", self.r_d.len(), w.len())?;
        for ((wi, &ri), &d) in w.iter_mut().zip(r).zip(&self.r_d) {
            *wi = d * ri;
        }
        Ok(())
    }
}
