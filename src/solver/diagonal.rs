use crate::error::LduError;
use crate::matrix::LduMatrix;
use crate::solver::LinearSolver;
use crate::utils::convergence::SolverPerformance;

/// Solver for purely diagonal systems: psi = source/diag.
pub struct DiagonalSolver<'a> {
    field_name: String,
    matrix: &'a LduMatrix,
}

impl<'a> DiagonalSolver<'a> {
    pub fn new(field_name: &str, matrix: &'a LduMatrix) -> Self {
        Self { field_name: field_name.into(), matrix }
    }
}

impl LinearSolver for DiagonalSolver<'_> {
    fn type_name(&self) -> &'static str {
        "diagonal"
    }

    fn solve(&self, psi: &mut [f64], source: &[f64], _cmpt: usize) -> Result<SolverPerformance, LduError> {
        LduError::check_len("solution", self.matrix.n_cells(), psi.len())?;
        LduError::check_len("source", self.matrix.n_cells(), source.len())?;
        let mut perf = SolverPerformance::new("diagonal", self.field_name.as_str());
        let (zero_at, any_zero) = self.matrix.has_zero_diagonal()?;
        if any_zero {
            if let Some(cell) = zero_at {
                log::warn!("diagonal: zero diagonal coefficient in cell {cell} for {}", self.field_name);
            }
            perf.singular = true;
            perf.log();
            return Ok(perf);
        }
        for ((x, &b), &d) in psi.iter_mut().zip(source).zip(self.matrix.diag()) {
            *x = b / d;
        }
        perf.set_initial(0.0);
        perf.converged = true;
        perf.log();
        Ok(perf)
    }
}
