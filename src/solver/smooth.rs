//! Solver that only applies a smoother, checking convergence every
//! `nSweeps` sweeps.

use crate::config::SolverControls;
use crate::error::LduError;
use crate::matrix::LduMatrix;
use crate::smoother::Smoother;
use crate::solver::{LinearSolver, begin_solve};
use crate::utils::convergence::{Convergence, SolverPerformance, normalised_residual};

pub struct SmoothSolver<'a> {
    field_name: String,
    matrix: &'a LduMatrix,
    smoother: Box<dyn Smoother>,
    n_sweeps: usize,
    convergence: Convergence,
}

impl<'a> SmoothSolver<'a> {
    pub fn new(field_name: &str, matrix: &'a LduMatrix, smoother: Box<dyn Smoother>, controls: &SolverControls) -> Self {
        Self {
            field_name: field_name.into(),
            matrix,
            smoother,
            n_sweeps: controls.n_sweeps,
            convergence: Convergence::from_controls(controls),
        }
    }
}

impl LinearSolver for SmoothSolver<'_> {
    fn type_name(&self) -> &'static str {
        "smoothSolver"
    }

    fn solve(&self, psi: &mut [f64], source: &[f64], cmpt: usize) -> Result<SolverPerformance, LduError> {
        let mut perf = SolverPerformance::new("smoothSolver", self.field_name.as_str());
        let n = self.matrix.n_cells();
        let mut a_psi = vec![0.0; n];
        let mut r = vec![0.0; n];
        if let Some(norm_factor) = begin_solve(self.matrix, psi, source, cmpt, &mut perf, &mut a_psi, &mut r)? {
            if self.convergence.should_iterate(&mut perf) {
                loop {
                    self.smoother.smooth(self.matrix, psi, source, cmpt, self.n_sweeps)?;
                    self.matrix.residual(psi, source, cmpt, &mut r)?;
                    perf.record(normalised_residual(self.matrix, &r, norm_factor)?);
                    perf.n_iterations += self.n_sweeps;
                    if !self.convergence.keep_iterating(&mut perf) {
                        break;
                    }
                }
            }
        }
        perf.log();
        Ok(perf)
    }
}
