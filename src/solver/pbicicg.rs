//! Bi-conjugate gradient for several field components sharing one matrix.
//!
//! Components advance in lock-step, one iteration each per sweep, with their
//! own step lengths and convergence state. A component that converges (or
//! breaks down) stops iterating; the solve ends when every component has.

use crate::config::SolverControls;
use crate::error::LduError;
use crate::matrix::LduMatrix;
use crate::preconditioner::Preconditioner;
use crate::solver::pbicg::BiCgState;
use crate::solver::{LinearSolver, performance_name};
use crate::utils::convergence::{Convergence, SolverPerformance};

pub struct PbicicgSolver<'a> {
    field_name: String,
    matrix: &'a LduMatrix,
    preconditioner: Box<dyn Preconditioner + 'a>,
    convergence: Convergence,
}

impl<'a> PbicicgSolver<'a> {
    pub fn new(
        field_name: &str,
        matrix: &'a LduMatrix,
        preconditioner: Box<dyn Preconditioner + 'a>,
        controls: &SolverControls,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            matrix,
            preconditioner,
            convergence: Convergence::from_controls(controls),
        }
    }

    fn performance(&self, cmpt: usize, n_cmpts: usize) -> SolverPerformance {
        let field = if n_cmpts == 1 {
            self.field_name.clone()
        } else {
            format!("{}[{cmpt}]", self.field_name)
        };
        SolverPerformance::new(performance_name(self.preconditioner.type_name(), "PBiCICG"), field)
    }

    /// Solve `A·psi[c] = source[c]` for every component `c`.
    pub fn solve_components(
        &self,
        psi: &mut [Vec<f64>],
        source: &[Vec<f64>],
    ) -> Result<Vec<SolverPerformance>, LduError> {
        LduError::check_len("PBiCICG components", psi.len(), source.len())?;
        let n_cmpts = psi.len();
        let pc = self.preconditioner.as_ref();

        let mut perfs = Vec::with_capacity(n_cmpts);
        let mut states = Vec::with_capacity(n_cmpts);
        for (cmpt, (x, b)) in psi.iter().zip(source).enumerate() {
            let mut perf = self.performance(cmpt, n_cmpts);
            states.push(BiCgState::start(self.matrix, &self.convergence, &mut perf, x, b, cmpt)?);
            perfs.push(perf);
        }

        while states.iter().any(Option::is_some) {
            for (cmpt, (state, (perf, x))) in states.iter_mut().zip(perfs.iter_mut().zip(psi.iter_mut())).enumerate() {
                if let Some(s) = state {
                    if !s.step(self.matrix, pc, &self.convergence, perf, x, cmpt)? {
                        *state = None;
                    }
                }
            }
        }

        for perf in &perfs {
            perf.log();
        }
        Ok(perfs)
    }
}

impl LinearSolver for PbicicgSolver<'_> {
    fn type_name(&self) -> &'static str {
        "PBiCICG"
    }

    fn solve(&self, psi: &mut [f64], source: &[f64], cmpt: usize) -> Result<SolverPerformance, LduError> {
        let mut perf = self.performance(cmpt, 1);
        let pc = self.preconditioner.as_ref();
        if let Some(mut state) = BiCgState::start(self.matrix, &self.convergence, &mut perf, psi, source, cmpt)? {
            while state.step(self.matrix, pc, &self.convergence, &mut perf, psi, cmpt)? {}
        }
        perf.log();
        Ok(perf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::LduAddressing;
    use crate::preconditioner::{DiagonalPreconditioner, NoPreconditioner};
    use crate::solver::PbicgSolver;
    use approx::assert_abs_diff_eq;
    use std::sync::Arc;

    fn matrix(n: usize) -> LduMatrix {
        let addr = Arc::new(LduAddressing::new(n, (0..n - 1).collect(), (1..n).collect()).unwrap());
        LduMatrix::asymmetric(addr, vec![4.0; n], vec![-2.5; n - 1], vec![-1.0; n - 1]).unwrap()
    }

    #[test]
    fn components_match_independent_solves() {
        let m = matrix(10);
        let controls = SolverControls::new("PBiCICG").with_tolerance(1e-11);
        let sources = vec![
            (0..10).map(|i| i as f64).collect::<Vec<_>>(),
            vec![1.0; 10],
            vec![0.0; 10],
        ];
        let mut psi = vec![vec![0.0; 10]; 3];
        let solver = PbicicgSolver::new("U", &m, Box::new(DiagonalPreconditioner::new(&m)), &controls);
        let perfs = solver.solve_components(&mut psi, &sources).unwrap();
        assert_eq!(perfs.len(), 3);
        assert!(perfs.iter().all(|p| p.converged));
        assert_eq!(perfs[2].n_iterations, 0);
        assert_eq!(perfs[1].field_name, "U[1]");

        let single = PbicgSolver::new("U", &m, Box::new(DiagonalPreconditioner::new(&m)), &controls);
        for c in 0..2 {
            let mut x = vec![0.0; 10];
            let perf = single.solve(&mut x, &sources[c], c).unwrap();
            assert_eq!(perf.n_iterations, perfs[c].n_iterations);
            for i in 0..10 {
                assert_abs_diff_eq!(x[i], psi[c][i], epsilon = 1e-14);
            }
        }
    }

    #[test]
    fn single_component_solve() {
        let m = matrix(8);
        let controls = SolverControls::new("PBiCICG").with_tolerance(1e-12);
        let solver = PbicicgSolver::new("T", &m, Box::new(NoPreconditioner), &controls);
        let mut psi = vec![0.0; 8];
        let perf = solver.solve(&mut psi, &[1.0; 8], 0).unwrap();
        assert!(perf.converged);
        assert_eq!(perf.solver_name, "PBiCICG");
        let mut r = vec![0.0; 8];
        m.residual(&psi, &[1.0; 8], 0, &mut r).unwrap();
        assert!(r.iter().all(|v| v.abs() < 1e-10));
    }
}
