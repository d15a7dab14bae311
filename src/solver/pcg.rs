//! Preconditioned Conjugate Gradient (PCG) for symmetric matrices.

use crate::config::SolverControls;
use crate::core::field::{axpy, g_sum_prod};
use crate::error::LduError;
use crate::matrix::LduMatrix;
use crate::preconditioner::Preconditioner;
use crate::solver::{LinearSolver, begin_solve, performance_name};
use crate::utils::convergence::{Convergence, SolverPerformance, normalised_residual};

pub struct PcgSolver<'a> {
    field_name: String,
    matrix: &'a LduMatrix,
    preconditioner: Box<dyn Preconditioner + 'a>,
    convergence: Convergence,
}

impl<'a> PcgSolver<'a> {
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
}

impl LinearSolver for PcgSolver<'_> {
    fn type_name(&self) -> &'static str {
        "PCG"
    }

    fn solve(&self, psi: &mut [f64], source: &[f64], cmpt: usize) -> Result<SolverPerformance, LduError> {
        let mut perf = SolverPerformance::new(
            performance_name(self.preconditioner.type_name(), "PCG"),
            self.field_name.as_str(),
        );
        pcg(self.matrix, self.preconditioner.as_ref(), &self.convergence, &mut perf, psi, source, cmpt)?;
        perf.log();
        Ok(perf)
    }
}

/// Fletcher–Reeves conjugate gradient recurrence on an LDU matrix.
pub(crate) fn pcg(
    matrix: &LduMatrix,
    preconditioner: &dyn Preconditioner,
    convergence: &Convergence,
    perf: &mut SolverPerformance,
    psi: &mut [f64],
    source: &[f64],
    cmpt: usize,
) -> Result<(), LduError> {
    let n = matrix.n_cells();
    let comm = matrix.comm().as_ref();
    let mut w_a = vec![0.0; n];
    let mut r_a = vec![0.0; n];
    let Some(norm_factor) = begin_solve(matrix, psi, source, cmpt, perf, &mut w_a, &mut r_a)? else {
        return Ok(());
    };
    if !convergence.should_iterate(perf) {
        return Ok(());
    }

    let mut p_a = vec![0.0; n];
    let mut w_a_r_a = 0.0;
    loop {
        let w_a_r_a_old = w_a_r_a;
        preconditioner.precondition(&mut w_a, &r_a, cmpt)?;
        w_a_r_a = g_sum_prod(comm, &w_a, &r_a)?;

        if perf.n_iterations == 0 {
            p_a.copy_from_slice(&w_a);
        } else {
            let beta = w_a_r_a / w_a_r_a_old;
            for (p, &w) in p_a.iter_mut().zip(&w_a) {
                *p = w + beta * *p;
            }
        }

        matrix.amul(&p_a, cmpt, &mut w_a)?;
        let w_a_p_a = g_sum_prod(comm, &w_a, &p_a)?;
        if perf.check_singularity(w_a_p_a.abs() / norm_factor) {
            break;
        }

        let alpha = w_a_r_a / w_a_p_a;
        axpy(alpha, &p_a, psi);
        axpy(-alpha, &w_a, &mut r_a);

        perf.record(normalised_residual(matrix, &r_a, norm_factor)?);
        perf.n_iterations += 1;
        if !convergence.keep_iterating(perf) {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::LduAddressing;
    use crate::preconditioner::{DiagonalPreconditioner, DicPreconditioner, NoPreconditioner};
    use crate::utils::convergence::SolveOutcome;
    use approx::assert_abs_diff_eq;
    use std::sync::Arc;

    fn tridiagonal(n: usize) -> LduMatrix {
        let addr = Arc::new(LduAddressing::new(n, (0..n - 1).collect(), (1..n).collect()).unwrap());
        LduMatrix::symmetric(addr, vec![2.0; n], vec![-1.0; n - 1]).unwrap()
    }

    #[test]
    fn five_cell_chain_with_diagonal_preconditioner() {
        let m = tridiagonal(5);
        let controls = SolverControls::new("PCG").with_preconditioner("diagonal").with_tolerance(1e-10);
        let solver = PcgSolver::new("T", &m, Box::new(DiagonalPreconditioner::new(&m)), &controls);
        let mut psi = vec![0.0; 5];
        let perf = solver.solve(&mut psi, &[1.0, 0.0, 0.0, 0.0, 1.0], 0).unwrap();
        assert!(perf.converged);
        assert!(perf.n_iterations <= 5);
        assert_eq!(perf.solver_name, "diagonalPCG");
        for v in psi {
            assert_abs_diff_eq!(v, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn dic_converges_in_one_iteration_on_tridiagonal() {
        let m = tridiagonal(8);
        let controls = SolverControls::new("PCG").with_tolerance(1e-12);
        let solver = PcgSolver::new("p", &m, Box::new(DicPreconditioner::new(&m)), &controls);
        let mut psi = vec![0.0; 8];
        let b: Vec<f64> = (0..8).map(|i| i as f64).collect();
        let perf = solver.solve(&mut psi, &b, 0).unwrap();
        assert_eq!(perf.outcome(), SolveOutcome::Converged);
        assert_eq!(perf.n_iterations, 1);
    }

    #[test]
    fn relative_tolerance_stops_early() {
        let m = tridiagonal(40);
        let controls = SolverControls::new("PCG").with_tolerance(0.0).with_rel_tol(0.5);
        let solver = PcgSolver::new("p", &m, Box::new(NoPreconditioner), &controls);
        let mut psi = vec![0.0; 40];
        let perf = solver.solve(&mut psi, &vec![1.0; 40], 0).unwrap();
        assert!(perf.converged);
        assert!(perf.final_residual < 0.5 * perf.initial_residual);
        assert!(perf.n_iterations < 40);
        assert_eq!(perf.residual_history.len(), perf.n_iterations + 1);
    }

    #[test]
    fn max_iter_is_reported_not_fatal() {
        let m = tridiagonal(50);
        let controls = SolverControls::new("PCG").with_tolerance(1e-14).with_max_iter(3);
        let solver = PcgSolver::new("p", &m, Box::new(NoPreconditioner), &controls);
        let mut psi = vec![0.0; 50];
        let perf = solver.solve(&mut psi, &vec![1.0; 50], 0).unwrap();
        assert_eq!(perf.n_iterations, 3);
        assert_eq!(perf.outcome(), SolveOutcome::MaxIterations);
    }

    #[test]
    fn zero_source_and_solution_is_converged() {
        let m = tridiagonal(4);
        let solver = PcgSolver::new("p", &m, Box::new(NoPreconditioner), &SolverControls::default());
        let mut psi = vec![0.0; 4];
        let perf = solver.solve(&mut psi, &[0.0; 4], 0).unwrap();
        assert!(perf.converged);
        assert_eq!(perf.n_iterations, 0);
    }

    #[test]
    fn wrong_source_length_is_an_error() {
        let m = tridiagonal(4);
        let solver = PcgSolver::new("p", &m, Box::new(NoPreconditioner), &SolverControls::default());
        let mut psi = vec![0.0; 4];
        assert!(matches!(
            solver.solve(&mut psi, &[1.0; 3], 0),
            Err(LduError::DimensionMismatch { .. })
        ));
    }
}
