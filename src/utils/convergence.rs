//! Convergence tracking & tolerance checks for iterative solvers.
//!
//! Residuals are reported normalised: the global sum of |r| divided by a
//! normalisation factor built from the matrix row sums and the mean of the
//! current solution. This makes the tolerances independent of the scale of
//! the problem.

use std::fmt;

use crate::config::SolverControls;
use crate::core::field::{g_average, g_sum_mag};
use crate::error::LduError;
use crate::matrix::LduMatrix;

/// Stabiliser added to the normalisation factor.
pub const SMALL: f64 = 1e-20;
/// Threshold under which a pivot or inner product counts as zero.
pub const VSMALL: f64 = 1e-300;
/// Initial value of the previous inner product in the bi-conjugate recurrences.
pub const GREAT: f64 = 1e15;

/// Stopping criteria.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Convergence {
    pub tolerance: f64,
    pub rel_tol: f64,
    pub max_iter: usize,
    pub min_iter: usize,
}

impl Convergence {
    pub fn from_controls(controls: &SolverControls) -> Self {
        Self {
            tolerance: controls.tolerance,
            rel_tol: controls.rel_tol,
            max_iter: controls.max_iter,
            min_iter: controls.min_iter,
        }
    }

    /// Updates `perf.converged` and returns it.
    pub fn check(&self, perf: &mut SolverPerformance) -> bool {
        perf.converged = perf.final_residual < self.tolerance
            || (self.rel_tol > SMALL && perf.final_residual < self.rel_tol * perf.initial_residual);
        perf.converged
    }

    /// Whether the iteration loop should run at all after the initial residual.
    pub fn should_iterate(&self, perf: &mut SolverPerformance) -> bool {
        self.min_iter > 0 || !self.check(perf)
    }

    /// Loop condition evaluated after iteration `perf.n_iterations` completed.
    pub fn keep_iterating(&self, perf: &mut SolverPerformance) -> bool {
        if perf.singular || !perf.final_residual.is_finite() {
            return false;
        }
        (perf.n_iterations < self.max_iter && !self.check(perf)) || perf.n_iterations < self.min_iter
    }
}

/// How a solve ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveOutcome {
    Converged,
    MaxIterations,
    Singular,
    Diverged,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolverPerformance {
    pub solver_name: String,
    pub field_name: String,
    pub initial_residual: f64,
    pub final_residual: f64,
    pub n_iterations: usize,
    pub converged: bool,
    pub singular: bool,
    /// Normalised residual after each iteration, starting with the initial one.
    pub residual_history: Vec<f64>,
}

impl SolverPerformance {
    pub fn new(solver_name: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self {
            solver_name: solver_name.into(),
            field_name: field_name.into(),
            initial_residual: 0.0,
            final_residual: 0.0,
            n_iterations: 0,
            converged: false,
            singular: false,
            residual_history: Vec::new(),
        }
    }

    /// Record the residual before the first iteration.
    pub fn set_initial(&mut self, residual: f64) {
        self.initial_residual = residual;
        self.final_residual = residual;
        self.residual_history.clear();
        self.residual_history.push(residual);
    }

    /// Record the residual at the end of an iteration.
    pub fn record(&mut self, residual: f64) {
        self.final_residual = residual;
        self.residual_history.push(residual);
        log::trace!(
            "{}: {} iteration {} residual = {:e}",
            self.solver_name,
            self.field_name,
            self.n_iterations + 1,
            residual
        );
    }

    /// Flags the solve as singular when `value` is below `VSMALL`.
    pub fn check_singularity(&mut self, value: f64) -> bool {
        self.singular = value < VSMALL;
        self.singular
    }

    pub fn diverged(&self) -> bool {
        !self.final_residual.is_finite()
    }

    pub fn outcome(&self) -> SolveOutcome {
        if self.singular {
            SolveOutcome::Singular
        } else if self.diverged() {
            SolveOutcome::Diverged
        } else if self.converged {
            SolveOutcome::Converged
        } else {
            SolveOutcome::MaxIterations
        }
    }

    pub(crate) fn log(&self) {
        log::debug!("{self}");
    }
}

impl fmt::Display for SolverPerformance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:  Solving for {}, Initial residual = {:e}, Final residual = {:e}, No Iterations {}",
            self.solver_name, self.field_name, self.initial_residual, self.final_residual, self.n_iterations
        )?;
        if self.singular {
            write!(f, " (singular)")?;
        }
        Ok(())
    }
}

/// Normalisation factor for the residual of `A·psi = source`.
///
/// `a_psi` must hold `A·psi`. `tmp` is scratch space of the same length.
pub fn norm_factor(
    matrix: &LduMatrix,
    psi: &[f64],
    source: &[f64],
    a_psi: &[f64],
    tmp: &mut [f64],
) -> Result<f64, LduError> {
    let comm = matrix.comm().as_ref();
    matrix.sum_a(tmp)?;
    let x_ref = g_average(comm, psi)?;
    for t in tmp.iter_mut() {
        *t *= x_ref;
    }
    let local: f64 = a_psi
        .iter()
        .zip(source)
        .zip(tmp.iter())
        .map(|((&ax, &b), &t)| (ax - t).abs() + (b - t).abs())
        .sum();
    Ok(comm.sum(local)? + SMALL)
}

/// Normalised global residual magnitude.
pub fn normalised_residual(matrix: &LduMatrix, r: &[f64], norm_factor: f64) -> Result<f64, LduError> {
    Ok(g_sum_mag(matrix.comm().as_ref(), r)? / norm_factor)
}

/// True when the normalisation factor is no larger than its stabiliser, so the
/// system is trivially satisfied.
pub fn negligible(norm_factor: f64) -> bool {
    norm_factor <= 2.0 * SMALL
}
