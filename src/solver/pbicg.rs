//! Preconditioned bi-conjugate gradient for asymmetric matrices.
//!
//! Runs a shadow residual `rT` through `Aᵀ` and the transposed preconditioner
//! alongside the primary one.

use crate::config::SolverControls;
use crate::core::field::{axpy, g_sum_prod};
use crate::error::LduError;
use crate::matrix::LduMatrix;
use crate::preconditioner::Preconditioner;
use crate::solver::{LinearSolver, begin_solve, performance_name};
use crate::utils::convergence::{Convergence, GREAT, SolverPerformance, normalised_residual};

pub struct PbicgSolver<'a> {
    field_name: String,
    matrix: &'a LduMatrix,
    preconditioner: Box<dyn Preconditioner + 'a>,
    convergence: Convergence,
}

impl<'a> PbicgSolver<'a> {
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

impl LinearSolver for PbicgSolver<'_> {
    fn type_name(&self) -> &'static str {
        "PBiCG"
    }

    fn solve(&self, psi: &mut [f64], source: &[f64], cmpt: usize) -> Result<SolverPerformance, LduError> {
        let mut perf = SolverPerformance::new(
            performance_name(self.preconditioner.type_name(), "PBiCG"),
            self.field_name.as_str(),
        );
        let pc = self.preconditioner.as_ref();
        if let Some(mut state) = BiCgState::start(self.matrix, &self.convergence, &mut perf, psi, source, cmpt)? {
            while state.step(self.matrix, pc, &self.convergence, &mut perf, psi, cmpt)? {}
        }
        perf.log();
        Ok(perf)
    }
}

/// Work vectors and recurrence scalars of one bi-conjugate gradient solve.
pub(crate) struct BiCgState {
    w_a: Vec<f64>,
    r_a: Vec<f64>,
    w_t: Vec<f64>,
    r_t: Vec<f64>,
    p_a: Vec<f64>,
    p_t: Vec<f64>,
    w_a_r_t: f64,
    norm_factor: f64,
}

impl BiCgState {
    /// Initial residuals; `None` when no iteration is required.
    pub(crate) fn start(
        matrix: &LduMatrix,
        convergence: &Convergence,
        perf: &mut SolverPerformance,
        psi: &[f64],
        source: &[f64],
        cmpt: usize,
    ) -> Result<Option<Self>, LduError> {
        let n = matrix.n_cells();
        let mut w_a = vec![0.0; n];
        let mut r_a = vec![0.0; n];
        let Some(norm_factor) = begin_solve(matrix, psi, source, cmpt, perf, &mut w_a, &mut r_a)? else {
            return Ok(None);
        };
        if !convergence.should_iterate(perf) {
            return Ok(None);
        }
        let mut w_t = vec![0.0; n];
        matrix.tmul(psi, cmpt, &mut w_t)?;
        let r_t = source.iter().zip(&w_t).map(|(&b, &w)| b - w).collect();
        Ok(Some(Self {
            w_a,
            r_a,
            w_t,
            r_t,
            p_a: vec![0.0; n],
            p_t: vec![0.0; n],
            w_a_r_t: GREAT,
            norm_factor,
        }))
    }

    /// One iteration. Returns whether the solve should continue.
    pub(crate) fn step(
        &mut self,
        matrix: &LduMatrix,
        pc: &dyn Preconditioner,
        convergence: &Convergence,
        perf: &mut SolverPerformance,
        psi: &mut [f64],
        cmpt: usize,
    ) -> Result<bool, LduError> {
        let comm = matrix.comm().as_ref();
        let w_a_r_t_old = self.w_a_r_t;
        pc.precondition(&mut self.w_a, &self.r_a, cmpt)?;
        pc.precondition_t(&mut self.w_t, &self.r_t, cmpt)?;
        self.w_a_r_t = g_sum_prod(comm, &self.w_a, &self.r_t)?;

        if perf.n_iterations == 0 {
            self.p_a.copy_from_slice(&self.w_a);
            self.p_t.copy_from_slice(&self.w_t);
        } else {
            let beta = self.w_a_r_t / w_a_r_t_old;
            for (pa, &wa) in self.p_a.iter_mut().zip(&self.w_a) {
                *pa = wa + beta * *pa;
            }
            for (pt, &wt) in self.p_t.iter_mut().zip(&self.w_t) {
                *pt = wt + beta * *pt;
            }
        }

        matrix.amul(&self.p_a, cmpt, &mut self.w_a)?;
        matrix.tmul(&self.p_t, cmpt, &mut self.w_t)?;
        let w_a_p_t = g_sum_prod(comm, &self.w_a, &self.p_t)?;
        if perf.check_singularity(w_a_p_t.abs() / self.norm_factor) {
            return Ok(false);
        }

        let alpha = self.w_a_r_t / w_a_p_t;
        axpy(alpha, &self.p_a, psi);
        axpy(-alpha, &self.w_a, &mut self.r_a);
        axpy(-alpha, &self.w_t, &mut self.r_t);

        perf.record(normalised_residual(matrix, &self.r_a, self.norm_factor)?);
        perf.n_iterations += 1;
        Ok(convergence.keep_iterating(perf))
    }
}
