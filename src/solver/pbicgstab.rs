//! Preconditioned BiCGStab (van der Vorst), valid for either symmetry.
//!
//! Also used for asymmetric GAMG coarsest levels.

use crate::config::SolverControls;
use crate::core::field::{g_sum_prod, g_sum_sqr};
use crate::error::LduError;
use crate::matrix::LduMatrix;
use crate::preconditioner::Preconditioner;
use crate::solver::{LinearSolver, begin_solve, performance_name};
use crate::utils::convergence::{Convergence, SolverPerformance, VSMALL, normalised_residual};

pub struct PbicgStabSolver<'a> {
    field_name: String,
    matrix: &'a LduMatrix,
    preconditioner: Box<dyn Preconditioner + 'a>,
    convergence: Convergence,
}

impl<'a> PbicgStabSolver<'a> {
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

impl LinearSolver for PbicgStabSolver<'_> {
    fn type_name(&self) -> &'static str {
        "PBiCGStab"
    }

    fn solve(&self, psi: &mut [f64], source: &[f64], cmpt: usize) -> Result<SolverPerformance, LduError> {
        let mut perf = SolverPerformance::new(
            performance_name(self.preconditioner.type_name(), "PBiCGStab"),
            self.field_name.as_str(),
        );
        pbicgstab(self.matrix, self.preconditioner.as_ref(), &self.convergence, &mut perf, psi, source, cmpt)?;
        perf.log();
        Ok(perf)
    }
}

pub(crate) fn pbicgstab(
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
    let mut y_a = vec![0.0; n];
    let mut r_a = vec![0.0; n];
    let Some(norm_factor) = begin_solve(matrix, psi, source, cmpt, perf, &mut y_a, &mut r_a)? else {
        return Ok(());
    };
    if !convergence.should_iterate(perf) {
        return Ok(());
    }

    let r_a0 = r_a.clone();
    let mut p_a = vec![0.0; n];
    let mut a_y_a = vec![0.0; n];
    let mut s_a = vec![0.0; n];
    let mut z_a = vec![0.0; n];
    let mut t_a = vec![0.0; n];
    let mut r_a0_r_a = 0.0;
    let mut alpha = 0.0;
    let mut omega: f64 = 0.0;

    loop {
        let r_a0_r_a_old = r_a0_r_a;
        r_a0_r_a = g_sum_prod(comm, &r_a0, &r_a)?;
        if perf.check_singularity(r_a0_r_a.abs()) {
            break;
        }

        if perf.n_iterations == 0 {
            p_a.copy_from_slice(&r_a);
        } else {
            if perf.check_singularity(omega.abs()) {
                break;
            }
            let beta = (r_a0_r_a / r_a0_r_a_old) * (alpha / omega);
            for ((p, &r), &ay) in p_a.iter_mut().zip(&r_a).zip(&a_y_a) {
                *p = r + beta * (*p - omega * ay);
            }
        }

        preconditioner.precondition(&mut y_a, &p_a, cmpt)?;
        matrix.amul(&y_a, cmpt, &mut a_y_a)?;
        let r_a0_a_y_a = g_sum_prod(comm, &r_a0, &a_y_a)?;
        alpha = r_a0_r_a / r_a0_a_y_a;

        for ((s, &r), &ay) in s_a.iter_mut().zip(&r_a).zip(&a_y_a) {
            *s = r - alpha * ay;
        }
        let s_residual = normalised_residual(matrix, &s_a, norm_factor)?;
        perf.final_residual = s_residual;
        if perf.n_iterations + 1 >= convergence.min_iter && convergence.check(perf) {
            for (x, &y) in psi.iter_mut().zip(&y_a) {
                *x += alpha * y;
            }
            perf.record(s_residual);
            perf.n_iterations += 1;
            return Ok(());
        }

        preconditioner.precondition(&mut z_a, &s_a, cmpt)?;
        matrix.amul(&z_a, cmpt, &mut t_a)?;
        let t_a_t_a = g_sum_sqr(comm, &t_a)?;
        omega = if t_a_t_a < VSMALL { 0.0 } else { g_sum_prod(comm, &t_a, &s_a)? / t_a_t_a };

        for ((x, &y), &z) in psi.iter_mut().zip(&y_a).zip(&z_a) {
            *x += alpha * y + omega * z;
        }
        for ((r, &s), &t) in r_a.iter_mut().zip(&s_a).zip(&t_a) {
            *r = s - omega * t;
        }

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
    use crate::preconditioner::{DiagonalPreconditioner, DiluPreconditioner};
    use approx::assert_abs_diff_eq;
    use std::sync::Arc;

    fn grid_matrix(nx: usize) -> LduMatrix {
        let (mut owner, mut neighbour) = (Vec::new(), Vec::new());
        for j in 0..nx {
            for i in 0..nx {
                let c = j * nx + i;
                if i + 1 < nx {
                    owner.push(c);
                    neighbour.push(c + 1);
                }
                if j + 1 < nx {
                    owner.push(c);
                    neighbour.push(c + nx);
                }
            }
        }
        let nf = owner.len();
        let addr = Arc::new(LduAddressing::new(nx * nx, owner, neighbour).unwrap());
        LduMatrix::asymmetric(addr, vec![4.4; nx * nx], vec![-1.6; nf], vec![-0.4; nf]).unwrap()
    }

    #[test]
    fn converges_on_asymmetric_grid() {
        let m = grid_matrix(6);
        let x: Vec<f64> = (0..36).map(|i| (i as f64).cos()).collect();
        let mut b = vec![0.0; 36];
        m.amul(&x, 0, &mut b).unwrap();
        let controls = SolverControls::new("PBiCGStab").with_tolerance(1e-12);
        for pc in [
            Box::new(DiagonalPreconditioner::new(&m)) as Box<dyn Preconditioner>,
            Box::new(DiluPreconditioner::new(&m)),
        ] {
            let solver = PbicgStabSolver::new("k", &m, pc, &controls);
            let mut psi = vec![0.0; 36];
            let perf = solver.solve(&mut psi, &b, 0).unwrap();
            assert!(perf.converged, "{perf}");
            for i in 0..36 {
                assert_abs_diff_eq!(psi[i], x[i], epsilon = 1e-8);
            }
        }
    }
}
