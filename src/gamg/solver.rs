//! Geometric-agglomerated algebraic multigrid.
//!
//! One iteration is a V-cycle:
//!
//! 1. restrict the finest residual to the first coarse level;
//! 2. on the way down, optionally pre-smooth each level from a zero
//!    correction and restrict its residual to the next level;
//! 3. solve the coarsest level (direct LU or preconditioned Krylov);
//! 4. on the way up, prolong, optionally interpolate and scale the
//!    correction, add back the pre-smoothed part and post-smooth;
//! 5. add the finest correction to the solution and smooth the finest level.

use std::rc::Rc;

use crate::config::{GamgControls, SolverControls};
use crate::context::SelectionTables;
use crate::error::LduError;
use crate::gamg::agglomeration::GamgAgglomeration;
use crate::gamg::interpolate::{interpolate, scale};
use crate::matrix::LduMatrix;
use crate::preconditioner::{DicPreconditioner, DiluPreconditioner};
use crate::smoother::Smoother;
use crate::solver::direct_lu::LuSolver;
use crate::solver::pbicgstab::pbicgstab;
use crate::solver::pcg::pcg;
use crate::solver::{LinearSolver, begin_solve, performance_name};
use crate::utils::convergence::{Convergence, SolverPerformance, normalised_residual};

/// Iteration cap of the iterative coarsest-level solve.
const COARSEST_MAX_ITER: usize = 1000;

pub struct GamgSolver<'a> {
    field_name: String,
    matrix: &'a LduMatrix,
    agglomeration: Rc<GamgAgglomeration>,
    /// Galerkin matrices of coarse levels 0..L.
    coarse_matrices: Vec<LduMatrix>,
    /// Smoother of the finest level followed by every coarse level above the
    /// coarsest.
    smoothers: Vec<Box<dyn Smoother>>,
    coarsest_lu: Option<LuSolver>,
    controls: GamgControls,
    scale_correction: bool,
    convergence: Convergence,
}

/// Per-level work vectors of one V-cycle.
pub(crate) struct Workspace {
    corrections: Vec<Vec<f64>>,
    /// Restricted residual of the level above; the right-hand side of each
    /// coarse level.
    sources: Vec<Vec<f64>>,
    /// `sources − A·correction` after pre-smoothing.
    residuals: Vec<Vec<f64>>,
    pre_smoothed: Vec<Vec<f64>>,
    scratch: Vec<Vec<f64>>,
    finest_correction: Vec<f64>,
    finest_scratch: Vec<f64>,
}

impl<'a> GamgSolver<'a> {
    /// Agglomerate `matrix` with the configured agglomerator and build the
    /// level matrices and smoothers.
    pub fn new(
        tables: &SelectionTables,
        field_name: &str,
        matrix: &'a LduMatrix,
        controls: &SolverControls,
    ) -> Result<Self, LduError> {
        let agglomeration = Rc::new(tables.new_agglomerator(matrix, &controls.gamg)?);
        Self::with_agglomeration(tables, field_name, matrix, controls, agglomeration)
    }

    /// Reuse an existing agglomeration, which must have been built for the
    /// addressing of `matrix`.
    pub fn with_agglomeration(
        tables: &SelectionTables,
        field_name: &str,
        matrix: &'a LduMatrix,
        controls: &SolverControls,
        agglomeration: Rc<GamgAgglomeration>,
    ) -> Result<Self, LduError> {
        controls.gamg.validate()?;
        agglomeration.check_addressing(matrix.addressing())?;

        let n_levels = agglomeration.n_coarse_levels();
        let mut coarse_matrices: Vec<LduMatrix> = Vec::with_capacity(n_levels);
        for level in 0..n_levels {
            let fine = coarse_matrices.last().unwrap_or(matrix);
            let coarse = agglomeration.coarse_matrix(level, fine)?;
            coarse_matrices.push(coarse);
        }

        let mut smoothers = vec![tables.new_smoother(matrix, controls)?];
        for level_matrix in coarse_matrices.iter().take(n_levels.saturating_sub(1)) {
            smoothers.push(tables.new_smoother(level_matrix, controls)?);
        }

        let coarsest = coarse_matrices.last().unwrap_or(matrix);
        let coarsest_lu = if controls.gamg.direct_solve_coarsest {
            if coarsest.interfaces().is_empty() {
                let lu = LuSolver::new(coarsest)?;
                if lu.is_singular() {
                    log::warn!(
                        "GAMG: coarsest level of {field_name} is singular; \
                         solving it iteratively instead of directly"
                    );
                    None
                } else {
                    Some(lu)
                }
            } else {
                log::warn!(
                    "GAMG: coarsest level of {field_name} is coupled through {} interfaces; \
                     solving it iteratively instead of directly",
                    coarsest.interfaces().len()
                );
                None
            }
        } else {
            None
        };

        Ok(Self {
            field_name: field_name.into(),
            matrix,
            agglomeration,
            coarse_matrices,
            smoothers,
            coarsest_lu,
            scale_correction: controls.gamg.scale_correction_for(matrix.symmetric_storage()),
            controls: controls.gamg.clone(),
            convergence: Convergence::from_controls(controls),
        })
    }

    pub fn matrix(&self) -> &'a LduMatrix {
        self.matrix
    }

    pub fn agglomeration(&self) -> &Rc<GamgAgglomeration> {
        &self.agglomeration
    }

    pub fn n_coarse_levels(&self) -> usize {
        self.coarse_matrices.len()
    }

    /// Galerkin matrix of coarse level `level`.
    pub fn coarse_matrix(&self, level: usize) -> Option<&LduMatrix> {
        self.coarse_matrices.get(level)
    }

    fn coarsest_matrix(&self) -> &LduMatrix {
        self.coarse_matrices.last().unwrap_or(self.matrix)
    }

    pub(crate) fn workspace(&self) -> Workspace {
        let sizes: Vec<usize> = self.coarse_matrices.iter().map(LduMatrix::n_cells).collect();
        let level_vectors = || sizes.iter().map(|&n| vec![0.0; n]).collect::<Vec<_>>();
        let n = self.matrix.n_cells();
        Workspace {
            corrections: level_vectors(),
            sources: level_vectors(),
            residuals: level_vectors(),
            pre_smoothed: level_vectors(),
            scratch: level_vectors(),
            finest_correction: vec![0.0; n],
            finest_scratch: vec![0.0; n],
        }
    }

    /// One V-cycle updating `psi`, given `finest_residual = source − A·psi`.
    pub(crate) fn v_cycle(
        &self,
        ws: &mut Workspace,
        psi: &mut [f64],
        source: &[f64],
        finest_residual: &[f64],
        cmpt: usize,
    ) -> Result<(), LduError> {
        let n_levels = self.coarse_matrices.len();
        let agg = self.agglomeration.as_ref();

        if n_levels == 0 {
            self.solve_coarsest(&mut ws.finest_correction, finest_residual, cmpt)?;
        } else {
            let coarsest = n_levels - 1;
            agg.restrict_field(&mut ws.sources[0], finest_residual, 0)?;

            for l in 0..coarsest {
                let m = &self.coarse_matrices[l];
                let n_pre = self.controls.pre_sweeps(l);
                if n_pre > 0 {
                    ws.corrections[l].fill(0.0);
                    self.smoothers[l + 1].smooth(m, &mut ws.corrections[l], &ws.sources[l], cmpt, n_pre)?;
                    if self.scale_correction && l + 2 < n_levels {
                        scale(m, &mut ws.corrections[l], &mut ws.scratch[l], &ws.sources[l], cmpt)?;
                    }
                    m.residual(&ws.corrections[l], &ws.sources[l], cmpt, &mut ws.residuals[l])?;
                } else {
                    ws.residuals[l].copy_from_slice(&ws.sources[l]);
                }
                agg.restrict_field(&mut ws.sources[l + 1], &ws.residuals[l], l + 1)?;
            }

            self.solve_coarsest(&mut ws.corrections[coarsest], &ws.sources[coarsest], cmpt)?;

            for l in (0..coarsest).rev() {
                let m = &self.coarse_matrices[l];
                let n_pre = self.controls.pre_sweeps(l);
                if n_pre > 0 {
                    ws.pre_smoothed[l].copy_from_slice(&ws.corrections[l]);
                }

                let (finer, coarser) = ws.corrections.split_at_mut(l + 1);
                let correction = &mut finer[l];
                agg.prolong_field(correction, &coarser[0], l + 1)?;
                if self.controls.interpolate_correction {
                    let restrict = agg.level(l + 1).restrict_addressing();
                    interpolate(m, correction, &mut ws.scratch[l], restrict, &coarser[0], cmpt)?;
                }
                if self.scale_correction && (self.controls.interpolate_correction || l + 2 < n_levels) {
                    scale(m, correction, &mut ws.scratch[l], &ws.residuals[l], cmpt)?;
                }
                if n_pre > 0 {
                    for (c, &p) in correction.iter_mut().zip(&ws.pre_smoothed[l]) {
                        *c += p;
                    }
                }
                self.smoothers[l + 1].smooth(m, correction, &ws.sources[l], cmpt, self.controls.post_sweeps(l))?;
            }

            agg.prolong_field(&mut ws.finest_correction, &ws.corrections[0], 0)?;
            if self.controls.interpolate_correction {
                let restrict = agg.level(0).restrict_addressing();
                interpolate(
                    self.matrix,
                    &mut ws.finest_correction,
                    &mut ws.finest_scratch,
                    restrict,
                    &ws.corrections[0],
                    cmpt,
                )?;
            }
            if self.scale_correction {
                scale(self.matrix, &mut ws.finest_correction, &mut ws.finest_scratch, finest_residual, cmpt)?;
            }
        }

        for (p, &c) in psi.iter_mut().zip(&ws.finest_correction) {
            *p += c;
        }
        self.smoothers[0].smooth(self.matrix, psi, source, cmpt, self.controls.n_finest_sweeps)
    }

    fn solve_coarsest(&self, correction: &mut [f64], source: &[f64], cmpt: usize) -> Result<(), LduError> {
        if let Some(lu) = &self.coarsest_lu {
            correction.copy_from_slice(source);
            match lu.solve_in_place(correction) {
                Err(LduError::FactorError(msg)) => {
                    log::warn!("GAMG: direct coarsest solve for {} failed ({msg}); solving iteratively", self.field_name);
                }
                other => return other,
            }
        }

        let matrix = self.coarsest_matrix();
        let convergence = Convergence { max_iter: COARSEST_MAX_ITER, min_iter: 0, ..self.convergence };
        correction.fill(0.0);
        let mut perf = if matrix.symmetric_storage() {
            let mut perf = SolverPerformance::new(performance_name("DIC", "PCG"), "coarsestLevelCorr");
            pcg(matrix, &DicPreconditioner::new(matrix), &convergence, &mut perf, correction, source, cmpt)?;
            perf
        } else {
            let mut perf = SolverPerformance::new(performance_name("DILU", "PBiCGStab"), "coarsestLevelCorr");
            pbicgstab(matrix, &DiluPreconditioner::new(matrix), &convergence, &mut perf, correction, source, cmpt)?;
            perf
        };
        if perf.singular {
            log::debug!("GAMG: singular coarsest level for {}", self.field_name);
        }
        perf.field_name = format!("{}:coarsestLevelCorr", self.field_name);
        log::trace!("{perf}");
        Ok(())
    }
}

impl LinearSolver for GamgSolver<'_> {
    fn type_name(&self) -> &'static str {
        "GAMG"
    }

    fn solve(&self, psi: &mut [f64], source: &[f64], cmpt: usize) -> Result<SolverPerformance, LduError> {
        let mut perf = SolverPerformance::new("GAMG", self.field_name.as_str());
        let n = self.matrix.n_cells();
        let mut a_psi = vec![0.0; n];
        let mut finest_residual = vec![0.0; n];
        if let Some(norm_factor) = begin_solve(self.matrix, psi, source, cmpt, &mut perf, &mut a_psi, &mut finest_residual)? {
            if self.convergence.should_iterate(&mut perf) {
                let mut ws = self.workspace();
                loop {
                    self.v_cycle(&mut ws, psi, source, &finest_residual, cmpt)?;
                    self.matrix.residual(psi, source, cmpt, &mut finest_residual)?;
                    perf.record(normalised_residual(self.matrix, &finest_residual, norm_factor)?);
                    perf.n_iterations += 1;
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
