use std::rc::Rc;

use crate::config::SolverControls;
use crate::context::SelectionTables;
use crate::error::LduError;
use crate::gamg::{GamgAgglomeration, GamgSolver};
use crate::matrix::LduMatrix;
use crate::preconditioner::Preconditioner;

/// `nVcycles` V-cycles from a zero initial guess.
pub struct GamgPreconditioner<'a> {
    solver: GamgSolver<'a>,
    n_vcycles: usize,
}

impl<'a> GamgPreconditioner<'a> {
    pub fn new(tables: &SelectionTables, matrix: &'a LduMatrix, controls: &SolverControls) -> Result<Self, LduError> {
        Ok(Self {
            solver: GamgSolver::new(tables, "preconditioner", matrix, controls)?,
            n_vcycles: controls.gamg.n_vcycles,
        })
    }

    pub fn with_agglomeration(
        tables: &SelectionTables,
        matrix: &'a LduMatrix,
        controls: &SolverControls,
        agglomeration: Rc<GamgAgglomeration>,
    ) -> Result<Self, LduError> {
        Ok(Self {
            solver: GamgSolver::with_agglomeration(tables, "preconditioner", matrix, controls, agglomeration)?,
            n_vcycles: controls.gamg.n_vcycles,
        })
    }
}

impl Preconditioner for GamgPreconditioner<'_> {
    fn type_name(&self) -> &'static str {
        "GAMG"
    }

    fn precondition(&self, w: &mut [f64], r: &[f64], cmpt: usize) -> Result<(), LduError> {
        let matrix = self.solver.matrix();
        LduError::check_len("preconditioned field", matrix.n_cells(), w.len())?;
        LduError::check_len("preconditioner residual", matrix.n_cells(), r.len())?;

        w.fill(0.0);
        let mut ws = self.solver.workspace();
        let mut residual = r.to_vec();
        for cycle in 0..self.n_vcycles {
            self.solver.v_cycle(&mut ws, w, r, &residual, cmpt)?;
            if cycle + 1 < self.n_vcycles {
                matrix.residual(w, r, cmpt, &mut residual)?;
            }
        }
        Ok(())
    }
}
