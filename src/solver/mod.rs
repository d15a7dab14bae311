//! Krylov & direct solver interfaces.
//!
//! Every iterative solver follows the same life cycle:
//!
//! 1. compute `r = b − A·psi`, the normalisation factor and the initial
//!    residual;
//! 2. stop early on a zero diagonal (singular, `psi` untouched) or on a
//!    negligible normalisation factor (trivially converged);
//! 3. iterate until the [`Convergence`] criteria are met, `maxIter` is hit, a
//!    breakdown is detected (singular) or the residual stops being finite.
//!
//! The Krylov recurrences live in crate-visible kernel functions so the GAMG
//! coarsest-level solve can run them on a level matrix it owns.

use crate::error::LduError;
use crate::matrix::LduMatrix;
use crate::utils::convergence::{SolverPerformance, negligible, norm_factor, normalised_residual};

pub mod diagonal;
pub mod direct_lu;
pub mod pbicg;
pub mod pbicgstab;
pub mod pbicicg;
pub mod pcg;
pub mod smooth;

pub use diagonal::DiagonalSolver;
pub use direct_lu::LuSolver;
pub use pbicg::PbicgSolver;
pub use pbicgstab::PbicgStabSolver;
pub use pbicicg::PbicicgSolver;
pub use pcg::PcgSolver;
pub use smooth::SmoothSolver;

/// Common interface for every solver of an LDU system.
pub trait LinearSolver {
    /// Registry name of the solver.
    fn type_name(&self) -> &'static str;

    /// Solve `A·psi = source` for component `cmpt`, updating `psi` in place.
    fn solve(&self, psi: &mut [f64], source: &[f64], cmpt: usize) -> Result<SolverPerformance, LduError>;
}

/// Name used in performance records: the preconditioner type prefixed to the
/// solver type, as in `DICPCG`.
pub(crate) fn performance_name(preconditioner: &str, solver: &str) -> String {
    if preconditioner == "none" {
        solver.to_string()
    } else {
        format!("{preconditioner}{solver}")
    }
}

/// Initial residual and normalisation.
///
/// On return `a_psi` holds `A·psi` and `r` holds `source − A·psi`. Returns the
/// normalisation factor, or `None` when the solve is already over (singular
/// or trivially converged).
pub(crate) fn begin_solve(
    matrix: &LduMatrix,
    psi: &[f64],
    source: &[f64],
    cmpt: usize,
    perf: &mut SolverPerformance,
    a_psi: &mut [f64],
    r: &mut [f64],
) -> Result<Option<f64>, LduError> {
    let n = matrix.n_cells();
    LduError::check_len("solution", n, psi.len())?;
    LduError::check_len("source", n, source.len())?;

    matrix.amul(psi, cmpt, a_psi)?;
    for ((ri, &b), &ax) in r.iter_mut().zip(source).zip(a_psi.iter()) {
        *ri = b - ax;
    }
    let mut tmp = vec![0.0; n];
    let nf = norm_factor(matrix, psi, source, a_psi, &mut tmp)?;
    perf.set_initial(normalised_residual(matrix, r, nf)?);

    let (zero_at, any_zero) = matrix.has_zero_diagonal()?;
    if any_zero {
        if let Some(cell) = zero_at {
            log::warn!("{}: zero diagonal coefficient in cell {cell} for {}", perf.solver_name, perf.field_name);
        }
        perf.singular = true;
        return Ok(None);
    }
    if negligible(nf) {
        perf.converged = true;
        return Ok(None);
    }
    Ok(Some(nf))
}
