//! Run-time selection of solvers, preconditioners, smoothers and
//! agglomerators by type name.
//!
//! [`SelectionTables::standard`] registers every type shipped with the crate.
//! Additional types can be registered on the individual tables.
//!
//! ```ignore
//! let tables = SelectionTables::standard();
//! let controls = SolverControls::new("PCG").with_preconditioner("DIC");
//! let solver = tables.new_solver("p", &matrix, &controls)?;
//! let perf = solver.solve(&mut psi, &source, 0)?;
//! ```

use crate::config::{GamgControls, SolverControls};
use crate::context::selection_table::SelectionTable;
use crate::error::LduError;
use crate::gamg::{GamgAgglomeration, GamgSolver};
use crate::matrix::LduMatrix;
use crate::preconditioner::{
    DiagonalPreconditioner, DicPreconditioner, DiluPreconditioner, GamgPreconditioner, NoPreconditioner,
    Preconditioner,
};
use crate::smoother::incomplete::Factorisation;
use crate::smoother::{GaussSeidelSmoother, IncompleteGaussSeidelSmoother, IncompleteSmoother, Smoother, SweepFlags};
use crate::solver::{
    DiagonalSolver, LinearSolver, PbicgSolver, PbicgStabSolver, PbicicgSolver, PcgSolver, SmoothSolver,
};
use crate::utils::convergence::SolverPerformance;

pub type SolverFactory = for<'a> fn(
    &SelectionTables,
    &str,
    &'a LduMatrix,
    &SolverControls,
) -> Result<Box<dyn LinearSolver + 'a>, LduError>;

pub type PreconditionerFactory =
    for<'a> fn(&SelectionTables, &'a LduMatrix, &SolverControls) -> Result<Box<dyn Preconditioner + 'a>, LduError>;

pub type SmootherFactory = fn(&LduMatrix, &SolverControls) -> Result<Box<dyn Smoother>, LduError>;

pub type AgglomeratorFactory = fn(&LduMatrix, &GamgControls) -> Result<GamgAgglomeration, LduError>;

#[derive(Clone)]
pub struct SelectionTables {
    pub solvers: SelectionTable<SolverFactory>,
    pub preconditioners: SelectionTable<PreconditionerFactory>,
    pub smoothers: SelectionTable<SmootherFactory>,
    pub agglomerators: SelectionTable<AgglomeratorFactory>,
}

impl Default for SelectionTables {
    fn default() -> Self {
        Self::standard()
    }
}

impl SelectionTables {
    /// Empty tables.
    pub fn empty() -> Self {
        Self {
            solvers: SelectionTable::new("solver"),
            preconditioners: SelectionTable::new("preconditioner"),
            smoothers: SelectionTable::new("smoother"),
            agglomerators: SelectionTable::new("agglomerator"),
        }
    }

    pub fn standard() -> Self {
        let mut t = Self::empty();

        t.solvers
            .add_symmetric("PCG", pcg)
            .add_asymmetric("PBiCG", pbicg)
            .add_asymmetric("PBiCICG", pbicicg)
            .add("PBiCGStab", pbicgstab)
            .add("smoothSolver", smooth_solver)
            .add("GAMG", gamg_solver)
            .add("diagonal", diagonal_solver);

        t.preconditioners
            .add("none", no_preconditioner)
            .add("diagonal", diagonal_preconditioner)
            .add_symmetric("DIC", dic_preconditioner)
            .add_asymmetric("DILU", dilu_preconditioner)
            .add("GAMG", gamg_preconditioner);

        t.smoothers
            .add("GaussSeidel", gauss_seidel)
            .add("symGaussSeidel", sym_gauss_seidel)
            .add_symmetric("DIC", dic_smoother)
            .add_asymmetric("DILU", dilu_smoother)
            .add_symmetric("DICGaussSeidel", dic_gauss_seidel)
            .add_asymmetric("DILUGaussSeidel", dilu_gauss_seidel);

        t.agglomerators.add("algebraicPair", GamgAgglomeration::algebraic_pair);
        t
    }

    /// Solver named by `controls.solver` for `matrix`.
    pub fn new_solver<'a>(
        &self,
        field_name: &str,
        matrix: &'a LduMatrix,
        controls: &SolverControls,
    ) -> Result<Box<dyn LinearSolver + 'a>, LduError> {
        controls.validate()?;
        let factory = self.solvers.lookup(&controls.solver, matrix.symmetric_storage())?;
        log::debug!("selecting {} solver for {field_name}", controls.solver);
        factory(self, field_name, matrix, controls)
    }

    /// Preconditioner named by `controls.preconditioner`, built from its own
    /// nested controls when given as a dictionary.
    pub fn new_preconditioner<'a>(
        &self,
        matrix: &'a LduMatrix,
        controls: &SolverControls,
    ) -> Result<Box<dyn Preconditioner + 'a>, LduError> {
        let name = controls.preconditioner.name();
        let factory = self.preconditioners.lookup(name, matrix.symmetric_storage())?;
        factory(self, matrix, controls.preconditioner.controls(controls))
    }

    pub fn new_smoother(&self, matrix: &LduMatrix, controls: &SolverControls) -> Result<Box<dyn Smoother>, LduError> {
        let factory = self.smoothers.lookup(&controls.smoother, matrix.symmetric_storage())?;
        factory(matrix, controls)
    }

    pub fn new_agglomerator(&self, matrix: &LduMatrix, controls: &GamgControls) -> Result<GamgAgglomeration, LduError> {
        let factory = self.agglomerators.lookup(&controls.agglomerator, matrix.symmetric_storage())?;
        factory(matrix, controls)
    }

    /// Select a solver and solve component 0 of `A·psi = source`.
    pub fn solve(
        &self,
        field_name: &str,
        matrix: &LduMatrix,
        psi: &mut [f64],
        source: &[f64],
        controls: &SolverControls,
    ) -> Result<SolverPerformance, LduError> {
        self.new_solver(field_name, matrix, controls)?.solve(psi, source, 0)
    }
}

/// [`SelectionTables::solve`] with the standard tables.
pub fn solve(
    field_name: &str,
    matrix: &LduMatrix,
    psi: &mut [f64],
    source: &[f64],
    controls: &SolverControls,
) -> Result<SolverPerformance, LduError> {
    SelectionTables::standard().solve(field_name, matrix, psi, source, controls)
}

fn pcg<'a>(
    t: &SelectionTables,
    field: &str,
    m: &'a LduMatrix,
    c: &SolverControls,
) -> Result<Box<dyn LinearSolver + 'a>, LduError> {
    Ok(Box::new(PcgSolver::new(field, m, t.new_preconditioner(m, c)?, c)))
}

fn pbicg<'a>(
    t: &SelectionTables,
    field: &str,
    m: &'a LduMatrix,
    c: &SolverControls,
) -> Result<Box<dyn LinearSolver + 'a>, LduError> {
    Ok(Box::new(PbicgSolver::new(field, m, t.new_preconditioner(m, c)?, c)))
}

fn pbicicg<'a>(
    t: &SelectionTables,
    field: &str,
    m: &'a LduMatrix,
    c: &SolverControls,
) -> Result<Box<dyn LinearSolver + 'a>, LduError> {
    Ok(Box::new(PbicicgSolver::new(field, m, t.new_preconditioner(m, c)?, c)))
}

fn pbicgstab<'a>(
    t: &SelectionTables,
    field: &str,
    m: &'a LduMatrix,
    c: &SolverControls,
) -> Result<Box<dyn LinearSolver + 'a>, LduError> {
    Ok(Box::new(PbicgStabSolver::new(field, m, t.new_preconditioner(m, c)?, c)))
}

fn smooth_solver<'a>(
    t: &SelectionTables,
    field: &str,
    m: &'a LduMatrix,
    c: &SolverControls,
) -> Result<Box<dyn LinearSolver + 'a>, LduError> {
    Ok(Box::new(SmoothSolver::new(field, m, t.new_smoother(m, c)?, c)))
}

fn gamg_solver<'a>(
    t: &SelectionTables,
    field: &str,
    m: &'a LduMatrix,
    c: &SolverControls,
) -> Result<Box<dyn LinearSolver + 'a>, LduError> {
    Ok(Box::new(GamgSolver::new(t, field, m, c)?))
}

fn diagonal_solver<'a>(
    _t: &SelectionTables,
    field: &str,
    m: &'a LduMatrix,
    _c: &SolverControls,
) -> Result<Box<dyn LinearSolver + 'a>, LduError> {
    Ok(Box::new(DiagonalSolver::new(field, m)))
}

fn no_preconditioner<'a>(
    _t: &SelectionTables,
    _m: &'a LduMatrix,
    _c: &SolverControls,
) -> Result<Box<dyn Preconditioner + 'a>, LduError> {
    Ok(Box::new(NoPreconditioner))
}

fn diagonal_preconditioner<'a>(
    _t: &SelectionTables,
    m: &'a LduMatrix,
    _c: &SolverControls,
) -> Result<Box<dyn Preconditioner + 'a>, LduError> {
    Ok(Box::new(DiagonalPreconditioner::new(m)))
}

fn dic_preconditioner<'a>(
    _t: &SelectionTables,
    m: &'a LduMatrix,
    _c: &SolverControls,
) -> Result<Box<dyn Preconditioner + 'a>, LduError> {
    Ok(Box::new(DicPreconditioner::new(m)))
}

fn dilu_preconditioner<'a>(
    _t: &SelectionTables,
    m: &'a LduMatrix,
    _c: &SolverControls,
) -> Result<Box<dyn Preconditioner + 'a>, LduError> {
    Ok(Box::new(DiluPreconditioner::new(m)))
}

fn gamg_preconditioner<'a>(
    t: &SelectionTables,
    m: &'a LduMatrix,
    c: &SolverControls,
) -> Result<Box<dyn Preconditioner + 'a>, LduError> {
    Ok(Box::new(GamgPreconditioner::new(t, m, c)?))
}

fn gauss_seidel(m: &LduMatrix, _c: &SolverControls) -> Result<Box<dyn Smoother>, LduError> {
    Ok(Box::new(GaussSeidelSmoother::new(m, SweepFlags::FORWARD)))
}

fn sym_gauss_seidel(m: &LduMatrix, _c: &SolverControls) -> Result<Box<dyn Smoother>, LduError> {
    Ok(Box::new(GaussSeidelSmoother::new(m, SweepFlags::SYMMETRIC)))
}

fn dic_smoother(m: &LduMatrix, _c: &SolverControls) -> Result<Box<dyn Smoother>, LduError> {
    Ok(Box::new(IncompleteSmoother::new(m, Factorisation::Dic)))
}

fn dilu_smoother(m: &LduMatrix, _c: &SolverControls) -> Result<Box<dyn Smoother>, LduError> {
    Ok(Box::new(IncompleteSmoother::new(m, Factorisation::Dilu)))
}

fn dic_gauss_seidel(m: &LduMatrix, _c: &SolverControls) -> Result<Box<dyn Smoother>, LduError> {
    Ok(Box::new(IncompleteGaussSeidelSmoother::new(m, Factorisation::Dic)))
}

fn dilu_gauss_seidel(m: &LduMatrix, _c: &SolverControls) -> Result<Box<dyn Smoother>, LduError> {
    Ok(Box::new(IncompleteGaussSeidelSmoother::new(m, Factorisation::Dilu)))
}
