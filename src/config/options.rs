//! Solver controls.
//!
//! `SolverControls` mirrors the keyword dictionary of a solver entry. It can be
//! deserialised with serde (camelCase keys, every key optional) or built with
//! the `with_*` methods:
//!
//! ```ignore
//! let controls = SolverControls::new("PCG")
//!     .with_preconditioner("DIC")
//!     .with_tolerance(1e-8)
//!     .with_rel_tol(0.01);
//! ```
//!
//! The preconditioner is either a bare type name or a nested dictionary whose
//! `preconditioner` key names the type; the nested form carries its own
//! controls (for example the GAMG settings of a GAMG preconditioner).

use serde::{Deserialize, Serialize};

use crate::error::LduError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SolverControls {
    /// Solver type name (PCG, PBiCG, GAMG, ...)
    pub solver: String,
    pub preconditioner: PreconditionerControls,
    /// Smoother type name for GAMG and smoothSolver.
    pub smoother: String,
    /// Absolute tolerance on the normalised residual.
    pub tolerance: f64,
    /// Relative tolerance; zero disables the relative test.
    pub rel_tol: f64,
    pub max_iter: usize,
    pub min_iter: usize,
    /// Smoother sweeps per smoothSolver iteration.
    pub n_sweeps: usize,
    #[serde(flatten)]
    pub gamg: GamgControls,
}

impl Default for SolverControls {
    fn default() -> Self {
        Self {
            solver: "PCG".into(),
            preconditioner: PreconditionerControls::default(),
            smoother: "GaussSeidel".into(),
            tolerance: 1e-6,
            rel_tol: 0.0,
            max_iter: 1000,
            min_iter: 0,
            n_sweeps: 1,
            gamg: GamgControls::default(),
        }
    }
}

/// Settings of the agglomeration and V-cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GamgControls {
    pub agglomerator: String,
    pub n_cells_in_coarsest_level: usize,
    /// Pairwise passes composed into one coarse level.
    pub merge_levels: usize,
    /// Maximum number of levels including the finest.
    pub max_levels: usize,
    /// Fine/coarse size ratio below which agglomeration is considered stalled.
    pub min_coarsening_ratio: f64,
    pub n_pre_sweeps: usize,
    pub pre_sweeps_level_multiplier: usize,
    pub max_pre_sweeps: usize,
    pub n_post_sweeps: usize,
    pub post_sweeps_level_multiplier: usize,
    pub max_post_sweeps: usize,
    pub n_finest_sweeps: usize,
    pub interpolate_correction: bool,
    /// Defaults to on for symmetric matrices and off otherwise.
    pub scale_correction: Option<bool>,
    pub direct_solve_coarsest: bool,
    /// V-cycles per application when GAMG is a preconditioner.
    pub n_vcycles: usize,
}

impl Default for GamgControls {
    fn default() -> Self {
        Self {
            agglomerator: "algebraicPair".into(),
            n_cells_in_coarsest_level: 10,
            merge_levels: 1,
            max_levels: 50,
            min_coarsening_ratio: 1.1,
            n_pre_sweeps: 0,
            pre_sweeps_level_multiplier: 1,
            max_pre_sweeps: 4,
            n_post_sweeps: 2,
            post_sweeps_level_multiplier: 1,
            max_post_sweeps: 4,
            n_finest_sweeps: 2,
            interpolate_correction: false,
            scale_correction: None,
            direct_solve_coarsest: false,
            n_vcycles: 2,
        }
    }
}

impl GamgControls {
    pub fn scale_correction_for(&self, symmetric: bool) -> bool {
        self.scale_correction.unwrap_or(symmetric)
    }

    /// Pre-smoothing sweeps on coarse level `level` (0 = first coarse level).
    /// Pre-smoothing is off on every level when `nPreSweeps` is zero.
    pub fn pre_sweeps(&self, level: usize) -> usize {
        if self.n_pre_sweeps == 0 {
            return 0;
        }
        (self.n_pre_sweeps + self.pre_sweeps_level_multiplier * level).min(self.max_pre_sweeps)
    }

    pub fn post_sweeps(&self, level: usize) -> usize {
        (self.n_post_sweeps + self.post_sweeps_level_multiplier * level).min(self.max_post_sweeps)
    }

    pub fn validate(&self) -> Result<(), LduError> {
        if self.n_cells_in_coarsest_level == 0 {
            return Err(LduError::InvalidConfig("nCellsInCoarsestLevel must be positive".into()));
        }
        if self.merge_levels == 0 {
            return Err(LduError::InvalidConfig("mergeLevels must be at least 1".into()));
        }
        if !(self.min_coarsening_ratio >= 1.0) {
            return Err(LduError::InvalidConfig(format!(
                "minCoarseningRatio must be at least 1, got {}",
                self.min_coarsening_ratio
            )));
        }
        if self.n_vcycles == 0 {
            return Err(LduError::InvalidConfig("nVcycles must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PreconditionerControls {
    Name(String),
    Dict(Box<SolverControls>),
}

impl Default for PreconditionerControls {
    fn default() -> Self {
        PreconditionerControls::Name("none".into())
    }
}

impl PreconditionerControls {
    /// Preconditioner type name.
    pub fn name(&self) -> &str {
        match self {
            PreconditionerControls::Name(name) => name,
            PreconditionerControls::Dict(dict) => dict.preconditioner.name(),
        }
    }

    /// Controls the preconditioner is built with: its own dictionary, or the
    /// enclosing solver's controls for the bare-name form.
    pub fn controls<'a>(&'a self, outer: &'a SolverControls) -> &'a SolverControls {
        match self {
            PreconditionerControls::Name(_) => outer,
            PreconditionerControls::Dict(dict) => dict,
        }
    }
}

impl SolverControls {
    pub fn new(solver: &str) -> Self {
        Self { solver: solver.into(), ..Default::default() }
    }

    pub fn with_preconditioner(mut self, name: &str) -> Self {
        self.preconditioner = PreconditionerControls::Name(name.into());
        self
    }

    pub fn with_preconditioner_controls(mut self, controls: SolverControls) -> Self {
        self.preconditioner = PreconditionerControls::Dict(Box::new(controls));
        self
    }

    pub fn with_smoother(mut self, name: &str) -> Self {
        self.smoother = name.into();
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_rel_tol(mut self, rel_tol: f64) -> Self {
        self.rel_tol = rel_tol;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_min_iter(mut self, min_iter: usize) -> Self {
        self.min_iter = min_iter;
        self
    }

    pub fn with_n_sweeps(mut self, n_sweeps: usize) -> Self {
        self.n_sweeps = n_sweeps;
        self
    }

    pub fn with_gamg(mut self, gamg: GamgControls) -> Self {
        self.gamg = gamg;
        self
    }

    /// Check value ranges, including those of a nested preconditioner dictionary.
    pub fn validate(&self) -> Result<(), LduError> {
        if !(self.tolerance >= 0.0) {
            return Err(LduError::InvalidConfig(format!("tolerance must be >= 0, got {}", self.tolerance)));
        }
        if !(self.rel_tol >= 0.0) {
            return Err(LduError::InvalidConfig(format!("relTol must be >= 0, got {}", self.rel_tol)));
        }
        if self.max_iter == 0 {
            return Err(LduError::InvalidConfig("maxIter must be positive".into()));
        }
        if self.n_sweeps == 0 {
            return Err(LduError::InvalidConfig("nSweeps must be positive".into()));
        }
        self.gamg.validate()?;
        if let PreconditionerControls::Dict(dict) = &self.preconditioner {
            dict.validate()?;
        }
        Ok(())
    }
}
