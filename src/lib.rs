//! ldusolve: LDU-addressed sparse matrices and their solvers
//!
//! Matrices are stored face by face over an owner/neighbour addressing, the
//! layout of cell-centred finite-volume discretisations. On top of that the
//! crate provides preconditioned Krylov solvers (PCG, PBiCG, PBiCICG,
//! PBiCGStab), smoothers, and an agglomeration multigrid (GAMG) usable as a
//! solver or a preconditioner. Domain-decomposed runs couple the rank-local
//! matrices through processor and cyclic interfaces.
//!
//! Solvers are usually selected by name:
//!
//! ```ignore
//! use ldusolve::{SolverControls, solve};
//!
//! let controls = SolverControls::new("GAMG").with_tolerance(1e-8).with_rel_tol(0.01);
//! let perf = solve("p", &matrix, &mut p, &source, &controls)?;
//! println!("{perf}");
//! ```

pub mod parallel;

pub mod config;
pub mod context;
pub mod core;
pub mod error;
pub mod gamg;
pub mod interface;
pub mod matrix;
pub mod preconditioner;
pub mod smoother;
pub mod solver;
pub mod utils;

// Re-exports for convenience
pub use config::{GamgControls, PreconditionerControls, SolverControls};
pub use context::{SelectionTable, SelectionTables, solve};
pub use error::LduError;
pub use gamg::{GamgAgglomeration, GamgSolver};
pub use interface::{AgglomeratedInterface, CyclicInterface, InterfaceCoupling, LduInterface, ProcessorInterface};
pub use matrix::{LduAddressing, LduMatrix};
pub use parallel::{Comm, SerialComm};
pub use preconditioner::Preconditioner;
pub use smoother::{Smoother, SweepFlags};
pub use solver::LinearSolver;
pub use utils::{Convergence, SolveOutcome, SolverPerformance};
