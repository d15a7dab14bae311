//! Agglomeration multigrid: coarse-level hierarchy, Galerkin level matrices
//! and the V-cycle solver.

pub mod agglomeration;
mod interpolate;
mod pair;
pub mod solver;

pub use agglomeration::{FaceRestrict, GamgAgglomeration, GamgLevel};
pub use solver::GamgSolver;
