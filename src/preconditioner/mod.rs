//! Preconditioners for the Krylov solvers.
//!
//! A preconditioner approximately solves `M·w = r` with `M ≈ A`. Construction
//! goes through [`crate::context::SelectionTables`], which checks the requested
//! name against the variants valid for the matrix symmetry.

use crate::error::LduError;

pub mod diagonal;
pub mod dic;
pub mod dilu;
pub mod gamg;
pub mod none;

pub use diagonal::DiagonalPreconditioner;
pub use dic::DicPreconditioner;
pub use dilu::DiluPreconditioner;
pub use gamg::GamgPreconditioner;
pub use none::NoPreconditioner;

pub trait Preconditioner {
    /// Registry name, also used as the solver-name prefix in performance records.
    fn type_name(&self) -> &'static str;

    /// w = M⁻¹·r
    fn precondition(&self, w: &mut [f64], r: &[f64], cmpt: usize) -> Result<(), LduError>;

    /// w = M⁻ᵀ·r
    fn precondition_t(&self, w: &mut [f64], r: &[f64], cmpt: usize) -> Result<(), LduError> {
        self.precondition(w, r, cmpt)
    }
}
