//! Core field operations shared by solvers, smoothers and the GAMG cycle.

pub mod field;

pub use field::*;
