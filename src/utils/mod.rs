pub mod convergence;

pub use convergence::{Convergence, SolveOutcome, SolverPerformance};
