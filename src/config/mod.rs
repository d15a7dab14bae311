pub mod options;

pub use options::{GamgControls, PreconditionerControls, SolverControls};
