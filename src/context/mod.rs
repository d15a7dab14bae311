//! Construction of solvers and preconditioners from their type names.
//!
//! - [`selection_table`]: the generic name → constructor table.
//! - [`tables`]: the tables for every kind and the standard registrations.

pub mod selection_table;
pub mod tables;

pub use selection_table::SelectionTable;
pub use tables::{
    AgglomeratorFactory, PreconditionerFactory, SelectionTables, SmootherFactory, SolverFactory, solve,
};
