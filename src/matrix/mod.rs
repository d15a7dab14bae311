//! Matrix module: LDU addressing, the LDU matrix and its dense view.

pub mod addressing;
pub mod dense;
pub mod ldu;

pub use addressing::LduAddressing;
pub use ldu::LduMatrix;
