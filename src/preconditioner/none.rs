use crate::error::LduError;
use crate::preconditioner::Preconditioner;

/// Identity: w = r.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPreconditioner;

impl Preconditioner for NoPreconditioner {
    fn type_name(&self) -> &'static str {
        "none"
    }

    fn precondition(&self, w: &mut [f64], r: &[f64], _cmpt: usize) -> Result<(), LduError> {
        LduError::check_len("preconditioner", r.len(), w.len())?;
        w.copy_from_slice(r);
        Ok(())
    }
}
