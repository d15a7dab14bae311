use thiserror::Error;

// Unified error type for ldusolve

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LduError {
    #[error("dimension mismatch in {context}: expected {expected}, found {found}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("invalid topology: {0}")]
    InvalidTopology(String),
    #[error("unknown {kind} type '{name}', valid {kind} types are: {}", .valid.join(", "))]
    UnknownType {
        kind: &'static str,
        name: String,
        valid: Vec<String>,
    },
    #[error("communication error: {0}")]
    CommunicationError(String),
    #[error("invalid solver controls: {0}")]
    InvalidConfig(String),
    #[error("factorization error: {0}")]
    FactorError(String),
}

impl LduError {
    /// Shorthand for the size checks performed at every public entry point.
    pub fn check_len(context: &'static str, expected: usize, found: usize) -> Result<(), LduError> {
        if expected == found {
            Ok(())
        } else {
            Err(LduError::DimensionMismatch { context, expected, found })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_type_lists_valid_names() {
        let e = LduError::UnknownType {
            kind: "preconditioner",
            name: "ILU7".into(),
            valid: vec!["DIC".into(), "diagonal".into()],
        };
        let msg = e.to_string();
        assert!(msg.contains("ILU7"));
        assert!(msg.contains("DIC, diagonal"));
    }

    #[test]
    fn check_len_reports_context() {
        assert!(LduError::check_len("amul", 3, 3).is_ok());
        let err = LduError::check_len("amul", 3, 4).unwrap_err();
        assert_eq!(
            err,
            LduError::DimensionMismatch { context: "amul", expected: 3, found: 4 }
        );
    }
}
