//! Formula error types

use sheetcalc_core::{CellAddress, ErrorCode};
use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors that can occur during formula evaluation
///
/// None of these reach the host: [`FormulaError::code`] maps each one to
/// the error value displayed in the cell.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    /// Malformed formula text (unbalanced parentheses, bad expression)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Function name not in the catalog
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// Arithmetic expression left with something other than numbers and operators
    #[error("Unknown name in expression: {0}")]
    UnknownName(String),

    /// Argument of the wrong type
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Wrong number of arguments
    #[error("Wrong number of arguments for {function}: expected {expected}, got {actual}")]
    ArgumentCount {
        function: String,
        expected: String,
        actual: usize,
    },

    /// Malformed or oversized range
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    /// Division by zero in an arithmetic expression
    #[error("Division by zero")]
    DivisionByZero,

    /// Mode accepted by the syntax but not implemented
    #[error("Unsupported mode: {0}")]
    UnsupportedMode(String),

    /// Any other evaluation failure
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// A cell was reached again while it was still being evaluated
    #[error("Circular reference detected involving cell {0}")]
    CircularReference(CellAddress),

    /// Evaluation nested deeper than the configured limit
    #[error("Recursion limit of {0} exceeded")]
    RecursionLimit(usize),
}

impl FormulaError {
    /// Error value shown in the cell for this failure
    pub fn code(&self) -> ErrorCode {
        match self {
            FormulaError::UnknownFunction(_) | FormulaError::UnknownName(_) => ErrorCode::Name,
            FormulaError::InvalidArgument(_) | FormulaError::UnsupportedMode(_) => ErrorCode::Value,
            FormulaError::DivisionByZero => ErrorCode::DivZero,
            FormulaError::CircularReference(_) => ErrorCode::Circular,
            FormulaError::Parse(_)
            | FormulaError::ArgumentCount { .. }
            | FormulaError::InvalidReference(_)
            | FormulaError::Evaluation(_)
            | FormulaError::RecursionLimit(_) => ErrorCode::Error,
        }
    }

    /// Fatal errors abort the whole evaluation chain instead of becoming
    /// the referencing cell's text value
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FormulaError::CircularReference(_) | FormulaError::RecursionLimit(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(FormulaError::UnknownFunction("FOO".into()).code(), ErrorCode::Name);
        assert_eq!(FormulaError::UnknownName("x".into()).code(), ErrorCode::Name);
        assert_eq!(FormulaError::InvalidArgument("x".into()).code(), ErrorCode::Value);
        assert_eq!(FormulaError::DivisionByZero.code(), ErrorCode::DivZero);
        assert_eq!(FormulaError::Parse("x".into()).code(), ErrorCode::Error);
        assert_eq!(FormulaError::RecursionLimit(8).code(), ErrorCode::Error);
        assert_eq!(
            FormulaError::CircularReference(CellAddress::new(0, 0)).code(),
            ErrorCode::Circular
        );
    }

    #[test]
    fn test_fatal() {
        assert!(FormulaError::CircularReference(CellAddress::new(0, 0)).is_fatal());
        assert!(FormulaError::RecursionLimit(4).is_fatal());
        assert!(!FormulaError::DivisionByZero.is_fatal());
        assert!(!FormulaError::UnknownFunction("X".into()).is_fatal());
    }

    #[test]
    fn test_circular_message_names_cell() {
        let err = FormulaError::CircularReference(CellAddress::new(1, 0));
        assert_eq!(
            err.to_string(),
            "Circular reference detected involving cell A2"
        );
    }
}
