use thiserror::Error;

use super::GridShape;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FieldError {
    #[error("grid mismatch between '{left}' {left_shape} and '{right}' {right_shape}: {reason}")]
    GridMismatch {
        left: String,
        left_shape: GridShape,
        right: String,
        right_shape: GridShape,
        reason: String,
    },

    #[error("no bias correction rule defined for variable '{0}'")]
    UnsupportedVariable(String),

    #[error("time series '{variable}' has {steps} steps, which is not a whole number of years")]
    IncompleteYear { variable: String, steps: usize },

    #[error("'{variable}' has {steps} steps, but a monthly climatology needs exactly 12")]
    NotAClimatology { variable: String, steps: usize },

    #[error("expected observed variable '{expected}', found '{found}'")]
    VariableMismatch { expected: String, found: String },

    #[error("units '{units}' of '{variable}' cannot be used as {expected}")]
    UnsupportedUnits {
        variable: String,
        units: String,
        expected: &'static str,
    },

    #[error("invalid shape: {0}")]
    InvalidShape(String),
}
