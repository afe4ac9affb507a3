use thiserror::Error;

/// Failures reported by the correlation and ranking routines.
///
/// Every variant is raised by a check on the inputs; numeric work never
/// starts on data that fails one of them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CorrError {
    #[error("shape mismatch: left input has {left} samples, right input has {right}")]
    ShapeMismatch { left: usize, right: usize },

    #[error("invalid shape {rows}x{cols}: at least 2 rows and 2 columns are required")]
    InvalidShape { rows: usize, cols: usize },

    #[error("column {column} has zero variance")]
    DegenerateColumn { column: usize },

    #[error("missing value at row {row}, column {column}")]
    MissingValue { row: usize, column: usize },
}

pub type Result<T> = std::result::Result<T, CorrError>;
