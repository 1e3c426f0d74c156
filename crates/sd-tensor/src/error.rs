use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TensorError {
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch { expected: Vec<usize>, got: Vec<usize> },
    #[error("data length {len} does not match shape {shape:?} (numel={numel})")]
    DataLength {
        len: usize,
        shape: Vec<usize>,
        numel: usize,
    },
    #[error("expected a 2D tensor, got {ndim} dimensions")]
    NotMatrix { ndim: usize },
    #[error("row {row} out of range for tensor with {rows} rows")]
    RowOutOfRange { row: usize, rows: usize },
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, TensorError>;
