use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecoderError {
    #[error("decoder returned logits of shape {got:?}, expected [{rows}, {vocab}]")]
    ShapeMismatch {
        rows: usize,
        vocab: usize,
        got: Vec<usize>,
    },
    #[error("decoder received {tokens} tokens but {states} states")]
    InputMismatch { tokens: usize, states: usize },
    #[error("decoder returned {got} states for {expected} hypotheses")]
    StateCountMismatch { expected: usize, got: usize },
    #[error("token id {token} exceeds vocab size {vocab}")]
    TokenOutOfRange { token: u32, vocab: usize },
    #[error("tensor error: {0}")]
    TensorError(#[from] sd_tensor::TensorError),
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, DecoderError>;
