use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("hypothesis in slot {0} has no decoder state")]
    MissingState(usize),
    #[error("prompt must contain at least one token")]
    EmptyPrompt,
    #[error("decoder error: {0}")]
    Decoder(#[from] sd_decoder::DecoderError),
    #[error("tensor error: {0}")]
    Tensor(#[from] sd_tensor::TensorError),
}

pub type Result<T> = std::result::Result<T, SearchError>;
