pub mod bigram;
pub mod decoder;
pub mod error;
pub mod fn_decoder;

pub use bigram::BigramDecoder;
pub use decoder::{checked_step, prime, StepDecoder, StepOutput};
pub use error::{DecoderError, Result};
pub use fn_decoder::FnDecoder;
