use sd_tensor::{Shape, Tensor};

use crate::decoder::{StepDecoder, StepOutput};
use crate::error::{DecoderError, Result};

/// Reference decoder backed by a `[V, V]` transition table.
///
/// Row `t` of the table holds the logits of the token following `t`. The
/// state is the number of tokens the sequence has consumed so far, which is
/// enough to observe that states are threaded through every call.
#[derive(Debug, Clone)]
pub struct BigramDecoder {
    table: Tensor,
    vocab_size: usize,
}

impl BigramDecoder {
    /// Create a decoder from a square logits table.
    pub fn new(table: Tensor) -> Result<Self> {
        let (rows, cols) = table.shape().as_matrix()?;
        if rows != cols || rows == 0 {
            return Err(DecoderError::Other(format!(
                "bigram table must be square and non-empty, got {}",
                table.shape()
            )));
        }
        Ok(Self {
            table,
            vocab_size: rows,
        })
    }

    /// Build the table from a function of `(previous, next)` token ids.
    pub fn from_fn<F>(vocab_size: usize, f: F) -> Result<Self>
    where
        F: Fn(u32, u32) -> f32,
    {
        let mut data = Vec::with_capacity(vocab_size * vocab_size);
        for prev in 0..vocab_size as u32 {
            for next in 0..vocab_size as u32 {
                data.push(f(prev, next));
            }
        }
        Self::new(Tensor::new(data, Shape::matrix(vocab_size, vocab_size))?)
    }
}

impl StepDecoder for BigramDecoder {
    type State = usize;

    fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    fn step(&self, token_ids: &[u32], states: &[usize]) -> Result<StepOutput<usize>> {
        if token_ids.len() != states.len() {
            return Err(DecoderError::InputMismatch {
                tokens: token_ids.len(),
                states: states.len(),
            });
        }

        let mut data = Vec::with_capacity(token_ids.len() * self.vocab_size);
        for &token in token_ids {
            if token as usize >= self.vocab_size {
                return Err(DecoderError::TokenOutOfRange {
                    token,
                    vocab: self.vocab_size,
                });
            }
            data.extend_from_slice(self.table.row(token as usize)?);
        }

        Ok(StepOutput {
            logits: Tensor::new(data, Shape::matrix(token_ids.len(), self.vocab_size))?,
            states: states.iter().map(|pos| pos + 1).collect(),
        })
    }
}
