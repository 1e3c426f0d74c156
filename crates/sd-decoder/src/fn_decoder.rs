use std::fmt;
use std::marker::PhantomData;

use sd_tensor::{Shape, Tensor};

use crate::decoder::{StepDecoder, StepOutput};
use crate::error::{DecoderError, Result};

/// Adapts a per-hypothesis closure into a batched [`StepDecoder`].
///
/// The closure maps `(token, &state)` to `(logits, new_state)` for a single
/// hypothesis; `FnDecoder` runs it once per row and stacks the results.
pub struct FnDecoder<S, F> {
    vocab_size: usize,
    f: F,
    _state: PhantomData<fn(&S) -> S>,
}

impl<S, F> FnDecoder<S, F>
where
    F: Fn(u32, &S) -> (Vec<f32>, S),
{
    pub fn new(vocab_size: usize, f: F) -> Self {
        Self {
            vocab_size,
            f,
            _state: PhantomData,
        }
    }
}

impl<S, F> fmt::Debug for FnDecoder<S, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnDecoder")
            .field("vocab_size", &self.vocab_size)
            .finish_non_exhaustive()
    }
}

impl<S, F> StepDecoder for FnDecoder<S, F>
where
    S: Clone,
    F: Fn(u32, &S) -> (Vec<f32>, S),
{
    type State = S;

    fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    fn step(&self, token_ids: &[u32], states: &[S]) -> Result<StepOutput<S>> {
        if token_ids.len() != states.len() {
            return Err(DecoderError::InputMismatch {
                tokens: token_ids.len(),
                states: states.len(),
            });
        }

        let mut data = Vec::with_capacity(token_ids.len() * self.vocab_size);
        let mut new_states = Vec::with_capacity(states.len());
        let mut width = None;
        for (&token, state) in token_ids.iter().zip(states) {
            let (row, next) = (self.f)(token, state);
            match width {
                None => width = Some(row.len()),
                Some(w) if w != row.len() => {
                    return Err(DecoderError::ShapeMismatch {
                        rows: token_ids.len(),
                        vocab: self.vocab_size,
                        got: vec![new_states.len() + 1, row.len()],
                    });
                }
                Some(_) => {}
            }
            data.extend(row);
            new_states.push(next);
        }

        let cols = width.unwrap_or(self.vocab_size);
        let logits = Tensor::new(data, Shape::matrix(token_ids.len(), cols))?;
        Ok(StepOutput {
            logits,
            states: new_states,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_follow_input_order() {
        let dec = FnDecoder::new(3, |tok, s: &i32| (vec![tok as f32, 0.0, 0.0], s - 1));
        let out = dec.step(&[7, 9], &[0, 5]).unwrap();
        assert_eq!(out.logits.row(0).unwrap(), &[7.0, 0.0, 0.0]);
        assert_eq!(out.logits.row(1).unwrap(), &[9.0, 0.0, 0.0]);
        assert_eq!(out.states, vec![-1, 4]);
    }

    #[test]
    fn test_empty_batch() {
        let dec = FnDecoder::new(3, |_tok, s: &()| (vec![0.0; 3], *s));
        let out = dec.step(&[], &[]).unwrap();
        assert_eq!(out.logits.shape().dims(), &[0, 3]);
        assert!(out.states.is_empty());
    }

    #[test]
    fn test_ragged_closure_output() {
        let dec = FnDecoder::new(2, |tok, s: &()| (vec![0.0; tok as usize], *s));
        assert!(matches!(
            dec.step(&[2, 3], &[(), ()]),
            Err(DecoderError::ShapeMismatch { .. })
        ));
    }
}
