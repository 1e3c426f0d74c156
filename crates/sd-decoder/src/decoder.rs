use sd_tensor::Tensor;
use tracing::trace;

use crate::error::{DecoderError, Result};

/// Result of one decoder call: an `[N, V]` matrix of unnormalized
/// log-probabilities and `N` successor states, index-aligned with the input.
#[derive(Debug, Clone)]
pub struct StepOutput<S> {
    pub logits: Tensor,
    pub states: Vec<S>,
}

/// A one-step autoregressive decoder.
///
/// Maps a batch of current tokens plus their opaque states to next-token
/// logits and new states. The decoder itself holds no per-sequence state:
/// everything a sequence needs to continue lives in `State`, which callers
/// thread through every call and must pass back exactly as returned.
pub trait StepDecoder {
    /// Opaque per-hypothesis state (hidden vectors, cache handles, ...).
    type State: Clone;

    /// Returns the vocabulary size (number of output logits per row).
    fn vocab_size(&self) -> usize;

    /// Run one decoding step for `token_ids.len()` hypotheses.
    ///
    /// - `token_ids`: the latest token of each hypothesis.
    /// - `states`: the state of each hypothesis, same length as `token_ids`.
    fn step(&self, token_ids: &[u32], states: &[Self::State])
        -> Result<StepOutput<Self::State>>;
}

impl<D: StepDecoder + ?Sized> StepDecoder for &D {
    type State = D::State;

    fn vocab_size(&self) -> usize {
        (**self).vocab_size()
    }

    fn step(&self, token_ids: &[u32], states: &[Self::State]) -> Result<StepOutput<Self::State>> {
        (**self).step(token_ids, states)
    }
}

/// Call `decoder.step` and verify the output matches the `[N, V]` contract.
///
/// A mismatch is reported as an error; rows are never padded or truncated.
pub fn checked_step<D: StepDecoder + ?Sized>(
    decoder: &D,
    token_ids: &[u32],
    states: &[D::State],
) -> Result<StepOutput<D::State>> {
    if token_ids.len() != states.len() {
        return Err(DecoderError::InputMismatch {
            tokens: token_ids.len(),
            states: states.len(),
        });
    }

    let n = token_ids.len();
    let vocab = decoder.vocab_size();
    let out = decoder.step(token_ids, states)?;

    if out.logits.shape().expect_matrix(n, vocab).is_err() {
        return Err(DecoderError::ShapeMismatch {
            rows: n,
            vocab,
            got: out.logits.shape().dims().to_vec(),
        });
    }
    if out.states.len() != n {
        return Err(DecoderError::StateCountMismatch {
            expected: n,
            got: out.states.len(),
        });
    }

    trace!(rows = n, vocab, "decoder step");
    Ok(out)
}

/// Feed `context` through the decoder one token at a time, discarding the
/// logits, and return the resulting state.
pub fn prime<D: StepDecoder + ?Sized>(
    decoder: &D,
    context: &[u32],
    mut state: D::State,
) -> Result<D::State> {
    for &token in context {
        let out = checked_step(decoder, &[token], std::slice::from_ref(&state))?;
        state = out
            .states
            .into_iter()
            .next()
            .ok_or(DecoderError::StateCountMismatch {
                expected: 1,
                got: 0,
            })?;
    }
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fn_decoder::FnDecoder;
    use sd_tensor::Shape;

    /// Decoder that ignores its contract and always returns a single row.
    struct OneRow;

    impl StepDecoder for OneRow {
        type State = ();

        fn vocab_size(&self) -> usize {
            3
        }

        fn step(&self, _token_ids: &[u32], _states: &[()]) -> Result<StepOutput<()>> {
            Ok(StepOutput {
                logits: Tensor::new(vec![0.0; 3], Shape::matrix(1, 3)).unwrap(),
                states: vec![()],
            })
        }
    }

    #[test]
    fn test_checked_step_passes_valid_output() {
        let dec = FnDecoder::new(4, |tok, s: &u32| (vec![tok as f32; 4], s + 1));
        let out = checked_step(&dec, &[1, 2], &[0, 10]).unwrap();
        assert_eq!(out.logits.shape().dims(), &[2, 4]);
        assert_eq!(out.states, vec![1, 11]);
    }

    #[test]
    fn test_checked_step_rejects_wrong_rows() {
        let err = checked_step(&OneRow, &[0, 1], &[(), ()]).unwrap_err();
        assert_eq!(
            err,
            DecoderError::ShapeMismatch {
                rows: 2,
                vocab: 3,
                got: vec![1, 3],
            }
        );
    }

    #[test]
    fn test_checked_step_rejects_wrong_vocab() {
        let dec = FnDecoder::new(4, |_tok, s: &()| (vec![0.0; 3], *s));
        let err = checked_step(&dec, &[0], &[()]).unwrap_err();
        assert!(matches!(err, DecoderError::ShapeMismatch { vocab: 4, .. }));
    }

    #[test]
    fn test_checked_step_rejects_misaligned_inputs() {
        let err = checked_step(&OneRow, &[0], &[(), ()]).unwrap_err();
        assert_eq!(err, DecoderError::InputMismatch { tokens: 1, states: 2 });
    }

    #[test]
    fn test_prime_threads_state() {
        // State records every token it has seen.
        let dec = FnDecoder::new(2, |tok, s: &Vec<u32>| {
            let mut s = s.clone();
            s.push(tok);
            (vec![0.0, 0.0], s)
        });
        let state = prime(&dec, &[5, 6, 7], Vec::new()).unwrap();
        assert_eq!(state, vec![5, 6, 7]);
    }

    #[test]
    fn test_prime_empty_context_is_identity() {
        let dec = FnDecoder::new(2, |_tok, s: &u32| (vec![0.0, 0.0], s + 1));
        assert_eq!(prime(&dec, &[], 41).unwrap(), 41);
    }
}
