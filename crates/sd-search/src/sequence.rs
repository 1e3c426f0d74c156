//! Stochastic multi-sample sequence sampling.
//!
//! K independent rollouts per batch element. Every step draws one token per
//! live rollout from the temperature-scaled softmax; rollouts never compete
//! and finished ones are no longer sent to the decoder.

use rand::Rng;
use sd_decoder::{checked_step, StepDecoder};
use sd_tensor::ComputeBackend;
use tracing::{debug, trace};

use crate::categorical::draw;
use crate::config::SamplingConfig;
use crate::error::{Result, SearchError};
use crate::hypothesis::{FinishReason, Hypothesis};
use crate::output::Decoded;
use crate::search::Search;
use crate::temperature::Temperature;

pub struct SequenceSampler<'a, D: StepDecoder, R: Rng + ?Sized> {
    decoder: &'a D,
    backend: &'a dyn ComputeBackend,
    config: &'a SamplingConfig,
    temperature: Temperature,
    rng: &'a mut R,
    samples: Vec<Hypothesis<D::State>>,
    steps: usize,
}

impl<'a, D: StepDecoder, R: Rng + ?Sized> SequenceSampler<'a, D, R> {
    /// Start K rollouts from the same seed token and decoder state.
    ///
    /// Random draws come from `rng`, one per live rollout per step, in slot
    /// order.
    pub fn new(
        decoder: &'a D,
        backend: &'a dyn ComputeBackend,
        config: &'a SamplingConfig,
        token: u32,
        state: D::State,
        rng: &'a mut R,
    ) -> Result<Self> {
        config.validate()?;
        let temperature = Temperature::new(config.temperature)?;

        let mut seed = Hypothesis::seed(token, state);
        if config.max_length <= 1 {
            seed.finish(FinishReason::MaxLength);
        }
        debug!(
            num_samples = config.num_samples,
            max_length = config.max_length,
            temperature = config.temperature,
            "sequence sampling started"
        );

        Ok(Self {
            decoder,
            backend,
            config,
            temperature,
            rng,
            samples: vec![seed; config.num_samples],
            steps: 0,
        })
    }

    pub fn hypotheses(&self) -> &[Hypothesis<D::State>] {
        &self.samples
    }
}

impl<D: StepDecoder, R: Rng + ?Sized> Search for SequenceSampler<'_, D, R> {
    fn name(&self) -> &str {
        "sequence_sampler"
    }

    fn is_done(&self) -> bool {
        self.samples.iter().all(|h| !h.is_active())
    }

    fn steps(&self) -> usize {
        self.steps
    }

    fn step(&mut self) -> Result<()> {
        let live: Vec<usize> = (0..self.samples.len())
            .filter(|&i| self.samples[i].is_active())
            .collect();
        if live.is_empty() {
            return Ok(());
        }

        let tokens: Vec<u32> = live.iter().map(|&i| self.samples[i].last_token()).collect();
        let states = live
            .iter()
            .map(|&i| {
                self.samples[i]
                    .take_state()
                    .ok_or(SearchError::MissingState(i))
            })
            .collect::<Result<Vec<_>>>()?;

        let out = checked_step(self.decoder, &tokens, &states)?;
        let vocab = self.decoder.vocab_size();
        let scaled = self.temperature.apply(self.backend, &out.logits)?;
        let probs = self.backend.softmax(scaled.data(), vocab)?;
        let log_probs = self.backend.log_softmax(scaled.data(), vocab)?;

        let eos_id = self.config.eos_id;
        let max_length = self.config.max_length;
        for (row, (&slot, state)) in live.iter().zip(out.states).enumerate() {
            let offset = row * vocab;
            let token = match draw(&probs[offset..offset + vocab], &mut *self.rng) {
                Some(token) => token,
                // No usable mass in this row: take the greedy choice.
                None => {
                    let logits = &scaled.data()[offset..offset + vocab];
                    self.backend.argmax(logits, vocab)?[0] as usize
                }
            };
            let parent = &self.samples[slot];
            let total = parent.log_prob() + log_probs[offset + token];
            let token = token as u32;

            let child = if token == eos_id {
                parent.ended(total, total)
            } else {
                let mut child = parent.extend(token, total, total, state);
                if child.valid_length() >= max_length {
                    child.finish(FinishReason::MaxLength);
                }
                child
            };
            self.samples[slot] = child;
        }

        self.steps += 1;
        trace!(step = self.steps, live = live.len(), "sampled tokens");
        Ok(())
    }

    fn finish_active(&mut self, reason: FinishReason) {
        for h in &mut self.samples {
            h.finish(reason);
        }
    }

    fn into_output(self) -> Decoded {
        debug!(steps = self.steps, "sequence sampling finished");
        Decoded::from_hypotheses(self.samples, self.config.sort_by_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use sd_decoder::{BigramDecoder, FnDecoder};
    use sd_tensor::CpuBackend;
    use std::cell::Cell;

    const EOS: u32 = 0;

    fn config(num_samples: usize, max_length: usize, temperature: f32) -> SamplingConfig {
        SamplingConfig {
            num_samples,
            eos_id: EOS,
            max_length,
            temperature,
            seed: 0,
            sort_by_score: false,
        }
    }

    fn run<D: StepDecoder>(
        dec: &D,
        config: &SamplingConfig,
        token: u32,
        state: D::State,
        seed: u64,
    ) -> Decoded {
        let backend = CpuBackend::new();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut sampler =
            SequenceSampler::new(dec, &backend, config, token, state, &mut rng).unwrap();
        while !sampler.is_done() {
            sampler.step().unwrap();
        }
        sampler.into_output()
    }

    fn bigram() -> BigramDecoder {
        BigramDecoder::from_fn(6, |prev, next| ((prev * 7 + next * 4) % 9) as f32 * 0.3).unwrap()
    }

    #[test]
    fn test_same_seed_same_samples() {
        let dec = bigram();
        let cfg = config(4, 10, 1.0);
        assert_eq!(run(&dec, &cfg, 2, 0, 11), run(&dec, &cfg, 2, 0, 11));
    }

    #[test]
    fn test_k_samples_within_bounds() {
        let dec = bigram();
        let cfg = config(5, 7, 1.3);
        let out = run(&dec, &cfg, 1, 0, 5);
        assert_eq!(out.len(), 5);
        for (seq, &len) in out.sequences.iter().zip(&out.valid_lengths) {
            assert!(len >= 1 && len <= 7);
            assert_eq!(seq.len(), len);
            assert!(!seq.contains(&EOS));
            assert_eq!(seq[0], 1);
        }
    }

    #[test]
    fn test_low_temperature_is_greedy() {
        let dec = bigram();
        let cfg = config(3, 8, 1e-4);
        let out = run(&dec, &cfg, 4, 0, 99);

        let backend = CpuBackend::new();
        let mut greedy = vec![4u32];
        let mut state = 0usize;
        while greedy.len() < 8 {
            let step = dec.step(&[*greedy.last().unwrap()], &[state]).unwrap();
            state = step.states[0];
            let next = backend.argmax(step.logits.row(0).unwrap(), 6).unwrap()[0];
            if next == EOS {
                break;
            }
            greedy.push(next);
        }
        for seq in &out.sequences {
            assert_eq!(seq, &greedy);
        }
    }

    #[test]
    fn test_score_is_summed_log_prob() {
        // Two tokens, uniform: every drawn token costs ln(1/2).
        let dec = FnDecoder::new(2, |_tok, s: &()| (vec![0.0, 0.0], *s));
        let cfg = SamplingConfig {
            eos_id: 99,
            ..config(3, 4, 1.0)
        };
        let out = run(&dec, &cfg, 1, (), 3);
        for &score in &out.scores {
            assert_relative_eq!(score, 3.0 * 0.5f32.ln(), epsilon = 1e-5);
        }
        assert_eq!(out.valid_lengths, vec![4, 4, 4]);
    }

    #[test]
    fn test_finished_samples_are_not_stepped() {
        // EOS is certain after token 1; token 2 never ends.
        let calls = Cell::new(0usize);
        let dec = FnDecoder::new(3, |tok, s: &()| {
            calls.set(calls.get() + 1);
            let row = match tok {
                1 => vec![0.0, f32::NEG_INFINITY, f32::NEG_INFINITY],
                _ => vec![f32::NEG_INFINITY, 0.0, 0.0],
            };
            (row, *s)
        });
        let cfg = config(4, 6, 1.0);
        let out = run(&dec, &cfg, 2, (), 21);
        let expected_rows: usize = out
            .sequences
            .iter()
            .map(|seq| {
                if seq.len() == 6 {
                    // Ran to max_length: one call per appended token.
                    5
                } else {
                    // Ended on EOS: one extra call that drew EOS.
                    seq.len()
                }
            })
            .sum();
        assert_eq!(calls.get(), expected_rows);
        for seq in &out.sequences {
            if seq.contains(&1) {
                assert_eq!(seq.last(), Some(&1));
            }
        }
    }

    #[test]
    fn test_sorted_output_option() {
        let dec = bigram();
        let cfg = SamplingConfig {
            sort_by_score: true,
            ..config(6, 8, 2.0)
        };
        let out = run(&dec, &cfg, 3, 0, 8);
        for w in out.scores.windows(2) {
            assert!(w[0] >= w[1]);
        }
    }

    #[test]
    fn test_fully_masked_row_falls_back_to_argmax() {
        let dec = FnDecoder::new(3, |_tok, s: &()| (vec![f32::NEG_INFINITY; 3], *s));
        let cfg = config(2, 5, 1.0);
        let out = run(&dec, &cfg, 1, (), 0);
        // argmax of an all-masked row is index 0, which is EOS here.
        assert_eq!(out.sequences, vec![vec![1], vec![1]]);
        assert!(out.scores.iter().all(|&s| s == f32::NEG_INFINITY));
    }

    #[test]
    fn test_invalid_temperature() {
        let dec = bigram();
        let backend = CpuBackend::new();
        let mut rng = StdRng::seed_from_u64(0);
        let cfg = config(2, 5, 0.0);
        assert!(SequenceSampler::new(&dec, &backend, &cfg, 1, 0, &mut rng).is_err());
    }
}
