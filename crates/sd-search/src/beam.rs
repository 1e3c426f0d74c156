//! Beam search with length-normalized scoring.
//!
//! Each step expands every active hypothesis over the full vocabulary,
//! carries finished hypotheses over unchanged, and keeps the K best
//! candidates across all beams.
//!
//! Slots that no finite candidate can fill stay empty: they are never
//! expanded or carried, and are only filled with copies of the best
//! hypotheses when the output is emitted.

use sd_decoder::{checked_step, StepDecoder};
use sd_tensor::ComputeBackend;
use tracing::{debug, trace};

use crate::config::BeamSearchConfig;
use crate::error::{Result, SearchError};
use crate::hypothesis::{FinishReason, Hypothesis};
use crate::output::Decoded;
use crate::scorer::LengthPenaltyScorer;
use crate::search::Search;
use crate::select::{select_top_k, Candidate, Expansion};

pub struct BeamSearch<'a, D: StepDecoder> {
    decoder: &'a D,
    backend: &'a dyn ComputeBackend,
    config: &'a BeamSearchConfig,
    scorer: LengthPenaltyScorer,
    beams: Vec<Hypothesis<D::State>>,
    steps: usize,
}

impl<'a, D: StepDecoder> BeamSearch<'a, D> {
    /// Start a search from a single seed token and decoder state.
    ///
    /// The seed occupies one slot; the first step fans it out over the
    /// vocabulary into up to K distinct hypotheses.
    pub fn new(
        decoder: &'a D,
        backend: &'a dyn ComputeBackend,
        config: &'a BeamSearchConfig,
        token: u32,
        state: D::State,
    ) -> Result<Self> {
        config.validate()?;

        let mut seed = Hypothesis::seed(token, state);
        if config.max_length <= 1 {
            seed.finish(FinishReason::MaxLength);
        }
        let beams = vec![seed];
        debug!(
            beam_size = config.beam_size,
            max_length = config.max_length,
            alpha = config.scorer.alpha,
            "beam search started"
        );

        Ok(Self {
            decoder,
            backend,
            config,
            scorer: LengthPenaltyScorer::new(config.scorer),
            beams,
            steps: 0,
        })
    }

    /// Occupied slots, at most K. Empty slots are not listed.
    pub fn hypotheses(&self) -> &[Hypothesis<D::State>] {
        &self.beams
    }

    /// Slots whose hypotheses get expanded this step.
    fn live_slots(&self) -> Vec<usize> {
        (0..self.beams.len())
            .filter(|&i| self.beams[i].is_active())
            .collect()
    }
}

impl<D: StepDecoder> Search for BeamSearch<'_, D> {
    fn name(&self) -> &str {
        "beam_search"
    }

    fn is_done(&self) -> bool {
        self.beams.iter().all(|h| !h.is_active())
    }

    fn steps(&self) -> usize {
        self.steps
    }

    fn step(&mut self) -> Result<()> {
        let live = self.live_slots();
        if live.is_empty() {
            return Ok(());
        }

        let tokens: Vec<u32> = live.iter().map(|&i| self.beams[i].last_token()).collect();
        let states = live
            .iter()
            .map(|&i| {
                self.beams[i]
                    .take_state()
                    .ok_or(SearchError::MissingState(i))
            })
            .collect::<Result<Vec<_>>>()?;

        let out = checked_step(self.decoder, &tokens, &states)?;
        let log_probs = self.scorer.log_probs(self.backend, &out.logits)?;
        let len = self.steps + 1;

        // Map each slot to its row in the decoder output.
        let mut row_of = vec![None; self.beams.len()];
        for (row, &slot) in live.iter().enumerate() {
            row_of[slot] = Some(row);
        }

        let vocab = self.decoder.vocab_size();
        let mut candidates =
            Vec::with_capacity(live.len() * vocab + self.beams.len() - live.len());
        for (slot, row) in row_of.iter().enumerate() {
            let parent = &self.beams[slot];
            match row {
                None => candidates.push(Candidate {
                    index: candidates.len(),
                    parent: slot,
                    expansion: Expansion::Carry,
                    log_prob: parent.log_prob(),
                    score: parent.score(),
                }),
                Some(row) => {
                    for (token, &lp) in log_probs.row(*row)?.iter().enumerate() {
                        let (log_prob, score) = self.scorer.score(parent.log_prob(), lp, len);
                        candidates.push(Candidate {
                            index: candidates.len(),
                            parent: slot,
                            expansion: Expansion::Token(token as u32),
                            log_prob,
                            score,
                        });
                    }
                }
            }
        }
        trace!(step = len, live = live.len(), candidates = candidates.len(), "expanded beams");

        let eos_id = self.config.eos_id;
        let max_length = self.config.max_length;
        let width = self.config.beam_size;
        let mut next = Vec::with_capacity(width);
        for cand in select_top_k(candidates, width) {
            let parent = &self.beams[cand.parent];
            let child = match cand.expansion {
                Expansion::Carry => parent.clone(),
                Expansion::Token(token) if token == eos_id => {
                    parent.ended(cand.log_prob, cand.score)
                }
                Expansion::Token(token) => {
                    let state = row_of[cand.parent]
                        .and_then(|row| out.states.get(row))
                        .cloned()
                        .ok_or(SearchError::MissingState(cand.parent))?;
                    let mut child = parent.extend(token, cand.log_prob, cand.score, state);
                    if child.valid_length() >= max_length {
                        child.finish(FinishReason::MaxLength);
                    }
                    child
                }
            };
            next.push(child);
        }

        self.beams = next;
        self.steps = len;
        Ok(())
    }

    fn finish_active(&mut self, reason: FinishReason) {
        for h in &mut self.beams {
            h.finish(reason);
        }
    }

    fn into_output(self) -> Decoded {
        let width = self.config.beam_size;
        let mut beams = self.beams;
        debug!(steps = self.steps, filled = beams.len(), width, "beam search finished");

        // Empty slots repeat the occupied ones; the stable sort keeps each
        // copy next to its original.
        let filled = beams.len();
        if filled > 0 {
            for i in 0..width.saturating_sub(filled) {
                let copy = beams[i % filled].clone();
                beams.push(copy);
            }
        }
        Decoded::from_hypotheses(beams, true)
    }
}
