//! Runs a configured engine over a batch of independent inputs.

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use sd_decoder::{prime, StepDecoder};
use sd_tensor::{ComputeBackend, CpuBackend};
use tracing::{debug, debug_span, warn};

use crate::beam::BeamSearch;
use crate::config::Strategy;
use crate::error::{Result, SearchError};
use crate::hypothesis::FinishReason;
use crate::output::Decoded;
use crate::search::Search;
use crate::sequence::SequenceSampler;

/// Input for one batch element.
#[derive(Debug, Clone)]
pub struct DecodeRequest<S> {
    /// Tokens fed through the decoder before decoding starts. They update
    /// the state but are not part of the output and do not count toward
    /// `max_length`.
    pub context: Vec<u32>,
    /// Seed token every output sequence starts with.
    pub token: u32,
    /// Decoder state before `context` is consumed.
    pub state: S,
}

impl<S> DecodeRequest<S> {
    pub fn new(token: u32, state: S) -> Self {
        Self {
            context: Vec::new(),
            token,
            state,
        }
    }

    pub fn with_context(mut self, context: Vec<u32>) -> Self {
        self.context = context;
        self
    }

    /// Split a prompt into priming context and seed token (its last token).
    pub fn from_prompt(prompt: &[u32], state: S) -> Result<Self> {
        match prompt.split_last() {
            Some((&token, context)) => Ok(Self {
                context: context.to_vec(),
                token,
                state,
            }),
            None => Err(SearchError::EmptyPrompt),
        }
    }
}

/// Drives beam search or sequence sampling to completion.
///
/// Batch elements never share state: each one is primed, decoded and
/// reported on its own, and a decoder failure only fails that element.
pub struct DecodingDriver<D> {
    decoder: D,
    strategy: Strategy,
    backend: Box<dyn ComputeBackend>,
    time_limit: Option<Duration>,
}

impl<D: StepDecoder> DecodingDriver<D> {
    /// Create a driver, validating the strategy configuration up front.
    pub fn new(decoder: D, strategy: Strategy) -> Result<Self> {
        strategy.validate()?;
        Ok(Self {
            decoder,
            strategy,
            backend: Box::new(CpuBackend::new()),
            time_limit: None,
        })
    }

    /// Use a different compute backend for softmax and scoring.
    pub fn with_backend(mut self, backend: Box<dyn ComputeBackend>) -> Self {
        self.backend = backend;
        self
    }

    /// Stop each batch element's step loop once `limit` has elapsed.
    ///
    /// Checked between steps only; hypotheses still active at that point are
    /// finished at their current length.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    /// Prime and decode a single batch element.
    ///
    /// `rng` is only consulted by the sampling strategy.
    pub fn decode_one<R: Rng + ?Sized>(
        &self,
        request: DecodeRequest<D::State>,
        rng: &mut R,
    ) -> Result<Decoded> {
        let state = prime(&self.decoder, &request.context, request.state)?;
        if !request.context.is_empty() {
            debug!(context = request.context.len(), "primed decoder state");
        }

        let backend = self.backend.as_ref();
        match &self.strategy {
            Strategy::BeamSearch(config) => self.run(BeamSearch::new(
                &self.decoder,
                backend,
                config,
                request.token,
                state,
            )?),
            Strategy::Sampling(config) => self.run(SequenceSampler::new(
                &self.decoder,
                backend,
                config,
                request.token,
                state,
                rng,
            )?),
        }
    }

    fn run<E: Search>(&self, mut engine: E) -> Result<Decoded> {
        let deadline = self.time_limit.map(|limit| Instant::now() + limit);
        let max_steps = self.strategy.max_length();

        while !engine.is_done() {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                warn!(
                    engine = engine.name(),
                    steps = engine.steps(),
                    "time limit reached, finishing active hypotheses"
                );
                engine.finish_active(FinishReason::TimeLimit);
                break;
            }
            if engine.steps() >= max_steps {
                engine.finish_active(FinishReason::MaxLength);
                break;
            }
            engine.step()?;
        }

        debug!(engine = engine.name(), steps = engine.steps(), "decode finished");
        Ok(engine.into_output())
    }

    /// Random source for batch element `index`, derived from the sampling seed.
    fn element_rng(&self, index: usize) -> StdRng {
        let seed = match &self.strategy {
            Strategy::Sampling(config) => config.seed,
            Strategy::BeamSearch(_) => 0,
        };
        StdRng::seed_from_u64(seed.wrapping_add(index as u64))
    }

    fn decode_indexed<R: Rng + ?Sized>(
        &self,
        index: usize,
        request: DecodeRequest<D::State>,
        rng: &mut R,
    ) -> Result<Decoded> {
        let _span = debug_span!("decode", index).entered();
        let result = self.decode_one(request, rng);
        if let Err(e) = &result {
            warn!(error = %e, "batch element failed");
        }
        result
    }

    /// Decode every request in order, one result per batch element.
    pub fn decode(&self, requests: Vec<DecodeRequest<D::State>>) -> Vec<Result<Decoded>> {
        requests
            .into_iter()
            .enumerate()
            .map(|(i, request)| self.decode_indexed(i, request, &mut self.element_rng(i)))
            .collect()
    }

    /// Decode every request in order, drawing all randomness from `rng`.
    ///
    /// Draws happen in (batch element, slot) order.
    pub fn decode_with_rng<R: Rng + ?Sized>(
        &self,
        requests: Vec<DecodeRequest<D::State>>,
        rng: &mut R,
    ) -> Vec<Result<Decoded>> {
        requests
            .into_iter()
            .enumerate()
            .map(|(i, request)| self.decode_indexed(i, request, rng))
            .collect()
    }

    /// Same results as [`DecodingDriver::decode`], with batch elements
    /// decoded in parallel.
    pub fn par_decode(&self, requests: Vec<DecodeRequest<D::State>>) -> Vec<Result<Decoded>>
    where
        D: Sync,
        D::State: Send,
    {
        requests
            .into_par_iter()
            .enumerate()
            .map(|(i, request)| self.decode_indexed(i, request, &mut self.element_rng(i)))
            .collect()
    }
}
