use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};
use crate::scorer::LengthPenaltyScorer;
use crate::temperature::Temperature;

/// Length-penalty scorer parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorerConfig {
    /// Exponent of the length penalty. 0 disables normalization.
    pub alpha: f32,
    /// Offset added to the length before exponentiation.
    pub k_offset: f32,
    /// When false the decoder emits raw logits that are log-softmax
    /// normalized before scoring; when true they are already
    /// log-probabilities and used as is.
    pub from_logits: bool,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            alpha: 0.0,
            k_offset: 5.0,
            from_logits: false,
        }
    }
}

impl ScorerConfig {
    /// Checks that the penalty is finite and positive for every reachable length.
    pub fn validate(&self, max_length: usize) -> Result<()> {
        if !self.alpha.is_finite() {
            return Err(SearchError::InvalidConfig(format!(
                "alpha must be finite, got {}",
                self.alpha
            )));
        }
        if !self.k_offset.is_finite() || self.k_offset < 0.0 {
            return Err(SearchError::InvalidConfig(format!(
                "k_offset must be finite and >= 0, got {}",
                self.k_offset
            )));
        }

        // The penalty is monotonic in length, so checking both ends covers
        // every length in between.
        let scorer = LengthPenaltyScorer::new(*self);
        for len in [1, max_length.max(1)] {
            let lp = scorer.length_penalty(len);
            if !lp.is_finite() || lp <= 0.0 {
                return Err(SearchError::InvalidConfig(format!(
                    "length penalty is {} at length {} (alpha={}, k_offset={})",
                    lp, len, self.alpha, self.k_offset
                )));
            }
        }
        Ok(())
    }
}

/// Configuration for deterministic beam search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeamSearchConfig {
    /// Number of hypotheses kept per batch element (K).
    pub beam_size: usize,
    /// Token id that terminates a hypothesis.
    pub eos_id: u32,
    /// Maximum number of tokens in a reported sequence, seed token included.
    pub max_length: usize,
    pub scorer: ScorerConfig,
}

impl Default for BeamSearchConfig {
    fn default() -> Self {
        Self {
            beam_size: 4,
            eos_id: 2,
            max_length: 64,
            scorer: ScorerConfig::default(),
        }
    }
}

impl BeamSearchConfig {
    pub fn validate(&self) -> Result<()> {
        check_common(self.beam_size, self.max_length)?;
        self.scorer.validate(self.max_length)
    }
}

/// Configuration for stochastic multi-sample sequence sampling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Number of independent samples drawn per batch element (K).
    pub num_samples: usize,
    pub eos_id: u32,
    pub max_length: usize,
    /// Logits are divided by this before the softmax. Must be > 0.
    pub temperature: f32,
    /// Seed for the per-batch-element random source used by the driver.
    pub seed: u64,
    /// Sort each batch element's samples by descending score before returning.
    pub sort_by_score: bool,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            num_samples: 4,
            eos_id: 2,
            max_length: 64,
            temperature: 1.0,
            seed: 0,
            sort_by_score: false,
        }
    }
}

impl SamplingConfig {
    pub fn validate(&self) -> Result<()> {
        check_common(self.num_samples, self.max_length)?;
        Temperature::new(self.temperature)?;
        Ok(())
    }
}

/// Which engine the driver runs, with its configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum Strategy {
    BeamSearch(BeamSearchConfig),
    Sampling(SamplingConfig),
}

impl Strategy {
    pub fn validate(&self) -> Result<()> {
        match self {
            Strategy::BeamSearch(c) => c.validate(),
            Strategy::Sampling(c) => c.validate(),
        }
    }

    /// Number of sequences produced per batch element.
    pub fn width(&self) -> usize {
        match self {
            Strategy::BeamSearch(c) => c.beam_size,
            Strategy::Sampling(c) => c.num_samples,
        }
    }

    pub fn max_length(&self) -> usize {
        match self {
            Strategy::BeamSearch(c) => c.max_length,
            Strategy::Sampling(c) => c.max_length,
        }
    }
}

fn check_common(width: usize, max_length: usize) -> Result<()> {
    if width < 1 {
        return Err(SearchError::InvalidConfig(
            "beam size must be >= 1".to_string(),
        ));
    }
    if max_length < 1 {
        return Err(SearchError::InvalidConfig(
            "max_length must be >= 1".to_string(),
        ));
    }
    Ok(())
}
