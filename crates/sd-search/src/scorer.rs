use sd_tensor::{ComputeBackend, Tensor};

use crate::config::ScorerConfig;
use crate::error::Result;

/// Running sequence score with length normalization.
///
/// ```text
/// log_prob'  = log_prob + log p(token)
/// lp(len)    = (k_offset + len)^alpha / (k_offset + 1)^alpha
/// score      = log_prob' / lp(len')
/// ```
///
/// With `alpha == 0` the penalty is 1 for every length and the score is the
/// plain summed log-probability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LengthPenaltyScorer {
    config: ScorerConfig,
}

impl LengthPenaltyScorer {
    pub fn new(config: ScorerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScorerConfig {
        &self.config
    }

    /// Penalty divisor for a hypothesis that has taken `len` steps.
    pub fn length_penalty(&self, len: usize) -> f32 {
        let ScorerConfig {
            alpha, k_offset, ..
        } = self.config;
        if alpha == 0.0 {
            return 1.0;
        }
        // Same value as the quotient of powers, without overflowing first.
        ((k_offset + len as f32) / (k_offset + 1.0)).powf(alpha)
    }

    /// Extend a parent's summed log-probability by one token.
    ///
    /// Returns `(log_prob', normalized_score)` for a hypothesis of `len` steps.
    pub fn score(&self, parent_log_prob: f32, token_log_prob: f32, len: usize) -> (f32, f32) {
        let total = parent_log_prob + token_log_prob;
        (total, total / self.length_penalty(len))
    }

    /// Turn a decoder's `[N, V]` output into log-probabilities.
    pub fn log_probs(&self, backend: &dyn ComputeBackend, logits: &Tensor) -> Result<Tensor> {
        if self.config.from_logits {
            return Ok(logits.clone());
        }
        let vocab = logits.cols()?;
        Ok(logits.map_data(|data| backend.log_softmax(data, vocab))?)
    }
}
