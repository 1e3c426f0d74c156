use serde::{Deserialize, Serialize};

/// Why a hypothesis stopped growing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinishReason {
    /// The decoder produced the end-of-sequence token.
    Eos,
    /// The sequence reached `max_length` tokens.
    MaxLength,
    /// The caller's time limit expired between steps.
    TimeLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HypothesisStatus {
    Active,
    Finished(FinishReason),
}

/// One candidate output sequence.
///
/// The token list always starts with the seed token and never contains the
/// EOS token. Once finished, tokens and scores are frozen and the decoder
/// state is released.
#[derive(Debug, Clone)]
pub struct Hypothesis<S> {
    tokens: Vec<u32>,
    log_prob: f32,
    score: f32,
    steps: usize,
    status: HypothesisStatus,
    state: Option<S>,
}

impl<S> Hypothesis<S> {
    /// A fresh hypothesis holding only the seed token.
    pub fn seed(token: u32, state: S) -> Self {
        Self {
            tokens: vec![token],
            log_prob: 0.0,
            score: 0.0,
            steps: 0,
            status: HypothesisStatus::Active,
            state: Some(state),
        }
    }

    pub fn tokens(&self) -> &[u32] {
        &self.tokens
    }

    /// Summed log-probability of every decoded token.
    pub fn log_prob(&self) -> f32 {
        self.log_prob
    }

    /// Ranking score (length-normalized for beam search).
    pub fn score(&self) -> f32 {
        self.score
    }

    /// Number of decoding steps taken, EOS step included.
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn valid_length(&self) -> usize {
        self.tokens.len()
    }

    pub fn status(&self) -> HypothesisStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == HypothesisStatus::Active
    }

    pub fn last_token(&self) -> u32 {
        // Never empty: construction starts from a seed token.
        self.tokens[self.tokens.len() - 1]
    }

    pub fn state(&self) -> Option<&S> {
        self.state.as_ref()
    }

    /// Move the decoder state out, leaving `None` behind.
    pub fn take_state(&mut self) -> Option<S> {
        self.state.take()
    }

    /// A child hypothesis with `token` appended.
    pub fn extend(&self, token: u32, log_prob: f32, score: f32, state: S) -> Self {
        let mut tokens = Vec::with_capacity(self.tokens.len() + 1);
        tokens.extend_from_slice(&self.tokens);
        tokens.push(token);
        Self {
            tokens,
            log_prob,
            score,
            steps: self.steps + 1,
            status: HypothesisStatus::Active,
            state: Some(state),
        }
    }

    /// A child that ended on EOS: same tokens, updated score, finished.
    pub fn ended(&self, log_prob: f32, score: f32) -> Self {
        Self {
            tokens: self.tokens.clone(),
            log_prob,
            score,
            steps: self.steps + 1,
            status: HypothesisStatus::Finished(FinishReason::Eos),
            state: None,
        }
    }

    /// Mark an active hypothesis finished. No-op if already finished.
    pub fn finish(&mut self, reason: FinishReason) {
        if self.is_active() {
            self.status = HypothesisStatus::Finished(reason);
            self.state = None;
        }
    }
}
