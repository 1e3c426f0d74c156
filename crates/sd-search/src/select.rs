use std::cmp::Ordering;

/// How a candidate continues its parent hypothesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expansion {
    /// A finished parent carried over unchanged.
    Carry,
    /// The parent extended by one token.
    Token(u32),
}

/// One possible successor considered during a beam search step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// Position in the flat candidate list, used to break score ties.
    pub index: usize,
    /// Slot of the parent hypothesis.
    pub parent: usize,
    pub expansion: Expansion,
    /// Summed log-probability after this expansion.
    pub log_prob: f32,
    /// Normalized ranking score after this expansion.
    pub score: f32,
}

impl Candidate {
    fn rank_score(&self) -> f32 {
        if self.score.is_nan() {
            f32::NEG_INFINITY
        } else {
            self.score
        }
    }

    /// Whether this candidate may win a slot on its own merit.
    pub fn is_viable(&self) -> bool {
        self.rank_score() > f32::NEG_INFINITY
    }
}

/// Best-first order: higher score first, then lower candidate index.
/// NaN ranks with negative infinity.
fn rank(a: &Candidate, b: &Candidate) -> Ordering {
    b.rank_score()
        .partial_cmp(&a.rank_score())
        .unwrap_or(Ordering::Equal)
        .then(a.index.cmp(&b.index))
}

/// Keep the `k` best candidates, sorted best-first.
///
/// Uses a partial selection over the flat list followed by a sort of the
/// winners, so the cost is O(n + k log k). Candidates whose score is negative
/// infinity (or NaN) are dropped whenever a viable one exists, so the result
/// may hold fewer than `k` entries. Each candidate appears at most once. When
/// nothing is viable the lowest-index candidates are kept instead.
pub fn select_top_k(mut candidates: Vec<Candidate>, k: usize) -> Vec<Candidate> {
    if k == 0 || candidates.is_empty() {
        return Vec::new();
    }

    let take = k.min(candidates.len());
    if take < candidates.len() {
        candidates.select_nth_unstable_by(take - 1, rank);
        candidates.truncate(take);
    }
    candidates.sort_by(rank);

    let viable = candidates.iter().take_while(|c| c.is_viable()).count();
    if viable > 0 {
        candidates.truncate(viable);
    }
    candidates
}
