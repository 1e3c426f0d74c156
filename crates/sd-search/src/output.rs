use serde::{Deserialize, Serialize};

use crate::hypothesis::Hypothesis;

/// Decoding result for one batch element.
///
/// The three vectors are index-aligned and hold exactly K entries. Each
/// sequence holds exactly `valid_lengths[i]` tokens: the seed token followed
/// by the generated tokens, never the EOS token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decoded {
    pub sequences: Vec<Vec<u32>>,
    pub scores: Vec<f32>,
    pub valid_lengths: Vec<usize>,
}

impl Decoded {
    /// Collect finished hypotheses, optionally sorting by descending score.
    ///
    /// Sorting is stable, so equal scores keep their slot order.
    pub fn from_hypotheses<S>(mut hypotheses: Vec<Hypothesis<S>>, sort: bool) -> Self {
        if sort {
            hypotheses.sort_by(|a, b| {
                let key = |s: f32| if s.is_nan() { f32::NEG_INFINITY } else { s };
                key(b.score())
                    .partial_cmp(&key(a.score()))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }

        let mut out = Decoded {
            sequences: Vec::with_capacity(hypotheses.len()),
            scores: Vec::with_capacity(hypotheses.len()),
            valid_lengths: Vec::with_capacity(hypotheses.len()),
        };
        for h in hypotheses {
            out.valid_lengths.push(h.valid_length());
            out.scores.push(h.score());
            out.sequences.push(h.tokens().to_vec());
        }
        out
    }

    /// Number of sequences (K).
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// The highest-scoring sequence and its score.
    pub fn best(&self) -> Option<(&[u32], f32)> {
        self.scores
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, f32)>, (i, &s)| match best {
                Some((_, b)) if b >= s || s.is_nan() => best,
                _ => Some((i, s)),
            })
            .map(|(i, s)| (self.sequences[i].as_slice(), s))
    }

    /// Sequences right-padded with `pad_id` to the longest valid length.
    pub fn padded(&self, pad_id: u32) -> Vec<Vec<u32>> {
        let width = self.valid_lengths.iter().copied().max().unwrap_or(0);
        self.sequences
            .iter()
            .map(|seq| {
                let mut row = seq.clone();
                row.resize(width, pad_id);
                row
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hypothesis::FinishReason;

    fn finished(tokens: &[u32], score: f32) -> Hypothesis<()> {
        let mut h = Hypothesis::seed(tokens[0], ());
        for &t in &tokens[1..] {
            h = h.extend(t, score, score, ());
        }
        h.finish(FinishReason::MaxLength);
        h
    }

    #[test]
    fn test_sorted_output() {
        let out = Decoded::from_hypotheses(
            vec![
                finished(&[0, 1], -2.0),
                finished(&[0, 2, 3], -0.5),
                finished(&[0], 0.0),
            ],
            true,
        );
        assert_eq!(out.scores, vec![0.0, -0.5, -2.0]);
        assert_eq!(out.sequences, vec![vec![0], vec![0, 2, 3], vec![0, 1]]);
        assert_eq!(out.valid_lengths, vec![1, 3, 2]);
    }

    #[test]
    fn test_unsorted_keeps_slot_order() {
        let out = Decoded::from_hypotheses(
            vec![finished(&[0, 1], -2.0), finished(&[0, 2], -0.5)],
            false,
        );
        assert_eq!(out.scores, vec![-2.0, -0.5]);
        assert_eq!(out.best(), Some((&[0u32, 2][..], -0.5)));
    }

    #[test]
    fn test_padded() {
        let out = Decoded::from_hypotheses(
            vec![finished(&[5], -1.0), finished(&[5, 6, 7], -1.0)],
            false,
        );
        assert_eq!(out.padded(0), vec![vec![5, 0, 0], vec![5, 6, 7]]);
        assert_eq!(out.len(), 2);
    }
}
