use std::fmt::Debug;

use crate::error::Result;

/// Trait for pluggable compute backends.
///
/// Every op works on flat row-major data made of rows of `n_vocab`
/// elements, one row per hypothesis. Data is passed in as slices and
/// returned as owned vectors.
pub trait ComputeBackend: Send + Sync + Debug {
    /// Returns the name of this backend (e.g., "cpu").
    fn name(&self) -> &str;

    /// Scalar multiplication: result[i] = a[i] * s.
    fn scale(&self, a: &[f32], s: f32) -> Result<Vec<f32>>;

    /// Softmax over chunks of `n_vocab` elements.
    ///
    /// For each chunk: result[i] = exp(x[i] - max(x)) / sum(exp(x[j] - max(x))).
    /// A chunk with no finite maximum yields all zeros.
    fn softmax(&self, x: &[f32], n_vocab: usize) -> Result<Vec<f32>>;

    /// Log-softmax over chunks of `n_vocab` elements.
    ///
    /// For each chunk: result[i] = x[i] - max(x) - ln(sum(exp(x[j] - max(x)))).
    /// A chunk with no finite maximum yields all negative infinity.
    fn log_softmax(&self, x: &[f32], n_vocab: usize) -> Result<Vec<f32>>;

    /// Index of the largest element in each chunk of `n_vocab` elements.
    ///
    /// Ties resolve to the lowest index; NaN never wins.
    fn argmax(&self, x: &[f32], n_vocab: usize) -> Result<Vec<u32>>;
}
