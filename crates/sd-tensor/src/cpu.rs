use crate::backend::ComputeBackend;
use crate::error::{Result, TensorError};

/// Pure-Rust CPU compute backend.
///
/// Implements all operations with straightforward loops optimized for
/// correctness rather than peak performance.
#[derive(Debug, Clone)]
pub struct CpuBackend;

impl CpuBackend {
    pub fn new() -> Self {
        CpuBackend
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn check_chunks(op: &str, x: &[f32], n_vocab: usize) -> Result<usize> {
    if n_vocab == 0 {
        return Err(TensorError::Other(format!("{}: n_vocab must be > 0", op)));
    }
    if x.len() % n_vocab != 0 {
        return Err(TensorError::Other(format!(
            "{}: x.len()={} is not a multiple of n_vocab={}",
            op,
            x.len(),
            n_vocab
        )));
    }
    Ok(x.len() / n_vocab)
}

/// Maximum of a chunk, ignoring NaN.
fn chunk_max(chunk: &[f32]) -> f32 {
    chunk.iter().copied().fold(f32::NEG_INFINITY, f32::max)
}

impl ComputeBackend for CpuBackend {
    fn name(&self) -> &str {
        "cpu"
    }

    fn scale(&self, a: &[f32], s: f32) -> Result<Vec<f32>> {
        Ok(a.iter().map(|x| x * s).collect())
    }

    fn softmax(&self, x: &[f32], n_vocab: usize) -> Result<Vec<f32>> {
        check_chunks("softmax", x, n_vocab)?;
        let mut result = vec![0.0f32; x.len()];

        for (chunk, out) in x.chunks(n_vocab).zip(result.chunks_mut(n_vocab)) {
            let max_val = chunk_max(chunk);
            if !max_val.is_finite() {
                // Fully masked row: no probability mass anywhere.
                continue;
            }

            let mut sum = 0.0f32;
            for (o, &v) in out.iter_mut().zip(chunk) {
                let e = (v - max_val).exp();
                *o = if e.is_nan() { 0.0 } else { e };
                sum += *o;
            }
            for o in out.iter_mut() {
                *o /= sum;
            }
        }

        Ok(result)
    }

    fn log_softmax(&self, x: &[f32], n_vocab: usize) -> Result<Vec<f32>> {
        check_chunks("log_softmax", x, n_vocab)?;
        let mut result = vec![f32::NEG_INFINITY; x.len()];

        for (chunk, out) in x.chunks(n_vocab).zip(result.chunks_mut(n_vocab)) {
            let max_val = chunk_max(chunk);
            if !max_val.is_finite() {
                continue;
            }

            let sum: f32 = chunk
                .iter()
                .map(|&v| (v - max_val).exp())
                .filter(|e| !e.is_nan())
                .sum();
            let log_norm = max_val + sum.ln();
            for (o, &v) in out.iter_mut().zip(chunk) {
                let lp = v - log_norm;
                *o = if lp.is_nan() { f32::NEG_INFINITY } else { lp };
            }
        }

        Ok(result)
    }

    fn argmax(&self, x: &[f32], n_vocab: usize) -> Result<Vec<u32>> {
        check_chunks("argmax", x, n_vocab)?;
        Ok(x.chunks(n_vocab)
            .map(|chunk| {
                let mut best = 0usize;
                let mut best_val = f32::NEG_INFINITY;
                for (i, &v) in chunk.iter().enumerate() {
                    // Strict comparison keeps the lowest index on ties.
                    if v > best_val {
                        best = i;
                        best_val = v;
                    }
                }
                best as u32
            })
            .collect())
    }
}
