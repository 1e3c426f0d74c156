use sd_tensor::{ComputeBackend, Tensor};

use crate::error::{Result, SearchError};

/// Divides logits by a temperature before the softmax.
///
/// Higher temperatures produce more uniform distributions (more random),
/// while lower temperatures sharpen the distribution towards the argmax.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Temperature(f32);

impl Temperature {
    /// Create a temperature, rejecting zero, negative and non-finite values.
    pub fn new(temperature: f32) -> Result<Self> {
        if !temperature.is_finite() || temperature <= 0.0 {
            return Err(SearchError::InvalidConfig(format!(
                "temperature must be finite and > 0, got {}",
                temperature
            )));
        }
        Ok(Self(temperature))
    }

    pub fn value(&self) -> f32 {
        self.0
    }

    /// Scale every logit of an `[N, V]` tensor.
    pub fn apply(&self, backend: &dyn ComputeBackend, logits: &Tensor) -> Result<Tensor> {
        if self.0 == 1.0 {
            return Ok(logits.clone());
        }
        Ok(logits.map_data(|data| backend.scale(data, 1.0 / self.0))?)
    }
}
