//! `sd-tensor` - Logit matrices with pluggable compute backends for seq-decode.
//!
//! This crate provides:
//! - A `Tensor` type holding row-major `[N, V]` f32 data (one row per hypothesis)
//! - A `ComputeBackend` trait for the row-wise ops decoding needs
//! - A reference `CpuBackend` implementation
//! - Shape utilities

pub mod backend;
pub mod cpu;
pub mod error;
pub mod shape;
pub mod tensor;

// Re-export primary types at the crate root for convenience.
pub use backend::ComputeBackend;
pub use cpu::CpuBackend;
pub use error::{Result, TensorError};
pub use shape::Shape;
pub use tensor::Tensor;
