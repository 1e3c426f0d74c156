//! `sd-search` - Turns a one-step decoder into complete output sequences.
//!
//! Two engines share the same step-synchronous loop:
//! - [`BeamSearch`]: K competing hypotheses, length-normalized scores,
//!   global top-K selection every step.
//! - [`SequenceSampler`]: K independent temperature-scaled rollouts.
//!
//! [`DecodingDriver`] primes decoder state, runs either engine per batch
//! element and reports `(sequences, scores, valid_lengths)`.

pub mod beam;
pub mod categorical;
pub mod config;
pub mod driver;
pub mod error;
pub mod hypothesis;
pub mod output;
pub mod scorer;
pub mod search;
pub mod select;
pub mod sequence;
pub mod temperature;

pub use beam::BeamSearch;
pub use config::{BeamSearchConfig, SamplingConfig, ScorerConfig, Strategy};
pub use driver::{DecodeRequest, DecodingDriver};
pub use error::{Result, SearchError};
pub use hypothesis::{FinishReason, Hypothesis, HypothesisStatus};
pub use output::Decoded;
pub use scorer::LengthPenaltyScorer;
pub use search::Search;
pub use sequence::SequenceSampler;
pub use temperature::Temperature;
