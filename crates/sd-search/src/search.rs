use crate::error::Result;
use crate::hypothesis::FinishReason;
use crate::output::Decoded;

/// A step-synchronous decoding engine for one batch element.
///
/// The driver calls [`Search::step`] until [`Search::is_done`] and then
/// collects the result with [`Search::into_output`].
pub trait Search {
    /// Returns the name of this engine.
    fn name(&self) -> &str;

    /// True once every hypothesis is finished.
    fn is_done(&self) -> bool;

    /// Number of steps run so far.
    fn steps(&self) -> usize;

    /// Advance every live hypothesis by one token with a single decoder call.
    fn step(&mut self) -> Result<()>;

    /// Finish every still-active hypothesis at its current length.
    fn finish_active(&mut self, reason: FinishReason);

    /// Consume the engine and emit its K sequences.
    fn into_output(self) -> Decoded
    where
        Self: Sized;
}
