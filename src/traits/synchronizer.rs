//! Synchronizer trait - shared capability of every loop and estimator

use std::fmt::Debug;

/// Common surface of the synchronizer families.
///
/// Stepping differs per stage (per sample, per strobe, per frame) and lives
/// on the concrete types; reset and the current estimate do not.
pub trait Synchronizer: Send {
    type Estimate: Copy + Debug;

    /// Return to the canonical start-up state
    fn reset(&mut self);

    /// Latest estimate produced by the stage
    fn estimate(&self) -> Self::Estimate;
}
