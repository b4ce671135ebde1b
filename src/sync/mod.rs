//! Carrier and frame synchronization
//!
//! - [`CoarseFreqSync`]: pilot-aided PLL removing large carrier offsets
//! - [`FrameSync`]: PLHEADER detection and frame realignment
//! - [`FineSync`]: residual frequency and phase from the pilot blocks
//! - [`StepComposite`]: coarse loop, matched filter and Gardner per sample

mod coarse;
mod fine;
mod frame;
mod lr;
mod step;

pub use coarse::{pll_coefficients, CoarseFreqSync, CoarseLoopState};
pub use fine::{FineEstimate, FineSync, PilotFreqPhase};
pub use frame::{Correlator, FftCorrelator, FrameSync, FrameSyncResult, SOF_PLSC_LEN};
pub use lr::LuiseReggiannini;
pub use step::{StepComposite, StepEstimate};
