//! Pulse shaping filter implementations
//!
//! Root Raised Cosine taps plus the two streaming filters built on them:
//! the TX upsampling shaper and the RX matched filter.

mod fir;
mod rrc;

pub use fir::{MatchedFilter, ShapingFilter};
pub use rrc::RootRaisedCosine;

/// Default DVB-S2 roll-off factor
pub const DEFAULT_ALPHA: f64 = 0.2;

/// Default group delay in symbols (each side of center)
pub const DEFAULT_SPAN: usize = 20;
