//! Scrambling layers
//!
//! - [`BbScrambler`]: bit-level LFSR energy dispersal around the FEC
//! - [`PlScrambler`]: symbol-level quadrant rotation of the PL frame payload

mod bb;
mod pl;

pub use bb::BbScrambler;
pub use pl::{PlScrambler, ScrambleDirection};
