//! Frame-by-frame transmit and receive chains
//!
//! ```text
//! TX: XFEC ─►[Framer]─►[PL scramble]─►[RRC ↑osf]─► samples
//!
//! RX: samples ─►[AGC]─►[coarse PLL ─► MF ─► Gardner]─►[AGC]─►[frame sync]
//!        ─►[PL descramble]─►[L&R]─►[pilot fine]─►[remove PLH]─►[Es/N0]─► XFEC
//! ```

mod rx;
mod tx;


pub use rx::{Receiver, RxFrame, RxPhase};
pub use tx::Transmitter;
