//! Carrier oscillator implementations
//!
//! Currently only the NCO multiplier used for frequency correction.

mod nco;

pub use nco::Nco;
