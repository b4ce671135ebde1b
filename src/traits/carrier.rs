//! Carrier trait - Frequency correction
//!
//! A complex-exponential multiplier driven by a normalized frequency.
//! The owner sets the frequency; the phase counter stays private.

use num_complex::Complex64;

/// Numerically controlled multiplier
pub trait Carrier: Send + Sync {
    /// Multiply one sample by the current oscillator output and advance
    fn step(&mut self, x: Complex64) -> Complex64;

    /// Rewind the phase counter
    fn reset(&mut self);

    /// Normalized frequency (cycles per sample) in use
    fn frequency(&self) -> f64;

    /// Set the normalized frequency (cycles per sample)
    fn set_frequency(&mut self, nu: f64);

    /// Block form of [`Carrier::step`]
    fn rotate(&mut self, input: &[Complex64], output: &mut [Complex64]) {
        debug_assert_eq!(input.len(), output.len());
        for (x, y) in input.iter().zip(output.iter_mut()) {
            *y = self.step(*x);
        }
    }
}
