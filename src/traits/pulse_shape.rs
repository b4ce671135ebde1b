//! PulseShape trait - Spectral shaping / ISI control
//!
//! The same taps serve TX shaping and RX matched filtering.

use num_complex::Complex64;

/// Pulse shaping filter trait
pub trait PulseShape: Send + Sync {
    /// Length of the filter in samples
    fn filter_len(&self) -> usize;

    /// Get the filter coefficients
    fn coefficients(&self) -> &[f64];

    /// Filter span in symbols (each side of center)
    fn span_symbols(&self) -> usize;

    /// Samples per symbol the taps were designed for
    fn samples_per_symbol(&self) -> usize;

    /// Dot product of the taps with a history buffer (newest sample last)
    fn filter(&self, history: &[Complex64]) -> Complex64 {
        debug_assert_eq!(history.len(), self.filter_len());
        self.coefficients()
            .iter()
            .rev()
            .zip(history.iter())
            .map(|(c, h)| *h * *c)
            .sum()
    }
}
