//! Root Raised Cosine (RRC) pulse shaping filter
//!
//! TX shaping and RX matched filtering with the same taps give a raised
//! cosine with zero ISI and unit gain at symbol centers.

use std::f64::consts::PI;

use crate::traits::PulseShape;

/// Root Raised Cosine filter
#[derive(Debug, Clone)]
pub struct RootRaisedCosine {
    coeffs: Vec<f64>,
    span: usize,
    samples_per_symbol: usize,
}

impl RootRaisedCosine {
    /// Create a new RRC filter
    ///
    /// # Arguments
    /// * `samples_per_symbol` - Number of samples per symbol period
    /// * `alpha` - Roll-off factor
    /// * `span` - Group delay in symbols (each side of center)
    pub fn new(samples_per_symbol: usize, alpha: f64, span: usize) -> Self {
        let coeffs = generate_rrc_coefficients(samples_per_symbol, alpha, span);
        Self {
            coeffs,
            span,
            samples_per_symbol,
        }
    }

    /// Create with DVB-S2 defaults (α=0.2, 20 symbols each side)
    pub fn default_for_sps(samples_per_symbol: usize) -> Self {
        Self::new(samples_per_symbol, super::DEFAULT_ALPHA, super::DEFAULT_SPAN)
    }

    /// Group delay of one filter in samples
    pub fn delay_samples(&self) -> usize {
        self.span * self.samples_per_symbol
    }
}

impl PulseShape for RootRaisedCosine {
    fn filter_len(&self) -> usize {
        self.coeffs.len()
    }

    fn coefficients(&self) -> &[f64] {
        &self.coeffs
    }

    fn span_symbols(&self) -> usize {
        self.span
    }

    fn samples_per_symbol(&self) -> usize {
        self.samples_per_symbol
    }
}

/// Generate RRC filter coefficients
///
/// Symmetric impulse response of `2·span·sps + 1` taps, normalized to unit
/// energy. The points `t = ±1/(4α)` use the closed-form limit.
fn generate_rrc_coefficients(samples_per_symbol: usize, alpha: f64, span: usize) -> Vec<f64> {
    const SINGULAR_TOLERANCE: f64 = 1e-10;
    let center = span * samples_per_symbol;
    let mut coeffs = vec![0.0; 2 * center + 1];

    coeffs[center] = 1.0 - alpha + 4.0 * alpha / PI;

    for i in 1..=center {
        // t in symbol periods
        let t = i as f64 / samples_per_symbol as f64;

        let h = if (4.0 * alpha * t - 1.0).abs() < SINGULAR_TOLERANCE {
            alpha / 2.0_f64.sqrt()
                * ((1.0 + 2.0 / PI) * (PI / (4.0 * alpha)).sin()
                    + (1.0 - 2.0 / PI) * (PI / (4.0 * alpha)).cos())
        } else {
            let num = (PI * t * (1.0 - alpha)).sin()
                + 4.0 * alpha * t * (PI * t * (1.0 + alpha)).cos();
            let den = PI * t * (1.0 - 16.0 * alpha * alpha * t * t);
            num / den
        };

        coeffs[center + i] = h;
        coeffs[center - i] = h;
    }

    // Normalize filter for unit energy
    let energy: f64 = coeffs.iter().map(|x| x * x).sum();
    let norm = energy.sqrt();
    for c in &mut coeffs {
        *c /= norm;
    }

    coeffs
}
