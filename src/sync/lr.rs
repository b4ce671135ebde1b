//! Luise-Reggiannini frequency estimator
//!
//! Autocorrelation of the pilot-removed symbols at lags `1..=N`, summed over
//! the first `Lp` symbols of every pilot block and smoothed across frames.
//! `arg(R) / ((N + 1)π)` is the frequency in cycles per symbol.

use num_complex::Complex64;
use std::f64::consts::PI;

use super::fine::{remove_pilot, FineEstimate};
use crate::error::{check_len, PhyResult};
use crate::params::FrameGeometry;
use crate::traits::Synchronizer;
use crate::utils::derotate;

/// Pilot symbols used per block
const LR_SPAN: usize = 18;
/// Largest autocorrelation lag
const LR_LAGS: usize = LR_SPAN / 2;

#[derive(Debug, Clone)]
pub struct LuiseReggiannini {
    frame_len: usize,
    pilot_starts: Vec<usize>,
    alpha: f64,
    autocorr: Complex64,
    freq: f64,
    z: [Complex64; LR_SPAN],
}

impl LuiseReggiannini {
    /// Estimator over the pilots of `geometry`; `alpha` weighs the previous
    /// frames' autocorrelation (1 keeps all of it)
    pub fn new(geometry: &FrameGeometry, alpha: f64) -> Self {
        let pilot_starts = geometry
            .pilot_starts()
            .filter(|s| s + LR_SPAN <= geometry.pl_frame_size)
            .collect();
        Self {
            frame_len: geometry.pl_frame_size,
            pilot_starts,
            alpha,
            autocorr: Complex64::default(),
            freq: 0.0,
            z: [Complex64::default(); LR_SPAN],
        }
    }

    /// Frequency estimate in cycles per symbol
    pub fn freq(&self) -> f64 {
        self.freq
    }

    pub fn autocorrelation(&self) -> Complex64 {
        self.autocorr
    }

    pub fn synchronize(&mut self, input: &[Complex64], output: &mut [Complex64]) -> PhyResult<()> {
        check_len("L&R input", self.frame_len, input.len())?;
        check_len("L&R output", self.frame_len, output.len())?;

        let mut r = Complex64::default();
        for &start in &self.pilot_starts {
            for (z, x) in self.z.iter_mut().zip(&input[start..start + LR_SPAN]) {
                *z = remove_pilot(*x);
            }
            for m in 1..=LR_LAGS {
                let lag: Complex64 = (m..LR_SPAN).map(|k| self.z[k] * self.z[k - m].conj()).sum();
                r += lag / (2 * (LR_SPAN - m)) as f64;
            }
        }
        self.autocorr = self.autocorr * self.alpha + r;
        self.freq = self.autocorr.arg() / ((LR_LAGS + 1) as f64 * PI);

        derotate(input, output, self.freq, 0.0);
        Ok(())
    }

    /// Derotate with the last estimate, without updating it
    pub fn derotate(&self, input: &[Complex64], output: &mut [Complex64]) -> PhyResult<()> {
        check_len("L&R output", input.len(), output.len())?;
        derotate(input, output, self.freq, 0.0);
        Ok(())
    }

    pub fn reset(&mut self) {
        self.autocorr = Complex64::default();
        self.freq = 0.0;
    }
}

impl Synchronizer for LuiseReggiannini {
    type Estimate = FineEstimate;

    fn reset(&mut self) {
        LuiseReggiannini::reset(self);
    }

    fn estimate(&self) -> FineEstimate {
        FineEstimate {
            freq: self.freq,
            phase: 0.0,
        }
    }
}
