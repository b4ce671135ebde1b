//! Simulated link for tests and benchmarks
//!
//! Applies, in order: a fractional sample delay, a carrier frequency and
//! phase offset, and AWGN. Noise is specified as Es/N0 at the matched
//! filter output, i.e. per-component `sigma = sqrt(1 / (2·Es/N0))` on each
//! sample of a unit-energy shaped signal.

mod noise;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

pub use noise::NoiseGenerator;

use crate::error::{check_len, PhyError, PhyResult};
use crate::filters::{FarrowFilter, VariableDelay};
use crate::utils::esn0_to_sigma;

/// Channel impairments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// `None` disables the noise
    pub esn0_db: Option<f64>,
    /// Carrier offset, cycles per sample
    pub freq_offset: f64,
    /// Initial carrier phase, radians
    pub phase: f64,
    /// Delay in samples, at least one
    pub delay: f64,
    pub seed: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            esn0_db: None,
            freq_offset: 0.0,
            phase: 0.0,
            delay: 1.0,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Channel {
    noise: Option<NoiseGenerator>,
    freq_offset: f64,
    phase: f64,
    delay_line: VariableDelay,
    farrow: FarrowFilter,
}

impl Channel {
    pub fn new(cfg: &ChannelConfig) -> PhyResult<Self> {
        if !(cfg.delay >= 1.0 && cfg.delay.is_finite()) {
            return Err(PhyError::InvalidConfig(format!(
                "channel delay must be at least one sample, got {}",
                cfg.delay
            )));
        }
        // The interpolator contributes 2 - mu samples
        let whole = cfg.delay.floor();
        let frac = cfg.delay - whole;
        let extra = whole as usize - 1;
        let mut delay_line = VariableDelay::new(extra);
        delay_line.set_delay(extra);
        let mut farrow = FarrowFilter::new();
        farrow.set_mu(1.0 - frac);

        Ok(Self {
            noise: cfg
                .esn0_db
                .map(|esn0| NoiseGenerator::new(esn0_to_sigma(esn0), cfg.seed)),
            freq_offset: cfg.freq_offset,
            phase: cfg.phase,
            delay_line,
            farrow,
        })
    }

    pub fn freq_offset(&self) -> f64 {
        self.freq_offset
    }

    pub fn set_freq_offset(&mut self, freq_offset: f64) {
        self.freq_offset = freq_offset;
    }

    pub fn apply(&mut self, input: &[Complex64], output: &mut [Complex64]) -> PhyResult<()> {
        check_len("channel output", input.len(), output.len())?;
        for (x, y) in input.iter().zip(output.iter_mut()) {
            let delayed = self.farrow.step(self.delay_line.step(*x));
            *y = delayed * Complex64::from_polar(1.0, self.phase);
            self.phase = (self.phase + TAU * self.freq_offset).rem_euclid(TAU);
        }
        if let Some(noise) = &mut self.noise {
            noise.add_to(output);
        }
        Ok(())
    }
}
