//! Moment-based (M2M4) signal-to-noise estimation
//!
//! Blind estimate from the second and fourth moments of the payload symbols,
//! valid for constant-modulus constellations and still usable for APSK.

use num_complex::Complex64;

use crate::params::Modcod;
use crate::utils::{esn0_to_ebn0, esn0_to_sigma, power_to_db};

/// Reported when the noise term vanishes
pub const ESN0_CEILING_DB: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NoiseEstimate {
    /// Noise standard deviation per component
    pub sigma: f64,
    pub esn0_db: f64,
    pub ebn0_db: f64,
}

#[derive(Debug, Clone)]
pub struct EsN0Estimator {
    code_rate: f64,
    bits_per_symbol: usize,
    last: NoiseEstimate,
}

impl EsN0Estimator {
    pub fn new(code_rate: f64, bits_per_symbol: usize) -> Self {
        Self {
            code_rate,
            bits_per_symbol,
            last: NoiseEstimate::default(),
        }
    }

    pub fn for_modcod(modcod: Modcod) -> Self {
        Self::new(modcod.code_rate(), modcod.modulation().bits_per_symbol())
    }

    pub fn last(&self) -> NoiseEstimate {
        self.last
    }

    pub fn estimate(&mut self, symbols: &[Complex64]) -> NoiseEstimate {
        if symbols.is_empty() {
            return self.last;
        }
        let n = symbols.len() as f64;
        let (m2, m4) = symbols.iter().fold((0.0, 0.0), |(m2, m4), x| {
            let p = x.norm_sqr();
            (m2 + p, m4 + p * p)
        });
        let (m2, m4) = (m2 / n, m4 / n);

        let signal = (2.0 * m2 * m2 - m4).abs().sqrt();
        let noise = (m2 - signal).abs();
        let mut esn0_db = power_to_db(signal / noise);
        if !esn0_db.is_finite() {
            esn0_db = ESN0_CEILING_DB;
        }

        self.last = NoiseEstimate {
            sigma: esn0_to_sigma(esn0_db),
            esn0_db,
            ebn0_db: esn0_to_ebn0(esn0_db, self.code_rate, self.bits_per_symbol),
        };
        self.last
    }
}
