//! Numerically Controlled Oscillator (NCO)
//!
//! Multiplies the signal by `exp(jφ[n])` with `φ[n+1] = φ[n] + 2π·nu`.
//! The phase is accumulated, so changing the frequency mid-stream never
//! makes the output jump. The frequency is quantized to steps of 10^-6
//! cycles/sample.

use num_complex::Complex64;
use std::f64::consts::TAU;

use crate::traits::Carrier;

const FREQUENCY_STEPS: f64 = 1e6;

/// Numerically Controlled Oscillator
#[derive(Debug, Clone, Default)]
pub struct Nco {
    nu: f64,
    phase: f64,
}

impl Nco {
    /// Create an NCO at normalized frequency `nu`
    pub fn new(nu: f64) -> Self {
        let mut nco = Self::default();
        nco.set_frequency(nu);
        nco
    }

    /// Phase applied to the next sample, wrapped to one turn
    pub fn phase(&self) -> f64 {
        self.phase
    }
}

impl Carrier for Nco {
    #[inline]
    fn step(&mut self, x: Complex64) -> Complex64 {
        let y = x * Complex64::from_polar(1.0, self.phase);
        self.phase = (self.phase + TAU * self.nu).rem_euclid(TAU);
        y
    }

    fn reset(&mut self) {
        self.phase = 0.0;
    }

    fn frequency(&self) -> f64 {
        self.nu
    }

    fn set_frequency(&mut self, nu: f64) {
        self.nu = (nu * FREQUENCY_STEPS).floor() / FREQUENCY_STEPS;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nco_quantization() {
        let nco = Nco::new(1.23456789e-3);
        assert!((nco.frequency() - 1.234e-3).abs() < 1e-12, "nu = {}", nco.frequency());

        // floor, not round, for negative values too
        let neg = Nco::new(-2.5e-7);
        assert!((neg.frequency() + 1e-6).abs() < 1e-15, "nu = {}", neg.frequency());
    }

    #[test]
    fn test_nco_unit_amplitude() {
        let mut nco = Nco::new(0.01);
        for _ in 0..1000 {
            let y = nco.step(Complex64::new(1.0, 0.0));
            assert!((y.norm() - 1.0).abs() < 1e-10, "NCO magnitude: {}", y.norm());
        }
    }

    #[test]
    fn test_nco_rotation_rate() {
        let mut nco = Nco::new(0.125);
        let ys: Vec<Complex64> = (0..9).map(|_| nco.step(Complex64::new(1.0, 0.0))).collect();
        // 1/8 cycle per sample: back to 1 after 8 samples
        assert!((ys[0] - Complex64::new(1.0, 0.0)).norm() < 1e-12);
        assert!((ys[2] - Complex64::new(0.0, 1.0)).norm() < 1e-12);
        assert!((ys[8] - Complex64::new(1.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_nco_frequency_change_is_continuous() {
        let mut nco = Nco::new(0.1);
        for _ in 0..5 {
            nco.step(Complex64::new(1.0, 0.0));
        }
        let before = nco.phase();
        nco.set_frequency(-0.2);
        let y = nco.step(Complex64::new(1.0, 0.0));
        // first sample after the change still carries the accumulated phase
        assert!((y - Complex64::from_polar(1.0, before)).norm() < 1e-12, "{}", y);
        let expected = (before - TAU * 0.2).rem_euclid(TAU);
        assert!((nco.phase() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_nco_phase_stays_wrapped() {
        let mut nco = Nco::new(-0.37);
        for _ in 0..10_000 {
            nco.step(Complex64::new(1.0, 0.0));
            assert!((0.0..=TAU).contains(&nco.phase()), "phase {}", nco.phase());
        }
    }

    #[test]
    fn test_nco_reset() {
        let mut nco = Nco::new(0.01);
        for _ in 0..100 {
            nco.step(Complex64::new(1.0, 0.0));
        }
        nco.reset();
        let y = nco.step(Complex64::new(0.5, 0.5));
        assert_eq!(y, Complex64::new(0.5, 0.5) * Complex64::from_polar(1.0, 0.0));
        assert_eq!(nco.frequency(), 0.01);
    }
}
