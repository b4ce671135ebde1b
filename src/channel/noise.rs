//! Additive White Gaussian Noise generator
//!
//! Uses Box-Muller transform for Gaussian samples.

use num_complex::Complex64;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::f64::consts::PI;

/// Complex AWGN with a given standard deviation per component
#[derive(Debug, Clone)]
pub struct NoiseGenerator {
    std_dev: f64,
    rng: ChaCha8Rng,
    /// Second sample of the last Box-Muller pair
    cached: Option<f64>,
}

impl NoiseGenerator {
    pub fn new(std_dev: f64, seed: u64) -> Self {
        Self {
            std_dev,
            rng: ChaCha8Rng::seed_from_u64(seed),
            cached: None,
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.std_dev
    }

    pub fn set_std_dev(&mut self, std_dev: f64) {
        self.std_dev = std_dev;
    }

    /// Next real Gaussian sample
    pub fn next_sample(&mut self) -> f64 {
        if let Some(cached) = self.cached.take() {
            return cached * self.std_dev;
        }

        let u1: f64 = self.rng.gen();
        let u2: f64 = self.rng.gen();
        // Avoid log(0)
        let u1 = u1.max(1e-300);

        let r = (-2.0 * u1.ln()).sqrt();
        let theta = 2.0 * PI * u2;
        self.cached = Some(r * theta.sin());
        r * theta.cos() * self.std_dev
    }

    /// Next complex sample, independent I and Q
    #[inline]
    pub fn next_complex(&mut self) -> Complex64 {
        let re = self.next_sample();
        Complex64::new(re, self.next_sample())
    }

    /// Add noise to a block in place
    pub fn add_to(&mut self, block: &mut [Complex64]) {
        for x in block.iter_mut() {
            *x += self.next_complex();
        }
    }
}
