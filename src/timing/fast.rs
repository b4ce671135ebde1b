//! Per-sample Gardner synchronizer

use num_complex::Complex64;

use super::gardner::GardnerLoop;
use crate::filters::{farrow_branches, horner, FarrowFilter};

/// Farrow interpolator and Gardner loop stepped one sample at a time
#[derive(Debug, Clone)]
pub struct GardnerFast {
    farrow: FarrowFilter,
    core: GardnerLoop,
}

impl GardnerFast {
    pub fn new(damping: f64, bandwidth: f64, detector_gain: f64) -> Self {
        Self {
            farrow: FarrowFilter::new(),
            core: GardnerLoop::new(damping, bandwidth, detector_gain),
        }
    }

    /// Interpolate one sample; returns it with its strobe flag
    #[inline]
    pub fn step(&mut self, x: Complex64) -> (Complex64, bool) {
        self.farrow.push(x);
        let y = horner(&farrow_branches(self.farrow.line()), self.core.mu());
        let strobe = self.core.advance(y);
        (y, strobe)
    }

    pub fn synchronize(&mut self, input: &[Complex64], output: &mut [Complex64], strobes: &mut [bool]) {
        for ((x, y), s) in input.iter().zip(output.iter_mut()).zip(strobes.iter_mut()) {
            (*y, *s) = self.step(*x);
        }
    }

    pub fn core(&self) -> &GardnerLoop {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut GardnerLoop {
        &mut self.core
    }

    pub fn reset(&mut self) {
        self.farrow.reset();
        self.core.reset();
    }
}
