//! Block Gardner synchronizer
//!
//! Once active, input is taken in windows of `hold_size` samples. The Farrow
//! branch outputs of a window do not depend on `mu`, so they are computed in
//! one pass; the loop then walks the window applying the current `mu` to
//! each branch triple. Until activated it steps sample by sample.

use num_complex::Complex64;

use super::gardner::GardnerLoop;
use crate::filters::{farrow_branches, horner, FarrowFilter};

#[derive(Debug, Clone)]
pub struct GardnerUltra {
    farrow: FarrowFilter,
    core: GardnerLoop,
    hold_size: usize,
    active: bool,
    branches: Vec<[Complex64; 3]>,
}

impl GardnerUltra {
    pub fn new(damping: f64, bandwidth: f64, detector_gain: f64, hold_size: usize) -> Self {
        let hold_size = hold_size.max(1);
        Self {
            farrow: FarrowFilter::new(),
            core: GardnerLoop::new(damping, bandwidth, detector_gain),
            hold_size,
            active: false,
            branches: vec![[Complex64::default(); 3]; hold_size],
        }
    }

    pub fn hold_size(&self) -> usize {
        self.hold_size
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    #[inline]
    pub fn step(&mut self, x: Complex64) -> (Complex64, bool) {
        self.farrow.push(x);
        let y = horner(&farrow_branches(self.farrow.line()), self.core.mu());
        let strobe = self.core.advance(y);
        (y, strobe)
    }

    pub fn synchronize(&mut self, input: &[Complex64], output: &mut [Complex64], strobes: &mut [bool]) {
        if !self.active {
            for ((x, y), s) in input.iter().zip(output.iter_mut()).zip(strobes.iter_mut()) {
                (*y, *s) = self.step(*x);
            }
            return;
        }

        let windows = input
            .chunks(self.hold_size)
            .zip(output.chunks_mut(self.hold_size))
            .zip(strobes.chunks_mut(self.hold_size));
        for ((x, y), s) in windows {
            let branches = &mut self.branches[..x.len()];
            self.farrow.branches(x, branches);
            for ((c, y), s) in branches.iter().zip(y.iter_mut()).zip(s.iter_mut()) {
                *y = horner(c, self.core.mu());
                *s = self.core.advance(*y);
            }
        }
    }

    pub fn core(&self) -> &GardnerLoop {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut GardnerLoop {
        &mut self.core
    }

    /// Clears loop state; the activation flag is left as is
    pub fn reset(&mut self) {
        self.farrow.reset();
        self.core.reset();
    }
}
