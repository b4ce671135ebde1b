//! Symbol timing recovery
//!
//! Gardner loop driving a cubic Farrow interpolator at two samples per
//! symbol. [`TimingSync::synchronize`] produces the interpolated stream
//! with one strobe flag per sample; [`TimingSync::extract`] keeps the
//! strobed samples and hands out exactly one frame of symbols.

mod fast;
mod gardner;
mod ultra;

use num_complex::Complex64;

pub use fast::GardnerFast;
pub use gardner::{loop_coefficients, GardnerLoop, SymbolBuffer};
pub use ultra::GardnerUltra;

use crate::error::{check_len, PhyError, PhyResult};
use crate::params::{SyncConfig, TimingVariant};
use crate::traits::Synchronizer;

/// Oversampling factor the Gardner loop is built for
pub const TIMING_OSF: usize = 2;

/// Snapshot of the timing loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingEstimate {
    pub mu: f64,
    /// Symbols waiting in the output buffer
    pub delay: usize,
    pub overflows: usize,
    pub underflows: usize,
}

#[derive(Debug, Clone)]
enum Kernel {
    Fast(GardnerFast),
    Ultra(GardnerUltra),
}

/// Timing synchronizer for frames of `n_out` symbols
#[derive(Debug, Clone)]
pub struct TimingSync {
    kernel: Kernel,
    buffer: SymbolBuffer,
    n_out: usize,
}

impl TimingSync {
    /// Per-sample variant
    pub fn fast(n_out: usize, damping: f64, bandwidth: f64, detector_gain: f64) -> Self {
        Self {
            kernel: Kernel::Fast(GardnerFast::new(damping, bandwidth, detector_gain)),
            buffer: SymbolBuffer::new(2 * n_out),
            n_out,
        }
    }

    /// Block variant processing `hold_size`-sample windows once active
    pub fn ultra(
        n_out: usize,
        damping: f64,
        bandwidth: f64,
        detector_gain: f64,
        hold_size: usize,
    ) -> Self {
        Self {
            kernel: Kernel::Ultra(GardnerUltra::new(damping, bandwidth, detector_gain, hold_size)),
            buffer: SymbolBuffer::new(2 * n_out),
            n_out,
        }
    }

    /// Build from configuration for frames of `n_out` symbols
    pub fn from_config(n_out: usize, cfg: &SyncConfig) -> PhyResult<Self> {
        if cfg.osf != TIMING_OSF {
            return Err(PhyError::InvalidConfig(format!(
                "Gardner timing needs {} samples per symbol, got {}",
                TIMING_OSF, cfg.osf
            )));
        }
        Ok(match cfg.timing_variant {
            TimingVariant::Fast => Self::fast(
                n_out,
                cfg.timing_damping,
                cfg.timing_bandwidth,
                cfg.timing_detector_gain,
            ),
            TimingVariant::Ultra => Self::ultra(
                n_out,
                cfg.timing_damping,
                cfg.timing_bandwidth,
                cfg.timing_detector_gain,
                cfg.hold_size,
            ),
        })
    }

    pub fn n_in(&self) -> usize {
        TIMING_OSF * self.n_out
    }

    pub fn n_out(&self) -> usize {
        self.n_out
    }

    fn core(&self) -> &GardnerLoop {
        match &self.kernel {
            Kernel::Fast(k) => k.core(),
            Kernel::Ultra(k) => k.core(),
        }
    }

    pub fn set_loop_coefficients(&mut self, damping: f64, bandwidth: f64, detector_gain: f64) {
        let core = match &mut self.kernel {
            Kernel::Fast(k) => k.core_mut(),
            Kernel::Ultra(k) => k.core_mut(),
        };
        core.set_coefficients(damping, bandwidth, detector_gain);
    }

    /// Switch the block variant between windowed and per-sample processing.
    /// No effect on the per-sample variant.
    pub fn set_active(&mut self, active: bool) {
        if let Kernel::Ultra(k) = &mut self.kernel {
            k.set_active(active);
        }
    }

    pub fn mu(&self) -> f64 {
        self.core().mu()
    }

    pub fn last_symbol(&self) -> Complex64 {
        self.core().last_symbol()
    }

    /// Symbols buffered but not yet extracted
    pub fn delay(&self) -> usize {
        self.buffer.len()
    }

    /// One input sample; returns the interpolated sample and its strobe flag
    #[inline]
    pub fn step(&mut self, x: Complex64) -> (Complex64, bool) {
        match &mut self.kernel {
            Kernel::Fast(k) => k.step(x),
            Kernel::Ultra(k) => k.step(x),
        }
    }

    /// Interpolate a block, flagging the strobes
    pub fn synchronize(
        &mut self,
        input: &[Complex64],
        output: &mut [Complex64],
        strobes: &mut [bool],
    ) -> PhyResult<()> {
        check_len("timing output", input.len(), output.len())?;
        check_len("timing strobe flags", input.len(), strobes.len())?;
        match &mut self.kernel {
            Kernel::Fast(k) => k.synchronize(input, output, strobes),
            Kernel::Ultra(k) => k.synchronize(input, output, strobes),
        }
        Ok(())
    }

    /// Buffer the strobed samples and pull one frame of symbols.
    ///
    /// Missing symbols are zero-filled. Returns whether this call underflowed.
    pub fn extract(
        &mut self,
        samples: &[Complex64],
        strobes: &[bool],
        symbols: &mut [Complex64],
    ) -> PhyResult<bool> {
        check_len("timing strobe flags", samples.len(), strobes.len())?;
        check_len("timing symbols", self.n_out, symbols.len())?;
        for (s, _) in samples.iter().zip(strobes).filter(|(_, f)| **f) {
            self.buffer.push(*s);
        }
        let before = self.buffer.underflows();
        for y in symbols.iter_mut() {
            *y = self.buffer.pull();
        }
        Ok(self.buffer.underflows() > before)
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        match &mut self.kernel {
            Kernel::Fast(k) => k.reset(),
            Kernel::Ultra(k) => k.reset(),
        }
    }
}

impl Synchronizer for TimingSync {
    type Estimate = TimingEstimate;

    fn reset(&mut self) {
        TimingSync::reset(self);
    }

    fn estimate(&self) -> TimingEstimate {
        TimingEstimate {
            mu: self.mu(),
            delay: self.delay(),
            overflows: self.buffer.overflows(),
            underflows: self.buffer.underflows(),
        }
    }
}
