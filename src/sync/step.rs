//! Coarse loop, matched filter and Gardner run as one per-sample chain
//!
//! While the coarse PLL is learning it needs the strobe symbols of the
//! timing loop as they are produced, so the three stages cannot be run
//! block after block. Before each frame the pilot position of the next
//! strobe is re-anchored from the frame synchronizer's delay and the
//! symbols still buffered in the timing loop.

use num_complex::Complex64;

use super::coarse::CoarseFreqSync;
use crate::error::{check_len, PhyError, PhyResult};
use crate::params::DvbS2Params;
use crate::pulse_shapes::{MatchedFilter, RootRaisedCosine};
use crate::timing::{TimingSync, TIMING_OSF};
use crate::traits::Synchronizer;

/// Loop state after a frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StepEstimate {
    pub mu: f64,
    /// Coarse frequency removed, cycles per sample
    pub coarse_freq: f64,
    /// Symbols left in the timing buffer
    pub timing_delay: usize,
}

#[derive(Debug, Clone)]
pub struct StepComposite {
    coarse: CoarseFreqSync,
    matched_filter: MatchedFilter<RootRaisedCosine>,
    timing: TimingSync,
    frame_len: usize,
    last_delay: usize,
    samples: Vec<Complex64>,
    filtered: Vec<Complex64>,
    strobes: Vec<bool>,
}

impl StepComposite {
    pub fn new(
        coarse: CoarseFreqSync,
        matched_filter: MatchedFilter<RootRaisedCosine>,
        timing: TimingSync,
    ) -> PhyResult<Self> {
        let frame_len = timing.n_out();
        if coarse.frame_len() != frame_len {
            return Err(PhyError::InvalidGeometry(format!(
                "coarse loop frames of {} symbols, timing frames of {}",
                coarse.frame_len(),
                frame_len
            )));
        }
        let n_in = timing.n_in();
        let last_delay = timing.delay();
        Ok(Self {
            coarse,
            matched_filter,
            timing,
            frame_len,
            last_delay,
            samples: vec![Complex64::default(); n_in],
            filtered: vec![Complex64::default(); n_in],
            strobes: vec![false; n_in],
        })
    }

    /// Chain for a session, coarse loop at its acquisition bandwidth
    pub fn from_params(params: &DvbS2Params) -> PhyResult<Self> {
        let cfg = &params.sync;
        let n = params.geometry.pl_frame_size;
        let coarse = CoarseFreqSync::new(n, TIMING_OSF, cfg.coarse_damping, cfg.coarse_bandwidth);
        let rrc = RootRaisedCosine::new(cfg.osf, cfg.rolloff, cfg.grp_delay);
        let timing = TimingSync::from_config(n, cfg)?;
        Self::new(coarse, MatchedFilter::new(rrc), timing)
    }

    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    /// Input samples per frame
    pub fn n_in(&self) -> usize {
        self.timing.n_in()
    }

    pub fn coarse(&self) -> &CoarseFreqSync {
        &self.coarse
    }

    pub fn coarse_mut(&mut self) -> &mut CoarseFreqSync {
        &mut self.coarse
    }

    pub fn timing(&self) -> &TimingSync {
        &self.timing
    }

    pub fn timing_mut(&mut self) -> &mut TimingSync {
        &mut self.timing
    }

    /// One frame with the coarse loop learning from every strobe.
    ///
    /// `frame_delay` is the PLHEADER position reported by the frame
    /// synchronizer for the previous frame. Returns whether the timing
    /// buffer underflowed.
    pub fn synchronize(
        &mut self,
        input: &[Complex64],
        output: &mut [Complex64],
        frame_delay: usize,
    ) -> PhyResult<bool> {
        check_len("step input", self.n_in(), input.len())?;
        check_len("step output", self.frame_len, output.len())?;

        let n = self.frame_len;
        let anchor = (2 * n - frame_delay % n + self.last_delay) % n;
        self.coarse.set_curr_idx(anchor);
        self.last_delay = self.timing.delay();

        for ((x, y), s) in input
            .iter()
            .zip(self.samples.iter_mut())
            .zip(self.strobes.iter_mut())
        {
            let derotated = self.coarse.step(*x);
            let filtered = self.matched_filter.step(derotated);
            let (interp, strobe) = self.timing.step(filtered);
            if strobe {
                self.coarse.update_phase(self.timing.last_symbol());
            }
            *y = interp;
            *s = strobe;
        }
        self.timing.extract(&self.samples, &self.strobes, output)
    }

    /// One frame stage after stage with the coarse loop only derotating.
    /// Returns whether the timing buffer underflowed.
    pub fn synchronize_blocks(
        &mut self,
        input: &[Complex64],
        output: &mut [Complex64],
    ) -> PhyResult<bool> {
        check_len("step input", self.n_in(), input.len())?;
        check_len("step output", self.frame_len, output.len())?;

        self.coarse.synchronize(input, &mut self.samples)?;
        self.matched_filter.filter(&self.samples, &mut self.filtered)?;
        self.timing
            .synchronize(&self.filtered, &mut self.samples, &mut self.strobes)?;
        self.timing.extract(&self.samples, &self.strobes, output)
    }

    pub fn reset(&mut self) {
        self.coarse.reset();
        self.matched_filter.reset();
        self.timing.reset();
        self.last_delay = self.timing.delay();
    }
}

impl Synchronizer for StepComposite {
    type Estimate = StepEstimate;

    fn reset(&mut self) {
        StepComposite::reset(self);
    }

    fn estimate(&self) -> StepEstimate {
        StepEstimate {
            mu: self.timing.mu(),
            coarse_freq: self.coarse.estimated_freq(),
            timing_delay: self.timing.delay(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::SyncConfig;

    fn impulse_frames(step: &StepComposite, frames: usize) -> Vec<Complex64> {
        (0..frames * step.n_in())
            .map(|i| Complex64::from_polar(1.0, 0.3 * i as f64))
            .collect()
    }

    #[test]
    fn test_from_params_sizes() {
        let params = DvbS2Params::new("QPSK-S_8/9").unwrap();
        let step = StepComposite::from_params(&params).unwrap();
        assert_eq!(step.frame_len(), 8370);
        assert_eq!(step.n_in(), 16740);
        assert_eq!(step.coarse().curr_idx(), 8369);
    }

    #[test]
    fn test_mismatched_parts_rejected() {
        let cfg = SyncConfig::default();
        let coarse = CoarseFreqSync::new(100, 2, cfg.coarse_damping, cfg.coarse_bandwidth);
        let timing = TimingSync::from_config(200, &cfg).unwrap();
        let mf = MatchedFilter::new(RootRaisedCosine::default_for_sps(2));
        assert!(StepComposite::new(coarse, mf, timing).is_err());
    }

    #[test]
    fn test_anchor_from_frame_delay() {
        let params = DvbS2Params::new("").unwrap();
        let mut step = StepComposite::from_params(&params).unwrap();
        let input = impulse_frames(&step, 1);
        let mut out = vec![Complex64::default(); step.frame_len()];
        step.synchronize(&input, &mut out, 1000).unwrap();
        // anchored at 8370 - 1000, then one index per strobe
        let strobes = step.strobes.iter().filter(|s| **s).count();
        assert_eq!(step.coarse().curr_idx(), (7370 + strobes) % 8370);
    }

    #[test]
    fn test_blocks_match_per_sample_with_frozen_loop() {
        let params = DvbS2Params::new("").unwrap();
        let mut a = StepComposite::from_params(&params).unwrap();
        let mut b = a.clone();
        a.coarse_mut().set_estimated_freq(3e-4);
        b.coarse_mut().set_estimated_freq(3e-4);
        a.coarse_mut().disable_update();

        let input = impulse_frames(&a, 2);
        let mut oa = vec![Complex64::default(); a.frame_len()];
        let mut ob = vec![Complex64::default(); b.frame_len()];
        for frame in input.chunks_exact(a.n_in()) {
            a.synchronize(frame, &mut oa, 0).unwrap();
            b.synchronize_blocks(frame, &mut ob).unwrap();
            assert_eq!(oa, ob);
        }
        assert_eq!(a.estimate(), b.estimate());
    }

    #[test]
    fn test_reset() {
        let params = DvbS2Params::new("").unwrap();
        let mut step = StepComposite::from_params(&params).unwrap();
        let input = impulse_frames(&step, 1);
        let mut out = vec![Complex64::default(); step.frame_len()];
        step.synchronize(&input, &mut out, 0).unwrap();
        Synchronizer::reset(&mut step);
        assert_eq!(step.estimate(), StepEstimate::default());
        assert!(step.synchronize(&input[1..], &mut out, 0).is_err());
    }
}
