//! Pilot-aided fine frequency and phase estimation
//!
//! Works on a descrambled PL frame that starts on its PLHEADER. Each pilot
//! block gives one phase measurement; the unwrapped measurements are fitted
//! with a straight line whose slope is the residual frequency (cycles per
//! symbol) and whose intercept is the phase (cycles) at the first symbol.

use num_complex::Complex64;
use std::f64::consts::{PI, TAU};

use super::lr::LuiseReggiannini;
use crate::error::{check_len, PhyResult};
use crate::params::{FineSyncVariant, FrameGeometry, SyncConfig};
use crate::traits::Synchronizer;
use crate::utils::{derotate, normalize_angle, ols_fit};

/// Frequency (cycles per symbol) and phase (cycles) of a fine estimator
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FineEstimate {
    pub freq: f64,
    pub phase: f64,
}

/// `x·conj(1+j)`, the pilot symbol without its √2 scaling
#[inline]
pub(crate) fn remove_pilot(x: Complex64) -> Complex64 {
    Complex64::new(x.re + x.im, x.im - x.re)
}

/// Least-squares fit over the pilot blocks of a frame
#[derive(Debug, Clone)]
pub struct PilotFreqPhase {
    frame_len: usize,
    pilot_size: usize,
    pilot_starts: Vec<usize>,
    phases: Vec<f64>,
    t: Vec<f64>,
    y: Vec<f64>,
    estimate: FineEstimate,
}

impl PilotFreqPhase {
    pub fn new(geometry: &FrameGeometry) -> Self {
        let pilot_starts: Vec<usize> = geometry
            .pilot_starts()
            .filter(|s| s + geometry.pilot_size <= geometry.pl_frame_size)
            .collect();
        let p = pilot_starts.len();
        Self {
            frame_len: geometry.pl_frame_size,
            pilot_size: geometry.pilot_size,
            pilot_starts,
            phases: vec![0.0; p],
            t: vec![0.0; p],
            y: vec![0.0; p],
            estimate: FineEstimate::default(),
        }
    }

    pub fn pilot_starts(&self) -> &[usize] {
        &self.pilot_starts
    }

    /// Estimate from `input`, then derotate it into `output`
    pub fn synchronize(&mut self, input: &[Complex64], output: &mut [Complex64]) -> PhyResult<()> {
        check_len("fine sync input", self.frame_len, input.len())?;
        check_len("fine sync output", self.frame_len, output.len())?;
        self.estimate_frame(input);
        self.derotate(input, output)
    }

    /// Derotate with the last estimate, without updating it
    pub fn derotate(&self, input: &[Complex64], output: &mut [Complex64]) -> PhyResult<()> {
        check_len("fine sync output", input.len(), output.len())?;
        derotate(input, output, self.estimate.freq, self.estimate.phase);
        Ok(())
    }

    fn estimate_frame(&mut self, frame: &[Complex64]) {
        if self.pilot_starts.is_empty() {
            return;
        }
        for (phase, &start) in self.phases.iter_mut().zip(&self.pilot_starts) {
            let acc: Complex64 = frame[start..start + self.pilot_size]
                .iter()
                .map(|x| remove_pilot(*x))
                .sum();
            *phase = normalize_angle(acc.im.atan2(acc.re));
        }

        // Unwrap in whole cycles whenever consecutive blocks jump by more than π
        let half = (self.pilot_size / 2) as f64;
        let mut cycles = 0.0;
        for p in 0..self.phases.len() {
            if p > 0 {
                let diff = self.phases[p] - self.phases[p - 1];
                if diff.abs() > PI {
                    cycles += if diff > 0.0 {
                        (diff / TAU + 0.5).floor()
                    } else {
                        (diff / TAU - 0.5).ceil()
                    };
                }
            }
            self.y[p] = self.phases[p] / TAU - cycles;
            self.t[p] = self.pilot_starts[p] as f64 + half;
        }

        if let Some((freq, phase)) = ols_fit(&self.t, &self.y) {
            self.estimate = FineEstimate { freq, phase };
        }
    }

    pub fn reset(&mut self) {
        self.estimate = FineEstimate::default();
    }
}

impl Synchronizer for PilotFreqPhase {
    type Estimate = FineEstimate;

    fn reset(&mut self) {
        PilotFreqPhase::reset(self);
    }

    fn estimate(&self) -> FineEstimate {
        self.estimate
    }
}

// ============================================================================
// Fine estimator family
// ============================================================================

/// One stage of the fine carrier chain
#[derive(Debug, Clone)]
pub enum FineSync {
    LuiseReggiannini(LuiseReggiannini),
    PilotPhase(PilotFreqPhase),
}

impl FineSync {
    pub fn new(variant: FineSyncVariant, geometry: &FrameGeometry, cfg: &SyncConfig) -> Self {
        match variant {
            FineSyncVariant::LuiseReggiannini => {
                FineSync::LuiseReggiannini(LuiseReggiannini::new(geometry, cfg.lr_alpha))
            }
            FineSyncVariant::PilotPhase => FineSync::PilotPhase(PilotFreqPhase::new(geometry)),
        }
    }

    /// Build the configured chain, in order
    pub fn chain(geometry: &FrameGeometry, cfg: &SyncConfig) -> Vec<FineSync> {
        cfg.fine_chain
            .iter()
            .map(|v| FineSync::new(*v, geometry, cfg))
            .collect()
    }

    pub fn variant(&self) -> FineSyncVariant {
        match self {
            FineSync::LuiseReggiannini(_) => FineSyncVariant::LuiseReggiannini,
            FineSync::PilotPhase(_) => FineSyncVariant::PilotPhase,
        }
    }

    /// Estimate and derotate when `update` is set, otherwise derotate with
    /// the last estimate
    pub fn process(
        &mut self,
        input: &[Complex64],
        output: &mut [Complex64],
        update: bool,
    ) -> PhyResult<()> {
        match (self, update) {
            (FineSync::LuiseReggiannini(s), true) => s.synchronize(input, output),
            (FineSync::LuiseReggiannini(s), false) => s.derotate(input, output),
            (FineSync::PilotPhase(s), true) => s.synchronize(input, output),
            (FineSync::PilotPhase(s), false) => s.derotate(input, output),
        }
    }
}

impl Synchronizer for FineSync {
    type Estimate = FineEstimate;

    fn reset(&mut self) {
        match self {
            FineSync::LuiseReggiannini(s) => s.reset(),
            FineSync::PilotPhase(s) => s.reset(),
        }
    }

    fn estimate(&self) -> FineEstimate {
        match self {
            FineSync::LuiseReggiannini(s) => s.estimate(),
            FineSync::PilotPhase(s) => s.estimate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framer::{Framer, PILOT_SYMBOL};
    use crate::params::Modcod;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

    fn rotated_frame(modcod: Modcod, freq: f64, phase: f64) -> (FrameGeometry, Vec<Complex64>) {
        let geometry = FrameGeometry::new(modcod).unwrap();
        let framer = Framer::new(modcod, geometry);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let xfec: Vec<Complex64> = (0..geometry.xfec_frame_size)
            .map(|_| Complex64::from_polar(1.0, FRAC_PI_4 + FRAC_PI_2 * rng.gen_range(0..4) as f64))
            .collect();
        let mut frame = framer.generate_vec(&xfec).unwrap();
        for (n, x) in frame.iter_mut().enumerate() {
            *x *= Complex64::from_polar(1.0, TAU * (freq * n as f64 + phase));
        }
        (geometry, frame)
    }

    #[test]
    fn test_pilot_starts_fit_in_frame() {
        for modcod in Modcod::ALL {
            let geometry = FrameGeometry::new(modcod).unwrap();
            let sync = PilotFreqPhase::new(&geometry);
            assert_eq!(sync.pilot_starts().len(), geometry.n_pilots, "{}", modcod);
        }
    }

    #[test]
    fn test_estimates_small_offset() {
        let (geometry, frame) = rotated_frame(Modcod::Qpsk8_9, 1e-5, 0.1);
        let mut sync = PilotFreqPhase::new(&geometry);
        let mut out = vec![Complex64::default(); frame.len()];
        sync.synchronize(&frame, &mut out).unwrap();
        let est = sync.estimate();
        assert!((est.freq - 1e-5).abs() < 1e-9, "freq {}", est.freq);
        assert!((est.phase - 0.1).abs() < 1e-4, "phase {}", est.phase);
        for &start in sync.pilot_starts() {
            for y in &out[start..start + 36] {
                assert!((y - PILOT_SYMBOL).norm() < 1e-3, "pilot at {}: {}", start, y);
            }
        }
    }

    #[test]
    fn test_unwraps_across_cycles() {
        // 0.295 cycles between pilot blocks, wrapping once over the frame
        let (geometry, frame) = rotated_frame(Modcod::Qpsk8_9, 2e-4, 0.0);
        let mut sync = PilotFreqPhase::new(&geometry);
        let mut out = vec![Complex64::default(); frame.len()];
        sync.synchronize(&frame, &mut out).unwrap();
        let est = sync.estimate();
        assert!((est.freq - 2e-4).abs() < 1e-9, "freq {}", est.freq);
        assert!(est.phase.abs() < 1e-3, "phase {}", est.phase);
    }

    #[test]
    fn test_two_pilot_frame() {
        let (geometry, frame) = rotated_frame(Modcod::Apsk16_8_9, -3e-5, 0.3);
        let mut sync = PilotFreqPhase::new(&geometry);
        let mut out = vec![Complex64::default(); frame.len()];
        sync.synchronize(&frame, &mut out).unwrap();
        let est = sync.estimate();
        assert!((est.freq + 3e-5).abs() < 1e-9, "freq {}", est.freq);
        assert!((est.phase - 0.3).abs() < 1e-4, "phase {}", est.phase);
    }

    #[test]
    fn test_hold_keeps_last_estimate() {
        let (geometry, frame) = rotated_frame(Modcod::Qpsk8_9, 1e-5, 0.0);
        let cfg = SyncConfig::default();
        let mut stage = FineSync::new(FineSyncVariant::PilotPhase, &geometry, &cfg);
        let mut out = vec![Complex64::default(); frame.len()];
        stage.process(&frame, &mut out, true).unwrap();
        let first = stage.estimate();

        let (_, other) = rotated_frame(Modcod::Qpsk8_9, 5e-5, 0.0);
        stage.process(&other, &mut out, false).unwrap();
        assert_eq!(stage.estimate(), first);

        stage.reset();
        assert_eq!(stage.estimate(), FineEstimate::default());
        assert!(stage.process(&frame[1..], &mut out[1..], true).is_err());
    }

    #[test]
    fn test_chain_follows_config() {
        let geometry = FrameGeometry::new(Modcod::Qpsk8_9).unwrap();
        let chain = FineSync::chain(&geometry, &SyncConfig::default());
        let variants: Vec<FineSyncVariant> = chain.iter().map(|s| s.variant()).collect();
        assert_eq!(
            variants,
            vec![FineSyncVariant::LuiseReggiannini, FineSyncVariant::PilotPhase]
        );
    }
}
