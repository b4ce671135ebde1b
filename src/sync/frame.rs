//! PL frame synchronizer
//!
//! Correlates the symbol differentials `x[i-1]·conj(x[i])` against the
//! differential PLHEADER (SOF part `S`, PLSC part `P`). The metric
//! `max(|S+P|, |S-P|)` does not depend on the carrier phase nor on the
//! MODCOD bit that flips the PLSC. Metrics are smoothed per sample position
//! across frames, the peak gives the frame start, and the input is delayed
//! so the output frame begins on a PLHEADER.
//!
//! Two detectors compute the same metric: a sliding correlator and a
//! whole-frame FFT correlation.

use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use std::fmt;
use std::sync::Arc;

use crate::error::{check_len, PhyError, PhyResult};
use crate::filters::VariableDelay;
use crate::params::{FrameSyncVariant, SyncConfig};
use crate::tables::{FRAME_SYNC_REFERENCE, FRAME_SYNC_SOF_LEN};
use crate::traits::Synchronizer;

/// Number of differentials spanned by the PLHEADER
pub const SOF_PLSC_LEN: usize = FRAME_SYNC_REFERENCE.len();

/// Outcome of one frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameSyncResult {
    /// Position of the PLHEADER in the input frame
    pub delay: usize,
    /// Smoothed correlation peak
    pub metric: f64,
    /// Peak above the trigger
    pub detected: bool,
}

fn reference() -> [Complex64; SOF_PLSC_LEN] {
    let mut r = [Complex64::default(); SOF_PLSC_LEN];
    for (c, v) in r.iter_mut().zip(FRAME_SYNC_REFERENCE.iter()) {
        *c = Complex64::new(0.0, *v as f64);
    }
    r
}

#[inline]
fn metric(s: Complex64, p: Complex64) -> f64 {
    (s + p).norm().max((s - p).norm())
}

// ============================================================================
// Detectors
// ============================================================================

/// Sliding correlator over a doubled ring of differentials
#[derive(Debug, Clone)]
pub struct Correlator {
    reference: [Complex64; SOF_PLSC_LEN],
    buf: Vec<Complex64>,
    head: usize,
}

impl Default for Correlator {
    fn default() -> Self {
        Self::new()
    }
}

impl Correlator {
    pub fn new() -> Self {
        Self {
            reference: reference(),
            buf: vec![Complex64::default(); 2 * SOF_PLSC_LEN],
            head: 0,
        }
    }

    /// Push one differential and return the metric of the last 89
    #[inline]
    pub fn step(&mut self, diff: Complex64) -> f64 {
        self.buf[self.head] = diff;
        self.buf[self.head + SOF_PLSC_LEN] = diff;
        let window = &self.buf[self.head + 1..self.head + 1 + SOF_PLSC_LEN];
        let (sof, plsc) = window.split_at(FRAME_SYNC_SOF_LEN);
        let (rs, rp) = self.reference.split_at(FRAME_SYNC_SOF_LEN);
        let s: Complex64 = sof.iter().zip(rs).map(|(d, r)| d * r).sum();
        let p: Complex64 = plsc.iter().zip(rp).map(|(d, r)| d * r).sum();
        self.head = (self.head + 1) % SOF_PLSC_LEN;
        metric(s, p)
    }

    fn correlate(&mut self, diffs: &[Complex64], metrics: &mut [f64]) {
        for (d, m) in diffs.iter().zip(metrics.iter_mut()) {
            *m = self.step(*d);
        }
    }

    fn reset(&mut self) {
        self.buf.fill(Complex64::default());
        self.head = 0;
    }
}

/// FFT correlation of one frame of differentials, plus the 88 carried over
/// from the previous frame
#[derive(Clone)]
pub struct FftCorrelator {
    size: usize,
    fft_forward: Arc<dyn Fft<f64>>,
    fft_inverse: Arc<dyn Fft<f64>>,
    /// Spectra of the time-reversed SOF and PLSC references
    sof_spectrum: Vec<Complex64>,
    plsc_spectrum: Vec<Complex64>,
    carry: Vec<Complex64>,
    work_sof: Vec<Complex64>,
    work_plsc: Vec<Complex64>,
    scratch: Vec<Complex64>,
}

impl fmt::Debug for FftCorrelator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FftCorrelator")
            .field("size", &self.size)
            .finish()
    }
}

impl FftCorrelator {
    /// Correlator for frames of `n` differentials
    pub fn new(n: usize) -> Self {
        let size = (n + 2 * (SOF_PLSC_LEN - 1)).next_power_of_two();
        let mut planner = FftPlanner::new();
        let fft_forward = planner.plan_fft_forward(size);
        let fft_inverse = planner.plan_fft_inverse(size);
        let scratch_len = fft_forward
            .get_inplace_scratch_len()
            .max(fft_inverse.get_inplace_scratch_len());

        let r = reference();
        let mut sof_spectrum = vec![Complex64::default(); size];
        let mut plsc_spectrum = vec![Complex64::default(); size];
        for (k, c) in r.iter().enumerate() {
            let tap = SOF_PLSC_LEN - 1 - k;
            if k < FRAME_SYNC_SOF_LEN {
                sof_spectrum[tap] = *c;
            } else {
                plsc_spectrum[tap] = *c;
            }
        }
        let mut scratch = vec![Complex64::default(); scratch_len];
        fft_forward.process_with_scratch(&mut sof_spectrum, &mut scratch);
        fft_forward.process_with_scratch(&mut plsc_spectrum, &mut scratch);

        Self {
            size,
            fft_forward,
            fft_inverse,
            sof_spectrum,
            plsc_spectrum,
            carry: vec![Complex64::default(); SOF_PLSC_LEN - 1],
            work_sof: vec![Complex64::default(); size],
            work_plsc: vec![Complex64::default(); size],
            scratch,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    fn correlate(&mut self, diffs: &[Complex64], metrics: &mut [f64]) {
        let tail = self.carry.len();
        let n = diffs.len();

        self.work_sof.fill(Complex64::default());
        self.work_sof[..tail].copy_from_slice(&self.carry);
        self.work_sof[tail..tail + n].copy_from_slice(diffs);
        self.fft_forward
            .process_with_scratch(&mut self.work_sof, &mut self.scratch);

        for ((s, p), (hs, hp)) in self
            .work_sof
            .iter_mut()
            .zip(self.work_plsc.iter_mut())
            .zip(self.sof_spectrum.iter().zip(self.plsc_spectrum.iter()))
        {
            *p = *s * hp;
            *s *= hs;
        }
        self.fft_inverse
            .process_with_scratch(&mut self.work_sof, &mut self.scratch);
        self.fft_inverse
            .process_with_scratch(&mut self.work_plsc, &mut self.scratch);

        // Full overlap for output i sits at index i + 88 of the convolution
        let scale = 1.0 / self.size as f64;
        for (i, m) in metrics.iter_mut().enumerate().take(n) {
            *m = metric(self.work_sof[i + tail] * scale, self.work_plsc[i + tail] * scale);
        }

        if n >= tail {
            self.carry.copy_from_slice(&diffs[n - tail..]);
        } else {
            self.carry.rotate_left(n);
            self.carry[tail - n..].copy_from_slice(diffs);
        }
    }

    fn reset(&mut self) {
        self.carry.fill(Complex64::default());
    }
}

#[derive(Debug, Clone)]
enum Detector {
    Correlator(Correlator),
    Fft(FftCorrelator),
}

// ============================================================================
// Frame synchronizer
// ============================================================================

/// Frame synchronizer for frames of `n` symbols
#[derive(Debug, Clone)]
pub struct FrameSync {
    detector: Detector,
    n: usize,
    alpha: f64,
    trigger: f64,
    /// Last symbol of the previous frame
    reg_channel: Complex64,
    diffs: Vec<Complex64>,
    metrics: Vec<f64>,
    corr: Vec<f64>,
    output_delay: VariableDelay,
    last: FrameSyncResult,
}

impl FrameSync {
    pub fn new(variant: FrameSyncVariant, n: usize, alpha: f64, trigger: f64) -> PhyResult<Self> {
        if n < SOF_PLSC_LEN {
            return Err(PhyError::InvalidGeometry(format!(
                "frame of {} symbols is shorter than the PLHEADER differential ({})",
                n, SOF_PLSC_LEN
            )));
        }
        let detector = match variant {
            FrameSyncVariant::Correlator => Detector::Correlator(Correlator::new()),
            FrameSyncVariant::Fft => Detector::Fft(FftCorrelator::new(n)),
        };
        Ok(Self {
            detector,
            n,
            alpha,
            trigger,
            reg_channel: Complex64::new(1.0, 0.0),
            diffs: vec![Complex64::default(); n],
            metrics: vec![0.0; n],
            corr: vec![0.0; n],
            output_delay: VariableDelay::new(n),
            last: FrameSyncResult::default(),
        })
    }

    pub fn from_config(n: usize, cfg: &SyncConfig) -> PhyResult<Self> {
        Self::new(cfg.frame_variant, n, cfg.frame_alpha, cfg.frame_trigger)
    }

    pub fn frame_len(&self) -> usize {
        self.n
    }

    pub fn delay(&self) -> usize {
        self.last.delay
    }

    pub fn metric(&self) -> f64 {
        self.last.metric
    }

    pub fn packet_flag(&self) -> bool {
        self.last.detected
    }

    /// Smoothed correlation for every sample position of the frame
    pub fn correlation(&self) -> &[f64] {
        &self.corr
    }

    /// Locate the PLHEADER in `input` and write the realigned frame
    pub fn synchronize(
        &mut self,
        input: &[Complex64],
        output: &mut [Complex64],
    ) -> PhyResult<FrameSyncResult> {
        check_len("frame sync input", self.n, input.len())?;
        check_len("frame sync output", self.n, output.len())?;

        let mut prev = self.reg_channel;
        for (d, x) in self.diffs.iter_mut().zip(input) {
            *d = prev * x.conj();
            prev = *x;
        }
        self.reg_channel = prev;

        match &mut self.detector {
            Detector::Correlator(c) => c.correlate(&self.diffs, &mut self.metrics),
            Detector::Fft(f) => f.correlate(&self.diffs, &mut self.metrics),
        }

        let mut max_corr = f64::MIN;
        let mut max_idx = 0;
        for (i, (c, m)) in self.corr.iter_mut().zip(&self.metrics).enumerate() {
            *c = *c * self.alpha + (1.0 - self.alpha) * m;
            if *c > max_corr {
                max_corr = *c;
                max_idx = i;
            }
        }

        let delay = (self.n + max_idx - SOF_PLSC_LEN) % self.n;
        self.output_delay.set_delay((self.n - delay) % self.n);
        self.output_delay.filter(input, output);

        self.last = FrameSyncResult {
            delay,
            metric: max_corr,
            detected: max_corr > self.trigger,
        };
        Ok(self.last)
    }

    pub fn reset(&mut self) {
        match &mut self.detector {
            Detector::Correlator(c) => c.reset(),
            Detector::Fft(f) => f.reset(),
        }
        self.reg_channel = Complex64::new(1.0, 0.0);
        self.corr.fill(0.0);
        self.output_delay.reset();
        self.last = FrameSyncResult::default();
    }
}

impl Synchronizer for FrameSync {
    type Estimate = FrameSyncResult;

    fn reset(&mut self) {
        FrameSync::reset(self);
    }

    fn estimate(&self) -> FrameSyncResult {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framer::Framer;
    use crate::params::{FrameGeometry, Modcod, PLHEADER_SIZE};
    use crate::scrambler::PlScrambler;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

    fn qpsk(rng: &mut ChaCha8Rng) -> Complex64 {
        Complex64::from_polar(1.0, FRAC_PI_4 + FRAC_PI_2 * rng.gen_range(0..4) as f64)
    }

    /// Continuous stream of PL frames, `offset` symbols late
    fn stream(modcod: Modcod, frames: usize, offset: usize, seed: u64) -> (Framer, Vec<Complex64>) {
        let geometry = FrameGeometry::new(modcod).unwrap();
        let framer = Framer::new(modcod, geometry);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut out: Vec<Complex64> = (0..offset).map(|_| qpsk(&mut rng)).collect();
        for _ in 0..frames {
            let xfec: Vec<Complex64> = (0..geometry.xfec_frame_size).map(|_| qpsk(&mut rng)).collect();
            let mut pl = framer.generate_vec(&xfec).unwrap();
            PlScrambler::new().scramble(&mut pl, PLHEADER_SIZE).unwrap();
            out.extend(pl);
        }
        (framer, out)
    }

    #[test]
    fn test_header_metric_is_57() {
        for modcod in Modcod::ALL {
            let geometry = FrameGeometry::new(modcod).unwrap();
            let header = Framer::new(modcod, geometry).plheader().to_vec();
            let mut c = Correlator::new();
            let mut m = 0.0;
            for i in 1..header.len() {
                m = c.step(header[i - 1] * header[i].conj());
            }
            assert!((m - 57.0).abs() < 1e-9, "{}: metric {}", modcod, m);
        }
    }

    #[test]
    fn test_detects_offset_frame_and_realigns() {
        let (framer, s) = stream(Modcod::Qpsk8_9, 12, 1234, 7);
        let n = framer.geometry().pl_frame_size;
        let mut fs = FrameSync::new(FrameSyncVariant::Correlator, n, 0.9, 30.0).unwrap();
        let mut out = vec![Complex64::default(); n];

        let mut results = Vec::new();
        for frame in s.chunks_exact(n) {
            results.push(fs.synchronize(frame, &mut out).unwrap());
        }
        assert!(results.iter().all(|r| r.delay == 1234), "delays {:?}", results);
        let last = results.last().unwrap();
        assert!(last.detected, "metric {}", last.metric);
        assert!(!results[0].detected, "one frame of smoothing cannot reach the trigger");
        assert_eq!(&out[..PLHEADER_SIZE], &framer.plheader()[..]);
    }

    #[test]
    fn test_phase_rotation_does_not_matter() {
        let (framer, s) = stream(Modcod::Psk8_8_9, 3, 500, 8);
        let n = framer.geometry().pl_frame_size;
        let rot = Complex64::from_polar(1.0, 1.1);
        let mut fs = FrameSync::new(FrameSyncVariant::Correlator, n, 0.0, 30.0).unwrap();
        let mut out = vec![Complex64::default(); n];
        for frame in s.chunks_exact(n) {
            let rotated: Vec<Complex64> = frame.iter().map(|x| x * rot).collect();
            let r = fs.synchronize(&rotated, &mut out).unwrap();
            assert_eq!(r.delay, 500);
            assert!(r.detected && (r.metric - 57.0).abs() < 1e-6, "metric {}", r.metric);
        }
    }

    #[test]
    fn test_random_symbols_do_not_trigger() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let n = 8370;
        let mut fs = FrameSync::new(FrameSyncVariant::Correlator, n, 0.0, 30.0).unwrap();
        let mut out = vec![Complex64::default(); n];
        for _ in 0..3 {
            let frame: Vec<Complex64> = (0..n).map(|_| qpsk(&mut rng)).collect();
            let r = fs.synchronize(&frame, &mut out).unwrap();
            assert!(!r.detected, "metric {} on noise", r.metric);
        }
    }

    #[test]
    fn test_fft_matches_correlator() {
        let (framer, s) = stream(Modcod::Apsk16_8_9, 4, 3000, 10);
        let n = framer.geometry().pl_frame_size;
        let mut a = FrameSync::new(FrameSyncVariant::Correlator, n, 0.5, 30.0).unwrap();
        let mut b = FrameSync::new(FrameSyncVariant::Fft, n, 0.5, 30.0).unwrap();
        let mut oa = vec![Complex64::default(); n];
        let mut ob = vec![Complex64::default(); n];
        for frame in s.chunks_exact(n) {
            let ra = a.synchronize(frame, &mut oa).unwrap();
            let rb = b.synchronize(frame, &mut ob).unwrap();
            assert_eq!(ra.delay, rb.delay);
            assert_eq!(ra.detected, rb.detected);
            assert!((ra.metric - rb.metric).abs() < 1e-8, "{} vs {}", ra.metric, rb.metric);
            for (i, (x, y)) in a.correlation().iter().zip(b.correlation()).enumerate() {
                assert!((x - y).abs() < 1e-8, "position {}: {} vs {}", i, x, y);
            }
            assert_eq!(oa, ob);
        }
    }

    #[test]
    fn test_reset_and_geometry_errors() {
        assert!(FrameSync::new(FrameSyncVariant::Correlator, 50, 0.9, 30.0).is_err());

        let (framer, s) = stream(Modcod::Qpsk8_9, 2, 0, 11);
        let n = framer.geometry().pl_frame_size;
        let mut fs = FrameSync::new(FrameSyncVariant::Fft, n, 0.0, 30.0).unwrap();
        let mut out = vec![Complex64::default(); n];
        fs.synchronize(&s[..n], &mut out).unwrap();
        Synchronizer::reset(&mut fs);
        assert_eq!(fs.estimate(), FrameSyncResult::default());
        assert!(fs.correlation().iter().all(|c| *c == 0.0));
        assert!(fs.synchronize(&s[..n - 1], &mut out[..n - 1]).is_err());
    }
}
