//! Pilot-aided coarse frequency loop
//!
//! Runs on the strobed symbols of the timing loop. Inside each pilot block
//! the phase advance between pilot `k-2` and pilot `k` (after removing the
//! known scrambled pilot value) is the phase error; a PI loop filter feeds
//! an integrator whose output, per sample, steers the derotating NCO.

use num_complex::Complex64;
use std::f64::consts::FRAC_PI_2;
use tracing::debug;

use crate::carriers::Nco;
use crate::error::{check_len, PhyResult};
use crate::params::{FIRST_PILOT, PILOT_PERIOD, PILOT_SIZE};
use crate::tables::PL_RAND_SEQ;
use crate::traits::{Carrier, Synchronizer};

/// Offset of a pilot block inside one pilot period
const PILOT_OFFSET: usize = FIRST_PILOT % PILOT_PERIOD;

/// Proportional and integral gains `(Kp, Ki)` of the PLL loop filter
pub fn pll_coefficients(pll_sps: usize, damping: f64, bandwidth: f64) -> (f64, f64) {
    const DETECTOR_GAIN: f64 = 2.0;
    let sps = pll_sps as f64;
    let theta = bandwidth * sps / ((damping + 0.25 / damping) * sps);
    let d = 1.0 + 2.0 * damping * theta + theta * theta;
    let kp = (4.0 * damping * theta / d) / (DETECTOR_GAIN * sps);
    let ki = (4.0 / sps * theta * theta / d) / (DETECTOR_GAIN * sps);
    (kp, ki)
}

/// Loop filter state, saved before a frame and put back if it turns out
/// to be unsynchronized
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoarseLoopState {
    pub loop_filter_state: f64,
    pub integ_state: f64,
    pub dds_prev_in: f64,
    pub estimated_freq: f64,
}

#[derive(Debug, Clone)]
pub struct CoarseFreqSync {
    nco: Nco,
    /// Scrambled pilot value at every symbol position of the frame
    pilots: Vec<Complex64>,
    samples_per_symbol: usize,
    kp: f64,
    ki: f64,
    prev: Complex64,
    prev_prev: Complex64,
    loop_filter_state: f64,
    integ_state: f64,
    dds_prev_in: f64,
    curr_idx: usize,
    estimated_freq: f64,
    update_enabled: bool,
}

impl CoarseFreqSync {
    /// Loop for PL frames of `frame_len` symbols at `samples_per_symbol`
    pub fn new(frame_len: usize, samples_per_symbol: usize, damping: f64, bandwidth: f64) -> Self {
        let frame_len = frame_len.max(1);
        let pilots = (0..frame_len)
            .map(|i| {
                let r = PL_RAND_SEQ.get(i).copied().unwrap_or(0) as f64;
                Complex64::from_polar(1.0, FRAC_PI_2 * (r + 0.5))
            })
            .collect();
        let (kp, ki) = pll_coefficients(1, damping, bandwidth);
        Self {
            nco: Nco::default(),
            pilots,
            samples_per_symbol: samples_per_symbol.max(1),
            kp,
            ki,
            prev: Complex64::default(),
            prev_prev: Complex64::default(),
            loop_filter_state: 0.0,
            integ_state: 0.0,
            dds_prev_in: 0.0,
            curr_idx: frame_len - 1,
            estimated_freq: 0.0,
            update_enabled: true,
        }
    }

    pub fn frame_len(&self) -> usize {
        self.pilots.len()
    }

    pub fn set_pll_coeffs(&mut self, pll_sps: usize, damping: f64, bandwidth: f64) {
        let (kp, ki) = pll_coefficients(pll_sps.max(1), damping, bandwidth);
        debug!(kp, ki, bandwidth, "coarse PLL coefficients");
        self.kp = kp;
        self.ki = ki;
    }

    pub fn gains(&self) -> (f64, f64) {
        (self.kp, self.ki)
    }

    /// Symbol position the next strobe is taken to occupy
    pub fn curr_idx(&self) -> usize {
        self.curr_idx
    }

    pub fn set_curr_idx(&mut self, idx: usize) {
        self.curr_idx = idx % self.pilots.len();
    }

    pub fn enable_update(&mut self) {
        self.update_enabled = true;
    }

    pub fn disable_update(&mut self) {
        self.update_enabled = false;
    }

    pub fn is_update_enabled(&self) -> bool {
        self.update_enabled
    }

    /// Frequency (cycles per sample) being removed
    pub fn estimated_freq(&self) -> f64 {
        self.estimated_freq
    }

    pub fn set_estimated_freq(&mut self, freq: f64) {
        self.estimated_freq = freq;
        self.nco.set_frequency(-freq);
    }

    pub fn loop_state(&self) -> CoarseLoopState {
        CoarseLoopState {
            loop_filter_state: self.loop_filter_state,
            integ_state: self.integ_state,
            dds_prev_in: self.dds_prev_in,
            estimated_freq: self.estimated_freq,
        }
    }

    /// Put back a saved loop state. The NCO keeps its phase and the
    /// strobe position is untouched.
    pub fn restore_loop_state(&mut self, state: CoarseLoopState) {
        self.loop_filter_state = state.loop_filter_state;
        self.integ_state = state.integ_state;
        self.dds_prev_in = state.dds_prev_in;
        self.set_estimated_freq(state.estimated_freq);
    }

    /// Derotate one sample
    #[inline]
    pub fn step(&mut self, x: Complex64) -> Complex64 {
        self.nco.step(x)
    }

    /// Derotate a block with the current frequency
    pub fn synchronize(&mut self, input: &[Complex64], output: &mut [Complex64]) -> PhyResult<()> {
        check_len("coarse sync output", input.len(), output.len())?;
        self.nco.rotate(input, output);
        Ok(())
    }

    /// Feed the strobe symbol for position `curr_idx`, then advance it
    pub fn update_phase(&mut self, spl: Complex64) {
        let idx = self.curr_idx;
        let len = self.pilots.len();
        let rem = idx % PILOT_PERIOD;
        let in_pilots = idx >= FIRST_PILOT;

        if in_pilots && (PILOT_OFFSET..PILOT_OFFSET + PILOT_SIZE).contains(&rem) {
            if self.update_enabled {
                let prev_prev_idx = (idx + len - 2) % len;
                let error = (spl
                    * self.pilots[prev_prev_idx]
                    * (self.prev_prev * self.pilots[idx]).conj())
                .im;
                self.loop_filter_state += error * self.ki;
                self.integ_state += self.dds_prev_in;
                self.dds_prev_in = error * self.kp + self.loop_filter_state;
                self.estimated_freq = self.integ_state / self.samples_per_symbol as f64;
                self.nco.set_frequency(-self.estimated_freq);
            }
            self.prev_prev = self.prev;
            self.prev = spl;
        } else if in_pilots && rem == PILOT_OFFSET + PILOT_SIZE {
            self.prev_prev = Complex64::default();
            self.prev = Complex64::default();
        }
        self.curr_idx = (idx + 1) % len;
    }

    pub fn reset(&mut self) {
        self.prev = Complex64::default();
        self.prev_prev = Complex64::default();
        self.curr_idx = self.pilots.len() - 1;
        self.loop_filter_state = 0.0;
        self.integ_state = 0.0;
        self.dds_prev_in = 0.0;
        self.estimated_freq = 0.0;
        self.nco.reset();
        self.nco.set_frequency(0.0);
    }
}

impl Synchronizer for CoarseFreqSync {
    type Estimate = f64;

    fn reset(&mut self) {
        CoarseFreqSync::reset(self);
    }

    fn estimate(&self) -> f64 {
        self.estimated_freq
    }
}
