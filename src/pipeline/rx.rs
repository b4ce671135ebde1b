//! Receive chain and its acquisition state machine
//!
//! A fresh receiver waits for the frame synchronizer to fire, then lets the
//! coarse PLL learn in two bandwidth steps while it re-anchors on the frame
//! delay. Once the loop is frozen, every frame is realigned, descrambled
//! and cleaned by the fine estimators; in the transmission phase the XFEC
//! symbols are handed out with an Es/N0 estimate.
//!
//! A frame the synchronizer misses teaches nothing: the coarse loop is
//! rolled back to where it stood before that frame and the pilot anchor
//! keeps the last detected delay. The realigned frame that follows a miss
//! is mostly made of the missed input, so the fine estimators only learn
//! after two detections in a row.

use num_complex::Complex64;
use std::fmt;
use tracing::{debug, info, warn};

use crate::error::{check_len, PhyResult};
use crate::estimator::EsN0Estimator;
use crate::filters::Agc;
use crate::framer::Framer;
use crate::io::RxStatus;
use crate::params::{DvbS2Params, FineSyncVariant, PLHEADER_SIZE};
use crate::scrambler::PlScrambler;
use crate::sync::{FineSync, FrameSync, FrameSyncResult, StepComposite};
use crate::traits::{SampleSink, SampleSource, Synchronizer};

/// Acquisition phase of a [`Receiver`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxPhase {
    /// Looking for the first PLHEADER
    Waiting,
    /// Coarse PLL learning at the acquisition bandwidth
    Learning1,
    /// Coarse PLL learning at the tracking bandwidth
    Learning2,
    /// Coarse PLL frozen, fine estimators converging
    Learning3,
    /// Delivering XFEC frames
    Transmission,
}

impl fmt::Display for RxPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RxPhase::Waiting => "waiting",
            RxPhase::Learning1 => "learning_1",
            RxPhase::Learning2 => "learning_2",
            RxPhase::Learning3 => "learning_3",
            RxPhase::Transmission => "transmission",
        };
        f.write_str(name)
    }
}

/// Outcome of one input frame
#[derive(Debug, Clone, PartialEq)]
pub struct RxFrame {
    /// Phase the frame was processed in
    pub phase: RxPhase,
    /// XFEC symbols, only in the transmission phase
    pub symbols: Option<Vec<Complex64>>,
    pub frame_detected: bool,
    pub metric: f64,
    /// PLHEADER position in the symbol frame
    pub delay: usize,
    pub mu: f64,
    /// Cycles per sample
    pub coarse_freq: f64,
    /// Pilot estimator frequency, cycles per symbol
    pub fine_freq: f64,
    /// L&R frequency, cycles per symbol
    pub lr_freq: f64,
    pub esn0_db: Option<f64>,
}

pub struct Receiver {
    params: DvbS2Params,
    front_agc: Agc,
    step: StepComposite,
    symbol_agc: Agc,
    frame_sync: FrameSync,
    scrambler: PlScrambler,
    fine: Vec<FineSync>,
    framer: Framer,
    estimator: EsN0Estimator,
    phase: RxPhase,
    frames_in_phase: usize,
    frame_delay: usize,
    /// `frame_delay` comes from a detected frame
    anchor_valid: bool,
    prev_detected: bool,
    samples: Vec<Complex64>,
    symbols: Vec<Complex64>,
    aligned: Vec<Complex64>,
    scratch: Vec<Complex64>,
}

impl Receiver {
    pub fn new(params: DvbS2Params) -> PhyResult<Self> {
        let n = params.geometry.pl_frame_size;
        let n_in = params.samples_per_frame();
        let mut rx = Self {
            front_agc: Agc::new(1.0 / params.sync.osf as f64),
            step: StepComposite::from_params(&params)?,
            symbol_agc: Agc::new(1.0),
            frame_sync: FrameSync::from_config(n, &params.sync)?,
            scrambler: PlScrambler::new(),
            fine: FineSync::chain(&params.geometry, &params.sync),
            framer: Framer::new(params.modcod, params.geometry.clone()),
            estimator: EsN0Estimator::for_modcod(params.modcod),
            phase: RxPhase::Waiting,
            frames_in_phase: 0,
            frame_delay: 0,
            anchor_valid: false,
            prev_detected: false,
            samples: vec![Complex64::default(); n_in],
            symbols: vec![Complex64::default(); n],
            aligned: vec![Complex64::default(); n],
            scratch: vec![Complex64::default(); n],
            params,
        };
        rx.start();
        Ok(rx)
    }

    pub fn params(&self) -> &DvbS2Params {
        &self.params
    }

    pub fn phase(&self) -> RxPhase {
        self.phase
    }

    /// Input samples per frame
    pub fn n_in(&self) -> usize {
        self.samples.len()
    }

    /// XFEC symbols per delivered frame
    pub fn n_out(&self) -> usize {
        self.params.geometry.xfec_frame_size
    }

    pub fn step(&self) -> &StepComposite {
        &self.step
    }

    pub fn frame_sync(&self) -> &FrameSync {
        &self.frame_sync
    }

    /// PLHEADER position the pilot strobes are anchored on
    pub fn frame_delay(&self) -> usize {
        self.frame_delay
    }

    fn start(&mut self) {
        let cfg = &self.params.sync;
        self.step
            .coarse_mut()
            .set_pll_coeffs(1, cfg.coarse_damping, cfg.coarse_bandwidth);
        if cfg.skip_acquisition {
            self.step.coarse_mut().disable_update();
            self.step.timing_mut().set_active(true);
            self.phase = RxPhase::Transmission;
        } else {
            self.step.coarse_mut().enable_update();
            self.step.timing_mut().set_active(false);
            self.phase = RxPhase::Waiting;
        }
        self.frames_in_phase = 0;
        self.frame_delay = 0;
        self.anchor_valid = false;
        self.prev_detected = false;
    }

    fn enter(&mut self, phase: RxPhase) {
        info!(from = %self.phase, to = %phase, "receiver phase change");
        self.phase = phase;
        self.frames_in_phase = 0;
    }

    /// Process one frame of `osf·PL_FRAME` samples
    pub fn process_frame(&mut self, input: &[Complex64]) -> PhyResult<RxFrame> {
        check_len("receiver input", self.n_in(), input.len())?;
        self.front_agc.apply(input, &mut self.samples)?;

        let phase = self.phase;
        let (sync, symbols) = match phase {
            RxPhase::Waiting | RxPhase::Learning1 | RxPhase::Learning2 => {
                (self.acquire()?, None)
            }
            RxPhase::Learning3 | RxPhase::Transmission => self.track()?,
        };

        let frame = self.report(phase, sync, symbols);
        debug!(
            phase = %phase,
            detected = sync.detected,
            metric = sync.metric,
            delay = sync.delay,
            coarse_freq = frame.coarse_freq,
            "frame processed"
        );
        self.advance(sync);
        Ok(frame)
    }

    /// Coarse loop learning from the pilot strobes, undone if the frame
    /// is not detected
    fn acquire(&mut self) -> PhyResult<FrameSyncResult> {
        if self.anchor_valid {
            self.step.coarse_mut().enable_update();
        } else {
            self.step.coarse_mut().disable_update();
        }
        let saved = self.step.coarse().loop_state();

        let underflow = self
            .step
            .synchronize(&self.samples, &mut self.symbols, self.frame_delay)?;
        if underflow {
            debug!("timing buffer underflow");
        }
        self.symbol_agc.apply_in_place(&mut self.symbols);
        let sync = self.frame_sync.synchronize(&self.symbols, &mut self.aligned)?;
        self.prev_detected = sync.detected;

        if sync.detected {
            self.frame_delay = sync.delay;
            self.anchor_valid = true;
        } else {
            self.step.coarse_mut().restore_loop_state(saved);
            self.anchor_valid = false;
            if self.phase != RxPhase::Waiting {
                warn!(
                    metric = sync.metric,
                    trigger = self.params.sync.frame_trigger,
                    "frame sync missed, coarse loop held"
                );
            }
        }
        Ok(sync)
    }

    /// Frozen coarse loop, descrambling and fine correction
    fn track(&mut self) -> PhyResult<(FrameSyncResult, Option<Vec<Complex64>>)> {
        let underflow = self.step.synchronize_blocks(&self.samples, &mut self.symbols)?;
        if underflow {
            debug!("timing buffer underflow");
        }
        self.symbol_agc.apply_in_place(&mut self.symbols);
        let sync = self.frame_sync.synchronize(&self.symbols, &mut self.aligned)?;
        let trusted = sync.detected && self.prev_detected;
        self.prev_detected = sync.detected;
        if sync.detected {
            self.frame_delay = sync.delay;
        } else {
            warn!(
                metric = sync.metric,
                trigger = self.params.sync.frame_trigger,
                "frame sync missed, fine estimators held"
            );
        }
        if sync.detected && !trusted {
            debug!("realigned frame follows a miss, fine estimators held");
        }

        self.scrambler.descramble(&mut self.aligned, PLHEADER_SIZE)?;
        for stage in self.fine.iter_mut() {
            stage.process(&self.aligned, &mut self.scratch, trusted)?;
            std::mem::swap(&mut self.aligned, &mut self.scratch);
        }

        if self.phase != RxPhase::Transmission {
            return Ok((sync, None));
        }
        let xfec = self.framer.remove_plh_vec(&self.aligned)?;
        self.estimator.estimate(&xfec);
        Ok((sync, Some(xfec)))
    }

    fn report(
        &self,
        phase: RxPhase,
        sync: FrameSyncResult,
        symbols: Option<Vec<Complex64>>,
    ) -> RxFrame {
        let fine_freq = |variant| {
            self.fine
                .iter()
                .find(|s| s.variant() == variant)
                .map_or(0.0, |s| s.estimate().freq)
        };
        let esn0_db = symbols.as_ref().map(|_| self.estimator.last().esn0_db);
        RxFrame {
            phase,
            symbols,
            frame_detected: sync.detected,
            metric: sync.metric,
            delay: sync.delay,
            mu: self.step.timing().mu(),
            coarse_freq: self.step.coarse().estimated_freq(),
            fine_freq: fine_freq(FineSyncVariant::PilotPhase),
            lr_freq: fine_freq(FineSyncVariant::LuiseReggiannini),
            esn0_db,
        }
    }

    fn advance(&mut self, sync: FrameSyncResult) {
        self.frames_in_phase += 1;
        let cfg = &self.params.sync;
        let (learn_12, learn_3) = (cfg.learning_1_2_frames, cfg.learning_3_frames);
        let (damping, tracking) = (cfg.coarse_damping, cfg.coarse_bandwidth_tracking);

        match self.phase {
            RxPhase::Waiting if sync.detected => {
                info!(metric = sync.metric, delay = sync.delay, "PLHEADER found");
                self.step.reset();
                self.frame_sync.reset();
                self.frame_delay = 0;
                self.anchor_valid = false;
                self.prev_detected = false;
                self.enter(RxPhase::Learning1);
            }
            RxPhase::Learning1 if self.frames_in_phase >= learn_12 => {
                self.step.coarse_mut().set_pll_coeffs(1, damping, tracking);
                self.enter(RxPhase::Learning2);
            }
            RxPhase::Learning2 if self.frames_in_phase >= learn_12 => {
                self.step.coarse_mut().disable_update();
                info!(
                    coarse_freq = self.step.coarse().estimated_freq(),
                    "coarse loop frozen"
                );
                self.enter(RxPhase::Learning3);
            }
            RxPhase::Learning3 if self.frames_in_phase >= learn_3 => {
                self.step.timing_mut().set_active(true);
                self.enter(RxPhase::Transmission);
            }
            _ => {}
        }
    }

    /// Pull `frames` frames from `source`, pushing XFEC frames to `sink`.
    ///
    /// Returns the status of every frame received. Stops early at the end of
    /// the stream.
    pub fn run<S, K>(&mut self, source: &mut S, sink: &mut K, frames: usize) -> PhyResult<Vec<RxStatus>>
    where
        S: SampleSource,
        K: SampleSink,
    {
        let mut input = vec![Complex64::default(); self.n_in()];
        let mut statuses = Vec::with_capacity(frames);
        for k in 0..frames {
            let status = source.receive(&mut input)?;
            if status.overflow {
                warn!(frame = k, "source overflow");
            }
            if status.sequence_error {
                warn!(frame = k, "source sequence error");
            }
            if status.timeout {
                warn!(frame = k, "source timeout");
            }
            if status.rewound {
                info!(frame = k, "source rewound");
            }
            statuses.push(status);
            if status.end_of_stream {
                info!(frame = k, "end of stream");
                break;
            }

            let frame = self.process_frame(&input)?;
            if let Some(symbols) = frame.symbols {
                sink.send(&symbols)?;
            }
        }
        Ok(statuses)
    }

    /// Back to the initial phase with every loop cleared
    pub fn reset(&mut self) {
        self.step.reset();
        self.frame_sync.reset();
        for stage in self.fine.iter_mut() {
            stage.reset();
        }
        self.estimator = EsN0Estimator::for_modcod(self.params.modcod);
        self.start();
    }
}

impl fmt::Debug for Receiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Receiver")
            .field("modcod", &self.params.modcod)
            .field("phase", &self.phase)
            .field("frames_in_phase", &self.frames_in_phase)
            .field("frame_delay", &self.frame_delay)
            .field("anchor_valid", &self.anchor_valid)
            .finish()
    }
}
