//! MODCOD selection, frame geometry and synchronizer configuration
//!
//! Everything downstream sizes its buffers from a single [`FrameGeometry`],
//! computed once from the MODCOD when [`DvbS2Params`] is built.

use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_1_SQRT_2;
use std::fmt;
use std::str::FromStr;
use tracing::info;

use crate::error::{PhyError, PhyResult};

/// Short-frame LDPC codeword length
pub const N_LDPC: usize = 16200;

/// BCH codeword length before shortening
pub const N_BCH_UNSHORTENED: usize = 16383;

/// Slot size in symbols (also the PLHEADER length)
pub const SLOT_SIZE: usize = 90;

/// Pilot block size in symbols
pub const PILOT_SIZE: usize = 36;

/// PLHEADER length in symbols
pub const PLHEADER_SIZE: usize = 90;

/// SOF field length in symbols
pub const SOF_SIZE: usize = 26;

/// Data slots between two pilot blocks
pub const SLOTS_PER_PILOT: usize = 16;

/// Distance between the starts of two consecutive pilot blocks
pub const PILOT_PERIOD: usize = SLOTS_PER_PILOT * SLOT_SIZE + PILOT_SIZE;

/// Symbol index of the first pilot block inside a PL frame
pub const FIRST_PILOT: usize = PLHEADER_SIZE + SLOTS_PER_PILOT * SLOT_SIZE;

// ============================================================================
// MODCOD table
// ============================================================================

/// Constellation family of a MODCOD
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modulation {
    Qpsk,
    Psk8,
    Apsk16,
}

impl Modulation {
    pub fn bits_per_symbol(&self) -> usize {
        match self {
            Modulation::Qpsk => 2,
            Modulation::Psk8 => 3,
            Modulation::Apsk16 => 4,
        }
    }
}

/// Supported short-frame MODCODs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modcod {
    Qpsk8_9,
    Qpsk3_5,
    Psk8_3_5,
    Psk8_8_9,
    Apsk16_8_9,
}

impl Modcod {
    pub const ALL: [Modcod; 5] = [
        Modcod::Qpsk8_9,
        Modcod::Qpsk3_5,
        Modcod::Psk8_3_5,
        Modcod::Psk8_8_9,
        Modcod::Apsk16_8_9,
    ];

    /// Parse a MODCOD name; the empty string selects QPSK 8/9
    pub fn from_name(name: &str) -> PhyResult<Self> {
        match name {
            "" | "QPSK-S_8/9" => Ok(Modcod::Qpsk8_9),
            "QPSK-S_3/5" => Ok(Modcod::Qpsk3_5),
            "8PSK-S_3/5" => Ok(Modcod::Psk8_3_5),
            "8PSK-S_8/9" => Ok(Modcod::Psk8_8_9),
            "16APSK-S_8/9" => Ok(Modcod::Apsk16_8_9),
            other => Err(PhyError::UnsupportedModcod(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Modcod::Qpsk8_9 => "QPSK-S_8/9",
            Modcod::Qpsk3_5 => "QPSK-S_3/5",
            Modcod::Psk8_3_5 => "8PSK-S_3/5",
            Modcod::Psk8_8_9 => "8PSK-S_8/9",
            Modcod::Apsk16_8_9 => "16APSK-S_8/9",
        }
    }

    pub fn modulation(&self) -> Modulation {
        match self {
            Modcod::Qpsk8_9 | Modcod::Qpsk3_5 => Modulation::Qpsk,
            Modcod::Psk8_3_5 | Modcod::Psk8_8_9 => Modulation::Psk8,
            Modcod::Apsk16_8_9 => Modulation::Apsk16,
        }
    }

    /// BCH information length
    pub fn k_bch(&self) -> usize {
        match self {
            Modcod::Qpsk8_9 | Modcod::Psk8_8_9 | Modcod::Apsk16_8_9 => 14232,
            Modcod::Qpsk3_5 | Modcod::Psk8_3_5 => 9552,
        }
    }

    /// BCH codeword length (shortened)
    pub fn n_bch(&self) -> usize {
        match self {
            Modcod::Qpsk8_9 | Modcod::Psk8_8_9 | Modcod::Apsk16_8_9 => 14400,
            Modcod::Qpsk3_5 | Modcod::Psk8_3_5 => 9720,
        }
    }

    /// 7-bit PLS codeword, MSB first
    pub fn pls_codeword(&self) -> [u8; 7] {
        match self {
            Modcod::Qpsk8_9 => [0, 0, 1, 0, 1, 0, 1],
            Modcod::Qpsk3_5 => [0, 0, 0, 1, 0, 1, 1],
            Modcod::Psk8_3_5 => [0, 0, 1, 1, 0, 0, 1],
            Modcod::Psk8_8_9 => [0, 1, 0, 0, 0, 0, 1],
            Modcod::Apsk16_8_9 => [0, 1, 0, 1, 1, 0, 1],
        }
    }

    /// Information bits per LDPC codeword bit
    pub fn code_rate(&self) -> f64 {
        self.k_bch() as f64 / N_LDPC as f64
    }
}

impl FromStr for Modcod {
    type Err = PhyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Modcod::from_name(s)
    }
}

impl fmt::Display for Modcod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Frame geometry
// ============================================================================

/// Buffer sizes derived from the MODCOD
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGeometry {
    pub k_bch: usize,
    pub n_bch: usize,
    pub n_bch_unshortened: usize,
    pub n_ldpc: usize,
    pub bits_per_symbol: usize,
    /// Slot size `M`
    pub slot_size: usize,
    /// Pilot block size `P`
    pub pilot_size: usize,
    /// Payload symbols per frame
    pub xfec_frame_size: usize,
    /// Slots per frame `S`
    pub n_slots: usize,
    pub n_pilots: usize,
    /// `M*(S+1) + P*N_PILOTS`
    pub pl_frame_size: usize,
}

impl FrameGeometry {
    pub fn new(modcod: Modcod) -> PhyResult<Self> {
        let bits_per_symbol = modcod.modulation().bits_per_symbol();
        let xfec_frame_size = N_LDPC / bits_per_symbol;
        let n_slots = xfec_frame_size / SLOT_SIZE;
        let n_pilots = xfec_frame_size / (SLOTS_PER_PILOT * SLOT_SIZE);
        let pl_frame_size = SLOT_SIZE * (n_slots + 1) + n_pilots * PILOT_SIZE;

        if xfec_frame_size == 0 || n_slots == 0 {
            return Err(PhyError::InvalidGeometry(format!(
                "{}: empty payload ({} symbols)",
                modcod, xfec_frame_size
            )));
        }
        if n_slots * SLOT_SIZE != xfec_frame_size {
            return Err(PhyError::InvalidGeometry(format!(
                "{}: payload of {} symbols is not a whole number of slots",
                modcod, xfec_frame_size
            )));
        }

        Ok(Self {
            k_bch: modcod.k_bch(),
            n_bch: modcod.n_bch(),
            n_bch_unshortened: N_BCH_UNSHORTENED,
            n_ldpc: N_LDPC,
            bits_per_symbol,
            slot_size: SLOT_SIZE,
            pilot_size: PILOT_SIZE,
            xfec_frame_size,
            n_slots,
            n_pilots,
            pl_frame_size,
        })
    }

    /// Symbol index of every pilot block start inside a PL frame
    pub fn pilot_starts(&self) -> impl Iterator<Item = usize> {
        let n = self.n_pilots;
        (0..n).map(|p| FIRST_PILOT + p * PILOT_PERIOD)
    }
}

// ============================================================================
// Synchronizer configuration
// ============================================================================

/// Gardner implementation variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimingVariant {
    /// One full loop update per input sample
    Fast,
    /// Batched interpolation over `hold_size` windows
    Ultra,
}

/// Frame synchronizer implementation variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameSyncVariant {
    /// Sample-by-sample sliding correlator
    Correlator,
    /// Whole-frame FFT correlation
    Fft,
}

/// Fine carrier estimator stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FineSyncVariant {
    /// Luise-Reggiannini frequency estimator
    LuiseReggiannini,
    /// Pilot least-squares frequency and phase estimator
    PilotPhase,
}

/// Loop, filter and acquisition settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Samples per symbol at the receiver input
    pub osf: usize,
    /// RRC roll-off
    pub rolloff: f64,
    /// RRC group delay in symbols
    pub grp_delay: usize,

    pub coarse_damping: f64,
    /// Normalized coarse PLL bandwidth while acquiring
    pub coarse_bandwidth: f64,
    /// Normalized coarse PLL bandwidth once locked
    pub coarse_bandwidth_tracking: f64,

    pub timing_damping: f64,
    pub timing_bandwidth: f64,
    pub timing_detector_gain: f64,
    pub timing_variant: TimingVariant,
    /// Window length of the batched Gardner variant
    pub hold_size: usize,

    pub frame_variant: FrameSyncVariant,
    /// Smoothing of the correlation metric across frames
    pub frame_alpha: f64,
    /// Metric above which a frame is considered found
    pub frame_trigger: f64,

    /// Fine estimators, applied in order
    pub fine_chain: Vec<FineSyncVariant>,
    /// Forgetting factor of the L&R autocorrelation
    pub lr_alpha: f64,

    /// Frames spent in each of the two coarse PLL learning phases
    pub learning_1_2_frames: usize,
    /// Frames spent with the coarse loop frozen before delivering data
    pub learning_3_frames: usize,
    /// Start directly in the transmission phase
    pub skip_acquisition: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            osf: 2,
            rolloff: 0.2,
            grp_delay: 20,
            coarse_damping: FRAC_1_SQRT_2,
            coarse_bandwidth: 1e-4,
            coarse_bandwidth_tracking: 5e-5,
            timing_damping: FRAC_1_SQRT_2,
            timing_bandwidth: 5e-5,
            timing_detector_gain: 2.0,
            timing_variant: TimingVariant::Fast,
            hold_size: 101,
            frame_variant: FrameSyncVariant::Correlator,
            frame_alpha: 0.9,
            frame_trigger: 30.0,
            fine_chain: vec![FineSyncVariant::LuiseReggiannini, FineSyncVariant::PilotPhase],
            lr_alpha: 0.999,
            learning_1_2_frames: 150,
            learning_3_frames: 200,
            skip_acquisition: false,
        }
    }
}

impl SyncConfig {
    /// Wider loops and short learning phases, for clean links and tests
    pub fn fast_acquisition() -> Self {
        Self {
            coarse_bandwidth: 1e-3,
            coarse_bandwidth_tracking: 5e-4,
            timing_bandwidth: 1e-3,
            frame_alpha: 0.5,
            learning_1_2_frames: 10,
            learning_3_frames: 5,
            ..Self::default()
        }
    }

    /// Reject values the loops cannot run with
    pub fn validate(&self) -> PhyResult<()> {
        if self.osf != 2 {
            return Err(PhyError::InvalidConfig(format!(
                "Gardner recovery needs 2 samples per symbol, got {}",
                self.osf
            )));
        }
        if !(self.rolloff > 0.0 && self.rolloff <= 1.0) {
            return Err(PhyError::InvalidConfig(format!(
                "roll-off must be in (0, 1], got {}",
                self.rolloff
            )));
        }
        if self.grp_delay == 0 {
            return Err(PhyError::InvalidConfig("group delay must be positive".into()));
        }
        for (name, zeta) in [
            ("coarse damping", self.coarse_damping),
            ("timing damping", self.timing_damping),
        ] {
            if !(zeta > 0.0) {
                return Err(PhyError::InvalidConfig(format!(
                    "{} must be positive, got {}",
                    name, zeta
                )));
            }
        }
        for (name, bw) in [
            ("coarse bandwidth", self.coarse_bandwidth),
            ("coarse tracking bandwidth", self.coarse_bandwidth_tracking),
            ("timing bandwidth", self.timing_bandwidth),
        ] {
            if !(bw > 0.0 && bw < 1.0) {
                return Err(PhyError::InvalidConfig(format!(
                    "{} must be in (0, 1), got {}",
                    name, bw
                )));
            }
        }
        if !(self.timing_detector_gain > 0.0) {
            return Err(PhyError::InvalidConfig(format!(
                "detector gain must be positive, got {}",
                self.timing_detector_gain
            )));
        }
        if self.hold_size <= 4 {
            return Err(PhyError::InvalidConfig(format!(
                "hold size must exceed 4, got {}",
                self.hold_size
            )));
        }
        if !(0.0..1.0).contains(&self.frame_alpha) {
            return Err(PhyError::InvalidConfig(format!(
                "frame alpha must be in [0, 1), got {}",
                self.frame_alpha
            )));
        }
        if !(0.0..=1.0).contains(&self.lr_alpha) {
            return Err(PhyError::InvalidConfig(format!(
                "L&R alpha must be in [0, 1], got {}",
                self.lr_alpha
            )));
        }
        if !(self.frame_trigger >= 0.0) {
            return Err(PhyError::InvalidConfig(format!(
                "frame trigger must be non-negative, got {}",
                self.frame_trigger
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Session parameters
// ============================================================================

/// MODCOD, geometry and synchronizer settings for one pipeline
#[derive(Debug, Clone)]
pub struct DvbS2Params {
    pub modcod: Modcod,
    pub geometry: FrameGeometry,
    pub sync: SyncConfig,
}

impl DvbS2Params {
    /// Build with default synchronizer settings
    pub fn new(modcod_name: &str) -> PhyResult<Self> {
        Self::with_config(modcod_name, SyncConfig::default())
    }

    pub fn with_config(modcod_name: &str, sync: SyncConfig) -> PhyResult<Self> {
        let modcod = Modcod::from_name(modcod_name)?;
        let geometry = FrameGeometry::new(modcod)?;
        sync.validate()?;

        info!(
            modcod = %modcod,
            xfec = geometry.xfec_frame_size,
            pl_frame = geometry.pl_frame_size,
            pilots = geometry.n_pilots,
            "frame geometry resolved"
        );

        Ok(Self {
            modcod,
            geometry,
            sync,
        })
    }

    /// Samples per PL frame at the receiver input
    pub fn samples_per_frame(&self) -> usize {
        self.geometry.pl_frame_size * self.sync.osf
    }
}
