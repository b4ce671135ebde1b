//! NIF interface for Elixir
//!
//! Exposes the scramblers, the framer and stateful transmitter / receiver
//! resources. MODCODs are passed by name (`"QPSK-S_8/9"`). I/Q data crosses
//! the boundary as binaries of interleaved little-endian `f32` pairs.

use num_complex::Complex64;
use rustler::{Atom, Binary, Env, NifResult, OwnedBinary, ResourceArc};
use std::sync::Mutex;

use crate::error::PhyError;
use crate::framer::Framer;
use crate::io::{decode_iq_f32, encode_iq_f32};
use crate::params::{DvbS2Params, FrameGeometry, Modcod};
use crate::pipeline::{Receiver, RxPhase, Transmitter};
use crate::scrambler::{BbScrambler, PlScrambler};

rustler::atoms! {
    ok,
    // Receiver phases
    waiting,
    learning_1,
    learning_2,
    learning_3,
    transmission,
}

fn phase_atom(phase: RxPhase) -> Atom {
    match phase {
        RxPhase::Waiting => waiting(),
        RxPhase::Learning1 => learning_1(),
        RxPhase::Learning2 => learning_2(),
        RxPhase::Learning3 => learning_3(),
        RxPhase::Transmission => transmission(),
    }
}

fn term_error(err: PhyError) -> rustler::Error {
    rustler::Error::Term(Box::new(err.to_string()))
}

fn lock_error<T>(_: T) -> rustler::Error {
    rustler::Error::Term(Box::new("lock poisoned"))
}

fn decode(iq: &Binary) -> NifResult<Vec<Complex64>> {
    decode_iq_f32(iq.as_slice()).map_err(term_error)
}

fn encode<'a>(env: Env<'a>, samples: &[Complex64]) -> NifResult<Binary<'a>> {
    let bytes = encode_iq_f32(samples);
    let mut bin = OwnedBinary::new(bytes.len())
        .ok_or_else(|| rustler::Error::Term(Box::new("binary allocation failed")))?;
    bin.as_mut_slice().copy_from_slice(&bytes);
    Ok(bin.release(env))
}

fn framer_for(modcod: &str) -> NifResult<Framer> {
    let modcod = Modcod::from_name(modcod).map_err(term_error)?;
    let geometry = FrameGeometry::new(modcod).map_err(term_error)?;
    Ok(Framer::new(modcod, geometry))
}

// ============================================================================
// Stateless blocks
// ============================================================================

/// BB-scramble a list of 0/1 bits (descrambling is the same call)
#[rustler::nif]
pub fn bb_scramble(bits: Vec<u8>) -> Vec<u8> {
    let mut bits = bits;
    BbScrambler::new().scramble(&mut bits);
    bits
}

/// PL-scramble a frame of symbols from index `start` on
#[rustler::nif]
pub fn pl_scramble<'a>(env: Env<'a>, iq: Binary<'a>, start: usize) -> NifResult<Binary<'a>> {
    let mut frame = decode(&iq)?;
    PlScrambler::new()
        .scramble(&mut frame, start)
        .map_err(term_error)?;
    encode(env, &frame)
}

/// Inverse of `pl_scramble/2`
#[rustler::nif]
pub fn pl_descramble<'a>(env: Env<'a>, iq: Binary<'a>, start: usize) -> NifResult<Binary<'a>> {
    let mut frame = decode(&iq)?;
    PlScrambler::new()
        .descramble(&mut frame, start)
        .map_err(term_error)?;
    encode(env, &frame)
}

/// Wrap an XFEC frame with PLHEADER and pilots
///
/// Arguments:
/// - modcod: MODCOD name
/// - iq: XFEC symbols, `XFEC_FRAME` pairs
#[rustler::nif]
pub fn framer_generate<'a>(env: Env<'a>, modcod: String, iq: Binary<'a>) -> NifResult<Binary<'a>> {
    let framer = framer_for(&modcod)?;
    let pl_frame = framer.generate_vec(&decode(&iq)?).map_err(term_error)?;
    encode(env, &pl_frame)
}

/// Strip PLHEADER and pilots from a PL frame
#[rustler::nif]
pub fn framer_remove_plh<'a>(
    env: Env<'a>,
    modcod: String,
    iq: Binary<'a>,
) -> NifResult<Binary<'a>> {
    let framer = framer_for(&modcod)?;
    let xfec = framer.remove_plh_vec(&decode(&iq)?).map_err(term_error)?;
    encode(env, &xfec)
}

/// The 90 PLHEADER symbols of a MODCOD
#[rustler::nif]
pub fn plheader<'a>(env: Env<'a>, modcod: String) -> NifResult<Binary<'a>> {
    let framer = framer_for(&modcod)?;
    encode(env, framer.plheader())
}

// ============================================================================
// Transmitter
// ============================================================================

pub struct TxResource {
    pub inner: Mutex<Transmitter>,
}

/// Create a transmitter with default shaping for a MODCOD
#[rustler::nif]
pub fn tx_new(modcod: String) -> NifResult<ResourceArc<TxResource>> {
    let params = DvbS2Params::new(&modcod).map_err(term_error)?;
    Ok(ResourceArc::new(TxResource {
        inner: Mutex::new(Transmitter::new(&params)),
    }))
}

/// Frame, scramble and shape one XFEC frame into `osf·PL_FRAME` samples
#[rustler::nif(schedule = "DirtyCpu")]
pub fn tx_process<'a>(
    env: Env<'a>,
    tx: ResourceArc<TxResource>,
    iq: Binary<'a>,
) -> NifResult<Binary<'a>> {
    let xfec = decode(&iq)?;
    let samples = {
        let mut state = tx.inner.lock().map_err(lock_error)?;
        state.process_frame(&xfec).map_err(term_error)?
    };
    encode(env, &samples)
}

// ============================================================================
// Receiver
// ============================================================================

pub struct RxResource {
    pub inner: Mutex<Receiver>,
}

/// Create a receiver in the waiting phase
#[rustler::nif]
pub fn rx_new(modcod: String) -> NifResult<ResourceArc<RxResource>> {
    let params = DvbS2Params::new(&modcod).map_err(term_error)?;
    let receiver = Receiver::new(params).map_err(term_error)?;
    Ok(ResourceArc::new(RxResource {
        inner: Mutex::new(receiver),
    }))
}

/// Process one frame of samples
///
/// Returns `{phase, detected, metric, symbols}` where `symbols` is the XFEC
/// binary in the transmission phase and `nil` before it.
#[rustler::nif(schedule = "DirtyCpu")]
pub fn rx_process<'a>(
    env: Env<'a>,
    rx: ResourceArc<RxResource>,
    iq: Binary<'a>,
) -> NifResult<(Atom, bool, f64, Option<Binary<'a>>)> {
    let samples = decode(&iq)?;
    let frame = {
        let mut state = rx.inner.lock().map_err(lock_error)?;
        state.process_frame(&samples).map_err(term_error)?
    };
    let symbols = match frame.symbols {
        Some(ref xfec) => Some(encode(env, xfec)?),
        None => None,
    };
    Ok((phase_atom(frame.phase), frame.frame_detected, frame.metric, symbols))
}

/// Return the receiver to the waiting phase
#[rustler::nif]
pub fn rx_reset(rx: ResourceArc<RxResource>) -> Atom {
    if let Ok(mut state) = rx.inner.lock() {
        state.reset();
    }
    ok()
}
