//! PLHEADER construction
//!
//! Small pure functions, one per step of the standard's header chain:
//! (32,7) encoding, codeword/complement interleaving, PLS scrambling and
//! π/2-BPSK mapping. The header is built once per MODCOD.

use num_complex::Complex64;
use std::f64::consts::FRAC_1_SQRT_2;

use crate::params::{Modcod, PLHEADER_SIZE, SOF_SIZE};
use crate::tables::{G_32_7, PLS_SCRAMBLER, SOF_BITS};

/// GF(2) product of a 7-bit message with the (32,7) generator matrix
pub fn encode_32_7(message: &[u8; 7]) -> [u8; 32] {
    let mut coded = [0u8; 32];
    for (col, out) in coded.iter_mut().enumerate() {
        *out = message
            .iter()
            .zip(G_32_7.iter())
            .fold(0u8, |acc, (&m, row)| acc ^ (m & row[col]));
    }
    coded
}

/// Interleave a codeword with its complement and apply the PLS scrambler.
///
/// Output bit `2i` is `coded[i]`, bit `2i+1` is `!coded[i]`.
pub fn pls_bits(coded: &[u8; 32]) -> [u8; 64] {
    let mut bits = [0u8; 64];
    for (i, &c) in coded.iter().enumerate() {
        bits[2 * i] = c ^ PLS_SCRAMBLER[2 * i];
        bits[2 * i + 1] = (c ^ 1) ^ PLS_SCRAMBLER[2 * i + 1];
    }
    bits
}

/// π/2-BPSK mapping of one bit at position `index`.
///
/// `rotated` selects the alternate constellation used for the PLS field
/// when the first MODCOD bit is 1.
#[inline]
pub fn pi2_bpsk(bit: u8, index: usize, rotated: bool) -> Complex64 {
    let b = FRAC_1_SQRT_2 * (1.0 - 2.0 * bit as f64);
    match (rotated, index % 2 == 0) {
        (false, true) => Complex64::new(b, b),
        (false, false) => Complex64::new(-b, b),
        (true, true) => Complex64::new(-b, b),
        (true, false) => Complex64::new(-b, -b),
    }
}

/// Modulated SOF field
pub fn sof_symbols() -> [Complex64; SOF_SIZE] {
    let mut out = [Complex64::default(); SOF_SIZE];
    for (i, (&bit, sym)) in SOF_BITS.iter().zip(out.iter_mut()).enumerate() {
        *sym = pi2_bpsk(bit, i, false);
    }
    out
}

/// Full 90-symbol PLHEADER for a MODCOD
pub fn build_plheader(modcod: Modcod) -> [Complex64; PLHEADER_SIZE] {
    let message = modcod.pls_codeword();
    let bits = pls_bits(&encode_32_7(&message));
    let rotated = message[0] == 1;

    let mut header = [Complex64::default(); PLHEADER_SIZE];
    header[..SOF_SIZE].copy_from_slice(&sof_symbols());
    for (i, &bit) in bits.iter().enumerate() {
        header[SOF_SIZE + i] = pi2_bpsk(bit, i, rotated);
    }
    header
}
