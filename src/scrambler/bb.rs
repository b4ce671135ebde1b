//! Base-band scrambler
//!
//! 15-stage LFSR, polynomial 1 + x^14 + x^15. The register is reloaded with
//! the standard seed on every call, so scrambling and descrambling the same
//! frame always line up.

use crate::tables::BB_SCRAMBLER_SEED;

/// Stateless base-band (de)scrambler
#[derive(Debug, Clone, Copy, Default)]
pub struct BbScrambler;

impl BbScrambler {
    pub fn new() -> Self {
        Self
    }

    /// Scramble bits in place (bits are 0/1 bytes)
    pub fn scramble(&self, bits: &mut [u8]) {
        let mut lfsr = BB_SCRAMBLER_SEED;
        for bit in bits.iter_mut() {
            let feedback = lfsr[13] ^ lfsr[14];
            lfsr.rotate_right(1);
            lfsr[0] = feedback;
            *bit ^= feedback;
        }
    }

    /// Descrambling is the same operation
    pub fn descramble(&self, bits: &mut [u8]) {
        self.scramble(bits)
    }

    /// Scramble from `input` into `output` (equal lengths)
    pub fn scramble_into(&self, input: &[u8], output: &mut [u8]) {
        debug_assert_eq!(input.len(), output.len());
        output.copy_from_slice(input);
        self.scramble(output);
    }
}
