//! Standard-mandated constant tables
//!
//! Bit-exact sequences from EN 302 307. The PL scrambling sequence is built
//! once, on first use, and shared read-only afterwards.

use lazy_static::lazy_static;

use crate::params::PLHEADER_SIZE;

/// BB scrambler initial register state
pub const BB_SCRAMBLER_SEED: [u8; 15] = [1, 0, 0, 1, 0, 1, 0, 1, 0, 0, 0, 0, 0, 0, 0];

/// Start-of-frame pattern (0x18D2E82)
pub const SOF_BITS: [u8; 26] = [
    0, 1, 1, 0, 0, 0, 1, 1, 0, 1, 0, 0, 1, 0, 1, 1, 1, 0, 1, 0, 0, 0, 0, 0, 1, 0,
];

/// Generator matrix of the (32,7) PLS code
pub const G_32_7: [[u8; 32]; 7] = [
    [1, 0, 0, 1, 0, 0, 0, 0, 1, 0, 1, 0, 1, 1, 0, 0, 0, 0, 1, 0, 1, 1, 0, 1, 1, 1, 0, 1, 1, 1, 0, 1],
    [0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1],
    [0, 0, 1, 1, 0, 0, 1, 1, 0, 0, 1, 1, 0, 0, 1, 1, 0, 0, 1, 1, 0, 0, 1, 1, 0, 0, 1, 1, 0, 0, 1, 1],
    [0, 0, 0, 0, 1, 1, 1, 1, 0, 0, 0, 0, 1, 1, 1, 1, 0, 0, 0, 0, 1, 1, 1, 1, 0, 0, 0, 0, 1, 1, 1, 1],
    [0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 1],
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1],
    [1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1],
];

/// PLS scrambling sequence
pub const PLS_SCRAMBLER: [u8; 64] = [
    0, 1, 1, 1, 0, 0, 0, 1, 1, 0, 0, 1, 1, 1, 0, 1, 1, 0, 0, 0, 0, 0, 1, 1, 1, 1, 0, 0, 1, 0, 0, 1,
    0, 1, 0, 1, 0, 0, 1, 1, 0, 1, 0, 0, 0, 0, 1, 0, 0, 0, 1, 0, 1, 1, 0, 1, 1, 1, 1, 1, 1, 0, 1, 0,
];

/// Differential PLHEADER reference used by the frame synchronizer.
///
/// Imaginary parts of `conj` differential symbols; 25 SOF entries followed
/// by 64 PLSC entries, zero wherever the PLSC differential depends on the
/// MODCOD.
pub const FRAME_SYNC_REFERENCE: [i8; 89] = [
    1, 1, 1, 1, -1, -1, -1, -1, 1, -1, -1, -1, 1, -1, -1, 1, 1, -1, 1, 1, -1, 1, -1, -1, 1,
    0, 1, 0, -1, 0, -1, 0, 1, 0, 1, 0, 1, 0, -1, 0, 1, 0, 1, 0, -1, 0, -1, 0, -1, 0, -1, 0,
    -1, 0, 1, 0, 1, 0, 1, 0, 1, 0, -1, 0, -1, 0, 1, 0, -1, 0, -1, 0, 1, 0, -1, 0, 1, 0, -1,
    0, 1, 0, -1, 0, -1, 0, 1, 0, 1,
];

/// Number of SOF entries in [`FRAME_SYNC_REFERENCE`]
pub const FRAME_SYNC_SOF_LEN: usize = 25;

/// Longest PL frame payload (after the header) covered by the sequence
pub const PL_RAND_PAYLOAD_LEN: usize = 66420;

const GOLD_REGISTER_LEN: usize = 18;
const GOLD_SHIFT: usize = 131072;

lazy_static! {
    /// PL scrambling sequence indexed by symbol position within a PL frame.
    ///
    /// The header positions hold 0 and are never applied.
    pub static ref PL_RAND_SEQ: Vec<u8> = build_pl_rand_seq(PL_RAND_PAYLOAD_LEN);
}

/// Gold sequence `R_0` (scrambling code 0), prefixed by the unscrambled header
fn build_pl_rand_seq(payload_len: usize) -> Vec<u8> {
    let n = payload_len + GOLD_SHIFT;
    let mut x = vec![0u8; n + GOLD_REGISTER_LEN];
    let mut y = vec![1u8; n + GOLD_REGISTER_LEN];
    x[0] = 1;

    for i in 0..n {
        x[i + GOLD_REGISTER_LEN] = x[i + 7] ^ x[i];
        y[i + GOLD_REGISTER_LEN] = y[i + 10] ^ y[i + 7] ^ y[i + 5] ^ y[i];
    }

    let z = |i: usize| x[i] ^ y[i];

    let mut seq = vec![0u8; PLHEADER_SIZE];
    seq.extend((0..payload_len).map(|i| 2 * z(i + GOLD_SHIFT) + z(i)));
    seq
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pl_rand_seq_layout() {
        assert_eq!(PL_RAND_SEQ.len(), PLHEADER_SIZE + PL_RAND_PAYLOAD_LEN);
        assert!(PL_RAND_SEQ[..PLHEADER_SIZE].iter().all(|&r| r == 0));
        assert!(PL_RAND_SEQ.iter().all(|&r| r < 4));
    }

    #[test]
    fn test_pl_rand_seq_balanced() {
        let mut hist = [0usize; 4];
        for &r in &PL_RAND_SEQ[PLHEADER_SIZE..] {
            hist[r as usize] += 1;
        }
        let expected = PL_RAND_PAYLOAD_LEN / 4;
        for (v, &count) in hist.iter().enumerate() {
            assert!(
                (count as i64 - expected as i64).abs() < (expected / 20) as i64,
                "value {} appears {} times, expected about {}",
                v,
                count,
                expected
            );
        }
    }

    #[test]
    fn test_pl_rand_seq_first_values() {
        // x(0)=1 with an all-ones y gives z(0)=0; x is zero for the next 17
        // positions so z(1..18) = 1.
        assert_eq!(PL_RAND_SEQ[PLHEADER_SIZE] & 1, 0);
        for k in 1..GOLD_REGISTER_LEN {
            assert_eq!(PL_RAND_SEQ[PLHEADER_SIZE + k] & 1, 1, "LSB at {}", k);
        }
    }

    #[test]
    fn test_frame_sync_reference_weight() {
        let sof: i32 = FRAME_SYNC_REFERENCE[..FRAME_SYNC_SOF_LEN]
            .iter()
            .map(|v| v.abs() as i32)
            .sum();
        let plsc: i32 = FRAME_SYNC_REFERENCE[FRAME_SYNC_SOF_LEN..]
            .iter()
            .map(|v| v.abs() as i32)
            .sum();
        assert_eq!(sof, 25);
        assert_eq!(plsc, 32);
    }
}
