//! Physical-layer scrambler
//!
//! Rotates every payload symbol by 0, 90, 180 or 270 degrees as selected by
//! `PL_RAND_SEQ[i]`, where `i` is the symbol position within the PL frame.
//! Symbols below `start_ix` (the PLHEADER) are copied untouched.

use num_complex::Complex64;

use crate::error::{check_len, PhyError, PhyResult};
use crate::tables::PL_RAND_SEQ;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrambleDirection {
    Scramble,
    Descramble,
}

/// Stateless PL (de)scrambler over the shared sequence
#[derive(Debug, Clone, Copy)]
pub struct PlScrambler {
    seq: &'static [u8],
}

impl Default for PlScrambler {
    fn default() -> Self {
        Self::new()
    }
}

/// Rotation selected by a 2-bit sequence value
#[inline]
fn rotation(r: u8, direction: ScrambleDirection) -> Complex64 {
    let lsb = (r & 1) as f64;
    let msb = (r >> 1) as f64;
    let re = (1.0 - lsb) * (1.0 - 2.0 * msb);
    let im = lsb * (1.0 - 2.0 * msb);
    match direction {
        ScrambleDirection::Scramble => Complex64::new(re, im),
        ScrambleDirection::Descramble => Complex64::new(re, -im),
    }
}

impl PlScrambler {
    pub fn new() -> Self {
        Self {
            seq: PL_RAND_SEQ.as_slice(),
        }
    }

    /// Longest frame the sequence covers
    pub fn max_len(&self) -> usize {
        self.seq.len()
    }

    /// Rotate `input` into `output` from `start_ix` on
    pub fn apply(
        &self,
        input: &[Complex64],
        output: &mut [Complex64],
        start_ix: usize,
        direction: ScrambleDirection,
    ) -> PhyResult<()> {
        check_len("PL scrambler output", input.len(), output.len())?;
        if input.len() > self.seq.len() {
            return Err(PhyError::InvalidGeometry(format!(
                "frame of {} symbols exceeds the PL sequence ({})",
                input.len(),
                self.seq.len()
            )));
        }

        let split = start_ix.min(input.len());
        output[..split].copy_from_slice(&input[..split]);
        for i in split..input.len() {
            output[i] = input[i] * rotation(self.seq[i], direction);
        }
        Ok(())
    }

    pub fn scramble(&self, frame: &mut [Complex64], start_ix: usize) -> PhyResult<()> {
        self.apply_in_place(frame, start_ix, ScrambleDirection::Scramble)
    }

    pub fn descramble(&self, frame: &mut [Complex64], start_ix: usize) -> PhyResult<()> {
        self.apply_in_place(frame, start_ix, ScrambleDirection::Descramble)
    }

    fn apply_in_place(
        &self,
        frame: &mut [Complex64],
        start_ix: usize,
        direction: ScrambleDirection,
    ) -> PhyResult<()> {
        if frame.len() > self.seq.len() {
            return Err(PhyError::InvalidGeometry(format!(
                "frame of {} symbols exceeds the PL sequence ({})",
                frame.len(),
                self.seq.len()
            )));
        }
        for (i, x) in frame.iter_mut().enumerate().skip(start_ix) {
            *x *= rotation(self.seq[i], direction);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn random_frame(len: usize, seed: u64) -> Vec<Complex64> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (0..len)
            .map(|_| Complex64::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)))
            .collect()
    }

    #[test]
    fn test_rotation_quadrants() {
        let s = ScrambleDirection::Scramble;
        assert_eq!(rotation(0, s), Complex64::new(1.0, 0.0));
        assert_eq!(rotation(1, s), Complex64::new(0.0, 1.0));
        assert_eq!(rotation(2, s), Complex64::new(-1.0, 0.0));
        assert_eq!(rotation(3, s), Complex64::new(0.0, -1.0));
        for r in 0..4 {
            let p = rotation(r, s) * rotation(r, ScrambleDirection::Descramble);
            assert!((p - Complex64::new(1.0, 0.0)).norm() < 1e-15, "r={} gives {}", r, p);
        }
    }

    #[test]
    fn test_pl_involution() {
        let scrambler = PlScrambler::new();
        let original = random_frame(8370, 11);
        for start_ix in [0usize, 90, 1000, 8370, 9000] {
            let mut scrambled = vec![Complex64::default(); original.len()];
            let mut restored = vec![Complex64::default(); original.len()];
            scrambler
                .apply(&original, &mut scrambled, start_ix, ScrambleDirection::Scramble)
                .unwrap();
            scrambler
                .apply(&scrambled, &mut restored, start_ix, ScrambleDirection::Descramble)
                .unwrap();

            for (i, (a, b)) in original.iter().zip(restored.iter()).enumerate() {
                assert!((a - b).norm() < 1e-12, "start {} index {}: {} vs {}", start_ix, i, a, b);
            }
            for i in 0..start_ix.min(original.len()) {
                assert_eq!(scrambled[i], original[i], "header symbol {} rotated", i);
            }
        }
    }

    #[test]
    fn test_pl_in_place_matches_copy() {
        let scrambler = PlScrambler::new();
        let original = random_frame(5598, 3);
        let mut copied = vec![Complex64::default(); original.len()];
        scrambler
            .apply(&original, &mut copied, 90, ScrambleDirection::Scramble)
            .unwrap();
        let mut in_place = original.clone();
        scrambler.scramble(&mut in_place, 90).unwrap();
        assert_eq!(copied, in_place);
    }

    #[test]
    fn test_pl_length_errors() {
        let scrambler = PlScrambler::new();
        let input = vec![Complex64::default(); 10];
        let mut output = vec![Complex64::default(); 9];
        assert!(scrambler
            .apply(&input, &mut output, 0, ScrambleDirection::Scramble)
            .is_err());

        let mut too_long = vec![Complex64::default(); scrambler.max_len() + 1];
        assert!(scrambler.scramble(&mut too_long, 90).is_err());
    }
}
