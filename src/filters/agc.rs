//! Block automatic gain control
//!
//! Scales a block so its variance equals `output_energy`. The mean is
//! removed from the variance estimate but not from the samples.

use num_complex::Complex64;

use crate::error::{check_len, PhyResult};

#[derive(Debug, Clone, Copy)]
pub struct Agc {
    output_energy: f64,
    last_gain: f64,
}

impl Agc {
    pub fn new(output_energy: f64) -> Self {
        Self {
            output_energy,
            last_gain: 1.0,
        }
    }

    pub fn output_energy(&self) -> f64 {
        self.output_energy
    }

    /// Gain applied to the most recent block
    pub fn last_gain(&self) -> f64 {
        self.last_gain
    }

    fn gain(&mut self, block: &[Complex64]) -> f64 {
        let n = block.len() as f64;
        let (sum, energy) = block
            .iter()
            .fold((Complex64::default(), 0.0), |(s, e), x| (s + *x, e + x.norm_sqr()));
        let std = (n * energy - sum.norm_sqr()).max(0.0).sqrt() / n / self.output_energy.sqrt();
        self.last_gain = if std > 0.0 && std.is_finite() { 1.0 / std } else { 1.0 };
        self.last_gain
    }

    pub fn apply(&mut self, input: &[Complex64], output: &mut [Complex64]) -> PhyResult<()> {
        check_len("agc output", input.len(), output.len())?;
        if input.is_empty() {
            return Ok(());
        }
        let g = self.gain(input);
        for (x, y) in input.iter().zip(output.iter_mut()) {
            *y = *x * g;
        }
        Ok(())
    }

    pub fn apply_in_place(&mut self, block: &mut [Complex64]) {
        if block.is_empty() {
            return;
        }
        let g = self.gain(block);
        block.iter_mut().for_each(|x| *x *= g);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agc_normalizes_variance() {
        let input: Vec<Complex64> = (0..1000)
            .map(|i| Complex64::from_polar(7.5, i as f64 * 0.37))
            .collect();
        for target in [1.0, 0.5] {
            let mut agc = Agc::new(target);
            let mut out = vec![Complex64::default(); input.len()];
            agc.apply(&input, &mut out).unwrap();
            let n = out.len() as f64;
            let mean: Complex64 = out.iter().sum::<Complex64>() / n;
            let var = out.iter().map(|x| (*x - mean).norm_sqr()).sum::<f64>() / n;
            assert!((var - target).abs() < 1e-9, "target {} variance {}", target, var);
        }
    }

    #[test]
    fn test_agc_passes_constant_block() {
        let mut block = vec![Complex64::new(2.0, -1.0); 16];
        let mut agc = Agc::new(1.0);
        agc.apply_in_place(&mut block);
        assert_eq!(agc.last_gain(), 1.0);
        assert!(block.iter().all(|x| *x == Complex64::new(2.0, -1.0)));
    }

    #[test]
    fn test_agc_length_mismatch() {
        let mut agc = Agc::new(1.0);
        let mut out = vec![Complex64::default(); 3];
        assert!(agc.apply(&[Complex64::default(); 4], &mut out).is_err());
    }
}
