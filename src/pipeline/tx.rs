//! Transmit chain used to drive the receiver in tests and benchmarks

use num_complex::Complex64;

use crate::error::{check_len, PhyResult};
use crate::framer::Framer;
use crate::params::{DvbS2Params, PLHEADER_SIZE};
use crate::pulse_shapes::{RootRaisedCosine, ShapingFilter};
use crate::scrambler::PlScrambler;

/// XFEC frames in, shaped samples out
///
/// Filter state carries across frames, so consecutive calls produce one
/// continuous stream.
#[derive(Debug, Clone)]
pub struct Transmitter {
    framer: Framer,
    scrambler: PlScrambler,
    shaping: ShapingFilter<RootRaisedCosine>,
    osf: usize,
    pl_frame: Vec<Complex64>,
}

impl Transmitter {
    pub fn new(params: &DvbS2Params) -> Self {
        let cfg = &params.sync;
        let rrc = RootRaisedCosine::new(cfg.osf, cfg.rolloff, cfg.grp_delay);
        Self {
            framer: Framer::new(params.modcod, params.geometry.clone()),
            scrambler: PlScrambler::new(),
            shaping: ShapingFilter::new(rrc),
            osf: cfg.osf,
            pl_frame: vec![Complex64::default(); params.geometry.pl_frame_size],
        }
    }

    pub fn framer(&self) -> &Framer {
        &self.framer
    }

    pub fn xfec_len(&self) -> usize {
        self.framer.geometry().xfec_frame_size
    }

    /// Samples produced per frame
    pub fn n_out(&self) -> usize {
        self.osf * self.pl_frame.len()
    }

    /// Frame, scramble and shape one XFEC frame into `output`
    pub fn process_frame_into(
        &mut self,
        xfec: &[Complex64],
        output: &mut [Complex64],
    ) -> PhyResult<()> {
        check_len("transmitter output", self.n_out(), output.len())?;
        self.framer.generate(xfec, &mut self.pl_frame)?;
        self.scrambler.scramble(&mut self.pl_frame, PLHEADER_SIZE)?;
        self.shaping.filter(&self.pl_frame, output)
    }

    pub fn process_frame(&mut self, xfec: &[Complex64]) -> PhyResult<Vec<Complex64>> {
        let mut out = vec![Complex64::default(); self.n_out()];
        self.process_frame_into(xfec, &mut out)?;
        Ok(out)
    }

    pub fn reset(&mut self) {
        self.shaping.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pulse_shapes::MatchedFilter;

    fn qpsk_frame(len: usize, seed: usize) -> Vec<Complex64> {
        let s = std::f64::consts::FRAC_1_SQRT_2;
        (0..len)
            .map(|i| {
                let k = (i * 7 + seed * 13 + (i * i) % 11) % 4;
                Complex64::new(if k & 1 == 0 { s } else { -s }, if k & 2 == 0 { s } else { -s })
            })
            .collect()
    }

    #[test]
    fn test_output_size() {
        let params = DvbS2Params::new("QPSK-S_8/9").unwrap();
        let mut tx = Transmitter::new(&params);
        let out = tx.process_frame(&qpsk_frame(tx.xfec_len(), 0)).unwrap();
        assert_eq!(out.len(), 2 * 8370);
        assert!(tx.process_frame(&qpsk_frame(10, 0)).is_err());
    }

    #[test]
    fn test_matched_filter_recovers_plheader() {
        let params = DvbS2Params::new("8PSK-S_8/9").unwrap();
        let mut tx = Transmitter::new(&params);
        let xfec = qpsk_frame(tx.xfec_len(), 1);
        let mut samples = tx.process_frame(&xfec).unwrap();
        samples.extend(tx.process_frame(&xfec).unwrap());

        let mut mf = MatchedFilter::new(RootRaisedCosine::new(2, 0.2, 20));
        let mut filtered = vec![Complex64::default(); samples.len()];
        mf.filter(&samples, &mut filtered).unwrap();

        // TX and RX filters each delay by grp_delay symbols
        let n = params.geometry.pl_frame_size;
        let header = tx.framer().plheader();
        for (k, h) in header.iter().enumerate() {
            let y = filtered[2 * (n + 40 + k)];
            assert!((y - h).norm() < 0.05, "header symbol {}: {} vs {}", k, y, h);
        }
    }

    #[test]
    fn test_average_power() {
        let params = DvbS2Params::new("").unwrap();
        let mut tx = Transmitter::new(&params);
        tx.process_frame(&qpsk_frame(tx.xfec_len(), 2)).unwrap();
        let out = tx.process_frame(&qpsk_frame(tx.xfec_len(), 3)).unwrap();
        let power = out.iter().map(|x| x.norm_sqr()).sum::<f64>() / out.len() as f64;
        assert!((power - 0.5).abs() < 0.05, "power per sample {}", power);
    }
}
