//! PL framing
//!
//! [`Framer::generate`] prepends the PLHEADER and inserts a pilot block after
//! every 16 slots of payload; [`Framer::remove_plh`] undoes both.

pub mod plheader;

use num_complex::Complex64;
use std::f64::consts::FRAC_1_SQRT_2;

use crate::error::{check_len, PhyResult};
use crate::params::{FrameGeometry, Modcod, PLHEADER_SIZE, SLOTS_PER_PILOT};

pub use plheader::build_plheader;

/// Value of every pilot symbol
pub const PILOT_SYMBOL: Complex64 = Complex64::new(FRAC_1_SQRT_2, FRAC_1_SQRT_2);

/// Header and pilot insertion for one MODCOD
#[derive(Debug, Clone)]
pub struct Framer {
    geometry: FrameGeometry,
    plheader: [Complex64; PLHEADER_SIZE],
}

impl Framer {
    pub fn new(modcod: Modcod, geometry: FrameGeometry) -> Self {
        Self {
            geometry,
            plheader: build_plheader(modcod),
        }
    }

    pub fn plheader(&self) -> &[Complex64; PLHEADER_SIZE] {
        &self.plheader
    }

    pub fn geometry(&self) -> &FrameGeometry {
        &self.geometry
    }

    fn data_per_block(&self) -> usize {
        SLOTS_PER_PILOT * self.geometry.slot_size
    }

    /// Build a PL frame from one XFEC frame
    pub fn generate(&self, xfec: &[Complex64], pl_frame: &mut [Complex64]) -> PhyResult<()> {
        let g = &self.geometry;
        check_len("framer input", g.xfec_frame_size, xfec.len())?;
        check_len("framer output", g.pl_frame_size, pl_frame.len())?;

        pl_frame[..PLHEADER_SIZE].copy_from_slice(&self.plheader);

        let block = self.data_per_block();
        let mut out = PLHEADER_SIZE;
        let mut data = xfec.chunks_exact(block);
        for chunk in data.by_ref().take(g.n_pilots) {
            pl_frame[out..out + block].copy_from_slice(chunk);
            out += block;
            pl_frame[out..out + g.pilot_size].fill(PILOT_SYMBOL);
            out += g.pilot_size;
        }

        let tail = &xfec[g.n_pilots * block..];
        pl_frame[out..out + tail.len()].copy_from_slice(tail);
        Ok(())
    }

    /// Strip header and pilots from a PL frame
    pub fn remove_plh(&self, pl_frame: &[Complex64], xfec: &mut [Complex64]) -> PhyResult<()> {
        let g = &self.geometry;
        check_len("deframer input", g.pl_frame_size, pl_frame.len())?;
        check_len("deframer output", g.xfec_frame_size, xfec.len())?;

        let block = self.data_per_block();
        let mut src = PLHEADER_SIZE;
        let mut dst = 0;
        for _ in 0..g.n_pilots {
            xfec[dst..dst + block].copy_from_slice(&pl_frame[src..src + block]);
            dst += block;
            src += block + g.pilot_size;
        }

        let rem = g.xfec_frame_size - dst;
        xfec[dst..].copy_from_slice(&pl_frame[src..src + rem]);
        Ok(())
    }

    /// Allocating form of [`Framer::generate`]
    pub fn generate_vec(&self, xfec: &[Complex64]) -> PhyResult<Vec<Complex64>> {
        let mut out = vec![Complex64::default(); self.geometry.pl_frame_size];
        self.generate(xfec, &mut out)?;
        Ok(out)
    }

    /// Allocating form of [`Framer::remove_plh`]
    pub fn remove_plh_vec(&self, pl_frame: &[Complex64]) -> PhyResult<Vec<Complex64>> {
        let mut out = vec![Complex64::default(); self.geometry.xfec_frame_size];
        self.remove_plh(pl_frame, &mut out)?;
        Ok(out)
    }
}
