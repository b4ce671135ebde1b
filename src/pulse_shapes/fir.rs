//! Streaming FIR filters over a pulse shape
//!
//! History survives between calls so consecutive frames filter as one
//! continuous stream.

use num_complex::Complex64;

use crate::error::{check_len, PhyResult};
use crate::traits::PulseShape;

/// Sample history kept twice over so the last `len` samples are always a
/// contiguous slice.
#[derive(Debug, Clone)]
struct History {
    buf: Vec<Complex64>,
    head: usize,
    len: usize,
}

impl History {
    fn new(len: usize) -> Self {
        Self {
            buf: vec![Complex64::default(); 2 * len],
            head: 0,
            len,
        }
    }

    /// Push a sample and return the window, oldest first
    #[inline]
    fn push(&mut self, x: Complex64) -> &[Complex64] {
        let h = self.head;
        self.buf[h] = x;
        self.buf[h + self.len] = x;
        self.head = (h + 1) % self.len;
        &self.buf[h + 1..h + 1 + self.len]
    }

    fn clear(&mut self) {
        self.buf.fill(Complex64::default());
        self.head = 0;
    }
}

/// RX matched filter, one output per input sample
#[derive(Debug, Clone)]
pub struct MatchedFilter<P: PulseShape> {
    pulse: P,
    history: History,
}

impl<P: PulseShape> MatchedFilter<P> {
    pub fn new(pulse: P) -> Self {
        let history = History::new(pulse.filter_len());
        Self { pulse, history }
    }

    #[inline]
    pub fn step(&mut self, x: Complex64) -> Complex64 {
        let window = self.history.push(x);
        self.pulse.filter(window)
    }

    pub fn filter(&mut self, input: &[Complex64], output: &mut [Complex64]) -> PhyResult<()> {
        check_len("matched filter output", input.len(), output.len())?;
        for (x, y) in input.iter().zip(output.iter_mut()) {
            *y = self.step(*x);
        }
        Ok(())
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }

    pub fn pulse(&self) -> &P {
        &self.pulse
    }
}

/// TX shaping filter, `sps` outputs per input symbol
#[derive(Debug, Clone)]
pub struct ShapingFilter<P: PulseShape> {
    pulse: P,
    /// Polyphase branches: `phases[f][k] = h[f + k·sps]`
    phases: Vec<Vec<f64>>,
    history: History,
}

impl<P: PulseShape> ShapingFilter<P> {
    pub fn new(pulse: P) -> Self {
        let sps = pulse.samples_per_symbol().max(1);
        let mut phases = vec![Vec::new(); sps];
        for (i, &c) in pulse.coefficients().iter().enumerate() {
            phases[i % sps].push(c);
        }
        let depth = phases.iter().map(Vec::len).max().unwrap_or(1);
        Self {
            pulse,
            phases,
            history: History::new(depth),
        }
    }

    /// Upsample and filter one symbol into `out` (length `sps`)
    pub fn step(&mut self, symbol: Complex64, out: &mut [Complex64]) {
        let window = self.history.push(symbol);
        for (y, branch) in out.iter_mut().zip(self.phases.iter()) {
            // branch[k] multiplies the symbol k periods back (newest is last)
            *y = branch
                .iter()
                .zip(window.iter().rev())
                .map(|(c, x)| *x * *c)
                .sum();
        }
    }

    pub fn filter(&mut self, symbols: &[Complex64], output: &mut [Complex64]) -> PhyResult<()> {
        let sps = self.phases.len();
        check_len("shaping filter output", symbols.len() * sps, output.len())?;
        for (s, out) in symbols.iter().zip(output.chunks_exact_mut(sps)) {
            self.step(*s, out);
        }
        Ok(())
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }

    pub fn pulse(&self) -> &P {
        &self.pulse
    }
}
