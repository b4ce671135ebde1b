//! Gardner timing loop at two samples per symbol
//!
//! The loop is split from the interpolator: [`GardnerLoop::advance`] takes
//! the interpolated sample and runs detector, loop filter and interpolation
//! control. Both timing variants feed it the same arithmetic, so they stay
//! sample-for-sample identical.
//!
//! ```text
//! x ──►[Farrow(μ)]──y──►[TED]──e──►[PI filter]──v──►[NCO counter]──► strobe, μ
//!           ▲                                              │
//!           └──────────────────────────────────────────────┘
//! ```

use num_complex::Complex64;

/// Proportional and integral gains `(Kp, Ki)` of the loop filter.
///
/// Derived from the damping factor, the bandwidth normalized to the symbol
/// rate and the detector gain; the NCO gain is -1.
pub fn loop_coefficients(damping: f64, bandwidth: f64, detector_gain: f64) -> (f64, f64) {
    const K0: f64 = -1.0;
    let theta = bandwidth / 2.0 / (damping + 0.25 / damping);
    let d = (1.0 + 2.0 * damping * theta + theta * theta) * K0 * detector_gain;
    (4.0 * damping * theta / d, 4.0 * theta * theta / d)
}

/// Detector, loop filter and interpolation control state
#[derive(Debug, Clone)]
pub struct GardnerLoop {
    kp: f64,
    ki: f64,
    /// Strobe flag for the sample being produced
    is_strobe: bool,
    prev_is_strobe: bool,
    /// [head, mid] of the detector
    ted: [Complex64; 2],
    ted_error: f64,
    lf_prev_in: f64,
    lf_output: f64,
    counter: f64,
    mu: f64,
    last_symbol: Complex64,
}

impl GardnerLoop {
    pub fn new(damping: f64, bandwidth: f64, detector_gain: f64) -> Self {
        let (kp, ki) = loop_coefficients(damping, bandwidth, detector_gain);
        Self {
            kp,
            ki,
            is_strobe: false,
            prev_is_strobe: false,
            ted: [Complex64::default(); 2],
            ted_error: 0.0,
            lf_prev_in: 0.0,
            lf_output: 0.0,
            counter: 0.0,
            mu: 0.0,
            last_symbol: Complex64::default(),
        }
    }

    pub fn set_coefficients(&mut self, damping: f64, bandwidth: f64, detector_gain: f64) {
        let (kp, ki) = loop_coefficients(damping, bandwidth, detector_gain);
        self.kp = kp;
        self.ki = ki;
    }

    pub fn gains(&self) -> (f64, f64) {
        (self.kp, self.ki)
    }

    /// Fractional interval to apply to the next interpolation
    #[inline]
    pub fn mu(&self) -> f64 {
        self.mu
    }

    pub fn last_symbol(&self) -> Complex64 {
        self.last_symbol
    }

    pub fn ted_error(&self) -> f64 {
        self.ted_error
    }

    /// Consume one interpolated sample; returns whether it is a strobe
    #[inline]
    pub fn advance(&mut self, y: Complex64) -> bool {
        let strobe = self.is_strobe;
        if strobe {
            self.last_symbol = y;
        }
        self.ted_update(y);
        self.loop_filter();
        self.interpolation_control();
        strobe
    }

    #[inline]
    fn ted_update(&mut self, y: Complex64) {
        let history = self.is_strobe as u8 + 2 * self.prev_is_strobe as u8;
        let [head, mid] = self.ted;
        match history {
            1 => {
                self.ted_error = mid.re * (head.re - y.re) + mid.im * (head.im - y.im);
                self.ted = [Complex64::default(), y];
            }
            0 => self.ted_error = 0.0,
            // Two strobes in a row or a skipped one: shift without an error
            _ => {
                self.ted_error = 0.0;
                self.ted = [mid, y];
            }
        }
    }

    #[inline]
    fn loop_filter(&mut self) {
        let vi = self.lf_prev_in + self.ted_error * self.ki;
        self.lf_prev_in = vi;
        self.lf_output = self.ted_error * self.kp + vi;
    }

    #[inline]
    fn interpolation_control(&mut self) {
        let w = self.lf_output + 0.5;
        self.prev_is_strobe = self.is_strobe;
        self.is_strobe = self.counter < w;
        if self.is_strobe {
            self.mu = self.counter / w;
            self.counter += 1.0;
        }
        self.counter -= w;
    }

    pub fn reset(&mut self) {
        *self = Self {
            kp: self.kp,
            ki: self.ki,
            ..Self::new(1.0, 0.0, 1.0)
        };
    }
}

/// Bounded FIFO of recovered symbols
///
/// Pushes beyond capacity are dropped and counted; pulls from an empty
/// buffer yield zero and are counted.
#[derive(Debug, Clone)]
pub struct SymbolBuffer {
    buf: Vec<Complex64>,
    head: usize,
    tail: usize,
    len: usize,
    overflows: usize,
    underflows: usize,
}

impl SymbolBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: vec![Complex64::default(); capacity.max(1)],
            head: 0,
            tail: 0,
            len: 0,
            overflows: 0,
            underflows: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn overflows(&self) -> usize {
        self.overflows
    }

    pub fn underflows(&self) -> usize {
        self.underflows
    }

    #[inline]
    pub fn push(&mut self, s: Complex64) {
        if self.len < self.buf.len() {
            self.buf[self.head] = s;
            self.head = (self.head + 1) % self.buf.len();
            self.len += 1;
        } else {
            self.overflows += 1;
        }
    }

    #[inline]
    pub fn pull(&mut self) -> Complex64 {
        if self.len > 0 {
            let s = self.buf[self.tail];
            self.tail = (self.tail + 1) % self.buf.len();
            self.len -= 1;
            s
        } else {
            self.underflows += 1;
            Complex64::default()
        }
    }

    pub fn clear(&mut self) {
        self.buf.fill(Complex64::default());
        self.head = 0;
        self.tail = 0;
        self.len = 0;
        self.overflows = 0;
        self.underflows = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loop_coefficients() {
        let (kp, ki) = loop_coefficients(std::f64::consts::FRAC_1_SQRT_2, 5e-5, 2.0);
        let zeta = std::f64::consts::FRAC_1_SQRT_2;
        let theta = 5e-5 / 2.0 / (zeta + 0.25 / zeta);
        let d = -2.0 * (1.0 + 2.0 * zeta * theta + theta * theta);
        assert!((kp - 4.0 * zeta * theta / d).abs() < 1e-18);
        assert!((ki - 4.0 * theta * theta / d).abs() < 1e-22);
        assert!(kp < 0.0 && ki < 0.0, "negative NCO gain flips both: {} {}", kp, ki);
    }

    #[test]
    fn test_idle_loop_strobes_every_other_sample() {
        let mut lp = GardnerLoop::new(1.0, 0.0, 1.0);
        let flags: Vec<bool> = (0..10).map(|_| lp.advance(Complex64::default())).collect();
        assert_eq!(
            flags,
            vec![false, true, false, true, false, true, false, true, false, true]
        );
        assert_eq!(lp.mu(), 0.0);
    }

    #[test]
    fn test_ted_error_on_strobe() {
        let mut lp = GardnerLoop::new(1.0, 0.0, 1.0);
        lp.ted = [Complex64::new(1.0, 1.0), Complex64::new(0.5, -0.5)];
        lp.is_strobe = true;
        lp.advance(Complex64::new(-1.0, 1.0));
        // mid·(head - y) = 0.5·2 + (-0.5)·0
        assert_eq!(lp.ted_error(), 1.0);
        assert_eq!(lp.ted, [Complex64::default(), Complex64::new(-1.0, 1.0)]);
        assert_eq!(lp.last_symbol(), Complex64::new(-1.0, 1.0));
    }

    #[test]
    fn test_reset_keeps_gains() {
        let mut lp = GardnerLoop::new(0.7, 1e-2, 2.0);
        let gains = lp.gains();
        for i in 0..50 {
            lp.advance(Complex64::new((i as f64).sin(), (i as f64).cos()));
        }
        lp.reset();
        assert_eq!(lp.gains(), gains);
        assert_eq!(lp.mu(), 0.0);
        assert!(!lp.is_strobe);
        assert_eq!(lp.last_symbol(), Complex64::default());
    }

    #[test]
    fn test_symbol_buffer_overflow_underflow() {
        let mut b = SymbolBuffer::new(3);
        for i in 0..5 {
            b.push(Complex64::new(i as f64, 0.0));
        }
        assert_eq!(b.len(), 3);
        assert_eq!(b.overflows(), 2);
        let pulled: Vec<f64> = (0..4).map(|_| b.pull().re).collect();
        assert_eq!(pulled, vec![0.0, 1.0, 2.0, 0.0]);
        assert_eq!(b.underflows(), 1);
        assert!(b.is_empty());
        b.clear();
        assert_eq!(b.overflows(), 0);
        assert_eq!(b.underflows(), 0);
    }
}
