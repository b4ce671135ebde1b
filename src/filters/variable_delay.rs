//! Integer delay line with a run-time adjustable delay
//!
//! `out[n] = in[n - d]` over the continuous stream, `0 <= d <= max_delay`.

use num_complex::Complex64;

#[derive(Debug, Clone)]
pub struct VariableDelay {
    buf: Vec<Complex64>,
    write: usize,
    delay: usize,
}

impl VariableDelay {
    pub fn new(max_delay: usize) -> Self {
        Self {
            buf: vec![Complex64::default(); max_delay + 1],
            write: 0,
            delay: 0,
        }
    }

    pub fn max_delay(&self) -> usize {
        self.buf.len() - 1
    }

    pub fn delay(&self) -> usize {
        self.delay
    }

    /// Set the delay, clamped to the maximum
    pub fn set_delay(&mut self, delay: usize) {
        self.delay = delay.min(self.max_delay());
    }

    #[inline]
    pub fn step(&mut self, x: Complex64) -> Complex64 {
        let size = self.buf.len();
        self.buf[self.write] = x;
        let read = (self.write + size - self.delay) % size;
        self.write = (self.write + 1) % size;
        self.buf[read]
    }

    pub fn filter(&mut self, input: &[Complex64], output: &mut [Complex64]) {
        debug_assert_eq!(input.len(), output.len());
        for (x, y) in input.iter().zip(output.iter_mut()) {
            *y = self.step(*x);
        }
    }

    pub fn reset(&mut self) {
        self.buf.fill(Complex64::default());
        self.write = 0;
        self.delay = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize) -> Vec<Complex64> {
        (1..=n).map(|i| Complex64::new(i as f64, 0.0)).collect()
    }

    #[test]
    fn test_zero_delay_passthrough() {
        let mut d = VariableDelay::new(10);
        let x = ramp(20);
        let mut y = vec![Complex64::default(); 20];
        d.filter(&x, &mut y);
        assert_eq!(x, y);
    }

    #[test]
    fn test_fixed_delay() {
        let mut d = VariableDelay::new(10);
        d.set_delay(7);
        let x = ramp(30);
        let mut y = vec![Complex64::default(); 30];
        d.filter(&x, &mut y);
        for n in 0..30 {
            let expected = if n >= 7 { x[n - 7] } else { Complex64::default() };
            assert_eq!(y[n], expected, "n = {}", n);
        }
    }

    #[test]
    fn test_delay_change_mid_stream() {
        let mut d = VariableDelay::new(16);
        let x = ramp(40);
        let mut y = vec![Complex64::default(); 40];
        d.set_delay(3);
        d.filter(&x[..20], &mut y[..20]);
        d.set_delay(12);
        d.filter(&x[20..], &mut y[20..]);
        assert_eq!(y[19], x[16]);
        assert_eq!(y[20], x[8]);
        assert_eq!(y[39], x[27]);
    }

    #[test]
    fn test_delay_clamped() {
        let mut d = VariableDelay::new(5);
        d.set_delay(99);
        assert_eq!(d.delay(), 5);
        d.reset();
        assert_eq!(d.delay(), 0);
    }
}
