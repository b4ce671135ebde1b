//! Cubic Farrow fractional-delay interpolator
//!
//! Three branch filters run on the input delay line `x[n-3..=n]` and the
//! output is a polynomial in `mu` evaluated in Horner form:
//!
//! ```text
//! c0 = x[n-2]
//! c1 = (-x[n-3] - x[n-2] + 3·x[n-1] - x[n]) / 2
//! c2 = ( x[n-3] - x[n-2] -   x[n-1] + x[n]) / 2
//! y  = c0 + mu·(c1 + mu·c2)
//! ```
//!
//! The branches depend on the inputs only, so a block of them can be
//! computed ahead of time and `mu` applied sample by sample afterwards.

use num_complex::Complex64;

/// Branch outputs `[c0, c1, c2]` for a delay line, oldest sample first
#[inline]
pub fn farrow_branches(line: &[Complex64; 4]) -> [Complex64; 3] {
    let [x0, x1, x2, x3] = *line;
    [
        x1,
        (x2 * 3.0 - x0 - x1 - x3) * 0.5,
        (x0 - x1 - x2 + x3) * 0.5,
    ]
}

/// Evaluate the interpolating polynomial at `mu`
#[inline]
pub fn horner(c: &[Complex64; 3], mu: f64) -> Complex64 {
    c[0] + (c[1] + c[2] * mu) * mu
}

/// Farrow filter with its input delay line
#[derive(Debug, Clone, Default)]
pub struct FarrowFilter {
    /// x[n-3], x[n-2], x[n-1], x[n]
    line: [Complex64; 4],
    mu: f64,
}

impl FarrowFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mu(&self) -> f64 {
        self.mu
    }

    pub fn set_mu(&mut self, mu: f64) {
        self.mu = mu;
    }

    /// Shift one input into the delay line and interpolate
    #[inline]
    pub fn step(&mut self, x: Complex64) -> Complex64 {
        self.push(x);
        horner(&farrow_branches(&self.line), self.mu)
    }

    /// Shift one input without computing an output
    #[inline]
    pub fn push(&mut self, x: Complex64) {
        self.line.rotate_left(1);
        self.line[3] = x;
    }

    /// Delay line contents, oldest first
    pub fn line(&self) -> &[Complex64; 4] {
        &self.line
    }

    /// Push a block of inputs, writing the branch outputs after each push
    pub fn branches(&mut self, input: &[Complex64], out: &mut [[Complex64; 3]]) {
        debug_assert_eq!(input.len(), out.len());
        for (x, c) in input.iter().zip(out.iter_mut()) {
            self.push(*x);
            *c = farrow_branches(&self.line);
        }
    }

    /// Interpolate a block with the current `mu`
    pub fn filter(&mut self, input: &[Complex64], output: &mut [Complex64]) {
        debug_assert_eq!(input.len(), output.len());
        for (x, y) in input.iter().zip(output.iter_mut()) {
            *y = self.step(*x);
        }
    }

    pub fn reset(&mut self) {
        self.line = [Complex64::default(); 4];
        self.mu = 0.0;
    }
}
