//! Small DSP math helpers

use num_complex::Complex64;
use std::f64::consts::{PI, TAU};

/// Convert a power ratio in dB to linear scale
#[inline]
pub fn db_to_power(db: f64) -> f64 {
    10.0_f64.powf(db / 10.0)
}

/// Convert a linear power ratio to dB
#[inline]
pub fn power_to_db(linear: f64) -> f64 {
    10.0 * linear.log10()
}

/// Normalize angle to [0, 2π)
#[inline]
pub fn normalize_angle(angle: f64) -> f64 {
    let a = angle.rem_euclid(TAU);
    // rem_euclid may round up to exactly 2π
    if a >= TAU {
        0.0
    } else {
        a
    }
}

/// Per-component noise standard deviation for unit-energy symbols at `esn0_db`
#[inline]
pub fn esn0_to_sigma(esn0_db: f64) -> f64 {
    (1.0 / (2.0 * db_to_power(esn0_db))).sqrt()
}

/// Inverse of [`esn0_to_sigma`]
#[inline]
pub fn sigma_to_esn0(sigma: f64) -> f64 {
    power_to_db(1.0 / (2.0 * sigma * sigma))
}

/// Eb/N0 from Es/N0 for a code rate and bits per symbol
#[inline]
pub fn esn0_to_ebn0(esn0_db: f64, code_rate: f64, bits_per_symbol: usize) -> f64 {
    esn0_db - power_to_db(code_rate * bits_per_symbol as f64)
}

/// Least-squares line `y = slope·t + intercept`.
///
/// With a single point, or all `t` equal, the slope is 0 and the intercept
/// is the mean of `y`. Returns `None` for empty input.
pub fn ols_fit(t: &[f64], y: &[f64]) -> Option<(f64, f64)> {
    let n = t.len().min(y.len());
    if n == 0 {
        return None;
    }
    let (mut st, mut sy, mut sty, mut stt) = (0.0, 0.0, 0.0, 0.0);
    for (ti, yi) in t.iter().zip(y) {
        st += ti;
        sy += yi;
        sty += ti * yi;
        stt += ti * ti;
    }
    let nf = n as f64;
    let den = nf * stt - st * st;
    let slope = if den.abs() > f64::EPSILON * nf * stt.max(1.0) {
        (nf * sty - st * sy) / den
    } else {
        0.0
    };
    Some((slope, (sy - slope * st) / nf))
}

/// Derotate `input` along the phase line `2π(freq·n + phase)`, `n` counted
/// from the first sample
pub fn derotate(input: &[Complex64], output: &mut [Complex64], freq: f64, phase: f64) {
    for (n, (x, y)) in input.iter().zip(output.iter_mut()).enumerate() {
        let theta = 2.0 * PI * (freq * n as f64 + phase);
        *y = x * Complex64::from_polar(1.0, -theta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_conversion() {
        assert!((db_to_power(0.0) - 1.0).abs() < 1e-12);
        assert!((db_to_power(10.0) - 10.0).abs() < 1e-10);
        assert!((power_to_db(0.01) + 20.0).abs() < 1e-10);
    }

    #[test]
    fn test_normalize_angle() {
        assert!((normalize_angle(0.0) - 0.0).abs() < 1e-10);
        assert!((normalize_angle(2.0 * PI) - 0.0).abs() < 1e-10);
        assert!((normalize_angle(-PI) - PI).abs() < 1e-10);
        assert!((normalize_angle(-1e-20)).abs() < 1e-10);
        assert!(normalize_angle(-1e-20) < TAU);
    }

    #[test]
    fn test_sigma_esn0_inverse() {
        for esn0 in [-3.0, 0.0, 4.5, 12.0] {
            let sigma = esn0_to_sigma(esn0);
            assert!((sigma_to_esn0(sigma) - esn0).abs() < 1e-9, "{} dB -> {}", esn0, sigma);
        }
        assert!((esn0_to_sigma(0.0) - 0.5_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_ebn0() {
        // rate 1/2 QPSK carries one bit per symbol
        assert!((esn0_to_ebn0(3.0, 0.5, 2) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_ols_fit_line() {
        let t = [1.0, 4.0, 9.0, 10.0];
        let y: Vec<f64> = t.iter().map(|t| 0.25 * t - 3.0).collect();
        let (slope, intercept) = ols_fit(&t, &y).unwrap();
        assert!((slope - 0.25).abs() < 1e-12, "slope {}", slope);
        assert!((intercept + 3.0).abs() < 1e-12, "intercept {}", intercept);
    }

    #[test]
    fn test_ols_fit_degenerate() {
        assert_eq!(ols_fit(&[], &[]), None);
        assert_eq!(ols_fit(&[5.0], &[0.3]), Some((0.0, 0.3)));
    }

    #[test]
    fn test_derotate() {
        let input: Vec<Complex64> = (0..16)
            .map(|n| Complex64::from_polar(1.0, 2.0 * PI * (0.01 * n as f64 + 0.2)))
            .collect();
        let mut out = vec![Complex64::default(); 16];
        derotate(&input, &mut out, 0.01, 0.2);
        for y in &out {
            assert!((y - Complex64::new(1.0, 0.0)).norm() < 1e-12, "{}", y);
        }
    }
}
