// SPDX: CC0-1.0

//! Riemann zeta and Gamma over `f64` complex numbers.
//!
//! Zeta uses Borwein's accelerated alternating series for the Dirichlet eta
//! function when `Re(s) >= 0` and the functional equation otherwise. Gamma
//! uses the Lanczos approximation (g = 7) with reflection for `Re(z) < 1/2`.
//! Both return NaN parts at their poles so that callers see the undefined
//! sentinel after normalization.

use crate::Complex;
use core::f64::consts::PI;
use std::sync::OnceLock;

/// Number of terms in the Borwein series. Error is roughly `(3 + √8)^-N`
/// times a factor growing like `e^{π|Im s|/2}`.
const BORWEIN_TERMS: usize = 50;

const LANCZOS_G: f64 = 7.0;
const LANCZOS: [f64; 9] = [
    0.999_999_999_999_809_9,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_6,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_572e-6,
    1.505_632_735_149_311_6e-7,
];

fn undefined() -> Complex {
    Complex::new(f64::NAN, f64::NAN)
}

/// Borwein's `d_k` for `k = 0..=n`, built on first use.
fn borwein_coefficients() -> &'static [f64; BORWEIN_TERMS + 1] {
    static TABLE: OnceLock<[f64; BORWEIN_TERMS + 1]> = OnceLock::new();
    TABLE.get_or_init(build_borwein_coefficients)
}

fn build_borwein_coefficients() -> [f64; BORWEIN_TERMS + 1] {
    let n = BORWEIN_TERMS as f64;
    let mut d = [0.0; BORWEIN_TERMS + 1];
    // term_i = (n + i - 1)! 4^i / ((n - i)! (2i)!), term_0 = 1/n
    let mut term = 1.0 / n;
    let mut sum = term;
    d[0] = n * sum;
    for (i, dk) in d.iter_mut().enumerate().skip(1) {
        let prev = (i - 1) as f64;
        term *= 4.0 * (n + prev) * (n - prev) / ((2.0 * prev + 1.0) * (2.0 * prev + 2.0));
        sum += term;
        *dk = n * sum;
    }
    d
}

fn eta(s: Complex) -> Complex {
    let d = borwein_coefficients();
    let dn = d[BORWEIN_TERMS];
    let mut sum = Complex::new(0.0, 0.0);
    for (k, dk) in d.iter().take(BORWEIN_TERMS).enumerate() {
        let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
        // (k + 1)^{-s}
        let term = (-s * ((k + 1) as f64).ln()).exp();
        sum += term * (sign * (dk - dn));
    }
    sum * (-1.0 / dn)
}

pub fn zeta(s: Complex) -> Complex {
    if !(s.re.is_finite() && s.im.is_finite()) {
        return undefined();
    }
    if s.re == 1.0 && s.im == 0.0 {
        return undefined();
    }

    if s.re < 0.0 {
        // zeta(s) = 2^s pi^{s-1} sin(pi s / 2) gamma(1 - s) zeta(1 - s)
        let one = Complex::new(1.0, 0.0);
        let two_s = (s * 2f64.ln()).exp();
        let pi_s = ((s - one) * PI.ln()).exp();
        let sine = (s * (PI / 2.0)).sin();
        return two_s * pi_s * sine * gamma(one - s) * zeta(one - s);
    }

    // zeta(s) = eta(s) / (1 - 2^{1-s})
    let denom = Complex::new(1.0, 0.0) - ((Complex::new(1.0, 0.0) - s) * 2f64.ln()).exp();
    eta(s) / denom
}

pub fn gamma(z: Complex) -> Complex {
    if !(z.re.is_finite() && z.im.is_finite()) {
        return undefined();
    }
    if z.im == 0.0 && z.re <= 0.0 && z.re.fract() == 0.0 {
        return undefined();
    }

    if z.re < 0.5 {
        // gamma(z) gamma(1 - z) = pi / sin(pi z)
        let one = Complex::new(1.0, 0.0);
        return Complex::new(PI, 0.0) / ((z * PI).sin() * gamma(one - z));
    }

    let z = z - 1.0;
    let mut x = Complex::new(LANCZOS[0], 0.0);
    for (i, p) in LANCZOS.iter().enumerate().skip(1) {
        x += Complex::new(*p, 0.0) / (z + i as f64);
    }
    let t = z + (LANCZOS_G + 0.5);
    let sqrt_two_pi = (2.0 * PI).sqrt();
    // t^{z + 1/2} e^{-t}
    let pow = ((z + 0.5) * t.ln() - t).exp();
    pow * x * sqrt_two_pi
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Complex, b: Complex, tol: f64) -> bool {
        (a - b).norm() < tol
    }

    #[test]
    fn gamma_matches_factorials() {
        assert!(close(gamma(Complex::new(1.0, 0.0)), Complex::new(1.0, 0.0), 1e-12));
        assert!(close(gamma(Complex::new(5.0, 0.0)), Complex::new(24.0, 0.0), 1e-9));
        assert!(close(
            gamma(Complex::new(0.5, 0.0)),
            Complex::new(PI.sqrt(), 0.0),
            1e-12
        ));
    }

    #[test]
    fn gamma_poles_are_undefined() {
        assert!(gamma(Complex::new(0.0, 0.0)).re.is_nan());
        assert!(gamma(Complex::new(-3.0, 0.0)).im.is_nan());
    }

    #[test]
    fn zeta_known_values() {
        assert!(close(
            zeta(Complex::new(2.0, 0.0)),
            Complex::new(PI * PI / 6.0, 0.0),
            1e-10
        ));
        assert!(close(
            zeta(Complex::new(-1.0, 0.0)),
            Complex::new(-1.0 / 12.0, 0.0),
            1e-10
        ));
        assert!(zeta(Complex::new(-2.0, 0.0)).norm() < 1e-10);
    }

    #[test]
    fn zeta_first_nontrivial_zero() {
        let rho = Complex::new(0.5, 14.134_725_141_734_693);
        assert!(zeta(rho).norm() < 1e-8);
    }

    #[test]
    fn borwein_table_is_built_once() {
        let d = borwein_coefficients();
        assert!(core::ptr::eq(d, borwein_coefficients()));
        assert!((d[0] - 1.0).abs() < 1e-15);
        assert!(d.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn zeta_pole_is_undefined() {
        assert!(zeta(Complex::new(1.0, 0.0)).re.is_nan());
    }
}
