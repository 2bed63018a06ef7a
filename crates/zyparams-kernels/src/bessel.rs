//! Scaled modified Bessel functions of complex argument.
//!
//! The internal-conductor kernel (spec §4.1) needs `I_0, I_1, K_0, K_1`
//! evaluated at arguments `w = m·r` whose magnitude grows with
//! frequency and conductivity and routinely exceeds what an
//! unscaled evaluation can represent in `f64`. Every function here
//! therefore returns the *scaled* variant directly:
//!
//! - `i0_scaled(z) = I_0(z)·e^{-Re(z)}`, `i1_scaled(z) = I_1(z)·e^{-Re(z)}`
//! - `k0_scaled(z) = K_0(z)·e^{Re(z)}`, `k1_scaled(z) = K_1(z)·e^{Re(z)}`
//!
//! For `|z|` below a threshold the unscaled series converges without
//! overflow and is evaluated directly, then rescaled. Above the
//! threshold, the scaled asymptotic expansion is evaluated directly so
//! its magnitude stays O(1) regardless of how large `|z|` actually is.

use num_complex::Complex64;
use zyparams_core::{apply_with_partials, ComplexM, Scalar};

const SERIES_CUTOFF: f64 = 20.0;
const MAX_TERMS: usize = 200;
const SERIES_EPS: f64 = 1e-17;
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

fn unscaled_i0_series(z: Complex64) -> Complex64 {
    let z2_over_4 = (z * z) * 0.25;
    let mut term = Complex64::new(1.0, 0.0);
    let mut sum = term;
    for k in 1..MAX_TERMS {
        term = term * z2_over_4 / (k as f64 * k as f64);
        sum += term;
        if term.norm() < SERIES_EPS * sum.norm().max(1.0) {
            break;
        }
    }
    sum
}

fn unscaled_i1_series(z: Complex64) -> Complex64 {
    let z2_over_4 = (z * z) * 0.25;
    let mut term = z * 0.5;
    let mut sum = term;
    for k in 1..MAX_TERMS {
        term = term * z2_over_4 / (k as f64 * (k as f64 + 1.0));
        sum += term;
        if term.norm() < SERIES_EPS * sum.norm().max(1.0) {
            break;
        }
    }
    sum
}

fn unscaled_k0_series(z: Complex64) -> Complex64 {
    let half = z * 0.5;
    let ln_half = half.ln();
    let i0 = unscaled_i0_series(z);
    let z2_over_4 = (z * z) * 0.25;
    let mut term = Complex64::new(1.0, 0.0);
    let mut harmonic = 0.0_f64;
    let mut sum = Complex64::new(0.0, 0.0);
    for k in 1..MAX_TERMS {
        term = term * z2_over_4 / (k as f64 * k as f64);
        harmonic += 1.0 / k as f64;
        let contribution = term.scale(harmonic);
        sum += contribution;
        if contribution.norm() < SERIES_EPS * sum.norm().max(1.0) {
            break;
        }
    }
    -(ln_half + EULER_GAMMA) * i0 + sum
}

/// Asymptotic correction polynomial in `1/z` shared by the large-|z|
/// expansions of `I_0, I_1, K_0, K_1` (Abramowitz & Stegun 9.7.1-9.7.4),
/// with `mu = 4·ν²` for order `ν` and `sign` flipping alternating terms
/// (`+1` for `I_ν`, `-1` for `K_ν`).
fn asymptotic_correction(z: Complex64, mu: f64, sign: f64) -> Complex64 {
    let inv8z = 1.0 / (8.0 * z);
    let t1 = inv8z * (mu - 1.0);
    let t2 = inv8z * inv8z * (mu - 1.0) * (mu - 9.0) / 2.0;
    let t3 = inv8z * inv8z * inv8z * (mu - 1.0) * (mu - 9.0) * (mu - 25.0) / 6.0;
    Complex64::new(1.0, 0.0) + t1.scale(sign) + t2 - t3.scale(sign)
}

fn i0_scaled_asymptotic(z: Complex64) -> Complex64 {
    let phase = Complex64::new(0.0, z.im).exp();
    let prefactor = 1.0 / (2.0 * std::f64::consts::PI * z).sqrt();
    phase * prefactor * asymptotic_correction(z, 0.0, 1.0)
}

fn i1_scaled_asymptotic(z: Complex64) -> Complex64 {
    let phase = Complex64::new(0.0, z.im).exp();
    let prefactor = 1.0 / (2.0 * std::f64::consts::PI * z).sqrt();
    phase * prefactor * asymptotic_correction(z, 4.0, -1.0)
}

fn k0_scaled_asymptotic(z: Complex64) -> Complex64 {
    let phase = Complex64::new(0.0, -z.im).exp();
    let prefactor = (std::f64::consts::PI / (2.0 * z)).sqrt();
    phase * prefactor * asymptotic_correction(z, 0.0, -1.0)
}

/// Scaled `I_0(z)·e^{-Re(z)}`.
pub fn i0_scaled(z: Complex64) -> Complex64 {
    if z.norm() < SERIES_CUTOFF {
        unscaled_i0_series(z).scale((-z.re).exp())
    } else {
        i0_scaled_asymptotic(z)
    }
}

/// Scaled `I_1(z)·e^{-Re(z)}`.
pub fn i1_scaled(z: Complex64) -> Complex64 {
    if z.norm() < SERIES_CUTOFF {
        unscaled_i1_series(z).scale((-z.re).exp())
    } else {
        i1_scaled_asymptotic(z)
    }
}

/// Scaled `K_0(z)·e^{Re(z)}`.
pub fn k0_scaled(z: Complex64) -> Complex64 {
    if z.norm() < SERIES_CUTOFF {
        unscaled_k0_series(z).scale(z.re.exp())
    } else {
        k0_scaled_asymptotic(z)
    }
}

/// Scaled `K_1(z)·e^{Re(z)}`, recovered from the Wronskian
/// `I_0(z)K_1(z) + I_1(z)K_0(z) = 1/z`, which holds unchanged for the
/// scaled quantities since the `e^{∓Re(z)}` factors cancel in each product.
pub fn k1_scaled(z: Complex64) -> Complex64 {
    let i0 = i0_scaled(z);
    let i1 = i1_scaled(z);
    let k0 = k0_scaled(z);
    (1.0 / z - i1 * k0) / i0
}

/// Unscaled `K_0(z)`, used directly on bounded arguments only (e.g. the
/// Bessel-K-difference path in the earth-return kernel).
pub fn k0_unscaled(z: Complex64) -> Complex64 {
    k0_scaled(z).scale((-z.re).exp())
}

/// Uncertainty-propagating wrappers around the four scaled Bessel
/// primitives, generic over `S: Scalar`.
///
/// The scaling factor `e^{∓Re(z)}` is a function of `Re(z)` alone, so
/// none of these are complex-analytic in `z` — `apply_holomorphic`'s
/// Cauchy–Riemann shortcut does not apply. Instead each partial
/// derivative wrt `u = Re(z)` and `v = Im(z)` is derived directly from
/// the standard Bessel recurrences `I_0' = I_1`, `I_1' = I_0 - I_1/z`,
/// `K_0' = -K_1`, `K_1' = -K_0 - K_1/z`, re-expressed in terms of the
/// already-scaled quantities so the derivative itself never needs an
/// unscaled (overflow-prone) value.
pub mod scalar {
    use super::*;

    pub fn i0_scaled<S: Scalar>(z: ComplexM<S>) -> ComplexM<S> {
        let zn = z.nominal();
        let j0 = super::i0_scaled(zn);
        let j1 = super::i1_scaled(zn);
        let du = j1 - j0;
        let dv = Complex64::new(0.0, 1.0) * j1;
        apply_with_partials(z, j0, du, dv)
    }

    pub fn i1_scaled<S: Scalar>(z: ComplexM<S>) -> ComplexM<S> {
        let zn = z.nominal();
        let j0 = super::i0_scaled(zn);
        let j1 = super::i1_scaled(zn);
        let du = j0 - j1 / zn - j1;
        let dv = Complex64::new(0.0, 1.0) * (j0 - j1 / zn);
        apply_with_partials(z, j1, du, dv)
    }

    pub fn k0_scaled<S: Scalar>(z: ComplexM<S>) -> ComplexM<S> {
        let zn = z.nominal();
        let k0 = super::k0_scaled(zn);
        let k1 = super::k1_scaled(zn);
        let du = k0 - k1;
        let dv = Complex64::new(0.0, -1.0) * k1;
        apply_with_partials(z, k0, du, dv)
    }

    pub fn k1_scaled<S: Scalar>(z: ComplexM<S>) -> ComplexM<S> {
        let zn = z.nominal();
        let k0 = super::k0_scaled(zn);
        let k1 = super::k1_scaled(zn);
        let du = -k0 - k1 / zn + k1;
        let dv = Complex64::new(0.0, -1.0) * (k0 + k1 / zn);
        apply_with_partials(z, k1, du, dv)
    }
}
