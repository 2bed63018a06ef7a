//! Lossless insulation impedance (inductance) and admittance-coefficient
//! (capacitance) kernels, spec §4.1.

use zyparams_core::constants::{EPSILON_0, MU_0};
use zyparams_core::{ComplexM, Scalar};

const RADIUS_EPS_RELATIVE: f64 = 1e-9;

fn degenerate<S: Scalar>(r_in: f64, r_ex: f64) -> bool {
    r_in.abs() < RADIUS_EPS_RELATIVE * r_ex.max(1.0) || (r_ex - r_in).abs() < RADIUS_EPS_RELATIVE * r_ex.max(1.0)
}

/// Insulation series impedance `Z_ins = jω·μ·ln(r_ex/r_in) / (2π)`, with
/// `μ = μ₀·μ_r`. Returns exactly zero for a bare or degenerate insulator
/// (`r_in ≈ 0` or `r_in ≈ r_ex`), per spec §4.1.
pub fn z_ins<S: Scalar>(r_in: S, r_ex: S, mu_r: S, jw: ComplexM<S>) -> ComplexM<S> {
    if degenerate::<S>(r_in.value(), r_ex.value()) {
        return ComplexM::from_real(S::from_value(0.0));
    }
    let ratio = (r_ex / r_in).ln();
    let mu = S::from_value(MU_0) * mu_r;
    let coeff = mu * ratio / S::from_value(2.0 * std::f64::consts::PI);
    jw * ComplexM::from_real(coeff)
}

/// Insulation potential coefficient `P_ins = ln(r_ex/r_in) / (2π·ε)`,
/// with `ε = ε₀·ε_r`. Returns exactly zero for the same degenerate cases
/// as `z_ins` (spec §8's "Degenerate admittance" property).
pub fn p_ins<S: Scalar>(r_in: S, r_ex: S, eps_r: S) -> S {
    if degenerate::<S>(r_in.value(), r_ex.value()) {
        return S::from_value(0.0);
    }
    let ratio = (r_ex / r_in).ln();
    let eps = S::from_value(EPSILON_0) * eps_r;
    ratio / (S::from_value(2.0 * std::f64::consts::PI) * eps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use zyparams_core::constants::angular_frequency;

    #[test]
    fn z_ins_matches_log_ratio_inductance_formula() {
        let jw = ComplexM::new(0.0_f64, angular_frequency(50.0));
        let z = z_ins(0.02_f64, 0.025, 1.0, jw);
        let expected_l = MU_0 * (0.025_f64 / 0.02).ln() / (2.0 * std::f64::consts::PI);
        assert_relative_eq!(z.re, 0.0, epsilon = 1e-18);
        assert_relative_eq!(z.im, angular_frequency(50.0) * expected_l, max_relative = 1e-10);
    }

    #[test]
    fn z_ins_degenerate_bare_conductor_is_zero() {
        let jw = ComplexM::new(0.0_f64, angular_frequency(50.0));
        let z = z_ins(0.0_f64, 0.02, 1.0, jw);
        assert_relative_eq!(z.re, 0.0);
        assert_relative_eq!(z.im, 0.0);
    }

    #[test]
    fn z_ins_degenerate_equal_radii_is_zero() {
        let jw = ComplexM::new(0.0_f64, angular_frequency(50.0));
        let z = z_ins(0.02_f64, 0.02, 1.0, jw);
        assert_relative_eq!(z.re, 0.0);
        assert_relative_eq!(z.im, 0.0);
    }

    #[test]
    fn p_ins_matches_log_ratio_capacitance_formula() {
        let p = p_ins(0.02_f64, 0.025, 2.3);
        let expected = (0.025_f64 / 0.02).ln() / (2.0 * std::f64::consts::PI * 2.3 * EPSILON_0);
        assert_relative_eq!(p, expected, max_relative = 1e-10);
    }

    #[test]
    fn p_ins_degenerate_is_exactly_zero() {
        assert_relative_eq!(p_ins(0.0_f64, 0.02, 2.3), 0.0);
        assert_relative_eq!(p_ins(0.02_f64, 0.02, 2.3), 0.0);
    }
}
