//! Earth-return impedance and admittance kernels over a homogeneous
//! equivalent earth (Papadopoulos / Pollaczek / Images), spec §4.1.
//!
//! The semi-infinite oscillatory integral and the closed-form branches
//! are evaluated on plain `Complex64` — uncertainty in the handful of
//! real scalar inputs (heights, separation, layer properties) is
//! propagated afterwards by perturbing each uncertain input in turn and
//! combining the resulting sensitivities in quadrature. This is the one
//! kernel where differentiating the integral analytically would require
//! differentiating under the integral sign for every term in `F`/`G`;
//! a central-difference sensitivity at the nominal point is the pragmatic
//! equivalent of "Jacobian at the nominal" for this path.

use crate::bessel::k0_unscaled;
use num_complex::Complex64;
use zyparams_core::constants::{EPSILON_0, MU_0};
use zyparams_core::model::EarthKernelKind;
use zyparams_core::{ComplexM, Scalar};
use zyparams_quadrature::integrate_semi_infinite;

const LAMBDA_MAX_ZERO: f64 = 1e-6;
const MIN_SIGMA: f64 = 1e-30;
const INTEGRAL_RELTOL: f64 = 1e-8;
const INTEGRAL_MAX_EVALUATIONS: usize = 20_000;

/// Per-layer material, already temperature-corrected if applicable.
#[derive(Debug, Clone, Copy)]
pub struct LayerMaterial<S: Scalar> {
    pub mu_r: S,
    pub sigma: S,
    pub eps_r: S,
}

#[derive(Debug, Clone, Copy)]
struct LayerMaterialN {
    mu_r: f64,
    sigma: f64,
    eps_r: f64,
}

impl<S: Scalar> LayerMaterial<S> {
    fn nominal(&self) -> LayerMaterialN {
        LayerMaterialN {
            mu_r: self.mu_r.value(),
            sigma: self.sigma.value(),
            eps_r: self.eps_r.value(),
        }
    }
}

/// The geometry and resolved frequency shared by an impedance and an
/// admittance evaluation between conductors `i` and `j`.
#[derive(Debug, Clone, Copy)]
pub struct EarthGeometry<S: Scalar> {
    pub h_i: S,
    pub h_j: S,
    pub y_ij: S,
}

fn gamma_lossy(omega: f64, mat: LayerMaterialN) -> Complex64 {
    let mu = MU_0 * mat.mu_r;
    let eps = EPSILON_0 * mat.eps_r;
    let sigma_c = Complex64::new(mat.sigma, omega * eps);
    (Complex64::new(0.0, omega) * mu * sigma_c).sqrt()
}

fn gamma_lossless(omega: f64, mat: LayerMaterialN) -> Complex64 {
    let mu = MU_0 * mat.mu_r;
    let eps = EPSILON_0 * mat.eps_r;
    Complex64::new(0.0, omega) * (mu * eps).sqrt()
}

struct Resolved {
    gamma_s: Complex64,
    gamma_o: Complex64,
    mu_s: f64,
    mu_o: f64,
    /// Real conductivity used as the leading coefficient for impedance.
    sigma_s_z: f64,
    /// Layer selected as "s" admits the admittance-specific complex
    /// conductivity `sigma + jw*eps`.
    eps_s: f64,
    overhead_shortcut: bool,
    admittance_zero_shortcut: bool,
}

fn resolve(kind: EarthKernelKind, omega: f64, air: LayerMaterialN, earth: LayerMaterialN) -> Resolved {
    match kind {
        EarthKernelKind::Papadopoulos => {
            let gamma_air = gamma_lossy(omega, air);
            let gamma_earth = gamma_lossy(omega, earth);
            Resolved {
                gamma_s: gamma_earth,
                gamma_o: gamma_air,
                mu_s: MU_0 * earth.mu_r,
                mu_o: MU_0 * air.mu_r,
                sigma_s_z: earth.sigma.max(MIN_SIGMA),
                eps_s: EPSILON_0 * earth.eps_r,
                overhead_shortcut: false,
                admittance_zero_shortcut: gamma_earth.norm() < LAMBDA_MAX_ZERO,
            }
        }
        EarthKernelKind::Pollaczek => {
            let gamma_air = gamma_lossless(omega, air);
            Resolved {
                gamma_s: Complex64::new(0.0, 0.0),
                gamma_o: gamma_air,
                mu_s: MU_0,
                mu_o: MU_0 * air.mu_r,
                sigma_s_z: earth.sigma.max(MIN_SIGMA),
                eps_s: EPSILON_0 * earth.eps_r,
                overhead_shortcut: false,
                admittance_zero_shortcut: true,
            }
        }
        EarthKernelKind::Images => {
            let gamma_air = gamma_lossless(omega, air);
            Resolved {
                gamma_s: gamma_air,
                gamma_o: Complex64::new(0.0, 0.0),
                mu_s: MU_0 * air.mu_r,
                mu_o: MU_0,
                sigma_s_z: air.sigma.max(MIN_SIGMA),
                eps_s: EPSILON_0 * air.eps_r,
                overhead_shortcut: true,
                admittance_zero_shortcut: false,
            }
        }
    }
}

fn lambda_term(gamma_s: Complex64, d: f64, dd: f64) -> Complex64 {
    let z_max = (gamma_s.norm() * d).max(gamma_s.norm() * dd);
    if z_max < LAMBDA_MAX_ZERO {
        Complex64::new((dd / d).ln(), 0.0)
    } else {
        k0_unscaled(gamma_s * d) - k0_unscaled(gamma_s * dd)
    }
}

fn general_integral(resolved: &Resolved, h: f64, y: f64) -> Complex64 {
    let gamma_s = resolved.gamma_s;
    let gamma_o = resolved.gamma_o;
    let mu_s = resolved.mu_s;
    let mu_o = resolved.mu_o;
    let integrand = move |lambda: f64| -> Complex64 {
        let alpha_s = (Complex64::new(lambda * lambda, 0.0) + gamma_s * gamma_s).sqrt();
        let alpha_o = (Complex64::new(lambda * lambda, 0.0) + gamma_o * gamma_o).sqrt();
        let decay = (-alpha_s * h).exp();
        let denom1 = alpha_s * mu_o + alpha_o * mu_s;
        let f_term = mu_o * decay / denom1;
        let denom2 = alpha_s * gamma_o * gamma_o * mu_s + alpha_o * gamma_s * gamma_s * mu_o;
        let g_term = mu_o * mu_s * alpha_s * (gamma_s * gamma_s - gamma_o * gamma_o) * decay / (denom1 * denom2);
        (f_term + g_term) * (lambda * y).cos()
    };
    let segment_width = if y.abs() > 1e-9 {
        std::f64::consts::PI / y.abs()
    } else {
        1.0 / h.max(1e-3)
    };
    let outcome = integrate_semi_infinite(integrand, segment_width, INTEGRAL_RELTOL, INTEGRAL_MAX_EVALUATIONS);
    outcome.value * 2.0
}

fn nominal_impedance(
    kind: EarthKernelKind,
    omega: f64,
    h_i: f64,
    h_j: f64,
    y_ij: f64,
    air: LayerMaterialN,
    earth: LayerMaterialN,
) -> Complex64 {
    let resolved = resolve(kind, omega, air, earth);
    let d = (y_ij * y_ij + (h_i.abs() - h_j.abs()).powi(2)).sqrt();
    let dd = (y_ij * y_ij + (h_i.abs() + h_j.abs()).powi(2)).sqrt();
    let lambda = lambda_term(resolved.gamma_s, d, dd);
    let h_sum = h_i.abs() + h_j.abs();
    let integral = general_integral(&resolved, h_sum, y_ij);
    Complex64::new(0.0, omega) / (2.0 * std::f64::consts::PI * resolved.sigma_s_z) * (lambda + integral)
}

fn nominal_admittance(
    kind: EarthKernelKind,
    omega: f64,
    h_i: f64,
    h_j: f64,
    y_ij: f64,
    air: LayerMaterialN,
    earth: LayerMaterialN,
) -> Complex64 {
    let resolved = resolve(kind, omega, air, earth);
    let d = (y_ij * y_ij + (h_i.abs() - h_j.abs()).powi(2)).sqrt();
    let dd = (y_ij * y_ij + (h_i.abs() + h_j.abs()).powi(2)).sqrt();
    let lambda = lambda_term(resolved.gamma_s, d, dd);

    if resolved.overhead_shortcut {
        return Complex64::new(0.0, omega) / (2.0 * std::f64::consts::PI * resolved.eps_s) * lambda;
    }
    if resolved.admittance_zero_shortcut {
        return Complex64::new(0.0, 0.0);
    }
    let h_sum = h_i.abs() + h_j.abs();
    let integral = general_integral(&resolved, h_sum, y_ij);
    let sigma_s_complex = Complex64::new(resolved.sigma_s_z, omega * resolved.eps_s);
    Complex64::new(0.0, omega) / (2.0 * std::f64::consts::PI * sigma_s_complex) * (lambda + integral)
}

fn propagate<S: Scalar>(
    geometry: EarthGeometry<S>,
    air: LayerMaterial<S>,
    earth: LayerMaterial<S>,
    eval: impl Fn(f64, f64, f64, LayerMaterialN, LayerMaterialN) -> Complex64,
) -> ComplexM<S> {
    let h_i = geometry.h_i.value();
    let h_j = geometry.h_j.value();
    let y_ij = geometry.y_ij.value();
    let air_n = air.nominal();
    let earth_n = earth.nominal();

    let nominal = eval(h_i, h_j, y_ij, air_n, earth_n);

    let mut var_re = 0.0_f64;
    let mut var_im = 0.0_f64;

    let mut accumulate = |sigma: f64, perturbed: Complex64, step: f64| {
        if sigma == 0.0 {
            return;
        }
        let d_re = (perturbed.re - nominal.re) / step;
        let d_im = (perturbed.im - nominal.im) / step;
        var_re += (d_re * sigma).powi(2);
        var_im += (d_im * sigma).powi(2);
    };

    let rel_step = 1e-6;
    macro_rules! perturb_scalar {
        ($value:expr, $sigma:expr, $apply:expr) => {
            if $sigma != 0.0 {
                let step = ($value.abs() * rel_step).max(1e-9);
                let perturbed = $apply(step);
                accumulate($sigma, perturbed, step);
            }
        };
    }

    perturb_scalar!(h_i, geometry.h_i.sigma(), |step: f64| eval(
        h_i + step,
        h_j,
        y_ij,
        air_n,
        earth_n
    ));
    perturb_scalar!(h_j, geometry.h_j.sigma(), |step: f64| eval(
        h_i,
        h_j + step,
        y_ij,
        air_n,
        earth_n
    ));
    perturb_scalar!(y_ij, geometry.y_ij.sigma(), |step: f64| eval(
        h_i,
        h_j,
        y_ij + step,
        air_n,
        earth_n
    ));
    perturb_scalar!(earth_n.sigma, earth.sigma.sigma(), |step: f64| {
        let mut e = earth_n;
        e.sigma += step;
        eval(h_i, h_j, y_ij, air_n, e)
    });
    perturb_scalar!(earth_n.eps_r, earth.eps_r.sigma(), |step: f64| {
        let mut e = earth_n;
        e.eps_r += step;
        eval(h_i, h_j, y_ij, air_n, e)
    });
    perturb_scalar!(earth_n.mu_r, earth.mu_r.sigma(), |step: f64| {
        let mut e = earth_n;
        e.mu_r += step;
        eval(h_i, h_j, y_ij, air_n, e)
    });

    if var_re == 0.0 && var_im == 0.0 {
        return ComplexM::new(S::from_value(nominal.re), S::from_value(nominal.im));
    }
    ComplexM::new(
        S::from_parts(nominal.re, var_re.sqrt()),
        S::from_parts(nominal.im, var_im.sqrt()),
    )
}

/// Earth-return self/mutual impedance `Z_e_ij`, spec §4.1.
pub fn z_earth_return<S: Scalar>(
    kind: EarthKernelKind,
    omega: f64,
    geometry: EarthGeometry<S>,
    air: LayerMaterial<S>,
    earth: LayerMaterial<S>,
) -> ComplexM<S> {
    propagate(geometry, air, earth, |h_i, h_j, y_ij, a, e| {
        nominal_impedance(kind, omega, h_i, h_j, y_ij, a, e)
    })
}

/// Earth-return self/mutual potential coefficient `P_e_ij` (admittance
/// analogue), spec §4.1.
pub fn p_earth_return<S: Scalar>(
    kind: EarthKernelKind,
    omega: f64,
    geometry: EarthGeometry<S>,
    air: LayerMaterial<S>,
    earth: LayerMaterial<S>,
) -> ComplexM<S> {
    propagate(geometry, air, earth, |h_i, h_j, y_ij, a, e| {
        nominal_admittance(kind, omega, h_i, h_j, y_ij, a, e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use zyparams_core::constants::angular_frequency;

    fn air_material() -> LayerMaterial<f64> {
        LayerMaterial {
            mu_r: 1.0,
            sigma: 1e-15,
            eps_r: 1.0,
        }
    }

    fn earth_material() -> LayerMaterial<f64> {
        LayerMaterial {
            mu_r: 1.0,
            sigma: 1.0 / 100.0,
            eps_r: 10.0,
        }
    }

    #[test]
    fn images_admittance_matches_log_ratio_at_power_frequency() {
        let omega = angular_frequency(50.0);
        let geometry = EarthGeometry {
            h_i: 10.0_f64,
            h_j: 8.0,
            y_ij: 0.3,
        };
        let p = p_earth_return(EarthKernelKind::Images, omega, geometry, air_material(), earth_material());
        let d = (0.3_f64 * 0.3 + (10.0_f64 - 8.0).powi(2)).sqrt();
        let dd = (0.3_f64 * 0.3 + (18.0_f64).powi(2)).sqrt();
        let expected = omega / (2.0 * std::f64::consts::PI * EPSILON_0) * (dd / d).ln();
        assert_relative_eq!(p.nominal().im, expected, max_relative = 1e-6);
    }

    #[test]
    fn pollaczek_admittance_is_always_zero() {
        let omega = angular_frequency(1000.0);
        let geometry = EarthGeometry {
            h_i: -1.0_f64,
            h_j: -1.2,
            y_ij: 0.2,
        };
        let p = p_earth_return(EarthKernelKind::Pollaczek, omega, geometry, air_material(), earth_material());
        assert_relative_eq!(p.nominal().norm(), 0.0);
    }

    #[test]
    fn papadopoulos_impedance_is_finite_and_nonzero() {
        let omega = angular_frequency(50.0);
        let geometry = EarthGeometry {
            h_i: -1.0_f64,
            h_j: -1.0,
            y_ij: 0.0,
        };
        let z = z_earth_return(EarthKernelKind::Papadopoulos, omega, geometry, air_material(), earth_material());
        assert!(z.nominal().norm().is_finite());
        assert!(z.nominal().norm() > 0.0);
    }

    #[test]
    fn uncertainty_propagates_through_geometry() {
        use zyparams_core::Measurement;
        let omega = angular_frequency(50.0);
        let geometry = EarthGeometry {
            h_i: Measurement::new(-1.0, 0.01),
            h_j: Measurement::new(-1.2, 0.0),
            y_ij: Measurement::new(0.2, 0.0),
        };
        let air = LayerMaterial {
            mu_r: Measurement::exact(1.0),
            sigma: Measurement::exact(1e-15),
            eps_r: Measurement::exact(1.0),
        };
        let earth = LayerMaterial {
            mu_r: Measurement::exact(1.0),
            sigma: Measurement::exact(0.01),
            eps_r: Measurement::exact(10.0),
        };
        let z = z_earth_return(EarthKernelKind::Papadopoulos, omega, geometry, air, earth);
        assert!(z.re.sigma >= 0.0);
        assert!(z.im.sigma >= 0.0);
    }
}
