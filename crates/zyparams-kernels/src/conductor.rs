//! Internal-conductor impedance: scaled-Bessel (Schelkunoff) formulation
//! plus a coth/csch simplified fallback for a single annular layer.

use crate::bessel::scalar as bessel;
use num_complex::Complex64;
use zyparams_core::{ComplexM, Scalar};

/// Annulus geometry and material, already temperature-corrected if the
/// caller enabled that option.
#[derive(Debug, Clone, Copy)]
pub struct Annulus<S: Scalar> {
    pub radius_in: S,
    pub radius_ext: S,
    pub rho: S,
    pub mu_r: S,
}

/// The three self/transfer impedances of one annular conductor layer.
#[derive(Debug, Clone, Copy)]
pub struct ConductorImpedance<S: Scalar> {
    pub z_outer: ComplexM<S>,
    pub z_inner: ComplexM<S>,
    pub z_mutual: ComplexM<S>,
}

const MIN_RADIUS_IN: f64 = 1e-6;

/// Scaled-Bessel (Schelkunoff) internal-conductor impedance, spec §4.1.
///
/// `jw` is `jω` at the current frequency. Returns `z_inner = 0` when the
/// annulus is effectively solid (`radius_in ≈ 0`), matching the spec's
/// "substitute a small positive number" degenerate handling while still
/// reporting a physically meaningless inner surface as zero.
pub fn scaled_bessel<S: Scalar>(ann: Annulus<S>, jw: ComplexM<S>) -> ConductorImpedance<S> {
    let a_value = ann.radius_in.value();
    let solid = a_value.abs() < MIN_RADIUS_IN;
    let a = if solid {
        S::from_value(MIN_RADIUS_IN)
    } else {
        ann.radius_in
    };
    let b = ann.radius_ext;

    let mu0 = S::from_value(zyparams_core::constants::MU_0);
    let mu = ComplexM::from_real(mu0 * ann.mu_r);
    let sigma = ComplexM::from_real(ann.rho.recip());

    // m = sqrt(jw * mu * sigma)
    let m = (jw * mu * sigma).sqrt();
    let w_in = m * ComplexM::from_real(a);
    let w_out = m * ComplexM::from_real(b);

    if solid {
        return solid_conductor(ann, jw, m, w_out);
    }

    let i0_in = bessel::i0_scaled(w_in);
    let i1_in = bessel::i1_scaled(w_in);
    let k0_in = bessel::k0_scaled(w_in);
    let k1_in = bessel::k1_scaled(w_in);
    let i0_out = bessel::i0_scaled(w_out);
    let i1_out = bessel::i1_scaled(w_out);
    let k0_out = bessel::k0_scaled(w_out);
    let k1_out = bessel::k1_scaled(w_out);

    // Scaling cancellation s_c = exp(|Re w_in| - w_out) / exp(|Re w_out| - w_in),
    // kept as a plain (uncertainty-free) real scalar: it only corrects the
    // bookkeeping between the two independently-scaled Bessel evaluations,
    // it carries no extra physical information of its own.
    let w_in_n = w_in.nominal();
    let w_out_n = w_out.nominal();
    let s_c = ((w_in_n.re.abs() - w_out_n.re).exp() / (w_out_n.re.abs() - w_in_n.re).exp())
        .max(f64::MIN_POSITIVE);
    let s_c = ComplexM::from_real(S::from_value(s_c));

    let denom = i1_out * k1_in - s_c * k1_out * i1_in;

    let two_pi_w_out = ComplexM::from_real(S::from_value(2.0 * std::f64::consts::PI)) * w_out;
    let z_outer = (jw * mu / two_pi_w_out) * (i0_out * k1_in + s_c * k0_out * i1_in) / denom;

    let two_pi_w_in = ComplexM::from_real(S::from_value(2.0 * std::f64::consts::PI)) * w_in;
    let z_inner = (jw * mu / two_pi_w_in) * (s_c * i0_in * k1_out + k0_in * i1_out) / denom;

    let scale_out_in = ComplexM::from_real(
        S::from_value((w_out_n.re.abs() - w_in_n.re).exp()),
    );
    let two_pi_ab_sigma =
        ComplexM::from_real(S::from_value(2.0 * std::f64::consts::PI) * a * b) * sigma;
    let z_mutual = ComplexM::from_real(S::from_value(1.0)) / (two_pi_ab_sigma * denom * scale_out_in);

    ConductorImpedance {
        z_outer,
        z_inner,
        z_mutual,
    }
}

fn solid_conductor<S: Scalar>(
    ann: Annulus<S>,
    jw: ComplexM<S>,
    m: ComplexM<S>,
    w_out: ComplexM<S>,
) -> ConductorImpedance<S> {
    let mu0 = S::from_value(zyparams_core::constants::MU_0);
    let mu = ComplexM::from_real(mu0 * ann.mu_r);
    let sigma_dc = ann.rho.recip();
    let b = ann.radius_ext;

    let arg = m * ComplexM::from_real(b) * ComplexM::from_real(S::from_value(0.733));
    let coth = coth_complex(arg);
    let dc_residual = ComplexM::from_real(
        S::from_value(0.3179) / (sigma_dc * S::from_value(std::f64::consts::PI) * b * b),
    );
    let two_pi_w_out = ComplexM::from_real(S::from_value(2.0 * std::f64::consts::PI)) * w_out;
    let z_outer = (jw * mu / two_pi_w_out) * coth + dc_residual;

    ConductorImpedance {
        z_outer,
        z_inner: ComplexM::from_real(S::from_value(0.0)),
        z_mutual: ComplexM::from_real(S::from_value(0.0)),
    }
}

fn coth_complex<S: Scalar>(z: ComplexM<S>) -> ComplexM<S> {
    // coth(z) = cosh(z)/sinh(z) = (e^{2z}+1)/(e^{2z}-1)
    let two_z = z + z;
    let e = exp_complex(two_z);
    let one = ComplexM::from_real(S::from_value(1.0));
    (e + one) / (e - one)
}

fn exp_complex<S: Scalar>(z: ComplexM<S>) -> ComplexM<S> {
    zyparams_core::apply_holomorphic(z, |w| w.exp(), |w| w.exp())
}

/// Simplified coth/csch thin-shell approximation, selectable in place of
/// the full scaled-Bessel formulation (spec §4.1).
pub fn simplified<S: Scalar>(ann: Annulus<S>, jw: ComplexM<S>) -> ConductorImpedance<S> {
    let a = ann.radius_in;
    let b = ann.radius_ext;
    let thickness = b - a;
    let mean_radius = (a + b) * S::from_value(0.5);
    let mu0 = S::from_value(zyparams_core::constants::MU_0);
    let mu = ComplexM::from_real(mu0 * ann.mu_r);
    let sigma = ComplexM::from_real(ann.rho.recip());

    let m = (jw * mu * sigma).sqrt();
    let q = m * ComplexM::from_real(thickness);

    let r_dc = ComplexM::from_real(
        ann.rho / (S::from_value(2.0 * std::f64::consts::PI) * mean_radius * thickness),
    );
    let coth_q = coth_complex(q);
    let csch_q = csch_complex(q);
    let z_outer = r_dc * q * coth_q;
    let z_inner = z_outer;
    let z_mutual = r_dc * q * csch_q;

    ConductorImpedance {
        z_outer,
        z_inner,
        z_mutual,
    }
}

fn csch_complex<S: Scalar>(z: ComplexM<S>) -> ComplexM<S> {
    let two_z = z + z;
    let e = exp_complex(two_z);
    let one = ComplexM::from_real(S::from_value(1.0));
    let two = ComplexM::from_real(S::from_value(2.0));
    let ez = exp_complex(z);
    two * ez / (e - one)
}
