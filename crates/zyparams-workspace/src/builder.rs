//! Flattens a `ProblemDescription` into the contiguous arrays the
//! per-frequency assembler consumes (spec §4.2).

use num_complex::Complex64;
use std::collections::HashMap;
use zyparams_core::model::{EnforceLayer, Options, ProblemDescription};
use zyparams_core::{ComplexM, Scalar};

/// Per-component standard deviations to attach on top of a plain
/// (nominal-only) `ProblemDescription`, keyed by flat component index.
///
/// `ProblemDescription` itself carries plain `f64` geometry/material
/// fields; a `Workspace<Measurement>` build combines those nominals with
/// whichever of these sigmas the caller supplies, via `S::from_parts`
/// (which drops the sigma again when `S = f64`). This keeps the common
/// (uncertainty-free) build path free of any `Measurement` bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct UncertaintyOverlay {
    pub radius_in_sigma: HashMap<usize, f64>,
    pub radius_ext_sigma: HashMap<usize, f64>,
    pub rho_cond_sigma: HashMap<usize, f64>,
    pub ins_radius_ext_sigma: HashMap<usize, f64>,
    pub eps_ins_sigma: HashMap<usize, f64>,
}

impl UncertaintyOverlay {
    fn sigma(map: &HashMap<usize, f64>, index: usize) -> f64 {
        map.get(&index).copied().unwrap_or(0.0)
    }
}

/// The flattened, per-frequency-ready workspace. Read-only after
/// construction; the assembler only ever takes `&Workspace<S>`.
#[derive(Debug, Clone)]
pub struct Workspace<S: Scalar> {
    pub n: usize,
    pub n_cables: usize,

    pub horz: Vec<S>,
    pub vert: Vec<S>,

    pub radius_in: Vec<S>,
    pub radius_ext: Vec<S>,
    pub rho_cond: Vec<S>,
    pub mu_cond: Vec<S>,
    pub eps_cond: Vec<S>,

    pub ins_radius_ext: Vec<S>,
    pub rho_ins: Vec<S>,
    pub mu_ins: Vec<S>,
    pub eps_ins: Vec<S>,

    pub phase_map: Vec<i64>,
    pub cable_of: Vec<usize>,
    /// Component indices per cable, innermost conductor first.
    pub cable_components: Vec<Vec<usize>>,

    /// n*n flattened, row-major: `horz_sep[i*n + j]`.
    pub horz_sep: Vec<S>,

    pub frequencies: Vec<f64>,
    /// jω = i·2π·f[k], per frequency.
    pub jw: Vec<ComplexM<S>>,

    /// `earth_rho[layer][k]`, `earth_eps[layer][k]`, `earth_mu[layer][k]`.
    pub earth_rho: Vec<Vec<S>>,
    pub earth_eps: Vec<Vec<S>>,
    pub earth_mu: Vec<Vec<S>>,
    /// Resolved index of the layer an equivalent-homogeneous-earth
    /// formulation should treat as "the" earth (§9 Open Question).
    pub enforce_layer_index: usize,
}

impl<S: Scalar> Workspace<S> {
    #[inline]
    pub fn horz_sep(&self, i: usize, j: usize) -> S {
        self.horz_sep[i * self.n + j]
    }
}

/// Build a `Workspace<S>` from a validated `ProblemDescription`.
///
/// Callers must run `problem.validate()` first; this function does not
/// repeat the input-validation checks (spec §7's validation is a
/// pre-computation, one-time gate, not a per-build concern).
pub fn build<S: Scalar>(
    problem: &ProblemDescription,
    options: &Options,
    overlay: Option<&UncertaintyOverlay>,
) -> Workspace<S> {
    let n = problem.phase_count();
    let n_cables = problem.cable_count();
    let empty_overlay = UncertaintyOverlay::default();
    let overlay = overlay.unwrap_or(&empty_overlay);

    let mut horz = Vec::with_capacity(n);
    let mut vert = Vec::with_capacity(n);
    let mut radius_in = Vec::with_capacity(n);
    let mut radius_ext = Vec::with_capacity(n);
    let mut rho_cond = Vec::with_capacity(n);
    let mut mu_cond = Vec::with_capacity(n);
    let mut eps_cond = Vec::with_capacity(n);
    let mut ins_radius_ext = Vec::with_capacity(n);
    let mut rho_ins = Vec::with_capacity(n);
    let mut mu_ins = Vec::with_capacity(n);
    let mut eps_ins = Vec::with_capacity(n);
    let mut cable_of = Vec::with_capacity(n);
    let mut cable_components: Vec<Vec<usize>> = Vec::with_capacity(n_cables);

    let mut idx = 0usize;
    for (cable_idx, cable) in problem.cables.iter().enumerate() {
        let mut this_cable_components = Vec::with_capacity(cable.components.len());
        for comp in &cable.components {
            horz.push(S::from_value(cable.horz));
            vert.push(S::from_value(cable.vert));

            radius_in.push(S::from_parts(
                comp.conductor.radius_in,
                UncertaintyOverlay::sigma(&overlay.radius_in_sigma, idx),
            ));
            radius_ext.push(S::from_parts(
                comp.conductor.radius_ext,
                UncertaintyOverlay::sigma(&overlay.radius_ext_sigma, idx),
            ));

            let alpha_term = comp.conductor.alpha_cond
                * (problem.temperature - problem.reference_temperature);
            let rho_corrected = if options.temperature_correction {
                comp.conductor.rho_cond * (1.0 + alpha_term)
            } else {
                comp.conductor.rho_cond
            };
            rho_cond.push(S::from_parts(
                rho_corrected,
                UncertaintyOverlay::sigma(&overlay.rho_cond_sigma, idx),
            ));
            mu_cond.push(S::from_value(comp.conductor.mu_cond));
            eps_cond.push(S::from_value(comp.conductor.eps_cond));

            ins_radius_ext.push(S::from_parts(
                comp.insulator.radius_ext,
                UncertaintyOverlay::sigma(&overlay.ins_radius_ext_sigma, idx),
            ));
            rho_ins.push(S::from_value(comp.insulator.rho_ins));
            mu_ins.push(S::from_value(comp.insulator.mu_ins));
            eps_ins.push(S::from_parts(
                comp.insulator.eps_ins,
                UncertaintyOverlay::sigma(&overlay.eps_ins_sigma, idx),
            ));

            cable_of.push(cable_idx);
            this_cable_components.push(idx);
            idx += 1;
        }
        cable_components.push(this_cable_components);
    }

    let mut horz_sep = vec![S::from_value(0.0); n * n];
    for i in 0..n {
        for j in 0..n {
            if cable_of[i] == cable_of[j] {
                let outer = problem.cables[cable_of[i]].outer_radius();
                horz_sep[i * n + j] = S::from_value(outer);
            } else {
                let hi = problem.cables[cable_of[i]].horz;
                let hj = problem.cables[cable_of[j]].horz;
                horz_sep[i * n + j] = S::from_value((hi - hj).abs());
            }
        }
    }

    let jw: Vec<ComplexM<S>> = problem
        .frequencies
        .iter()
        .map(|&f| {
            let omega = zyparams_core::constants::angular_frequency(f);
            ComplexM::new(S::from_value(0.0), S::from_value(omega))
        })
        .collect();

    let f_count = problem.frequencies.len();
    let mut earth_rho = Vec::with_capacity(problem.earth.layers.len());
    let mut earth_eps = Vec::with_capacity(problem.earth.layers.len());
    let mut earth_mu = Vec::with_capacity(problem.earth.layers.len());
    for layer in &problem.earth.layers {
        earth_rho.push((0..f_count).map(|k| S::from_value(layer.rho_g[k])).collect());
        earth_eps.push((0..f_count).map(|k| S::from_value(layer.eps_g[k])).collect());
        earth_mu.push((0..f_count).map(|k| S::from_value(layer.mu_g[k])).collect());
    }

    let enforce_layer_index = match problem.earth.enforce_layer {
        EnforceLayer::Index(i) => i,
        EnforceLayer::Last => problem.earth.layers.len().saturating_sub(1),
    };

    Workspace {
        n,
        n_cables,
        horz,
        vert,
        radius_in,
        radius_ext,
        rho_cond,
        mu_cond,
        eps_cond,
        ins_radius_ext,
        rho_ins,
        mu_ins,
        eps_ins,
        phase_map: problem.phase_map.clone(),
        cable_of,
        cable_components,
        horz_sep,
        frequencies: problem.frequencies.clone(),
        jw,
        earth_rho,
        earth_eps,
        earth_mu,
        enforce_layer_index,
    }
}

/// `jω[k]` as a plain `Complex64`, independent of `S` (used by callers
/// that only need the nominal angular frequency, e.g. quadrature).
pub fn angular_frequency_nominal(frequency_hz: f64) -> Complex64 {
    Complex64::new(0.0, zyparams_core::constants::angular_frequency(frequency_hz))
}

#[cfg(test)]
mod tests {
    use super::*;
    use zyparams_core::model::{
        Cable, Component, ConductorGroup, EarthKernelKind, EarthLayer, EarthModel, InsulatorGroup,
    };
    use approx::assert_relative_eq;

    fn component(r_in: f64, r_ext: f64, r_ins_ext: f64) -> Component {
        Component {
            conductor: ConductorGroup {
                radius_in: r_in,
                radius_ext: r_ext,
                rho_cond: 2.826e-8,
                mu_cond: 1.0,
                eps_cond: 1.0,
                alpha_cond: 0.00393,
            },
            insulator: InsulatorGroup {
                radius_in: r_ext,
                radius_ext: r_ins_ext,
                rho_ins: 1e14,
                mu_ins: 1.0,
                eps_ins: 2.3,
            },
        }
    }

    fn two_cable_problem() -> ProblemDescription {
        ProblemDescription {
            cables: vec![
                Cable {
                    horz: 0.0,
                    vert: -1.0,
                    components: vec![component(0.0, 0.02, 0.025)],
                },
                Cable {
                    horz: 0.2,
                    vert: -1.0,
                    components: vec![component(0.0, 0.02, 0.025)],
                },
            ],
            phase_map: vec![1, 2],
            earth: EarthModel {
                layers: vec![
                    EarthLayer {
                        rho_g: vec![1e15],
                        eps_g: vec![1.0],
                        mu_g: vec![1.0],
                    },
                    EarthLayer {
                        rho_g: vec![100.0],
                        eps_g: vec![10.0],
                        mu_g: vec![1.0],
                    },
                ],
                enforce_layer: zyparams_core::model::EnforceLayer::Last,
            },
            frequencies: vec![50.0],
            temperature: 40.0,
            reference_temperature: 20.0,
            max_temperature_delta: 60.0,
            conductor_kernel: Default::default(),
            earth_kernel: EarthKernelKind::Papadopoulos,
        }
    }

    #[test]
    fn flattens_expected_phase_and_cable_counts() {
        let p = two_cable_problem();
        let ws: Workspace<f64> = build(&p, &Options::default(), None);
        assert_eq!(ws.n, 2);
        assert_eq!(ws.n_cables, 2);
        assert_eq!(ws.cable_components, vec![vec![0], vec![1]]);
    }

    #[test]
    fn horz_sep_uses_outer_radius_on_diagonal_within_cable() {
        let p = two_cable_problem();
        let ws: Workspace<f64> = build(&p, &Options::default(), None);
        assert_relative_eq!(ws.horz_sep(0, 0), 0.025);
        assert_relative_eq!(ws.horz_sep(0, 1), 0.2);
        assert_relative_eq!(ws.horz_sep(1, 0), 0.2);
    }

    #[test]
    fn temperature_correction_scales_rho_cond() {
        let p = two_cable_problem();
        let mut options = Options::default();
        options.temperature_correction = true;
        let ws: Workspace<f64> = build(&p, &options, None);
        let expected = 2.826e-8 * (1.0 + 0.00393 * (40.0 - 20.0));
        assert_relative_eq!(ws.rho_cond[0], expected, max_relative = 1e-12);
    }

    #[test]
    fn temperature_correction_disabled_keeps_nominal_rho() {
        let p = two_cable_problem();
        let mut options = Options::default();
        options.temperature_correction = false;
        let ws: Workspace<f64> = build(&p, &options, None);
        assert_relative_eq!(ws.rho_cond[0], 2.826e-8);
    }

    #[test]
    fn enforce_layer_last_resolves_to_final_index() {
        let p = two_cable_problem();
        let ws: Workspace<f64> = build(&p, &Options::default(), None);
        assert_eq!(ws.enforce_layer_index, 1);
    }

    #[test]
    fn uncertainty_overlay_attaches_sigma_on_requested_component() {
        use zyparams_core::Measurement;
        let p = two_cable_problem();
        let mut overlay = UncertaintyOverlay::default();
        overlay.radius_ext_sigma.insert(0, 0.0002);
        let ws: Workspace<Measurement> = build(&p, &Options::default(), Some(&overlay));
        assert_relative_eq!(ws.radius_ext[0].sigma, 0.0002);
        assert_relative_eq!(ws.radius_ext[1].sigma, 0.0);
    }

    #[test]
    fn jw_matches_two_pi_f() {
        let p = two_cable_problem();
        let ws: Workspace<f64> = build(&p, &Options::default(), None);
        assert_relative_eq!(ws.jw[0].im, 2.0 * std::f64::consts::PI * 50.0, max_relative = 1e-12);
        assert_relative_eq!(ws.jw[0].re, 0.0);
    }
}
