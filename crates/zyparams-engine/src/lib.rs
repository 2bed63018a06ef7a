//! Orchestrates the full per-frequency line-parameters pipeline (spec
//! §5, §6): builds the workspace once, fans the frequency loop out
//! across a `rayon` thread pool (each `k` independent after the
//! workspace is built), then optionally runs the inherently-sequential
//! modal continuation across the assembled sweep.

pub mod diagnostics;
pub mod error;
pub mod modal_stage;
pub mod pipeline;

pub use error::{EngineError, EngineResult};

use rayon::prelude::*;

use zyparams_core::model::{
    EngineWarning, FrequencyTensor, LineParameters, ModalOutput, Options, PrimitiveMatrices,
    ProblemDescription,
};
use zyparams_core::Scalar;
use zyparams_workspace::UncertaintyOverlay;

use diagnostics::PrimitivesAccumulator;

/// Everything a call to the engine can produce: the always-present
/// `LineParameters`, the optional diagnostics/modal outputs a caller
/// may have requested, and any non-fatal per-frequency warnings.
#[derive(Debug, Clone)]
pub struct EngineOutput {
    pub parameters: LineParameters,
    pub modal: Option<ModalOutput>,
    pub primitives: Option<PrimitiveMatrices>,
    pub warnings: Vec<EngineWarning>,
}

/// Runs the engine for a plain (uncertainty-free) problem, returning
/// `LineParameters` and any diagnostics `options` requested.
pub fn compute(problem: &ProblemDescription, options: &Options) -> EngineResult<EngineOutput> {
    run::<f64>(problem, options, None, false)
}

/// Like [`compute`], additionally running the modal decomposition
/// across the resulting sweep (spec §4.5). Modal output is requested
/// directly rather than through `Options`, since spec §6 describes it
/// as a distinct optional output, not an `Options` flag.
pub fn compute_with_modal(problem: &ProblemDescription, options: &Options) -> EngineResult<EngineOutput> {
    run::<f64>(problem, options, None, true)
}

/// Runs the engine with a per-component uncertainty overlay attached to
/// the nominal `ProblemDescription`, propagating first-order uncertainty
/// through to `LineParameters::z_sigma`/`y_sigma`.
pub fn compute_with_uncertainty(
    problem: &ProblemDescription,
    options: &Options,
    overlay: &UncertaintyOverlay,
) -> EngineResult<EngineOutput> {
    run::<zyparams_core::Measurement>(problem, options, Some(overlay), false)
}

/// The generic entry point every convenience wrapper above calls into.
pub fn run<S: Scalar + Send + Sync>(
    problem: &ProblemDescription,
    options: &Options,
    overlay: Option<&UncertaintyOverlay>,
    run_modal: bool,
) -> EngineResult<EngineOutput> {
    problem.validate()?;

    let ws: zyparams_workspace::Workspace<S> = zyparams_workspace::build(problem, options, overlay);
    let plan = zyparams_reduction::build_reorder_plan(&problem.phase_map);
    let n_keep = pipeline::output_size(&plan, options);
    let f_count = problem.frequencies.len();

    let per_frequency: Vec<EngineResult<pipeline::FrequencyResult<S>>> = (0..f_count)
        .into_par_iter()
        .map(|k| {
            pipeline::run_frequency(
                &ws,
                &plan,
                options,
                problem.conductor_kernel,
                problem.earth_kernel,
                k,
            )
        })
        .collect();

    let mut z = FrequencyTensor::zeros(n_keep, f_count);
    let mut y = FrequencyTensor::zeros(n_keep, f_count);
    let mut z_sigma = zyparams_core::model::SigmaTensor::zeros(n_keep, f_count);
    let mut y_sigma = zyparams_core::model::SigmaTensor::zeros(n_keep, f_count);
    let mut any_sigma = false;
    let mut warnings = Vec::new();

    let mut primitive_accum = if options.store_primitive_matrices {
        Some(PrimitivesAccumulator::new(ws.n, ws.n_cables, f_count))
    } else {
        None
    };

    for (k, result) in per_frequency.into_iter().enumerate() {
        let fr = result?;

        let z_ratio = pipeline::reciprocity_offdiag_ratio(&fr.primitives.z);
        if z_ratio > 1e-4 {
            warnings.push(EngineWarning::ReciprocityViolation {
                frequency_index: k,
                offdiag_ratio: z_ratio,
            });
        }
        let p_ratio = pipeline::reciprocity_offdiag_ratio(&fr.primitives.p);
        if p_ratio > 1e-4 {
            warnings.push(EngineWarning::ReciprocityViolation {
                frequency_index: k,
                offdiag_ratio: p_ratio,
            });
        }

        for i in 0..n_keep {
            for j in 0..n_keep {
                let z_entry = fr.z.get(i, j);
                z.set(k, i, j, z_entry.nominal());
                let z_sig = (z_entry.re.sigma(), z_entry.im.sigma());
                any_sigma |= z_sig.0 != 0.0 || z_sig.1 != 0.0;
                z_sigma.set(k, i, j, z_sig);

                let y_entry = fr.y.get(i, j);
                y.set(k, i, j, y_entry.nominal());
                let y_sig = (y_entry.re.sigma(), y_entry.im.sigma());
                any_sigma |= y_sig.0 != 0.0 || y_sig.1 != 0.0;
                y_sigma.set(k, i, j, y_sig);
            }
        }

        if let Some(acc) = primitive_accum.as_mut() {
            acc.store(k, &fr.primitives);
        }
    }

    let parameters = LineParameters {
        z,
        y,
        f: problem.frequencies.clone(),
        z_sigma: if any_sigma { Some(z_sigma) } else { None },
        y_sigma: if any_sigma { Some(y_sigma) } else { None },
    };

    let primitives = primitive_accum.map(PrimitivesAccumulator::finish);

    let modal = if run_modal {
        let (modal_output, modal_warnings) =
            modal_stage::compute_modal(&parameters, &problem.frequencies)?;
        warnings.extend(modal_warnings);
        Some(modal_output)
    } else {
        None
    };

    Ok(EngineOutput {
        parameters,
        modal,
        primitives,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use zyparams_core::model::{
        Cable, Component, ConductorGroup, ConductorKernelKind, EarthKernelKind, EarthLayer,
        EarthModel, EnforceLayer, InsulatorGroup,
    };

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

    /// Spec §8 scenario 1: single solid underground conductor.
    fn single_conductor_problem() -> ProblemDescription {
        ProblemDescription {
            cables: vec![Cable {
                horz: 0.0,
                vert: -1.0,
                components: vec![component(0.0, 0.02, 0.025)],
            }],
            phase_map: vec![1],
            earth: EarthModel {
                layers: vec![
                    EarthLayer { rho_g: vec![1e15], eps_g: vec![1.0], mu_g: vec![1.0] },
                    EarthLayer { rho_g: vec![100.0], eps_g: vec![10.0], mu_g: vec![1.0] },
                ],
                enforce_layer: EnforceLayer::Last,
            },
            frequencies: vec![50.0],
            temperature: 20.0,
            reference_temperature: 20.0,
            max_temperature_delta: 60.0,
            conductor_kernel: ConductorKernelKind::ScaledBessel,
            earth_kernel: EarthKernelKind::Papadopoulos,
        }
    }

    /// Spec §8 scenario 2: trifoil of three single-core cables.
    fn trifoil_problem() -> ProblemDescription {
        let mut p = single_conductor_problem();
        p.cables = vec![
            Cable { horz: 0.0, vert: -1.0, components: vec![component(0.0, 0.02, 0.025)] },
            Cable { horz: 0.035, vert: -1.0, components: vec![component(0.0, 0.02, 0.025)] },
            Cable { horz: 0.0175, vert: -1.03, components: vec![component(0.0, 0.02, 0.025)] },
        ];
        p.phase_map = vec![1, 2, 3];
        p.frequencies = vec![1000.0];
        p
    }

    #[test]
    fn single_conductor_produces_a_one_by_one_finite_result() {
        let problem = single_conductor_problem();
        let out = compute(&problem, &Options::default()).unwrap();
        assert_eq!(out.parameters.z.n, 1);
        let z11 = out.parameters.z.get(0, 0, 0);
        assert!(z11.re.is_finite() && z11.re > 0.0);
        assert!(z11.im.is_finite());
        assert!(out.modal.is_none());
        assert!(out.parameters.z_sigma.is_none());
    }

    #[test]
    fn trifoil_mutual_impedances_are_symmetric_in_magnitude() {
        let problem = trifoil_problem();
        let out = compute(&problem, &Options::default()).unwrap();
        let z = &out.parameters.z;
        let z12 = z.get(0, 0, 1).norm();
        let z23 = z.get(0, 1, 2).norm();
        let z13 = z.get(0, 0, 2).norm();
        assert!((z12 - z23).abs() / z12 < 0.01);
        assert!((z12 - z13).abs() / z12 < 0.01);
    }

    #[test]
    fn kron_reduction_on_two_core_cable_reduces_to_one_phase() {
        let mut problem = single_conductor_problem();
        problem.cables[0].components.push(component(0.023, 0.024, 0.0245));
        problem.phase_map = vec![1, 0];
        problem.frequencies = vec![1.0e5];
        let mut options = Options::default();
        options.kron_reduction = true;
        options.reduce_bundle = true;
        let out = compute(&problem, &options).unwrap();
        assert_eq!(out.parameters.z.n, 1);
    }

    #[test]
    fn compute_with_modal_attaches_modal_output_with_matching_frequency_count() {
        let problem = trifoil_problem();
        let out = compute_with_modal(&problem, &Options::default()).unwrap();
        let modal = out.modal.unwrap();
        assert_eq!(modal.gamma.len(), 1);
        assert_eq!(modal.gamma[0].len(), 3);
    }

    #[test]
    fn compute_with_uncertainty_produces_nonzero_sigma_on_perturbed_component() {
        let problem = single_conductor_problem();
        let mut overlay = UncertaintyOverlay::default();
        overlay.radius_ext_sigma.insert(0, 0.0002);
        let out = compute_with_uncertainty(&problem, &Options::default(), &overlay).unwrap();
        let sigma = out.parameters.z_sigma.expect("uncertainty overlay should produce z_sigma");
        let (_, im_sigma) = sigma.get(0, 0, 0);
        let nominal_im = out.parameters.z.get(0, 0, 0).im;
        assert!(im_sigma / nominal_im.abs() >= 0.02);
    }

    #[test]
    fn store_primitive_matrices_populates_diagnostics() {
        let problem = single_conductor_problem();
        let mut options = Options::default();
        options.store_primitive_matrices = true;
        let out = compute(&problem, &options).unwrap();
        let primitives = out.primitives.expect("diagnostics requested");
        assert_eq!(primitives.z_internal.n, 1);
        assert_eq!(primitives.z_earth.len(), 1);
    }

    /// Spec §8 scenario 4: frequency sweep modal continuity. After
    /// Gustavsen column rotation, consecutive T(k) columns should stay
    /// aligned (small principal angle) across a decade-spanning sweep.
    #[test]
    fn modal_columns_stay_continuous_across_a_frequency_sweep() {
        let mut problem = trifoil_problem();
        problem.frequencies = vec![1.0, 10.0, 100.0, 1_000.0, 10_000.0, 100_000.0, 1_000_000.0];
        let out = compute_with_modal(&problem, &Options::default()).unwrap();
        let modal = out.modal.unwrap();
        let n = out.parameters.z.n;

        for k in 1..problem.frequencies.len() {
            for col in 0..n {
                let prev: Vec<num_complex::Complex64> =
                    (0..n).map(|row| modal.t.get(k - 1, row, col)).collect();
                let cur: Vec<num_complex::Complex64> =
                    (0..n).map(|row| modal.t.get(k, row, col)).collect();

                let prev_norm = prev.iter().map(|c| c.norm_sqr()).sum::<f64>().sqrt();
                let cur_norm = cur.iter().map(|c| c.norm_sqr()).sum::<f64>().sqrt();
                let dot: num_complex::Complex64 = prev
                    .iter()
                    .zip(cur.iter())
                    .map(|(a, b)| a.conj() * b)
                    .sum();
                let cos_angle = (dot.norm() / (prev_norm * cur_norm)).min(1.0);
                let principal_angle = cos_angle.acos();
                assert!(
                    principal_angle <= 0.05 + 1e-6,
                    "column {col} at k={k} drifted by {principal_angle} rad"
                );
            }
        }
    }
}
