//! Drives `zyparams-modal` across the full frequency sweep (spec
//! §4.5), seeding at k=0 and continuing via LM from there.
//!
//! Per spec, the eigen/LM step always runs on nominal matrices — `T`
//! is never computed from an uncertain `Z`/`Y` — so this stage
//! consumes `LineParameters`' plain `Complex64` tensors directly and
//! never touches `z_sigma`/`y_sigma`.

use zyparams_core::model::{EngineWarning, FrequencyTensor, LineParameters, ModalOutput};

use crate::error::EngineResult;

pub fn compute_modal(
    parameters: &LineParameters,
    frequencies: &[f64],
) -> EngineResult<(ModalOutput, Vec<EngineWarning>)> {
    let n = parameters.z.n;
    let f_count = parameters.z.f_count;

    let mut t = FrequencyTensor::zeros(n, f_count);
    let mut z_c = FrequencyTensor::zeros(n, f_count);
    let mut y_c = FrequencyTensor::zeros(n, f_count);
    let mut z_ch = FrequencyTensor::zeros(n, f_count);
    let mut y_ch = FrequencyTensor::zeros(n, f_count);
    let mut gamma = Vec::with_capacity(f_count);
    let mut lm_fallback = Vec::with_capacity(f_count);
    let mut warnings = Vec::new();

    let mut prev: Option<(Vec<num_complex::Complex64>, Vec<num_complex::Complex64>)> = None;

    for k in 0..f_count {
        let z_k = &parameters.z.data[k];
        let y_k = &parameters.y.data[k];

        let step = match &prev {
            None => zyparams_modal::seed_first_frequency(z_k, y_k, n, k)?,
            Some((prev_t, prev_lambda)) => {
                let omega = zyparams_core::constants::angular_frequency(frequencies[k]);
                zyparams_modal::step_frequency(prev_t, prev_lambda, z_k, y_k, n, omega, k)?
            }
        };

        for i in 0..n {
            for j in 0..n {
                t.set(k, i, j, step.t[i * n + j]);
                z_ch.set(k, i, j, step.z_ch[i * n + j]);
                y_ch.set(k, i, j, step.y_ch[i * n + j]);
            }
            z_c.set(k, i, i, step.z_c[i]);
            y_c.set(k, i, i, step.y_c[i]);
        }
        gamma.push(step.gamma.clone());
        lm_fallback.push(step.lm_fallback);
        if step.lm_fallback {
            warnings.push(EngineWarning::ConvergenceFailure { frequency_index: k });
        }

        prev = Some((step.t.clone(), step.lambda.clone()));
    }

    Ok((
        ModalOutput {
            t,
            z_c,
            y_c,
            z_ch,
            y_ch,
            gamma,
            lm_fallback,
        },
        warnings,
    ))
}
