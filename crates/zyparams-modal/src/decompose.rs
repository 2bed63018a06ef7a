//! Per-frequency modal decomposition (spec §4.5): seed or continue the
//! eigenbasis of `S = Y·Z`, rotate it, and derive characteristic
//! impedance/admittance and propagation constant from it.
//!
//! The forward relations the spec states explicitly are the
//! back-projections `Z_ch = T^{-T}·Z_c·T^{-1}` and `Y_ch = T·Y_c·T^T`.
//! Inverting those gives the modal-domain quantities this module
//! actually computes from: `Z_m = T^T·Z·T` and `Y_m = T^{-1}·Y·T^{-T}`,
//! since applying the same transform pattern to the un-reduced `Z`/`Y`
//! is what the back-projection is undoing.

use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;

use zyparams_core::constants::{EPSILON_0, MU_0};

use crate::continuation::{normalize_to_unit_bilinear, solve_column};
use crate::eigen::eigen_general;
use crate::error::{ModalError, ModalResult as Outcome};
use crate::rotation::rotate_columns;

/// Continuation tolerance for the LM column solve.
pub const DEFAULT_LM_TOL: f64 = 1e-8;
/// Continuation iteration budget for the LM column solve.
pub const DEFAULT_LM_MAX_ITER: usize = 50;

/// The full modal output for one frequency, plus the raw `T`/`λ` pair
/// carried forward as the continuation seed for the next frequency.
#[derive(Debug, Clone)]
pub struct ModalStep {
    /// Modal transform, row-major `n×n`.
    pub t: Vec<Complex64>,
    /// Eigenvalues of `S = Y·Z` (not normalized by `κ`).
    pub lambda: Vec<Complex64>,
    pub z_c: Vec<Complex64>,
    pub y_c: Vec<Complex64>,
    /// Row-major `n×n`.
    pub z_ch: Vec<Complex64>,
    /// Row-major `n×n`.
    pub y_ch: Vec<Complex64>,
    pub gamma: Vec<Complex64>,
    /// Set when continuation did not converge and this step fell back
    /// to a fresh eigendecomposition (spec §7 `ConvergenceFailure`).
    pub lm_fallback: bool,
}

fn to_dmatrix(v: &[Complex64], n: usize) -> DMatrix<Complex64> {
    DMatrix::from_row_slice(n, n, v)
}

fn from_dmatrix(m: &DMatrix<Complex64>) -> Vec<Complex64> {
    let n = m.nrows();
    let mut out = vec![Complex64::new(0.0, 0.0); n * n];
    for i in 0..n {
        for j in 0..n {
            out[i * n + j] = m[(i, j)];
        }
    }
    out
}

fn columns_from_eigenvectors(vectors: &[Vec<Complex64>], n: usize) -> Vec<Complex64> {
    let normalized: Vec<Vec<Complex64>> = vectors.iter().map(|v| normalize_to_unit_bilinear(v)).collect();
    let mut t = vec![Complex64::new(0.0, 0.0); n * n];
    for j in 0..n {
        for i in 0..n {
            t[i * n + j] = normalized[j][i];
        }
    }
    t
}

/// Seeds the modal transform at the first frequency in the sweep via a
/// direct eigendecomposition of `S = Y·Z` — there is no previous `T` to
/// continue from.
pub fn seed_first_frequency(
    z: &[Complex64],
    y: &[Complex64],
    n: usize,
    frequency_index: usize,
) -> Outcome<ModalStep> {
    let z_m = to_dmatrix(z, n);
    let y_m = to_dmatrix(y, n);
    let s = &y_m * &z_m;
    let eig = eigen_general(&from_dmatrix(&s), n);

    let mut t = columns_from_eigenvectors(&eig.eigenvectors, n);
    rotate_columns(&mut t, n);

    finalize(t, eig.eigenvalues, z, y, n, false, frequency_index)
}

/// Advances the modal transform to the next frequency, continuing from
/// `(prev_t, prev_lambda)` via Levenberg-Marquardt (spec §4.5). Falls
/// back to a fresh eigendecomposition if any column fails to converge.
#[allow(clippy::too_many_arguments)]
pub fn step_frequency(
    prev_t: &[Complex64],
    prev_lambda: &[Complex64],
    z: &[Complex64],
    y: &[Complex64],
    n: usize,
    omega: f64,
    frequency_index: usize,
) -> Outcome<ModalStep> {
    let z_m = to_dmatrix(z, n);
    let y_m = to_dmatrix(y, n);
    let s = &y_m * &z_m;

    let kappa = -(omega * omega) * EPSILON_0 * MU_0;
    let kappa_c = Complex64::new(kappa, 0.0);

    let mut s_tilde = s.clone();
    for i in 0..n {
        for j in 0..n {
            s_tilde[(i, j)] /= kappa_c;
        }
        s_tilde[(i, i)] -= Complex64::new(1.0, 0.0);
    }
    let sr = s_tilde.map(|c| c.re);
    let si = s_tilde.map(|c| c.im);

    let mut t = vec![Complex64::new(0.0, 0.0); n * n];
    let mut lambda = vec![Complex64::new(0.0, 0.0); n];
    let mut all_converged = true;

    for j in 0..n {
        let seed_t: Vec<Complex64> = (0..n).map(|i| prev_t[i * n + j]).collect();
        let seed_lambda_tilde = prev_lambda[j] / kappa_c - Complex64::new(1.0, 0.0);
        match solve_column(&sr, &si, &seed_t, seed_lambda_tilde, DEFAULT_LM_TOL, DEFAULT_LM_MAX_ITER) {
            Some((t_col, lambda_tilde)) => {
                for i in 0..n {
                    t[i * n + j] = t_col[i];
                }
                lambda[j] = (lambda_tilde + Complex64::new(1.0, 0.0)) * kappa_c;
            }
            None => {
                all_converged = false;
                break;
            }
        }
    }

    if !all_converged {
        let eig = eigen_general(&from_dmatrix(&s), n);
        t = columns_from_eigenvectors(&eig.eigenvectors, n);
        lambda = eig.eigenvalues;
    }

    rotate_columns(&mut t, n);
    finalize(t, lambda, z, y, n, !all_converged, frequency_index)
}

fn finalize(
    t: Vec<Complex64>,
    lambda: Vec<Complex64>,
    z: &[Complex64],
    y: &[Complex64],
    n: usize,
    lm_fallback: bool,
    frequency_index: usize,
) -> Outcome<ModalStep> {
    let t_m = to_dmatrix(&t, n);
    let z_m = to_dmatrix(z, n);
    let y_m = to_dmatrix(y, n);

    let t_inv = t_m
        .clone()
        .try_inverse()
        .ok_or(ModalError::SingularTransform { frequency_index })?;

    let z_modal = t_m.transpose() * &z_m * &t_m;
    let y_modal = &t_inv * &y_m * t_inv.transpose();

    let mut z_c = vec![Complex64::new(0.0, 0.0); n];
    let mut y_c = vec![Complex64::new(0.0, 0.0); n];
    for i in 0..n {
        let zc = (z_modal[(i, i)] / y_modal[(i, i)]).sqrt();
        z_c[i] = zc;
        y_c[i] = Complex64::new(1.0, 0.0) / zc;
    }

    let zc_diag = DMatrix::from_diagonal(&DVector::from_vec(z_c.clone()));
    let yc_diag = DMatrix::from_diagonal(&DVector::from_vec(y_c.clone()));

    let z_ch = t_inv.transpose() * &zc_diag * &t_inv;
    let y_ch = &t_m * &yc_diag * t_m.transpose();

    let s_full = &y_m * &z_m;
    let modal_s = &t_inv * &s_full * &t_m;
    let gamma: Vec<Complex64> = (0..n).map(|i| modal_s[(i, i)].sqrt()).collect();

    Ok(ModalStep {
        t,
        lambda,
        z_c,
        y_c,
        z_ch: from_dmatrix(&z_ch),
        y_ch: from_dmatrix(&y_ch),
        gamma,
        lm_fallback,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Two decoupled single-wire loops: Z and Y are already diagonal, so
    /// T should reduce to (a permutation/rotation of) the identity and
    /// Z_ch/Y_ch should reproduce Z/Y exactly.
    #[test]
    fn decoupled_diagonal_system_reproduces_itself() {
        let n = 2;
        let z = vec![
            Complex64::new(1.0, 0.2),
            Complex64::new(0.0, 0.0),
            Complex64::new(0.0, 0.0),
            Complex64::new(2.0, 0.3),
        ];
        let y = vec![
            Complex64::new(0.0, 0.05),
            Complex64::new(0.0, 0.0),
            Complex64::new(0.0, 0.0),
            Complex64::new(0.0, 0.08),
        ];
        let step = seed_first_frequency(&z, &y, n, 0).expect("diagonal system must invert");
        assert!(!step.lm_fallback);

        for i in 0..n {
            let zii = z[i * n + i];
            let yii = y[i * n + i];
            let zc_expected = (zii / yii).sqrt();
            // The matched diagonal entry (mode order can differ from
            // input order since eigenvalues are unordered).
            let found = step
                .z_c
                .iter()
                .any(|zc| (zc - zc_expected).norm() < 1e-6 || (zc + zc_expected).norm() < 1e-6);
            assert!(found, "expected z_c entry near {zc_expected:?}, got {:?}", step.z_c);
        }
    }

    #[test]
    fn gamma_matches_sqrt_of_yz_eigenvalues_for_diagonal_system() {
        let n = 2;
        let z = vec![
            Complex64::new(1.0, 0.0),
            Complex64::new(0.0, 0.0),
            Complex64::new(0.0, 0.0),
            Complex64::new(4.0, 0.0),
        ];
        let y = vec![
            Complex64::new(1.0, 0.0),
            Complex64::new(0.0, 0.0),
            Complex64::new(0.0, 0.0),
            Complex64::new(1.0, 0.0),
        ];
        let step = seed_first_frequency(&z, &y, n, 0).unwrap();
        let mut gammas: Vec<f64> = step.gamma.iter().map(|g| g.re).collect();
        gammas.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_relative_eq!(gammas[0], 1.0, epsilon = 1e-6);
        assert_relative_eq!(gammas[1], 2.0, epsilon = 1e-6);
    }

    #[test]
    fn step_frequency_continues_from_a_seed_without_error() {
        let n = 2;
        let z = vec![
            Complex64::new(1.0, 0.1),
            Complex64::new(0.2, 0.0),
            Complex64::new(0.2, 0.0),
            Complex64::new(1.3, 0.15),
        ];
        let y = vec![
            Complex64::new(0.0, 0.01),
            Complex64::new(0.0, 0.001),
            Complex64::new(0.0, 0.001),
            Complex64::new(0.0, 0.012),
        ];
        let seed = seed_first_frequency(&z, &y, n, 0).unwrap();
        let omega = 2.0 * std::f64::consts::PI * 60.0;
        let next = step_frequency(&seed.t, &seed.lambda, &z, &y, n, omega, 1).unwrap();
        assert_eq!(next.z_c.len(), n);
    }
}
