//! Hand-rolled eigendecomposition of a general (non-Hermitian) complex
//! matrix via shifted QR iteration, used at the first frequency to seed
//! the LM continuation (spec §4.5) and as the non-convergence fallback
//! (spec §7 `ConvergenceFailure`).
//!
//! `nalgebra`'s public `Schur`/`SymmetricEigen` decompositions do not
//! cover a general complex matrix with no Hermitian structure (`S =
//! Y·Z` has none), so this module implements shifted QR directly: no
//! Hessenberg reduction or deflation, just Gram-Schmidt QR on the full
//! `n×n` matrix each iteration with a Rayleigh (bottom-right-entry)
//! shift. Adequate for the small phase counts this engine handles and
//! simpler to get right than a deflating Hessenberg-QR pipeline.

use num_complex::Complex64;

#[derive(Debug, Clone)]
pub struct EigenDecomposition {
    pub eigenvalues: Vec<Complex64>,
    /// `eigenvectors[j]` is the j-th eigenvector, Euclidean-normalized
    /// (`sum |v_k|^2 = 1`).
    pub eigenvectors: Vec<Vec<Complex64>>,
}

const DEFAULT_MAX_ITER: usize = 500;
const DEFAULT_TOL: f64 = 1e-12;

/// Eigendecomposition of a general `n×n` complex matrix, row-major.
pub fn eigen_general(a: &[Complex64], n: usize) -> EigenDecomposition {
    eigen_general_with(a, n, DEFAULT_MAX_ITER, DEFAULT_TOL)
}

pub fn eigen_general_with(
    a: &[Complex64],
    n: usize,
    max_iter: usize,
    tol: f64,
) -> EigenDecomposition {
    if n == 0 {
        return EigenDecomposition {
            eigenvalues: Vec::new(),
            eigenvectors: Vec::new(),
        };
    }
    if n == 1 {
        return EigenDecomposition {
            eigenvalues: vec![a[0]],
            eigenvectors: vec![vec![Complex64::new(1.0, 0.0)]],
        };
    }

    let mut t = a.to_vec();
    let mut q_total = identity(n);

    for _ in 0..max_iter {
        let shift = t[(n - 1) * n + (n - 1)];
        let mut shifted = t.clone();
        for i in 0..n {
            shifted[i * n + i] -= shift;
        }
        let (q, r) = qr_decompose(&shifted, n);
        let mut next = matmul(&r, &q, n);
        for i in 0..n {
            next[i * n + i] += shift;
        }
        t = next;
        q_total = matmul(&q_total, &q, n);

        let mut max_sub = 0.0f64;
        for i in 1..n {
            let v = t[i * n + i - 1].norm();
            if v > max_sub {
                max_sub = v;
            }
        }
        if max_sub < tol {
            break;
        }
    }

    let eigenvalues: Vec<Complex64> = (0..n).map(|i| t[i * n + i]).collect();
    let eigenvectors = eigenvectors_from_triangular(&t, &q_total, n);

    EigenDecomposition {
        eigenvalues,
        eigenvectors,
    }
}

/// Modified Gram-Schmidt QR decomposition of a general complex matrix.
fn qr_decompose(a: &[Complex64], n: usize) -> (Vec<Complex64>, Vec<Complex64>) {
    let mut q = vec![Complex64::new(0.0, 0.0); n * n];
    let mut r = vec![Complex64::new(0.0, 0.0); n * n];
    let mut cols: Vec<Vec<Complex64>> = (0..n).map(|j| (0..n).map(|i| a[i * n + j]).collect()).collect();

    for j in 0..n {
        let norm: f64 = cols[j].iter().map(|c| c.norm_sqr()).sum::<f64>().sqrt();
        r[j * n + j] = Complex64::new(norm, 0.0);
        let qj: Vec<Complex64> = if norm > 1e-300 {
            cols[j].iter().map(|c| c / norm).collect()
        } else {
            let mut e = vec![Complex64::new(0.0, 0.0); n];
            e[j] = Complex64::new(1.0, 0.0);
            e
        };
        for i in 0..n {
            q[i * n + j] = qj[i];
        }
        for k in (j + 1)..n {
            let mut dot = Complex64::new(0.0, 0.0);
            for i in 0..n {
                dot += qj[i].conj() * cols[k][i];
            }
            r[j * n + k] = dot;
            for i in 0..n {
                cols[k][i] -= dot * qj[i];
            }
        }
    }
    (q, r)
}

fn matmul(a: &[Complex64], b: &[Complex64], n: usize) -> Vec<Complex64> {
    let mut out = vec![Complex64::new(0.0, 0.0); n * n];
    for i in 0..n {
        for k in 0..n {
            let aik = a[i * n + k];
            if aik.norm_sqr() == 0.0 {
                continue;
            }
            for j in 0..n {
                out[i * n + j] += aik * b[k * n + j];
            }
        }
    }
    out
}

fn identity(n: usize) -> Vec<Complex64> {
    let mut out = vec![Complex64::new(0.0, 0.0); n * n];
    for i in 0..n {
        out[i * n + i] = Complex64::new(1.0, 0.0);
    }
    out
}

/// Eigenvectors of the converged (quasi-)upper-triangular Schur form
/// `t`, transformed back to the original basis by the accumulated
/// Schur vectors `q_total` (`a = q_total · t · q_total^H`).
fn eigenvectors_from_triangular(t: &[Complex64], q_total: &[Complex64], n: usize) -> Vec<Vec<Complex64>> {
    let mut vecs = Vec::with_capacity(n);
    for k in 0..n {
        let lambda = t[k * n + k];
        let mut x = vec![Complex64::new(0.0, 0.0); n];
        x[k] = Complex64::new(1.0, 0.0);
        for i in (0..k).rev() {
            let mut sum = Complex64::new(0.0, 0.0);
            for j in (i + 1)..=k {
                sum += t[i * n + j] * x[j];
            }
            let denom = t[i * n + i] - lambda;
            x[i] = if denom.norm() > 1e-12 {
                -sum / denom
            } else {
                Complex64::new(0.0, 0.0)
            };
        }
        let mut v = vec![Complex64::new(0.0, 0.0); n];
        for i in 0..n {
            let mut acc = Complex64::new(0.0, 0.0);
            for j in 0..n {
                acc += q_total[i * n + j] * x[j];
            }
            v[i] = acc;
        }
        let norm: f64 = v.iter().map(|c| c.norm_sqr()).sum::<f64>().sqrt();
        if norm > 1e-300 {
            for c in v.iter_mut() {
                *c /= norm;
            }
        }
        vecs.push(v);
    }
    vecs
}
