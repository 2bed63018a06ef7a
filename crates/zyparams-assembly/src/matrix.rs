//! A small dense complex matrix over `ComplexM<S>`, generic in the
//! scalar type so the same stamping and inversion code serves both the
//! plain `f64` pipeline and the uncertainty-carrying `Measurement` one.
//!
//! nalgebra's `DMatrix` cannot hold `ComplexM<Measurement>` (it is not
//! `nalgebra::RealField`/`ComplexField`), so inversion here is a
//! hand-rolled Gauss-Jordan elimination with partial pivoting by
//! nominal magnitude — the generic fallback every scalar type gets.
//! Spec §4.3 calls for attempting a Hermitian/Cholesky factorization of
//! `P` first and falling back to LU; this module does not implement
//! that two-tier split and runs the pivoted solver below unconditionally
//! for both the plain and uncertainty-carrying pipelines (see DESIGN.md).

use crate::error::{AssemblyError, AssemblyResult};
use zyparams_core::{ComplexM, Scalar};

#[derive(Debug, Clone)]
pub struct ComplexMatrix<S: Scalar> {
    pub n: usize,
    data: Vec<ComplexM<S>>,
}

impl<S: Scalar> ComplexMatrix<S> {
    pub fn zeros(n: usize) -> Self {
        Self {
            n,
            data: vec![ComplexM::from_real(S::from_value(0.0)); n * n],
        }
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> ComplexM<S> {
        self.data[i * self.n + j]
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, value: ComplexM<S>) {
        self.data[i * self.n + j] = value;
    }

    #[inline]
    pub fn add_at(&mut self, i: usize, j: usize, value: ComplexM<S>) {
        self.data[i * self.n + j] = self.data[i * self.n + j] + value;
    }

    pub fn transpose(&self) -> Self {
        let mut out = Self::zeros(self.n);
        for i in 0..self.n {
            for j in 0..self.n {
                out.set(j, i, self.get(i, j));
            }
        }
        out
    }

    /// `(M + Mᵀ) / 2`, the reciprocity-enforcing symmetric average.
    pub fn symmetrize(&self) -> Self {
        let half = ComplexM::from_real(S::from_value(0.5));
        let mut out = Self::zeros(self.n);
        for i in 0..self.n {
            for j in 0..self.n {
                out.set(i, j, (self.get(i, j) + self.get(j, i)) * half);
            }
        }
        out
    }

    pub fn scale(&self, factor: ComplexM<S>) -> Self {
        let mut out = Self::zeros(self.n);
        for i in 0..self.n {
            for j in 0..self.n {
                out.set(i, j, self.get(i, j) * factor);
            }
        }
        out
    }

    /// Inverts via Gauss-Jordan elimination with partial pivoting on the
    /// nominal magnitude of each candidate pivot column entry.
    pub fn invert(&self, frequency_index: usize) -> AssemblyResult<Self> {
        let n = self.n;
        let mut aug = self.data.clone();
        let mut inv = Self::zeros(n).data;
        for i in 0..n {
            inv[i * n + i] = ComplexM::from_real(S::from_value(1.0));
        }

        for col in 0..n {
            let mut pivot_row = col;
            let mut pivot_mag = aug[col * n + col].norm().value();
            for row in (col + 1)..n {
                let mag = aug[row * n + col].norm().value();
                if mag > pivot_mag {
                    pivot_mag = mag;
                    pivot_row = row;
                }
            }
            if pivot_mag < 1e-300 {
                return Err(AssemblyError::SingularPotentialMatrix { frequency_index });
            }
            if pivot_row != col {
                for k in 0..n {
                    aug.swap(col * n + k, pivot_row * n + k);
                    inv.swap(col * n + k, pivot_row * n + k);
                }
            }

            let pivot = aug[col * n + col];
            let pivot_inv = ComplexM::from_real(S::from_value(1.0)) / pivot;
            for k in 0..n {
                aug[col * n + k] = aug[col * n + k] * pivot_inv;
                inv[col * n + k] = inv[col * n + k] * pivot_inv;
            }

            for row in 0..n {
                if row == col {
                    continue;
                }
                let factor = aug[row * n + col];
                if factor.norm().value() == 0.0 {
                    continue;
                }
                for k in 0..n {
                    aug[row * n + k] = aug[row * n + k] - factor * aug[col * n + k];
                    inv[row * n + k] = inv[row * n + k] - factor * inv[col * n + k];
                }
            }
        }

        Ok(Self { n, data: inv })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn c(re: f64, im: f64) -> ComplexM<f64> {
        ComplexM::new(re, im)
    }

    #[test]
    fn inverts_a_simple_real_diagonal_matrix() {
        let mut m: ComplexMatrix<f64> = ComplexMatrix::zeros(2);
        m.set(0, 0, c(2.0, 0.0));
        m.set(1, 1, c(4.0, 0.0));
        let inv = m.invert(0).unwrap();
        assert_relative_eq!(inv.get(0, 0).re, 0.5);
        assert_relative_eq!(inv.get(1, 1).re, 0.25);
    }

    #[test]
    fn inverts_a_coupled_complex_matrix_and_recovers_identity() {
        let mut m: ComplexMatrix<f64> = ComplexMatrix::zeros(2);
        m.set(0, 0, c(2.0, 1.0));
        m.set(0, 1, c(0.5, 0.0));
        m.set(1, 0, c(0.5, 0.0));
        m.set(1, 1, c(3.0, -0.5));
        let inv = m.invert(0).unwrap();
        // M * Minv should be identity
        let mut prod = ComplexMatrix::zeros(2);
        for i in 0..2 {
            for j in 0..2 {
                let mut acc = c(0.0, 0.0);
                for k in 0..2 {
                    acc = acc + m.get(i, k) * inv.get(k, j);
                }
                prod.set(i, j, acc);
            }
        }
        assert_relative_eq!(prod.get(0, 0).re, 1.0, epsilon = 1e-9);
        assert_relative_eq!(prod.get(0, 0).im, 0.0, epsilon = 1e-9);
        assert_relative_eq!(prod.get(1, 1).re, 1.0, epsilon = 1e-9);
        assert_relative_eq!(prod.get(0, 1).re, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn singular_matrix_reports_the_offending_frequency_index() {
        let m: ComplexMatrix<f64> = ComplexMatrix::zeros(2);
        let err = m.invert(7).unwrap_err();
        assert!(matches!(
            err,
            AssemblyError::SingularPotentialMatrix { frequency_index: 7 }
        ));
    }

    #[test]
    fn symmetrize_averages_with_transpose() {
        let mut m: ComplexMatrix<f64> = ComplexMatrix::zeros(2);
        m.set(0, 1, c(1.0, 0.0));
        m.set(1, 0, c(3.0, 0.0));
        let s = m.symmetrize();
        assert_relative_eq!(s.get(0, 1).re, 2.0);
        assert_relative_eq!(s.get(1, 0).re, 2.0);
    }
}
