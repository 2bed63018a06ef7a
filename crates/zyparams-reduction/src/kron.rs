//! Kron elimination (spec §4.4): Schur-complement removal of grounded
//! conductors, or plain truncation of bundle-residual tails when
//! `kron_reduction` is disabled.

use crate::error::{ReductionError, ReductionResult};
use zyparams_assembly::ComplexMatrix;
use zyparams_core::{ComplexM, Scalar};

/// Partitions `m` into keep/eliminate per spec §4.4 and returns the
/// reduced matrix, the corresponding reduced phase map, and the
/// original indices that were kept (for downstream relabeling).
///
/// - `kron_reduction` on: eliminate every index with `phase_map == 0`
///   (this already includes bundle tails, which `merge_bundles` zeroed)
///   via the Schur complement `M_kk - M_ke·M_ee⁻¹·M_ek`.
/// - `kron_reduction` off, `reduce_bundle` on: drop only the bundle
///   tails (`is_bundle_tail`) by plain truncation — their contribution
///   was already folded into the bundle head by `merge_bundles`, so no
///   Schur complement is needed. Phase-0 (ground) entries remain.
/// - Both off: `m` is returned unchanged.
pub fn kronify<S: Scalar>(
    m: &ComplexMatrix<S>,
    phase_map: &[i64],
    is_bundle_tail: &[bool],
    kron_reduction: bool,
    reduce_bundle: bool,
    frequency_index: usize,
) -> ReductionResult<(ComplexMatrix<S>, Vec<i64>, Vec<usize>)> {
    let n = m.n;

    let (keep, eliminate, use_schur): (Vec<usize>, Vec<usize>, bool) = if kron_reduction {
        (
            (0..n).filter(|&i| phase_map[i] != 0).collect(),
            (0..n).filter(|&i| phase_map[i] == 0).collect(),
            true,
        )
    } else if reduce_bundle {
        (
            (0..n).filter(|&i| !is_bundle_tail[i]).collect(),
            (0..n).filter(|&i| is_bundle_tail[i]).collect(),
            false,
        )
    } else {
        ((0..n).collect(), Vec::new(), false)
    };

    let reduced_map: Vec<i64> = keep.iter().map(|&i| phase_map[i]).collect();

    if eliminate.is_empty() || !use_schur {
        return Ok((select_submatrix(m, &keep), reduced_map, keep));
    }

    let ne = eliminate.len();
    let nk = keep.len();

    let mut m_ee = ComplexMatrix::zeros(ne);
    for (ni, &i) in eliminate.iter().enumerate() {
        for (nj, &j) in eliminate.iter().enumerate() {
            m_ee.set(ni, nj, m.get(i, j));
        }
    }
    let m_ee_inv = m_ee
        .invert(frequency_index)
        .map_err(|_| ReductionError::SingularEliminateBlock { frequency_index })?;

    // tmp = M_ee^{-1} * M_ek, shape (ne x nk)
    let zero = ComplexM::from_real(S::from_value(0.0));
    let mut tmp = vec![zero; ne * nk];
    for a in 0..ne {
        for b in 0..nk {
            let mut acc = zero;
            for c in 0..ne {
                acc = acc + m_ee_inv.get(a, c) * m.get(eliminate[c], keep[b]);
            }
            tmp[a * nk + b] = acc;
        }
    }

    let mut out = ComplexMatrix::zeros(nk);
    for (ni, &i) in keep.iter().enumerate() {
        for (nj, &j) in keep.iter().enumerate() {
            let mut acc = m.get(i, j);
            for c in 0..ne {
                acc = acc - m.get(i, eliminate[c]) * tmp[c * nk + nj];
            }
            out.set(ni, nj, acc);
        }
    }

    Ok((out, reduced_map, keep))
}

fn select_submatrix<S: Scalar>(m: &ComplexMatrix<S>, keep: &[usize]) -> ComplexMatrix<S> {
    let mut out = ComplexMatrix::zeros(keep.len());
    for (ni, &i) in keep.iter().enumerate() {
        for (nj, &j) in keep.iter().enumerate() {
            out.set(ni, nj, m.get(i, j));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn c(re: f64) -> ComplexM<f64> {
        ComplexM::from_real(re)
    }

    /// Two-core cable, phase_map = [1, 0] (core + grounded screen),
    /// matching spec §8 scenario 3.
    fn core_screen_matrix() -> ComplexMatrix<f64> {
        let mut m = ComplexMatrix::zeros(2);
        m.set(0, 0, c(5.0));
        m.set(0, 1, c(2.0));
        m.set(1, 0, c(2.0));
        m.set(1, 1, c(4.0));
        m
    }

    #[test]
    fn kron_reduction_matches_scalar_schur_formula() {
        let m = core_screen_matrix();
        let (reduced, map, keep) =
            kronify(&m, &[1, 0], &[false, false], true, true, 0).unwrap();
        assert_eq!(map, vec![1]);
        assert_eq!(keep, vec![0]);
        // Z_cc - Z_cs^2 / Z_ss = 5 - 4/4 = 4
        assert_relative_eq!(reduced.get(0, 0).re, 4.0, epsilon = 1e-9);
    }

    #[test]
    fn kron_off_with_no_bundles_leaves_matrix_unchanged() {
        let m = core_screen_matrix();
        let (reduced, map, keep) =
            kronify(&m, &[1, 0], &[false, false], false, false, 0).unwrap();
        assert_eq!(map, vec![1, 0]);
        assert_eq!(keep, vec![0, 1]);
        assert_relative_eq!(reduced.get(1, 1).re, 4.0);
    }

    #[test]
    fn kron_off_reduce_bundle_on_truncates_tails_only() {
        // index 1 is a bundle tail (already merged into head 0); index 2 is ground.
        let mut m = ComplexMatrix::zeros(3);
        m.set(0, 0, c(10.0));
        m.set(1, 1, c(1.0));
        m.set(2, 2, c(7.0));
        let (reduced, map, keep) =
            kronify(&m, &[1, 0, 0], &[false, true, false], false, true, 0).unwrap();
        assert_eq!(keep, vec![0, 2]);
        assert_eq!(map, vec![1, 0]);
        assert_relative_eq!(reduced.get(0, 0).re, 10.0);
        assert_relative_eq!(reduced.get(1, 1).re, 7.0);
    }

    #[test]
    fn no_zero_entries_is_a_round_trip_identity() {
        let m = core_screen_matrix();
        let (reduced, map, keep) =
            kronify(&m, &[1, 2], &[false, false], true, true, 0).unwrap();
        assert_eq!(map, vec![1, 2]);
        assert_eq!(keep, vec![0, 1]);
        for i in 0..2 {
            for j in 0..2 {
                assert_relative_eq!(reduced.get(i, j).re, m.get(i, j).re);
            }
        }
    }

    #[test]
    fn singular_eliminate_block_reports_frequency_index() {
        let mut m = ComplexMatrix::zeros(2);
        m.set(0, 0, c(1.0));
        // M_ee block (index 1) is exactly zero => singular
        let err = kronify(&m, &[1, 0], &[false, false], true, true, 3).unwrap_err();
        assert!(matches!(
            err,
            ReductionError::SingularEliminateBlock { frequency_index: 3 }
        ));
    }

    #[test]
    fn reordering_invariance_reorder_then_kron_equals_kron_with_permuted_map() {
        // original: [ground(0), phase1(1)]; permute to [phase1, ground]
        let mut m = ComplexMatrix::zeros(2);
        m.set(0, 0, c(4.0)); // ground
        m.set(0, 1, c(2.0));
        m.set(1, 0, c(2.0));
        m.set(1, 1, c(5.0)); // phase1
        let perm = vec![1, 0]; // new order: [phase1, ground]
        let permuted = {
            let mut out = ComplexMatrix::zeros(2);
            for i in 0..2 {
                for j in 0..2 {
                    out.set(i, j, m.get(perm[i], perm[j]));
                }
            }
            out
        };
        let (direct, map_direct, _) =
            kronify(&permuted, &[1, 0], &[false, false], true, true, 0).unwrap();
        // Equivalent: Kron the original matrix with the original map [0, 1]
        // (ground first), the result must be the same 1x1 scalar.
        let (alt, map_alt, _) = kronify(&m, &[0, 1], &[false, false], true, true, 0).unwrap();
        assert_eq!(map_direct, map_alt);
        assert_relative_eq!(direct.get(0, 0).re, alt.get(0, 0).re, epsilon = 1e-9);
    }
}
