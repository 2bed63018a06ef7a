//! Reordering and in-place bundle merging (spec §4.4).

use crate::plan::ReorderPlan;
use zyparams_assembly::ComplexMatrix;
use zyparams_core::Scalar;

/// `out[i,j] = m[perm[i], perm[j]]` — applies the plan's permutation to
/// both rows and columns.
pub fn permute<S: Scalar>(m: &ComplexMatrix<S>, perm: &[usize]) -> ComplexMatrix<S> {
    let n = perm.len();
    let mut out = ComplexMatrix::zeros(n);
    for i in 0..n {
        for j in 0..n {
            out.set(i, j, m.get(perm[i], perm[j]));
        }
    }
    out
}

/// Bundle merge on an already-reordered matrix: difference-column pass
/// then difference-row pass (spec §4.4), driven by bundle groups
/// rediscovered from `phase_map` (not a stale cached plan), so a second
/// application against the already-merged `phase_map` finds no bundle
/// groups and is a no-op — the idempotence testable property (spec §8).
///
/// Returns the merged matrix and the phase map with every tail zeroed.
pub fn merge_bundles<S: Scalar>(
    m: &ComplexMatrix<S>,
    phase_map: &[i64],
) -> (ComplexMatrix<S>, Vec<i64>) {
    let groups = bundle_groups_from_map(phase_map);
    if groups.is_empty() {
        return (m.clone(), phase_map.to_vec());
    }

    let mut out = m.clone();
    let n = out.n;

    // Pass 1: columns, M[:,t] -= M[:,first].
    for (first, tails) in &groups {
        for &t in tails {
            for row in 0..n {
                let v = out.get(row, t) - out.get(row, *first);
                out.set(row, t, v);
            }
        }
    }
    // Pass 2: rows, after pass 1, M[t,:] -= M[first,:].
    for (first, tails) in &groups {
        for &t in tails {
            for col in 0..n {
                let v = out.get(t, col) - out.get(*first, col);
                out.set(t, col, v);
            }
        }
    }

    let mut new_map = phase_map.to_vec();
    for (_first, tails) in &groups {
        for &t in tails {
            new_map[t] = 0;
        }
    }
    (out, new_map)
}

/// Groups of `(first, tails)` discovered directly from a phase map in
/// its current (already-reordered) index order. A tail is any index
/// that repeats a positive label already seen at an earlier index.
fn bundle_groups_from_map(phase_map: &[i64]) -> Vec<(usize, Vec<usize>)> {
    use std::collections::HashMap;
    let mut first_of: HashMap<i64, usize> = HashMap::new();
    let mut tails_of: HashMap<i64, Vec<usize>> = HashMap::new();
    let mut order: Vec<i64> = Vec::new();
    for (i, &label) in phase_map.iter().enumerate() {
        if label <= 0 {
            continue;
        }
        match first_of.get(&label) {
            None => {
                first_of.insert(label, i);
            }
            Some(_) => {
                tails_of.entry(label).or_default().push(i);
                if !order.contains(&label) {
                    order.push(label);
                }
            }
        }
    }
    order
        .into_iter()
        .map(|label| (first_of[&label], tails_of.remove(&label).unwrap_or_default()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::build_reorder_plan;
    use approx::assert_relative_eq;
    use zyparams_core::ComplexM;

    fn c(re: f64) -> ComplexM<f64> {
        ComplexM::from_real(re)
    }

    fn sample_matrix() -> ComplexMatrix<f64> {
        // 3x3: head=0, tail=1 (same bundle), other=2
        let mut m = ComplexMatrix::zeros(3);
        m.set(0, 0, c(10.0));
        m.set(0, 1, c(2.0));
        m.set(0, 2, c(1.0));
        m.set(1, 0, c(2.0));
        m.set(1, 1, c(12.0));
        m.set(1, 2, c(3.0));
        m.set(2, 0, c(1.0));
        m.set(2, 1, c(3.0));
        m.set(2, 2, c(20.0));
        m
    }

    #[test]
    fn merge_bundles_differences_column_then_row() {
        let m = sample_matrix();
        // new order already [head=0, tail=1, other=2], phase_map = [1,1,2]
        let (merged, map) = merge_bundles(&m, &[1, 1, 2]);
        assert_eq!(map, vec![1, 0, 2]);
        // col pass: M[:,1] -= M[:,0] => [2-10, 12-2, 3-1] = [-8, 10, 2]
        // row pass: M[1,:] -= M[0,:] (using post-col-pass values)
        // row0 unaffected: [10, -8, 1]
        assert_relative_eq!(merged.get(0, 0).re, 10.0);
        assert_relative_eq!(merged.get(0, 1).re, -8.0);
        assert_relative_eq!(merged.get(0, 2).re, 1.0);
        // row1 = postcol_row1 - postcol_row0 = [2-10, 10-(-8), 3-1] = [-8, 18, 2]
        assert_relative_eq!(merged.get(1, 0).re, -8.0);
        assert_relative_eq!(merged.get(1, 1).re, 18.0);
        assert_relative_eq!(merged.get(1, 2).re, 2.0);
    }

    #[test]
    fn merge_bundles_is_idempotent() {
        let m = sample_matrix();
        let (once, map_once) = merge_bundles(&m, &[1, 1, 2]);
        let (twice, map_twice) = merge_bundles(&once, &map_once);
        assert_eq!(map_once, map_twice);
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(once.get(i, j).re, twice.get(i, j).re, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn merge_bundles_is_identity_without_shared_labels() {
        let m = sample_matrix();
        let (merged, map) = merge_bundles(&m, &[1, 2, 3]);
        assert_eq!(map, vec![1, 2, 3]);
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(merged.get(i, j).re, m.get(i, j).re);
            }
        }
    }

    #[test]
    fn permute_reorders_rows_and_columns_consistently() {
        let m = sample_matrix();
        let perm = vec![2, 0, 1];
        let out = permute(&m, &perm);
        assert_relative_eq!(out.get(0, 0).re, m.get(2, 2).re);
        assert_relative_eq!(out.get(1, 2).re, m.get(0, 1).re);
    }

    #[test]
    fn reorder_plan_permutation_matches_manual_merge_order() {
        // original order [1, 2, 1, 0]; plan places head(0), tail(2), label2(1), ground(3)
        let plan = build_reorder_plan(&[1, 2, 1, 0]);
        assert_eq!(plan.perm, vec![0, 2, 1, 3]);
    }
}
