//! Precomputed reorder/bundle/keep-eliminate plan (spec §4.4, §5:
//! "reduction operates deterministically on a precomputed index
//! permutation"). Built once per call from the problem's `phase_map`
//! and reused, unchanged, across every frequency.

use std::collections::HashMap;

/// One bundle: the first occurrence of a phase label plus the indices
/// of its remaining (tail) members, in the reordered index space.
#[derive(Debug, Clone)]
pub struct BundleGroup {
    pub label: i64,
    pub first: usize,
    pub tails: Vec<usize>,
}

/// The permutation that places each bundle's first occurrence first,
/// its tails immediately after, and phase-0 (and other non-positive)
/// entries last, plus the bookkeeping `merge_bundles`/`kronify` need.
#[derive(Debug, Clone)]
pub struct ReorderPlan {
    /// `perm[new_index] = old_index`.
    pub perm: Vec<usize>,
    /// `phase_map[perm[i]]`, i.e. the original labels in the new order,
    /// before `merge_bundles` has zeroed any tail.
    pub phase_map: Vec<i64>,
    /// True at new indices that are a bundle's tail member (spec's
    /// "bundle residual"), used to truncate them even when
    /// `kron_reduction` is disabled (spec §4.4).
    pub is_bundle_tail: Vec<bool>,
    pub bundle_groups: Vec<BundleGroup>,
}

impl ReorderPlan {
    pub fn n(&self) -> usize {
        self.perm.len()
    }

    /// The phase map after `merge_bundles` has been conceptually applied
    /// (every tail index zeroed), independent of matrix contents.
    pub fn merged_phase_map(&self) -> Vec<i64> {
        let mut map = self.phase_map.clone();
        for (i, tail) in self.is_bundle_tail.iter().enumerate() {
            if *tail {
                map[i] = 0;
            }
        }
        map
    }
}

/// Build the reorder plan from an (unpermuted) `phase_map` (spec §4.4).
///
/// Positive labels are grouped by first appearance; a label's first
/// occurrence becomes its bundle head, later occurrences become tails
/// immediately following it. Non-positive entries (0 = ground, or any
/// pre-existing -1 "keep explicitly though grounded" marker, spec §4.4)
/// are appended last, in their original relative order.
pub fn build_reorder_plan(phase_map: &[i64]) -> ReorderPlan {
    let n = phase_map.len();
    let mut label_order: Vec<i64> = Vec::new();
    let mut by_label: HashMap<i64, Vec<usize>> = HashMap::new();
    let mut non_positive: Vec<usize> = Vec::new();

    for (i, &m) in phase_map.iter().enumerate() {
        if m > 0 {
            by_label.entry(m).or_insert_with(|| {
                label_order.push(m);
                Vec::new()
            });
            by_label.get_mut(&m).unwrap().push(i);
        } else {
            non_positive.push(i);
        }
    }

    let mut perm = Vec::with_capacity(n);
    let mut is_bundle_tail = Vec::with_capacity(n);
    let mut bundle_groups = Vec::new();

    for label in &label_order {
        let members = &by_label[label];
        let first = perm.len();
        perm.push(members[0]);
        is_bundle_tail.push(false);
        let mut tails = Vec::with_capacity(members.len() - 1);
        for &orig in &members[1..] {
            tails.push(perm.len());
            perm.push(orig);
            is_bundle_tail.push(true);
        }
        bundle_groups.push(BundleGroup {
            label: *label,
            first,
            tails,
        });
    }
    for &orig in &non_positive {
        perm.push(orig);
        is_bundle_tail.push(false);
    }

    let phase_map_reordered: Vec<i64> = perm.iter().map(|&orig| phase_map[orig]).collect();

    ReorderPlan {
        perm,
        phase_map: phase_map_reordered,
        is_bundle_tail,
        bundle_groups,
    }
}
