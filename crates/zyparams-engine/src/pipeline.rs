//! The per-frequency pipeline (spec §4.3, §4.4 "Order of operations":
//! assemble raw → reorder → merge_bundles → invert P to Y → kronify →
//! symmetrize), plus the bundle/Kron output sizing shared between the
//! orchestration loop and callers that need `n_keep` up front.

use zyparams_assembly::{assemble_frequency, ComplexMatrix, Primitives};
use zyparams_core::model::{ConductorKernelKind, EarthKernelKind, Options};
use zyparams_core::Scalar;
use zyparams_reduction::{kronify, merge_bundles, permute, ReorderPlan};
use zyparams_workspace::Workspace;

use crate::error::EngineResult;

pub struct FrequencyResult<S: Scalar> {
    pub z: ComplexMatrix<S>,
    pub y: ComplexMatrix<S>,
    pub primitives: Primitives<S>,
}

/// The phase map as it stands right before `kronify`, i.e. after
/// `merge_bundles` has zeroed tails if `reduce_bundle` is set.
pub fn reduced_phase_map(plan: &ReorderPlan, options: &Options) -> Vec<i64> {
    if options.reduce_bundle {
        plan.merged_phase_map()
    } else {
        plan.phase_map.clone()
    }
}

/// The final `n_keep` this combination of options resolves to,
/// independent of frequency — computed once and shared by every worker.
pub fn output_size(plan: &ReorderPlan, options: &Options) -> usize {
    if options.kron_reduction {
        reduced_phase_map(plan, options).iter().filter(|&&v| v != 0).count()
    } else if options.reduce_bundle {
        plan.is_bundle_tail.iter().filter(|&t| !t).count()
    } else {
        plan.n()
    }
}

/// Frobenius-norm ratio `||M - Mᵀ|| / ||M||` on nominal magnitudes, used
/// to flag a reciprocity violation (spec §8) before the final symmetric
/// average discards the asymmetry.
pub fn reciprocity_offdiag_ratio<S: Scalar>(m: &ComplexMatrix<S>) -> f64 {
    let n = m.n;
    let mut diff_sq = 0.0;
    let mut norm_sq = 0.0;
    for i in 0..n {
        for j in 0..n {
            let a = m.get(i, j).nominal();
            let b = m.get(j, i).nominal();
            diff_sq += (a - b).norm_sqr();
            norm_sq += a.norm_sqr();
        }
    }
    if norm_sq == 0.0 {
        0.0
    } else {
        (diff_sq / norm_sq).sqrt()
    }
}

/// Runs the full per-frequency pipeline against a precomputed
/// `ReorderPlan`, returning the reduced `(Z, Y)` pair plus the raw
/// primitives for diagnostic storage.
pub fn run_frequency<S: Scalar>(
    ws: &Workspace<S>,
    plan: &ReorderPlan,
    options: &Options,
    conductor_kernel: ConductorKernelKind,
    earth_kernel: EarthKernelKind,
    k: usize,
) -> EngineResult<FrequencyResult<S>> {
    let (z_raw, y_raw, primitives) =
        assemble_frequency(ws, k, conductor_kernel, earth_kernel, options.ideal_transposition)?;

    let z_perm = permute(&z_raw, &plan.perm);
    let y_perm = permute(&y_raw, &plan.perm);

    let (z_merged, map_after_merge) = if options.reduce_bundle {
        merge_bundles(&z_perm, &plan.phase_map)
    } else {
        (z_perm, plan.phase_map.clone())
    };
    let (y_merged, _) = if options.reduce_bundle {
        merge_bundles(&y_perm, &plan.phase_map)
    } else {
        (y_perm, plan.phase_map.clone())
    };

    let (z_reduced, _, _) = kronify(
        &z_merged,
        &map_after_merge,
        &plan.is_bundle_tail,
        options.kron_reduction,
        options.reduce_bundle,
        k,
    )?;
    let (y_reduced, _, _) = kronify(
        &y_merged,
        &map_after_merge,
        &plan.is_bundle_tail,
        options.kron_reduction,
        options.reduce_bundle,
        k,
    )?;

    Ok(FrequencyResult {
        z: z_reduced.symmetrize(),
        y: y_reduced.symmetrize(),
        primitives,
    })
}
