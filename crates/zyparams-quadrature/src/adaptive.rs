//! Adaptive recursive bisection on top of the G7-K15 pair, plus a
//! semi-infinite driver that partitions `[0, ∞)` at the zero pattern of
//! an oscillatory `cos(y·λ)` factor (spec §4.1, §9's permitted
//! Levin-style subdivision).

use crate::gk15::qk15;
use num_complex::Complex64;

/// Outcome of an integration attempt. `converged = false` means the
/// evaluation budget was exhausted before `reltol` was reached; the
/// caller (a kernel) surfaces this as a recoverable `IntegrationFailure`
/// and uses `value` as the best available estimate (spec §7).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntegrationOutcome {
    pub value: Complex64,
    pub evaluations: usize,
    pub achieved_tolerance: f64,
    pub converged: bool,
}

const MAX_DEPTH: u32 = 40;

fn adaptive_segment(
    f: &dyn Fn(f64) -> Complex64,
    a: f64,
    b: f64,
    reltol: f64,
    scale: f64,
    depth: u32,
    evaluations: &mut usize,
    budget: usize,
) -> (Complex64, f64) {
    let (value, error) = qk15(f, a, b);
    *evaluations += 15;
    let tol = reltol * scale.max(value.norm()).max(1e-300);
    if error <= tol || depth >= MAX_DEPTH || *evaluations >= budget {
        return (value, error);
    }
    let mid = 0.5 * (a + b);
    let (v1, e1) = adaptive_segment(f, a, mid, reltol, scale, depth + 1, evaluations, budget);
    if *evaluations >= budget {
        return (v1, e1);
    }
    let (v2, e2) = adaptive_segment(f, mid, b, reltol, scale, depth + 1, evaluations, budget);
    (v1 + v2, e1 + e2)
}

/// Adaptively integrate `f` over the finite interval `[a, b]`.
pub fn integrate(
    f: impl Fn(f64) -> Complex64,
    a: f64,
    b: f64,
    reltol: f64,
    max_evaluations: usize,
) -> IntegrationOutcome {
    let mut evaluations = 0usize;
    let (value, error) = adaptive_segment(&f, a, b, reltol, 0.0, 0, &mut evaluations, max_evaluations);
    IntegrationOutcome {
        value,
        evaluations,
        achieved_tolerance: error,
        converged: evaluations < max_evaluations,
    }
}

/// Integrate `f` over `[0, ∞)`, walking forward in segments of width
/// `segment_width` (the half-period `π / y_ij` of the `cos(y_ij·λ)`
/// factor in spec §4.1's general earth-return integral, or a
/// caller-chosen decay length scale when `y_ij ≈ 0`), stopping once the
/// running total has stabilized to `reltol` for several consecutive
/// segments or the evaluation budget is spent.
pub fn integrate_semi_infinite(
    f: impl Fn(f64) -> Complex64,
    segment_width: f64,
    reltol: f64,
    max_evaluations: usize,
) -> IntegrationOutcome {
    let width = if segment_width.is_finite() && segment_width > 0.0 {
        segment_width
    } else {
        1.0
    };

    let mut total = Complex64::new(0.0, 0.0);
    let mut evaluations = 0usize;
    let mut achieved = 0.0_f64;
    let mut quiet_segments = 0u32;
    let mut start = 0.0_f64;
    const MAX_QUIET: u32 = 4;
    const MAX_SEGMENTS: usize = 4096;

    for _ in 0..MAX_SEGMENTS {
        if evaluations >= max_evaluations {
            return IntegrationOutcome {
                value: total,
                evaluations,
                achieved_tolerance: achieved,
                converged: false,
            };
        }
        let end = start + width;
        let budget_left = max_evaluations - evaluations;
        let mut seg_evals = 0usize;
        let (seg_value, seg_error) = adaptive_segment(
            &f,
            start,
            end,
            reltol,
            total.norm(),
            0,
            &mut seg_evals,
            budget_left,
        );
        evaluations += seg_evals;
        achieved += seg_error;
        total = total + seg_value;

        let contribution_negligible =
            seg_value.norm() <= reltol * total.norm().max(1e-300);
        if contribution_negligible {
            quiet_segments += 1;
        } else {
            quiet_segments = 0;
        }
        start = end;
        if quiet_segments >= MAX_QUIET {
            return IntegrationOutcome {
                value: total,
                evaluations,
                achieved_tolerance: achieved,
                converged: true,
            };
        }
    }

    IntegrationOutcome {
        value: total,
        evaluations,
        achieved_tolerance: achieved,
        converged: false,
    }
}
