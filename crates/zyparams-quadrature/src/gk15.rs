//! The 7-point Gauss / 15-point Kronrod pair (QUADPACK's `QK15` rule),
//! specialized to complex-valued integrands.

use num_complex::Complex64;

/// Kronrod abscissae on `[-1, 1]`, the last entry being the shared center.
const XGK: [f64; 8] = [
    0.991_455_371_120_813,
    0.949_107_912_342_759,
    0.864_864_423_359_769,
    0.741_531_185_599_394,
    0.586_087_235_467_691,
    0.405_845_151_377_397,
    0.207_784_955_007_898,
    0.0,
];

/// Kronrod weights, paired index-for-index with `XGK`.
const WGK: [f64; 8] = [
    0.022_935_322_010_529,
    0.063_092_092_629_979,
    0.104_790_010_322_250,
    0.140_653_259_715_525,
    0.169_004_726_639_267,
    0.190_350_578_064_785,
    0.204_432_940_075_298,
    0.209_482_141_084_728,
];

/// Gauss weights for the embedded 7-point rule, paired with `XGK[1]`,
/// `XGK[3]`, `XGK[5]`, `XGK[7]` (the last being the center).
const WG: [f64; 4] = [
    0.129_484_966_168_870,
    0.279_705_391_489_277,
    0.381_830_050_505_119,
    0.417_959_183_673_469,
];

/// One evaluation of the G7-K15 pair over `[a, b]`.
///
/// Returns `(kronrod_estimate, |kronrod - gauss| * half_length)`, the
/// second value a cheap local error estimate used to drive adaptive
/// bisection.
pub fn qk15(f: &dyn Fn(f64) -> Complex64, a: f64, b: f64) -> (Complex64, f64) {
    let half_length = 0.5 * (b - a);
    let center = 0.5 * (b + a);

    let fc = f(center);
    let mut resg = fc.scale(WG[3]);
    let mut resk = fc.scale(WGK[7]);

    // Gauss-shared nodes: XGK[1], XGK[3], XGK[5].
    for (j, &gauss_weight) in WG.iter().take(3).enumerate() {
        let jtw = 2 * j + 1;
        let absc = half_length * XGK[jtw];
        let fsum = f(center - absc) + f(center + absc);
        resg = resg + fsum.scale(gauss_weight);
        resk = resk + fsum.scale(WGK[jtw]);
    }

    // Kronrod-only nodes: XGK[0], XGK[2], XGK[4], XGK[6].
    for j in 0..4 {
        let jtwm1 = 2 * j;
        let absc = half_length * XGK[jtwm1];
        let fsum = f(center - absc) + f(center + absc);
        resk = resk + fsum.scale(WGK[jtwm1]);
    }

    let result = resk.scale(half_length);
    let error = (resk - resg).norm() * half_length.abs();
    (result, error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn integrates_constant_exactly() {
        let (value, error) = qk15(&|_x| Complex64::new(3.0, 0.0), 0.0, 2.0);
        assert_relative_eq!(value.re, 6.0, max_relative = 1e-12);
        assert!(error < 1e-10);
    }

    #[test]
    fn integrates_low_degree_polynomial_to_machine_precision() {
        // ∫_0^1 x^4 dx = 1/5, well within the Kronrod rule's exactness degree.
        let (value, _) = qk15(&|x| Complex64::new(x.powi(4), 0.0), 0.0, 1.0);
        assert_relative_eq!(value.re, 0.2, max_relative = 1e-12);
    }

    #[test]
    fn integrates_cosine_half_period() {
        let (value, _) = qk15(
            &|x| Complex64::new(x.cos(), 0.0),
            0.0,
            std::f64::consts::FRAC_PI_2,
        );
        assert_relative_eq!(value.re, 1.0, max_relative = 1e-9);
    }
}
