//! Gustavsen column rotation (spec §4.5): multiply each column of `T`
//! by `exp(iθ)` to minimize its imaginary energy, stabilizing mode
//! identity across the frequency sweep when combined with LM
//! continuation.

use num_complex::Complex64;
use std::f64::consts::FRAC_PI_2;

/// The closed-form angle minimizing `Σ Im(e^{iθ} t_k)²`, disambiguated
/// against its stationary-point twin `θ* + π/2` by comparing the
/// actual imaginary energy at both.
pub fn rotation_angle(column: &[Complex64]) -> f64 {
    let mut sum_re_im = 0.0;
    let mut sum_re2_minus_im2 = 0.0;
    for c in column {
        sum_re_im += c.re * c.im;
        sum_re2_minus_im2 += c.re * c.re - c.im * c.im;
    }
    let theta_star = 0.5 * (-2.0 * sum_re_im).atan2(sum_re2_minus_im2);
    let energy_at = |theta: f64| imaginary_energy(column, theta);
    let e1 = energy_at(theta_star);
    let e2 = energy_at(theta_star + FRAC_PI_2);
    if e2 < e1 {
        theta_star + FRAC_PI_2
    } else {
        theta_star
    }
}

fn imaginary_energy(column: &[Complex64], theta: f64) -> f64 {
    let (s, c) = theta.sin_cos();
    column.iter().map(|z| (c * z.im + s * z.re).powi(2)).sum()
}

/// Rotates one column of `T` in place, returning the angle applied.
pub fn rotate_column(column: &mut [Complex64]) -> f64 {
    let theta = rotation_angle(column);
    let factor = Complex64::from_polar(1.0, theta);
    for c in column.iter_mut() {
        *c *= factor;
    }
    theta
}

/// Rotates every column of a row-major `n×n` matrix in place.
pub fn rotate_columns(t: &mut [Complex64], n: usize) {
    for j in 0..n {
        let mut column: Vec<Complex64> = (0..n).map(|i| t[i * n + j]).collect();
        rotate_column(&mut column);
        for i in 0..n {
            t[i * n + j] = column[i];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rotation_zeroes_a_purely_imaginary_column() {
        // column aligned along the imaginary axis should rotate onto the real axis
        let mut column = vec![Complex64::new(0.0, 3.0), Complex64::new(0.0, -1.0)];
        rotate_column(&mut column);
        for c in &column {
            assert_relative_eq!(c.im, 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn rotation_is_a_no_op_energy_decrease_for_already_real_column() {
        let mut column = vec![Complex64::new(2.0, 0.0), Complex64::new(-1.0, 0.0)];
        let before: f64 = column.iter().map(|c| c.im.powi(2)).sum();
        rotate_column(&mut column);
        let after: f64 = column.iter().map(|c| c.im.powi(2)).sum();
        assert!(after <= before + 1e-12);
    }

    #[test]
    fn rotate_columns_processes_every_column_independently() {
        let n = 2;
        let mut t = vec![
            Complex64::new(0.0, 1.0),
            Complex64::new(1.0, 0.0),
            Complex64::new(0.0, -2.0),
            Complex64::new(3.0, 0.0),
        ];
        rotate_columns(&mut t, n);
        // column 0 was purely imaginary, should now be purely real
        assert_relative_eq!(t[0].im, 0.0, epsilon = 1e-9);
        assert_relative_eq!(t[2].im, 0.0, epsilon = 1e-9);
        // column 1 was already real, should stay (near) real
        assert_relative_eq!(t[1].im, 0.0, epsilon = 1e-9);
    }
}
