//! Complex arithmetic built on top of the `Scalar` abstraction.
//!
//! `ComplexM<f64>` behaves exactly like `num_complex::Complex64`.
//! `ComplexM<Measurement>` carries a propagated standard deviation on
//! both the real and imaginary parts, and `apply_holomorphic` is the
//! single place special functions (Bessel, in `zyparams-kernels`) use
//! to push uncertainty through a complex-analytic function evaluated
//! at the nominal point.

use crate::scalar::Scalar;
use num_complex::Complex64;
use std::ops::{Add, Div, Mul, Neg, Sub};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComplexM<S: Scalar> {
    pub re: S,
    pub im: S,
}

impl<S: Scalar> ComplexM<S> {
    pub fn new(re: S, im: S) -> Self {
        Self { re, im }
    }

    pub fn from_real(re: S) -> Self {
        Self {
            re,
            im: S::from_value(0.0),
        }
    }

    /// The nominal (uncertainty-stripped) value as a plain `Complex64`.
    pub fn nominal(&self) -> Complex64 {
        Complex64::new(self.re.value(), self.im.value())
    }

    pub fn conj(self) -> Self {
        Self {
            re: self.re,
            im: -self.im,
        }
    }

    pub fn norm_sqr(self) -> S {
        self.re * self.re + self.im * self.im
    }

    pub fn norm(self) -> S {
        self.norm_sqr().sqrt()
    }

    /// Principal complex square root, via the generic holomorphic
    /// uncertainty-propagation helper (d(√z) = 1/(2√z) · dz).
    pub fn sqrt(self) -> Self {
        apply_holomorphic(
            self,
            |z| z.sqrt(),
            |z| {
                let s = z.sqrt();
                if s.norm() == 0.0 {
                    Complex64::new(0.0, 0.0)
                } else {
                    1.0 / (2.0 * s)
                }
            },
        )
    }
}

impl<S: Scalar> Add for ComplexM<S> {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            re: self.re + rhs.re,
            im: self.im + rhs.im,
        }
    }
}

impl<S: Scalar> Sub for ComplexM<S> {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self {
            re: self.re - rhs.re,
            im: self.im - rhs.im,
        }
    }
}

impl<S: Scalar> Mul for ComplexM<S> {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        Self {
            re: self.re * rhs.re - self.im * rhs.im,
            im: self.re * rhs.im + self.im * rhs.re,
        }
    }
}

impl<S: Scalar> Div for ComplexM<S> {
    type Output = Self;
    fn div(self, rhs: Self) -> Self {
        let denom = rhs.norm_sqr();
        let num = self * rhs.conj();
        Self {
            re: num.re / denom,
            im: num.im / denom,
        }
    }
}

impl<S: Scalar> Neg for ComplexM<S> {
    type Output = Self;
    fn neg(self) -> Self {
        Self {
            re: -self.re,
            im: -self.im,
        }
    }
}

/// Evaluate a complex-analytic function `f` at the nominal value of
/// `z` and propagate `z`'s uncertainty through `f`'s derivative `fprime`
/// (both evaluated at the nominal point), per the Cauchy–Riemann
/// linearization `dw = f'(z)·dz`.
pub fn apply_holomorphic<S: Scalar>(
    z: ComplexM<S>,
    f: impl Fn(Complex64) -> Complex64,
    fprime: impl Fn(Complex64) -> Complex64,
) -> ComplexM<S> {
    let zn = z.nominal();
    let wn = f(zn);
    let sx = z.re.sigma();
    let sy = z.im.sigma();
    if sx == 0.0 && sy == 0.0 {
        return ComplexM {
            re: S::from_value(wn.re),
            im: S::from_value(wn.im),
        };
    }
    let d = fprime(zn);
    let var_re = (d.re * sx).powi(2) + (d.im * sy).powi(2);
    let var_im = (d.im * sx).powi(2) + (d.re * sy).powi(2);
    ComplexM {
        re: S::from_parts(wn.re, var_re.sqrt()),
        im: S::from_parts(wn.im, var_im.sqrt()),
    }
}

/// Evaluate `g` at the nominal value of `z` and propagate uncertainty
/// through its two *real* partial derivatives `dg/du` and `dg/dv`
/// (`u = Re(z)`, `v = Im(z)`), each themselves complex-valued.
///
/// `apply_holomorphic` is the special case `dg/dv = i·dg/du`; this is
/// the general form needed for functions like the scaled Bessel kernels
/// that are smooth in `(u, v)` but not complex-analytic (the scaling
/// factor `e^{∓u}` depends on `Re(z)` alone).
pub fn apply_with_partials<S: Scalar>(
    z: ComplexM<S>,
    value: Complex64,
    du: Complex64,
    dv: Complex64,
) -> ComplexM<S> {
    let sx = z.re.sigma();
    let sy = z.im.sigma();
    if sx == 0.0 && sy == 0.0 {
        return ComplexM {
            re: S::from_value(value.re),
            im: S::from_value(value.im),
        };
    }
    let var_re = (du.re * sx).powi(2) + (dv.re * sy).powi(2);
    let var_im = (du.im * sx).powi(2) + (dv.im * sy).powi(2);
    ComplexM {
        re: S::from_parts(value.re, var_re.sqrt()),
        im: S::from_parts(value.im, var_im.sqrt()),
    }
}

impl ComplexM<f64> {
    pub fn to_num_complex(self) -> Complex64 {
        Complex64::new(self.re, self.im)
    }

    pub fn from_num_complex(z: Complex64) -> Self {
        Self { re: z.re, im: z.im }
    }
}
