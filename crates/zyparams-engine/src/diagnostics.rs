//! Accumulates the optional `store_primitive_matrices` diagnostics
//! (spec §9 Design Notes) across frequencies into the public
//! `PrimitiveMatrices` tensors.

use num_complex::Complex64;
use zyparams_assembly::Primitives;
use zyparams_core::model::{FrequencyTensor, PrimitiveMatrices};
use zyparams_core::Scalar;

pub struct PrimitivesAccumulator {
    z_internal: FrequencyTensor,
    p_internal: FrequencyTensor,
    z_earth: Vec<Vec<Complex64>>,
    p_earth: Vec<Vec<Complex64>>,
    z_pre_reduction: FrequencyTensor,
    p_pre_reduction: FrequencyTensor,
}

impl PrimitivesAccumulator {
    pub fn new(n: usize, n_cables: usize, f_count: usize) -> Self {
        Self {
            z_internal: FrequencyTensor::zeros(n, f_count),
            p_internal: FrequencyTensor::zeros(n, f_count),
            z_earth: vec![vec![Complex64::new(0.0, 0.0); n_cables * n_cables]; f_count],
            p_earth: vec![vec![Complex64::new(0.0, 0.0); n_cables * n_cables]; f_count],
            z_pre_reduction: FrequencyTensor::zeros(n, f_count),
            p_pre_reduction: FrequencyTensor::zeros(n, f_count),
        }
    }

    pub fn store<S: Scalar>(&mut self, k: usize, primitives: &Primitives<S>) {
        let n = primitives.z.n;
        for i in 0..n {
            for j in 0..n {
                self.z_internal.set(k, i, j, primitives.z_internal.get(i, j).nominal());
                self.p_internal.set(k, i, j, primitives.p_internal.get(i, j).nominal());
                self.z_pre_reduction.set(k, i, j, primitives.z.get(i, j).nominal());
                self.p_pre_reduction.set(k, i, j, primitives.p.get(i, j).nominal());
            }
        }
        let nc = primitives.z_earth.n;
        for i in 0..nc {
            for j in 0..nc {
                self.z_earth[k][i * nc + j] = primitives.z_earth.get(i, j).nominal();
                self.p_earth[k][i * nc + j] = primitives.p_earth.get(i, j).nominal();
            }
        }
    }

    pub fn finish(self) -> PrimitiveMatrices {
        PrimitiveMatrices {
            z_internal: self.z_internal,
            p_internal: self.p_internal,
            z_earth: self.z_earth,
            p_earth: self.p_earth,
            z_pre_reduction: self.z_pre_reduction,
            p_pre_reduction: self.p_pre_reduction,
        }
    }
}
