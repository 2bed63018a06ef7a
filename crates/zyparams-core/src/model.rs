//! The problem description, options, and output data model (spec §3, §6).

use crate::constants::{DEFAULT_MAX_TEMPERATURE_DELTA_C, DEFAULT_REFERENCE_TEMPERATURE_C};
use crate::error::{CoreError, CoreResult};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Material and geometric parameters of a single annular conductor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConductorGroup {
    pub radius_in: f64,
    pub radius_ext: f64,
    pub rho_cond: f64,
    pub mu_cond: f64,
    pub eps_cond: f64,
    pub alpha_cond: f64,
}

/// Material and geometric parameters of the insulator jacketing a conductor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InsulatorGroup {
    /// Equal to the containing conductor's `radius_ext`.
    pub radius_in: f64,
    pub radius_ext: f64,
    pub rho_ins: f64,
    pub mu_ins: f64,
    pub eps_ins: f64,
}

/// A single conductor/insulator layer within a cable, innermost first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub conductor: ConductorGroup,
    pub insulator: InsulatorGroup,
}

/// One physical cable: a position plus its nested components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cable {
    /// Horizontal position of the cable center (m).
    pub horz: f64,
    /// Vertical position of the cable center (m); positive above ground.
    pub vert: f64,
    /// Components, innermost conductor first.
    pub components: Vec<Component>,
}

impl Cable {
    /// Outermost insulator radius of this cable.
    pub fn outer_radius(&self) -> f64 {
        self.components
            .iter()
            .map(|c| c.insulator.radius_ext)
            .fold(0.0, f64::max)
    }
}

/// Which earth layer an equivalent-homogeneous-earth formulation should
/// treat as "the" earth when only one effective layer can be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnforceLayer {
    /// Use the layer at this index (0 = air).
    Index(usize),
    /// Use the last layer in the stack. Resolved to a concrete index by
    /// the workspace builder once `earth_layers.len()` is known.
    Last,
}

impl Default for EnforceLayer {
    fn default() -> Self {
        EnforceLayer::Last
    }
}

/// Per-layer, per-frequency earth properties. The first layer is air.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarthLayer {
    /// Resistivity per frequency (Ω·m), length F.
    pub rho_g: Vec<f64>,
    /// Relative permittivity per frequency, length F.
    pub eps_g: Vec<f64>,
    /// Relative permeability per frequency, length F.
    pub mu_g: Vec<f64>,
}

/// The earth model: an ordered stack of layers plus the equivalent-layer
/// selection used by homogeneous-earth kernels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarthModel {
    pub layers: Vec<EarthLayer>,
    #[serde(default)]
    pub enforce_layer: EnforceLayer,
}

/// Earth-return kernel formulation (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EarthKernelKind {
    Papadopoulos,
    Pollaczek,
    Images,
}

/// Bessel evaluation strategy for the internal conductor kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConductorKernelKind {
    /// Full scaled-Bessel formulation (spec §4.1).
    ScaledBessel,
    /// coth/csch thin-shell approximation.
    Simplified,
}

impl Default for ConductorKernelKind {
    fn default() -> Self {
        ConductorKernelKind::ScaledBessel
    }
}

/// The full problem description: geometry, materials, mapping, earth,
/// frequencies, and operating temperature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemDescription {
    pub cables: Vec<Cable>,
    /// Phase assignment per component, flattened in cable/component order.
    /// 0 = grounded/eliminate; equal positive values denote a bundle.
    pub phase_map: Vec<i64>,
    pub earth: EarthModel,
    /// Strictly positive, monotone non-decreasing frequencies (Hz).
    pub frequencies: Vec<f64>,
    pub temperature: f64,
    #[serde(default = "default_reference_temperature")]
    pub reference_temperature: f64,
    #[serde(default = "default_max_temperature_delta")]
    pub max_temperature_delta: f64,
    #[serde(default)]
    pub conductor_kernel: ConductorKernelKind,
    #[serde(default = "default_earth_kernel")]
    pub earth_kernel: EarthKernelKind,
}

fn default_reference_temperature() -> f64 {
    DEFAULT_REFERENCE_TEMPERATURE_C
}

fn default_max_temperature_delta() -> f64 {
    DEFAULT_MAX_TEMPERATURE_DELTA_C
}

fn default_earth_kernel() -> EarthKernelKind {
    EarthKernelKind::Papadopoulos
}

impl ProblemDescription {
    /// Total number of conductor components across all cables (n in spec §3).
    pub fn phase_count(&self) -> usize {
        self.cables.iter().map(|c| c.components.len()).sum()
    }

    /// Number of cables (Nc in spec §3).
    pub fn cable_count(&self) -> usize {
        self.cables.len()
    }

    /// Validate the description per spec §7 InputValidation. Returns the
    /// first violation found; all checks run before any per-frequency work.
    pub fn validate(&self) -> CoreResult<()> {
        if self.frequencies.is_empty() {
            return Err(CoreError::EmptyFrequencyVector);
        }
        for (i, w) in self.frequencies.windows(2).enumerate() {
            if w[1] < w[0] {
                return Err(CoreError::NonMonotoneFrequencies { index: i + 1 });
            }
        }
        for (i, &f) in self.frequencies.iter().enumerate() {
            if f <= 0.0 {
                return Err(CoreError::NonPositiveFrequency { index: i, value: f });
            }
        }
        let delta = (self.temperature - self.reference_temperature).abs();
        if delta > self.max_temperature_delta {
            return Err(CoreError::TemperatureOutOfRange {
                temperature: self.temperature,
                t0: self.reference_temperature,
                delta: self.max_temperature_delta,
            });
        }
        let f_len = self.frequencies.len();
        for (li, layer) in self.earth.layers.iter().enumerate() {
            if layer.rho_g.len() != f_len || layer.eps_g.len() != f_len || layer.mu_g.len() != f_len
            {
                return Err(CoreError::EarthLayerLengthMismatch {
                    layer: li,
                    got: layer.rho_g.len(),
                    expected: f_len,
                });
            }
        }
        let mut idx = 0usize;
        for cable in &self.cables {
            for comp in &cable.components {
                if comp.conductor.radius_ext > comp.insulator.radius_in * (1.0 + 1e-9) {
                    return Err(CoreError::GeometricInconsistency {
                        index: idx,
                        r_ext: comp.conductor.radius_ext,
                        r_ins_in: comp.insulator.radius_in,
                    });
                }
                idx += 1;
            }
        }
        for a in 0..self.cables.len() {
            for b in (a + 1)..self.cables.len() {
                let ca = &self.cables[a];
                let cb = &self.cables[b];
                let distance = ((ca.horz - cb.horz).powi(2) + (ca.vert - cb.vert).powi(2)).sqrt();
                let sum_radii = ca.outer_radius() + cb.outer_radius();
                if distance <= sum_radii {
                    return Err(CoreError::CableOverlap {
                        a,
                        b,
                        distance,
                        sum_radii,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Runtime options recognized by the engine (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Options {
    #[serde(default)]
    pub reduce_bundle: bool,
    #[serde(default)]
    pub kron_reduction: bool,
    #[serde(default)]
    pub temperature_correction: bool,
    #[serde(default)]
    pub ideal_transposition: bool,
    #[serde(default)]
    pub store_primitive_matrices: bool,
    #[serde(default)]
    pub force_overwrite: bool,
    #[serde(default)]
    pub verbosity: u8,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            reduce_bundle: true,
            kron_reduction: true,
            temperature_correction: true,
            ideal_transposition: false,
            store_primitive_matrices: false,
            force_overwrite: false,
            verbosity: 0,
        }
    }
}

/// A dense complex matrix at every requested frequency, row-major per slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyTensor {
    pub n: usize,
    pub f_count: usize,
    /// `data[k][i * n + j]` is entry (i, j) at frequency index k.
    pub data: Vec<Vec<Complex64>>,
}

impl FrequencyTensor {
    pub fn zeros(n: usize, f_count: usize) -> Self {
        Self {
            n,
            f_count,
            data: vec![vec![Complex64::new(0.0, 0.0); n * n]; f_count],
        }
    }

    #[inline]
    pub fn get(&self, k: usize, i: usize, j: usize) -> Complex64 {
        self.data[k][i * self.n + j]
    }

    #[inline]
    pub fn set(&mut self, k: usize, i: usize, j: usize, value: Complex64) {
        self.data[k][i * self.n + j] = value;
    }
}

/// Per-entry propagated standard deviation `(sigma_re, sigma_im)` at
/// every frequency, returned alongside `LineParameters` whenever a
/// build carries input uncertainty (SPEC_FULL supplement: the nominal
/// `FrequencyTensor` is always plain `Complex64`, so uncertainty needs
/// a companion tensor instead of living on the entry type itself).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SigmaTensor {
    pub n: usize,
    pub f_count: usize,
    /// `data[k][i * n + j]` is `(sigma_re, sigma_im)` at (i, j), frequency k.
    pub data: Vec<Vec<(f64, f64)>>,
}

impl SigmaTensor {
    pub fn zeros(n: usize, f_count: usize) -> Self {
        Self {
            n,
            f_count,
            data: vec![vec![(0.0, 0.0); n * n]; f_count],
        }
    }

    #[inline]
    pub fn get(&self, k: usize, i: usize, j: usize) -> (f64, f64) {
        self.data[k][i * self.n + j]
    }

    #[inline]
    pub fn set(&mut self, k: usize, i: usize, j: usize, value: (f64, f64)) {
        self.data[k][i * self.n + j] = value;
    }

    /// True if every entry at every frequency has zero sigma.
    pub fn is_all_zero(&self) -> bool {
        self.data.iter().all(|slice| slice.iter().all(|&(r, i)| r == 0.0 && i == 0.0))
    }
}

/// Z, Y and the frequency vector they were evaluated at (spec §6).
/// `z_sigma`/`y_sigma` are `Some` only when the build carried input
/// uncertainty (§8 scenario 5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineParameters {
    pub z: FrequencyTensor,
    pub y: FrequencyTensor,
    pub f: Vec<f64>,
    #[serde(default)]
    pub z_sigma: Option<SigmaTensor>,
    #[serde(default)]
    pub y_sigma: Option<SigmaTensor>,
}

/// Optional modal decomposition output (spec §4.5, §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModalOutput {
    pub t: FrequencyTensor,
    pub z_c: FrequencyTensor,
    pub y_c: FrequencyTensor,
    pub z_ch: FrequencyTensor,
    pub y_ch: FrequencyTensor,
    /// Propagation constants γ per mode per frequency, `gamma[k][mode]`.
    pub gamma: Vec<Vec<Complex64>>,
    /// Set for frequency indices where LM continuation did not converge
    /// and the engine fell back to a plain eigen decomposition.
    pub lm_fallback: Vec<bool>,
}

/// Pre-reduction/primitive matrices retained when `store_primitive_matrices`
/// is set (spec §9 Design Notes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimitiveMatrices {
    pub z_internal: FrequencyTensor,
    pub p_internal: FrequencyTensor,
    pub z_earth: Vec<Vec<Complex64>>,
    pub p_earth: Vec<Vec<Complex64>>,
    pub z_pre_reduction: FrequencyTensor,
    pub p_pre_reduction: FrequencyTensor,
}

/// A non-fatal, per-frequency diagnostic surfaced back to the caller
/// instead of a log line (spec §7 recoverable failures).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngineWarning {
    ConvergenceFailure { frequency_index: usize },
    IntegrationFailure { frequency_index: usize, achieved_tolerance: f64 },
    ReciprocityViolation { frequency_index: usize, offdiag_ratio: f64 },
}
