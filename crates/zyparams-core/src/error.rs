/// Errors produced anywhere in the zyparams engine.
///
/// Variants are grouped loosely by spec category: input validation
/// (fatal, reported before any per-frequency work), numerical-domain
/// issues raised by a kernel that has no sentinel for the condition,
/// and solver-level failures that a caller may choose to recover from.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("empty frequency vector")]
    EmptyFrequencyVector,

    #[error("frequency vector is not monotonically non-decreasing at index {index}")]
    NonMonotoneFrequencies { index: usize },

    #[error("non-positive frequency {value} Hz at index {index}")]
    NonPositiveFrequency { index: usize, value: f64 },

    #[error("cables {a} and {b} overlap: center distance {distance} <= sum of insulator radii {sum_radii}")]
    CableOverlap {
        a: usize,
        b: usize,
        distance: f64,
        sum_radii: f64,
    },

    #[error("temperature {temperature} is outside [{t0} - {delta}, {t0} + {delta}]")]
    TemperatureOutOfRange {
        temperature: f64,
        t0: f64,
        delta: f64,
    },

    #[error("earth layer {layer} has {got} per-frequency entries, expected {expected}")]
    EarthLayerLengthMismatch {
        layer: usize,
        got: usize,
        expected: usize,
    },

    #[error("conductor outer radius {r_ext} exceeds insulator inner radius {r_ins_in} on component {index}")]
    GeometricInconsistency {
        index: usize,
        r_ext: f64,
        r_ins_in: f64,
    },

    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("numerical convergence failed after {iterations} iterations")]
    ConvergenceFailed { iterations: usize },

    #[error("adaptive integration exceeded its evaluation budget ({evaluations} evaluations, achieved tolerance {achieved})")]
    IntegrationBudgetExceeded { evaluations: usize, achieved: f64 },
}

/// Convenience result type used throughout the engine.
pub type CoreResult<T> = Result<T, CoreError>;
