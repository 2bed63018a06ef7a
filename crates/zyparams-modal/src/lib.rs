//! Frequency-tracked modal decomposition of the per-unit-length `Z`/`Y`
//! matrices (spec §4.5): diagonalizes `S = Y·Z` at each frequency,
//! continuing the eigenbasis from the previous frequency via
//! Levenberg-Marquardt so that mode identity (and hence `T`'s column
//! order and sign) stays stable across a sweep instead of jumping
//! around as a fresh eigendecomposition's arbitrary ordering would.

pub mod continuation;
pub mod decompose;
pub mod eigen;
pub mod error;
pub mod rotation;

pub use decompose::{seed_first_frequency, step_frequency, ModalStep, DEFAULT_LM_MAX_ITER, DEFAULT_LM_TOL};
pub use eigen::{eigen_general, eigen_general_with, EigenDecomposition};
pub use error::{ModalError, ModalResult};
