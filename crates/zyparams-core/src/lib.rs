pub mod complex;
pub mod constants;
pub mod error;
pub mod model;
pub mod scalar;

pub use complex::{apply_holomorphic, apply_with_partials, ComplexM};
pub use error::{CoreError, CoreResult};
pub use num_complex::Complex64;
pub use scalar::{Measurement, Scalar};
