//! Bundle merging and Kron elimination against a precomputed reorder
//! plan (spec §4.4, §5).

pub mod error;
pub mod kron;
pub mod merge;
pub mod plan;

pub use error::{ReductionError, ReductionResult};
pub use kron::kronify;
pub use merge::{merge_bundles, permute};
pub use plan::{build_reorder_plan, BundleGroup, ReorderPlan};
