//! Flattens a validated problem description into the contiguous arrays
//! the per-frequency assembler and kernel layer consume (spec §4.2).

pub mod builder;

pub use builder::{angular_frequency_nominal, build, UncertaintyOverlay, Workspace};
