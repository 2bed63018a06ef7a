/// Errors raised while stamping or inverting the per-frequency primitive
/// matrices (spec §7's `NumericalDomain` category, assembly-specific cases).
#[derive(Debug, thiserror::Error)]
pub enum AssemblyError {
    #[error("potential-coefficient matrix at frequency index {frequency_index} is singular and cannot be inverted")]
    SingularPotentialMatrix { frequency_index: usize },

    #[error("cable {cable} has no components to stamp")]
    EmptyCable { cable: usize },
}

pub type AssemblyResult<T> = Result<T, AssemblyError>;
