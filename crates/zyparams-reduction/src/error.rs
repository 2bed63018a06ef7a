/// Errors raised while reordering, bundle-merging, or Kron-eliminating a
/// per-frequency primitive matrix (spec §7's `NumericalDomain` category,
/// reduction-specific cases).
#[derive(Debug, thiserror::Error)]
pub enum ReductionError {
    #[error("permutation length {got} does not match matrix size {expected}")]
    PermutationSizeMismatch { got: usize, expected: usize },

    #[error("eliminate-block matrix at frequency index {frequency_index} is singular and cannot be Kron-reduced")]
    SingularEliminateBlock { frequency_index: usize },
}

pub type ReductionResult<T> = Result<T, ReductionError>;
