/// Errors raised while computing the modal decomposition for one
/// frequency (spec §7; `ConvergenceFailure` itself is not an `Err` here
/// — it is recovered locally via the eigen fallback and surfaced as
/// `ModalResult::lm_fallback`, per spec's recovery policy).
#[derive(Debug, thiserror::Error)]
pub enum ModalError {
    #[error("modal transform T is singular and cannot be inverted at frequency index {frequency_index}")]
    SingularTransform { frequency_index: usize },
}

pub type ModalResult<T> = Result<T, ModalError>;
