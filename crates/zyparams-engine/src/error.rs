/// Top-level error type seen at the engine's public boundary (spec §7):
/// wraps every per-crate error so a caller only ever matches on one type.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] zyparams_core::CoreError),

    #[error(transparent)]
    Assembly(#[from] zyparams_assembly::AssemblyError),

    #[error(transparent)]
    Reduction(#[from] zyparams_reduction::ReductionError),

    #[error(transparent)]
    Modal(#[from] zyparams_modal::ModalError),
}

pub type EngineResult<T> = Result<T, EngineError>;
