//! Engine-level errors, layered on top of `lojix-core`.

use thiserror::Error;

use lojix_core::CoreError;

/// Errors surfaced by the engine to its callers.
///
/// Most of the time this is a passed-through `CoreError`; the engine adds
/// only the failure modes that arise from orchestrating multiple ledgers.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A multi-ledger operation failed partway AND undoing the already
    /// committed steps also failed. The ledgers are inconsistent; the
    /// details name exactly what was left behind for manual repair.
    #[error("compensation failed during {operation}: {details}")]
    CompensationFailed { operation: String, details: String },
}

impl From<lojix_core::ValidationError> for EngineError {
    fn from(err: lojix_core::ValidationError) -> Self {
        EngineError::Core(err.into())
    }
}

impl EngineError {
    pub fn compensation_failed(
        operation: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        EngineError::CompensationFailed {
            operation: operation.into(),
            details: details.into(),
        }
    }
}

/// Convenience type alias for Results with EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_error_passes_through_transparently() {
        let err: EngineError = CoreError::not_found("Sale", "s1").into();
        assert_eq!(err.to_string(), "Sale not found: s1");
    }
}
