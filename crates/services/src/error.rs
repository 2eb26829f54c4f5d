//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::AssessmentError;
use storage::StorageError;

/// Errors emitted by assessment services.
///
/// Illegal commands on a running assessment are not errors; they are ignored
/// and reported through the command's boolean return value.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("assessment is still in progress")]
    InProgress,
    #[error(transparent)]
    Assessment(#[from] AssessmentError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
