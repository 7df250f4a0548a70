//! Error types for the Tally engine.

use crate::SampleId;
use thiserror::Error;

/// All caller-facing errors from the Tally engine.
///
/// Every variant is recoverable. Duplicate and unknown scans are not errors:
/// they are reported through [`crate::ScanOutcome`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Configuration errors
    #[error("invalid mapping: {0}")]
    InvalidMapping(String),

    #[error("validation error: {0}")]
    Validation(String),

    // Lookup errors
    #[error("sample not found: {0}")]
    NotFound(SampleId),

    #[error("sample already processed: {0}")]
    AlreadyProcessed(SampleId),

    // State errors
    #[error("invalid session state: {0}")]
    InvalidState(String),

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
