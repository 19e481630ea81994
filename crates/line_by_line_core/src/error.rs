//! crates/line_by_line_core/src/error.rs
//!
//! The error type returned by the core's ingestion, selection and review flows.

use crate::ports::PortError;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Input rejected before any write was attempted.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A flow needed an entity that does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The record store failed; surfaced unchanged.
    #[error("Storage error: {0}")]
    Storage(#[from] PortError),
}

pub type CoreResult<T> = Result<T, CoreError>;
