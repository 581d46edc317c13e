//! # Error Taxonomy
//!
//! Per spec: precondition failures inside the engine stay boolean/`Option`
//! (no exception-like unwind ever crosses the command boundary). `CanvasError`
//! covers only the typed failure surface that is allowed to produce an
//! `Err`: JSON parsing, design-projection invariants, and persistence I/O.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CanvasError {
    #[error("failed to parse canvas document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("design projection error: {0}")]
    Projection(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    /// Accumulated semantic validation errors from a document load (dangling
    /// port references, etc). Nothing partial is ever emitted when this is
    /// non-empty.
    #[error("canvas document failed validation: {}", .0.join("; "))]
    Validation(Vec<String>),
}

pub type CanvasResult<T> = Result<T, CanvasError>;
