//! Crate-wide error types.
//!
//! Each external boundary (browser driver, inference endpoint) carries its
//! own error enum next to its module; this module owns the aggregate
//! [`PipelineError`] that stage entry points and `main` return.

use thiserror::Error;

use crate::driver::DriverError;

/// Anything that can stop a pipeline stage.
///
/// Per-article faults (a page that never renders, a classification the
/// model flubs) are absorbed where they happen and logged. Only faults
/// that invalidate a whole stage for a symbol surface as `PipelineError`.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("render driver: {0}")]
    Driver(#[from] DriverError),

    #[error("storage: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization: {0}")]
    Json(#[from] serde_json::Error),

    #[error("compressed payload: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("{0}")]
    Setup(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
