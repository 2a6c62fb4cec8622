//! Error types for container operations
//!
//! This module defines all error types used throughout QuickMoov.

use crate::core::fourcc::FourCC;
use thiserror::Error;

/// Error types for scanning, analyzing and relocating containers
#[derive(Debug, Error)]
pub enum MoovError {
    /// The input path does not exist
    #[error("File not found: {0}")]
    NotFound(String),

    /// The source is empty or too damaged to hold a box list
    #[error("Corrupt container: {0}")]
    Corrupt(String),

    /// `moov` or `mdat` is missing, so the layout cannot be classified
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// A box required for relocation is absent
    #[error("Cannot find {0} box")]
    BoxNotFound(FourCC),

    /// The requested options would not change the file
    #[error("Nothing to optimize")]
    NothingToOptimize,

    /// Reading the source failed
    #[error("Read failure while {step}: {source}")]
    ReadFailure {
        step: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// Writing the sink failed
    #[error("Write failure while {step}: {source}")]
    WriteFailure {
        step: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// Bad parameter provided to a function
    #[error("Bad parameter: {0}")]
    BadParam(String),
}

impl MoovError {
    pub(crate) fn read(step: &'static str) -> impl FnOnce(std::io::Error) -> Self {
        move |source| MoovError::ReadFailure { step, source }
    }

    pub(crate) fn write(step: &'static str) -> impl FnOnce(std::io::Error) -> Self {
        move |source| MoovError::WriteFailure { step, source }
    }
}

/// Result type alias for QuickMoov operations
pub type MoovResult<T> = Result<T, MoovError>;
