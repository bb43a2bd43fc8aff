//! Error types for the sinkscope-core crate
//!
//! One categorized error enum for the whole analysis. Per-path failures are
//! converted into structured path outcomes at the worker boundary; only
//! configuration errors propagate to the top-level driver.

use std::time::Duration;
use thiserror::Error;

/// Unified analysis error
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Invalid configuration or malformed startup input. Fatal.
    #[error("configuration error: {0}")]
    Config(String),

    /// A class referenced by the manifest or the IR is not in the inventory.
    #[error("missing class: {0}")]
    MissingClass(String),

    /// A method exists but carries no body.
    #[error("missing method body: {0}")]
    MissingBody(String),

    /// Cooperative cancellation observed (global budget exhausted).
    #[error("analysis cancelled")]
    Cancelled,

    /// The per-path wall-clock budget ran out.
    #[error("path work exceeded {0:?} budget")]
    PathTimeout(Duration),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Invariant violation inside the analysis itself.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AnalysisError {
    /// Exit code mapping: configuration errors are `2`, everything else `1`.
    pub fn exit_code(&self) -> i32 {
        match self {
            AnalysisError::Config(_) => 2,
            _ => 1,
        }
    }

    /// Errors that abort a single path without touching its siblings.
    pub fn is_path_local(&self) -> bool {
        matches!(
            self,
            AnalysisError::Cancelled | AnalysisError::PathTimeout(_)
        )
    }
}

/// Result type alias
pub type AnalysisResult<T> = std::result::Result<T, AnalysisError>;
