// SPDX-License-Identifier: MIT

//! Shared error taxonomy. Every component-local error type
//! converts into [`OrchestratorError`] so callers can classify failures
//! without string matching.

use thiserror::Error;

/// The seven error kinds from the error-handling design. Kinds, not type
/// names: every variant maps to one row of the taxonomy table.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Malformed envelope, schema rejection, illegal transition. Surfaced to
    /// the caller; never logged as an error.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Task or project missing.
    #[error("not found: {0}")]
    NotFound(String),

    /// Wrong actor for the operation.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Platform-limit feedback from the executor. Caller recovers by
    /// lowering the concurrency cap; never increments a retry count.
    #[error("concurrency limit: {0}")]
    Concurrency(String),

    /// Rate limit, timeout, network blip. Task moves to `blocked`;
    /// background retry is possible.
    #[error("transient failure: {0}")]
    Transient(String),

    /// Agent unknown, invalid routing. Task moves to `deadletter`.
    #[error("permanent failure: {0}")]
    Permanent(String),

    /// On-disk state disagrees with an invariant (wrong status directory,
    /// stale lock). Reported by lint; the scheduler refuses to act on the
    /// affected task.
    #[error("corruption detected: {0}")]
    Corruption(String),

    /// Escape hatch for I/O and serialization failures that don't cleanly
    /// map to one of the above kinds.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl OrchestratorError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn corruption(msg: impl Into<String>) -> Self {
        Self::Corruption(msg.into())
    }

    /// The error-kind tag used in log fields and tool-call envelopes.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::Unauthorized(_) => "unauthorized",
            Self::Concurrency(_) => "concurrency",
            Self::Transient(_) => "transient",
            Self::Permanent(_) => "permanent",
            Self::Corruption(_) => "corruption",
            Self::Io(_) => "io",
        }
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
