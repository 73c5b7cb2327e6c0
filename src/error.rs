//! Error handling module for WorkPulse.
//!
//! This module provides a unified error type using the `thiserror` crate.
//! The domain variants mirror how callers are expected to react: not found,
//! forbidden, validation, conflict and concurrency failures are the caller's
//! problem, everything else is a system failure.

use std::io;
use thiserror::Error;

/// Unified error type for the WorkPulse engine.
#[derive(Error, Debug)]
pub enum WorkPulseError {
    /// Session, alert or other resource is absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Cross-user or cross-tenant access
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Timestamp out of bounds, malformed activity, oversized batch
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Second active session, session already stopped, alert already resolved
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Optimistic update retries exhausted
    #[error("Concurrent update failed: {0}")]
    Concurrency(String),

    /// Database operation errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Connection pool errors
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// I/O operation errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic infrastructure failure
    #[error("System error: {0}")]
    System(String),
}

/// Result type alias for WorkPulse operations
pub type Result<T> = std::result::Result<T, WorkPulseError>;

impl WorkPulseError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        WorkPulseError::NotFound(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        WorkPulseError::Forbidden(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        WorkPulseError::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        WorkPulseError::Conflict(msg.into())
    }

    pub fn concurrency(msg: impl Into<String>) -> Self {
        WorkPulseError::Concurrency(msg.into())
    }

    pub fn system(msg: impl Into<String>) -> Self {
        WorkPulseError::System(msg.into())
    }

    /// True for store/queue/infrastructure failures as opposed to errors
    /// caused by the request itself.
    pub fn is_system(&self) -> bool {
        matches!(
            self,
            WorkPulseError::Database(_)
                | WorkPulseError::Pool(_)
                | WorkPulseError::Io(_)
                | WorkPulseError::Json(_)
                | WorkPulseError::Config(_)
                | WorkPulseError::System(_)
        )
    }
}

impl From<String> for WorkPulseError {
    fn from(s: String) -> Self {
        WorkPulseError::System(s)
    }
}

impl From<&str> for WorkPulseError {
    fn from(s: &str) -> Self {
        WorkPulseError::System(s.to_string())
    }
}
