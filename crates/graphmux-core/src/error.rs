//! Graph error types.

use std::fmt;
use thiserror::Error;

/// Which side of a graph lock an operation needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    /// Shared side, needed for traversal
    Read,
    /// Exclusive side, needed for mutation
    Write,
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockMode::Read => write!(f, "read"),
            LockMode::Write => write!(f, "write"),
        }
    }
}

/// Errors raised by graph handles and triple stores.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Mutation attempted on an immutable graph
    #[error("graph is immutable: '{operation}' is not permitted")]
    Immutable { operation: &'static str },

    /// Checked graph accessed without holding the matching lock
    #[error("lock discipline violation: '{operation}' requires the caller to hold the {required} lock")]
    LockDisciplineViolation {
        operation: &'static str,
        required: LockMode,
    },

    /// Graph name failed validation
    #[error("invalid graph name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// Underlying triple store failed
    #[error("triple store error: {message}")]
    Store { message: String },
}

impl GraphError {
    /// Create an Immutable error.
    pub fn immutable(operation: &'static str) -> Self {
        Self::Immutable { operation }
    }

    /// Create a LockDisciplineViolation error.
    pub fn lock_violation(operation: &'static str, required: LockMode) -> Self {
        Self::LockDisciplineViolation {
            operation,
            required,
        }
    }

    /// Create an InvalidName error.
    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a Store error.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// True for violations reported by checked graphs.
    pub fn is_lock_violation(&self) -> bool {
        matches!(self, Self::LockDisciplineViolation { .. })
    }
}
