//! Error types for the ledger

use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Group, member, expense or split not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller is not allowed to read or change the resource
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Malformed expense (split sum mismatch, empty description, ...)
    #[error("Invalid expense: {0}")]
    InvalidExpense(String),

    /// Amount is negative or not quantized to the minor unit
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Malformed group (no name, no members)
    #[error("Invalid group: {0}")]
    InvalidGroup(String),

    /// Resource already exists
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Storage backend failure
    #[error("Storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Shorthand for a missing group
    pub fn group_not_found(group_id: impl std::fmt::Display) -> Self {
        Error::NotFound(format!("group {}", group_id))
    }
}
