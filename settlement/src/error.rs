//! Error types for settlement computation

use thiserror::Error;

/// Result type for settlement operations
pub type Result<T> = std::result::Result<T, Error>;

/// Settlement errors
#[derive(Error, Debug)]
pub enum Error {
    /// Group or referenced member absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Requester or split participant is not a group member
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Internal consistency fault (balances not conserved, residual
    /// balance after reduction, malformed payment)
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Amount finer than the currency minor unit
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Decimal overflow while accumulating balances
    #[error("Arithmetic overflow: {0}")]
    Overflow(String),

    /// Storage collaborator failure
    #[error("Ledger error: {0}")]
    Ledger(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Short label used for logging and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "not_found",
            Error::Forbidden(_) => "forbidden",
            Error::InvariantViolation(_) => "invariant_violation",
            Error::InvalidAmount(_) => "invalid_amount",
            Error::Overflow(_) => "overflow",
            Error::Ledger(_) => "ledger",
            Error::Config(_) => "config",
            Error::Metrics(_) => "metrics",
            Error::Io(_) => "io",
        }
    }
}

impl From<ledger_core::Error> for Error {
    fn from(err: ledger_core::Error) -> Self {
        match err {
            ledger_core::Error::NotFound(msg) => Error::NotFound(msg),
            ledger_core::Error::Forbidden(msg) => Error::Forbidden(msg),
            ledger_core::Error::InvalidAmount(msg) => Error::InvalidAmount(msg),
            other => Error::Ledger(other.to_string()),
        }
    }
}

impl From<prometheus::Error> for Error {
    fn from(err: prometheus::Error) -> Self {
        Error::Metrics(err.to_string())
    }
}
