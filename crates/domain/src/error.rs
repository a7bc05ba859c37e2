//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`PersistError`]
//! via `#[from]` or the boxing constructors below.

use std::error::Error as StdError;

/// Boxed error raised by an external collaborator (DAO or transaction manager).
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Raised when a query the caller declared unique did not match exactly one row.
///
/// These indicate wrong assumptions about cardinality in the calling code, not
/// infrastructure faults.
#[derive(Debug, thiserror::Error)]
pub enum UniquenessViolation {
    /// The query matched nothing.
    #[error("expected exactly one result but found none, sample: {sample}")]
    NoneFound { sample: String },

    /// The query matched two rows or more.
    #[error("expected exactly one result but found more than one, sample: {sample}")]
    MoreThanOne { sample: String },
}

impl UniquenessViolation {
    /// The rendered query example the violation was raised for.
    #[must_use]
    pub fn sample(&self) -> &str {
        match self {
            Self::NoneFound { sample } | Self::MoreThanOne { sample } => sample,
        }
    }
}

/// Top-level error returned by every service operation.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("uniqueness violation")]
    Uniqueness(#[from] UniquenessViolation),

    /// Failure reported by the DAO, passed through untouched.
    #[error("storage error")]
    Storage(#[source] BoxError),

    /// Failure to begin or complete a transaction.
    #[error("transaction error")]
    Transaction(#[source] BoxError),
}

impl PersistError {
    /// Wrap a DAO failure.
    pub fn storage(err: impl StdError + Send + Sync + 'static) -> Self {
        Self::Storage(Box::new(err))
    }

    /// Wrap a transaction manager failure.
    pub fn transaction(err: impl StdError + Send + Sync + 'static) -> Self {
        Self::Transaction(Box::new(err))
    }

    #[must_use]
    pub fn is_uniqueness_violation(&self) -> bool {
        matches!(self, Self::Uniqueness(_))
    }
}
