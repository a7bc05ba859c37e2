//! Transaction port: scoped units of work around DAO calls.

use std::fmt;
use std::future::Future;

use persistkit_domain::error::PersistError;

/// Access level requested when a transaction begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionMode {
    /// Lookups, counts and refreshes. Writes may be rejected by the store.
    ReadOnly,
    /// Saves, merges and deletes.
    ReadWrite,
}

impl TransactionMode {
    #[must_use]
    pub fn is_read_only(self) -> bool {
        matches!(self, Self::ReadOnly)
    }
}

impl fmt::Display for TransactionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadOnly => f.write_str("read_only"),
            Self::ReadWrite => f.write_str("read_write"),
        }
    }
}

/// An open transaction.
///
/// Exactly one of [`commit`](Transaction::commit) or
/// [`rollback`](Transaction::rollback) consumes it. Implementations must roll
/// back when the value is dropped without either having run.
pub trait Transaction: Send + Sized {
    /// Mode the transaction was opened with.
    fn mode(&self) -> TransactionMode;

    /// Make the transaction's work durable.
    fn commit(self) -> impl Future<Output = Result<(), PersistError>> + Send;

    /// Discard the transaction's work.
    fn rollback(self) -> impl Future<Output = Result<(), PersistError>> + Send;
}

/// Source of transactions.
pub trait TransactionManager: Send + Sync {
    type Transaction: Transaction;

    /// Open a new transaction.
    fn begin(
        &self,
        mode: TransactionMode,
    ) -> impl Future<Output = Result<Self::Transaction, PersistError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_report_read_only_mode() {
        assert!(TransactionMode::ReadOnly.is_read_only());
        assert!(!TransactionMode::ReadWrite.is_read_only());
    }

    #[test]
    fn should_display_mode_in_snake_case() {
        assert_eq!(TransactionMode::ReadOnly.to_string(), "read_only");
        assert_eq!(TransactionMode::ReadWrite.to_string(), "read_write");
    }
}
