//! Errors raised by the in-memory store.

use persistkit_domain::error::PersistError;

/// Errors originating from the in-memory storage layer.
#[derive(Debug, thiserror::Error)]
pub enum InMemoryError {
    /// A write was attempted through a read-only transaction.
    #[error("cannot {operation} inside a read-only transaction")]
    ReadOnlyTransaction { operation: &'static str },

    #[error("no entity with id {id}")]
    NotFound { id: String },

    #[error("an entity with id {id} already exists")]
    AlreadyExists { id: String },

    /// The operation needs an identified entity.
    #[error("cannot {operation} an entity without id")]
    Unidentified { operation: &'static str },
}

impl From<InMemoryError> for PersistError {
    fn from(err: InMemoryError) -> Self {
        Self::storage(err)
    }
}
