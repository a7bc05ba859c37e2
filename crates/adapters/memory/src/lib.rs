//! # persistkit-adapter-memory
//!
//! In-memory persistence adapter.
//!
//! ## Responsibilities
//! - Implement the `Dao`, `TransactionManager` and `Transaction` port traits
//!   defined in `persistkit-app::ports`
//! - Keep every entity of one type in a shared table ordered by identifier
//! - Stage read-write transactions on a private copy of the table and publish
//!   only the keys they touched on commit
//! - Record every transaction's lifecycle in a journal tests can inspect
//!
//! ## Dependency rule
//! Depends on `persistkit-app` (for port traits) and `persistkit-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

mod dao;
mod error;
mod matching;
mod sequence;
mod store;

pub use dao::InMemoryDao;
pub use error::InMemoryError;
pub use matching::Searchable;
pub use sequence::SequenceId;
pub use store::{
    InMemoryStore, InMemoryTransaction, InMemoryTransactionManager, TransactionEvent,
};
