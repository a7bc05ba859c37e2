//! # persistkit-app
//!
//! Application layer: the generic entity service and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `Dao`: example-based CRUD plus templated find and count
//!   - `TransactionManager` / `Transaction`: scoped read-only or read-write units of work
//! - Provide the **driving/inbound** `EntityService`: save, merge, get, delete,
//!   refresh, find, find-unique and count for any identifiable entity type
//! - Run every service operation inside exactly one transaction, committing on
//!   success and rolling back on error
//!
//! ## Dependency rule
//! Depends on `persistkit-domain` only (plus `tracing`).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod ports;
pub mod services;
