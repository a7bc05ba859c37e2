//! # persistkit-domain
//!
//! Pure domain model shared by every persistkit crate.
//!
//! ## Responsibilities
//! - Define the [`Identifiable`](identifiable::Identifiable) contract every
//!   persisted entity implements
//! - Define **search templates** (pagination + free-text pattern + match mode)
//! - Define the error taxonomy, including the uniqueness violations raised when
//!   a query declared unique returns zero or several rows
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod identifiable;
pub mod search;
