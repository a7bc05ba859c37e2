//! Application services.
//!
//! Each service struct accepts port trait implementations via generic parameters
//! (constructor injection), keeping this layer decoupled from concrete adapters.

pub mod entity_service;

pub use entity_service::{EntityFactory, EntityService};
