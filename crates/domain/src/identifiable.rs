//! Identity contract for persisted entities.

use std::fmt::Debug;

/// An entity carrying a unique identifier.
///
/// The identifier is `None` until the entity has been persisted; the storage
/// layer assigns it. Callers may set it explicitly to build a lookup example
/// (a blank entity with only its id populated).
pub trait Identifiable {
    /// Primary key type.
    type Id: Clone + Eq + Debug + Send + Sync + 'static;

    /// The identifier, if the entity has one yet.
    fn id(&self) -> Option<&Self::Id>;

    /// Assign the identifier.
    fn set_id(&mut self, id: Self::Id);

    /// Whether the entity has been given an identifier.
    fn is_identified(&self) -> bool {
        self.id().is_some()
    }
}
