//! DAO port: example-based persistence for one entity type.
//!
//! Queries are expressed by example: a partially populated entity whose set
//! fields are the ones to match. How examples and [`SearchTemplate`]s are turned
//! into actual queries is left entirely to the implementation.

use std::future::Future;

use persistkit_domain::error::PersistError;
use persistkit_domain::identifiable::Identifiable;
use persistkit_domain::search::SearchTemplate;

use super::transaction::Transaction;

/// Data access object for entities of type `E`.
///
/// Every method except [`bulk_persist`](Dao::bulk_persist) runs inside a
/// transaction handed in by the caller. Errors are reported as
/// [`PersistError::Storage`] (or any other variant the implementation sees fit)
/// and are passed through the service layer untouched.
pub trait Dao<E>: Send + Sync
where
    E: Identifiable + Send + Sync,
{
    type Transaction: Transaction;

    /// Insert a new entity, assigning its identifier.
    fn persist(
        &self,
        tx: &mut Self::Transaction,
        entity: &mut E,
    ) -> impl Future<Output = Result<(), PersistError>> + Send;

    /// Insert several entities, assigning their identifiers.
    fn persist_all(
        &self,
        tx: &mut Self::Transaction,
        entities: &mut [E],
    ) -> impl Future<Output = Result<(), PersistError>> + Send {
        async move {
            for entity in entities.iter_mut() {
                self.persist(tx, entity).await?;
            }
            Ok(())
        }
    }

    /// High-volume insert bypassing per-row overhead.
    ///
    /// Runs outside any service-managed transaction; atomicity is whatever the
    /// implementation provides.
    fn bulk_persist(
        &self,
        entities: Vec<E>,
    ) -> impl Future<Output = Result<(), PersistError>> + Send;

    /// Copy the state of a detached entity onto the managed one and return it.
    fn merge(
        &self,
        tx: &mut Self::Transaction,
        entity: E,
    ) -> impl Future<Output = Result<E, PersistError>> + Send;

    /// Fetch the entity sharing the example's identity.
    fn retrieve(
        &self,
        tx: &mut Self::Transaction,
        example: &E,
    ) -> impl Future<Output = Result<Option<E>, PersistError>> + Send;

    /// Delete the entity sharing the example's identity.
    fn delete(
        &self,
        tx: &mut Self::Transaction,
        example: &E,
    ) -> impl Future<Output = Result<(), PersistError>> + Send;

    /// Delete every listed entity by identity. Unknown identifiers are skipped.
    fn delete_all(
        &self,
        tx: &mut Self::Transaction,
        entities: &[E],
    ) -> impl Future<Output = Result<(), PersistError>> + Send;

    /// Reload the entity's state from the store, in place.
    fn refresh(
        &self,
        tx: &mut Self::Transaction,
        entity: &mut E,
    ) -> impl Future<Output = Result<(), PersistError>> + Send;

    /// Entities matching the example and template, in store order.
    fn find(
        &self,
        tx: &mut Self::Transaction,
        example: &E,
        template: &SearchTemplate,
    ) -> impl Future<Output = Result<Vec<E>, PersistError>> + Send;

    /// Number of entities matching the example and template.
    fn count(
        &self,
        tx: &mut Self::Transaction,
        example: &E,
        template: &SearchTemplate,
    ) -> impl Future<Output = Result<u64, PersistError>> + Send;
}
