//! Entity service: transactional CRUD and search over a [`Dao`].

use std::fmt::Debug;

use persistkit_domain::error::{PersistError, UniquenessViolation};
use persistkit_domain::identifiable::Identifiable;
use persistkit_domain::search::{SearchMode, SearchTemplate};

use crate::ports::{Dao, Transaction, TransactionManager, TransactionMode};

/// Number of rows fetched when checking that a query matches a single entity.
const UNIQUENESS_PROBE: u32 = 2;

/// Constructors for blank and defaulted entity instances.
pub struct EntityFactory<E> {
    /// Entity with every field unset, used to build lookup examples.
    pub blank: fn() -> E,
    /// Entity pre-populated with default field values.
    pub with_defaults: fn() -> E,
}

impl<E> EntityFactory<E> {
    #[must_use]
    pub fn new(blank: fn() -> E, with_defaults: fn() -> E) -> Self {
        Self {
            blank,
            with_defaults,
        }
    }
}

impl<E: Default> Default for EntityFactory<E> {
    fn default() -> Self {
        Self::new(E::default, E::default)
    }
}

impl<E> Clone for EntityFactory<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for EntityFactory<E> {}

/// Generic transactional facade over a DAO.
///
/// Every operation except [`save_batch`](Self::save_batch) runs inside exactly
/// one transaction obtained from the transaction manager: read-only for
/// lookups, counts and refreshes, read-write for saves, merges and deletes. The
/// transaction is committed when the operation succeeds and rolled back when it
/// fails.
pub struct EntityService<E, D, M> {
    dao: D,
    transactions: M,
    factory: EntityFactory<E>,
    defaults: SearchTemplate,
}

impl<E, D, M> EntityService<E, D, M>
where
    E: Identifiable + Debug + Send + Sync,
    M: TransactionManager,
    D: Dao<E, Transaction = M::Transaction>,
{
    /// Create a new service backed by the given DAO and transaction manager.
    pub fn new(dao: D, transactions: M, factory: EntityFactory<E>) -> Self {
        Self {
            dao,
            transactions,
            factory,
            defaults: SearchTemplate::default(),
        }
    }

    /// Replace the template used whenever a caller does not supply one.
    #[must_use]
    pub fn with_default_template(mut self, template: SearchTemplate) -> Self {
        self.defaults = template;
        self
    }

    #[must_use]
    pub fn dao(&self) -> &D {
        &self.dao
    }

    /// A blank entity, suitable as a lookup example.
    #[must_use]
    pub fn get_new(&self) -> E {
        (self.factory.blank)()
    }

    /// An entity pre-populated with default values.
    #[must_use]
    pub fn get_new_with_defaults(&self) -> E {
        (self.factory.with_defaults)()
    }

    /// Template used when a caller omits one.
    #[must_use]
    pub fn default_template(&self) -> &SearchTemplate {
        &self.defaults
    }

    // ---------------------------------------------------------------------
    // Save
    // ---------------------------------------------------------------------

    /// Bulk insert through the DAO's fast path, outside any transaction.
    ///
    /// # Errors
    ///
    /// Returns the storage error propagated from the DAO.
    #[tracing::instrument(skip_all, fields(count = entities.len()))]
    pub async fn save_batch(&self, entities: Vec<E>) -> Result<(), PersistError> {
        self.dao.bulk_persist(entities).await
    }

    /// Persist one entity. The DAO assigns its identifier.
    ///
    /// # Errors
    ///
    /// Returns a storage or transaction error.
    #[tracing::instrument(skip_all)]
    pub async fn save(&self, entity: &mut E) -> Result<(), PersistError> {
        let mut tx = self.begin(TransactionMode::ReadWrite).await?;
        let result = self.dao.persist(&mut tx, entity).await;
        complete(tx, result).await
    }

    /// Persist several entities in a single transaction.
    ///
    /// # Errors
    ///
    /// Returns a storage or transaction error; nothing is committed on error.
    #[tracing::instrument(skip_all, fields(count = entities.len()))]
    pub async fn save_all(&self, entities: &mut [E]) -> Result<(), PersistError> {
        let mut tx = self.begin(TransactionMode::ReadWrite).await?;
        let result = self.dao.persist_all(&mut tx, entities).await;
        complete(tx, result).await
    }

    /// Reconcile a detached entity into the store and return the managed copy.
    ///
    /// # Errors
    ///
    /// Returns a storage or transaction error.
    #[tracing::instrument(skip_all)]
    pub async fn merge(&self, entity: E) -> Result<E, PersistError> {
        let mut tx = self.begin(TransactionMode::ReadWrite).await?;
        let result = self.dao.merge(&mut tx, entity).await;
        complete(tx, result).await
    }

    // ---------------------------------------------------------------------
    // Get and delete
    // ---------------------------------------------------------------------

    /// Look up an entity by identifier. A missing entity is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns a storage or transaction error.
    #[tracing::instrument(skip(self))]
    pub async fn get_by_id(&self, id: E::Id) -> Result<Option<E>, PersistError> {
        let mut tx = self.begin(TransactionMode::ReadOnly).await?;
        let result = self.retrieve_by_id(&mut tx, id).await;
        complete(tx, result).await
    }

    /// Look up the entity sharing the example's identity. A missing entity is
    /// `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns a storage or transaction error.
    #[tracing::instrument(skip_all)]
    pub async fn get(&self, example: &E) -> Result<Option<E>, PersistError> {
        let mut tx = self.begin(TransactionMode::ReadOnly).await?;
        let result = self.dao.retrieve(&mut tx, example).await;
        complete(tx, result).await
    }

    /// Delete the entity with the given identifier, if it exists.
    ///
    /// # Errors
    ///
    /// Returns a storage or transaction error.
    #[tracing::instrument(skip(self))]
    pub async fn delete_by_id(&self, id: E::Id) -> Result<(), PersistError> {
        let mut tx = self.begin(TransactionMode::ReadWrite).await?;
        let result = match self.retrieve_by_id(&mut tx, id).await {
            Ok(found) => self.delete_in(&mut tx, found.as_ref()).await,
            Err(err) => Err(err),
        };
        complete(tx, result).await
    }

    /// Delete the given entity. Deleting `None` is a no-op.
    ///
    /// # Errors
    ///
    /// Returns a storage or transaction error.
    #[tracing::instrument(skip_all)]
    pub async fn delete(&self, entity: Option<&E>) -> Result<(), PersistError> {
        let Some(entity) = entity else {
            tracing::debug!("skipping deletion of absent entity");
            return Ok(());
        };

        let mut tx = self.begin(TransactionMode::ReadWrite).await?;
        let result = self.delete_in(&mut tx, Some(entity)).await;
        complete(tx, result).await
    }

    /// Delete several entities in a single transaction.
    ///
    /// # Errors
    ///
    /// Returns a storage or transaction error.
    #[tracing::instrument(skip_all, fields(count = entities.len()))]
    pub async fn delete_all(&self, entities: &[E]) -> Result<(), PersistError> {
        let mut tx = self.begin(TransactionMode::ReadWrite).await?;
        let result = self.dao.delete_all(&mut tx, entities).await;
        complete(tx, result).await
    }

    // ---------------------------------------------------------------------
    // Refresh
    // ---------------------------------------------------------------------

    /// Reload the entity's state from the store, in place.
    ///
    /// # Errors
    ///
    /// Returns a storage or transaction error.
    #[tracing::instrument(skip_all)]
    pub async fn refresh(&self, entity: &mut E) -> Result<(), PersistError> {
        let mut tx = self.begin(TransactionMode::ReadOnly).await?;
        let result = self.dao.refresh(&mut tx, entity).await;
        complete(tx, result).await
    }

    // ---------------------------------------------------------------------
    // Finders
    // ---------------------------------------------------------------------

    /// The single entity matching the example.
    ///
    /// # Errors
    ///
    /// Returns [`UniquenessViolation::NoneFound`] when nothing matches,
    /// [`UniquenessViolation::MoreThanOne`] when several entities match, or a
    /// storage or transaction error.
    pub async fn find_unique(&self, example: &E) -> Result<E, PersistError> {
        self.find_unique_with(example, &self.defaults).await
    }

    /// The single entity matching the example and template.
    ///
    /// # Errors
    ///
    /// See [`find_unique`](Self::find_unique).
    #[tracing::instrument(skip_all)]
    pub async fn find_unique_with(
        &self,
        example: &E,
        template: &SearchTemplate,
    ) -> Result<E, PersistError> {
        let mut tx = self.begin(TransactionMode::ReadOnly).await?;
        let result = match self.probe_unique(&mut tx, example, template).await {
            Ok(Some(entity)) => Ok(entity),
            Ok(None) => Err(UniquenessViolation::NoneFound {
                sample: format!("{example:?}"),
            }
            .into()),
            Err(err) => Err(err),
        };
        complete(tx, result).await
    }

    /// The entity matching the example, or `None` when nothing matches.
    ///
    /// # Errors
    ///
    /// Returns [`UniquenessViolation::MoreThanOne`] when several entities
    /// match, or a storage or transaction error.
    pub async fn find_unique_or_none(&self, example: &E) -> Result<Option<E>, PersistError> {
        self.find_unique_or_none_with(example, &self.defaults).await
    }

    /// The entity matching the example and template, or `None` when nothing
    /// matches.
    ///
    /// At most two rows are requested from the store whatever the template's
    /// own pagination says.
    ///
    /// # Errors
    ///
    /// See [`find_unique_or_none`](Self::find_unique_or_none).
    #[tracing::instrument(skip_all)]
    pub async fn find_unique_or_none_with(
        &self,
        example: &E,
        template: &SearchTemplate,
    ) -> Result<Option<E>, PersistError> {
        let mut tx = self.begin(TransactionMode::ReadOnly).await?;
        let result = self.probe_unique(&mut tx, example, template).await;
        complete(tx, result).await
    }

    /// Every entity, paginated by the default template.
    ///
    /// # Errors
    ///
    /// Returns a storage or transaction error.
    pub async fn find_all(&self) -> Result<Vec<E>, PersistError> {
        self.find(&self.get_new(), &self.defaults).await
    }

    /// Entities with a searchable field starting with `query`.
    ///
    /// # Errors
    ///
    /// Returns a storage or transaction error.
    #[tracing::instrument(skip(self))]
    pub async fn find_by_query(&self, query: &str) -> Result<Vec<E>, PersistError> {
        let template = self
            .defaults
            .clone()
            .with_search_pattern(query)
            .with_search_mode(SearchMode::StartingLike);
        self.find_with(&template).await
    }

    /// Entities matching the example.
    ///
    /// # Errors
    ///
    /// Returns a storage or transaction error.
    pub async fn find_by_example(&self, example: &E) -> Result<Vec<E>, PersistError> {
        self.find(example, &self.defaults).await
    }

    /// Entities matching the template.
    ///
    /// # Errors
    ///
    /// Returns a storage or transaction error.
    pub async fn find_with(&self, template: &SearchTemplate) -> Result<Vec<E>, PersistError> {
        self.find(&self.get_new(), template).await
    }

    /// Entities matching both the example and the template, in store order.
    ///
    /// # Errors
    ///
    /// Returns a storage or transaction error.
    #[tracing::instrument(
        skip_all,
        fields(pattern = ?template.search_pattern, mode = ?template.search_mode)
    )]
    pub async fn find(
        &self,
        example: &E,
        template: &SearchTemplate,
    ) -> Result<Vec<E>, PersistError> {
        let mut tx = self.begin(TransactionMode::ReadOnly).await?;
        let result = self.dao.find(&mut tx, example, template).await;
        complete(tx, result).await
    }

    // ---------------------------------------------------------------------
    // Counts
    // ---------------------------------------------------------------------

    /// Number of entities.
    ///
    /// # Errors
    ///
    /// Returns a storage or transaction error.
    pub async fn count_all(&self) -> Result<u64, PersistError> {
        self.count(&self.get_new(), &self.defaults).await
    }

    /// Number of entities matching the example.
    ///
    /// # Errors
    ///
    /// Returns a storage or transaction error.
    pub async fn count_by_example(&self, example: &E) -> Result<u64, PersistError> {
        self.count(example, &self.defaults).await
    }

    /// Number of entities matching the template.
    ///
    /// # Errors
    ///
    /// Returns a storage or transaction error.
    pub async fn count_with(&self, template: &SearchTemplate) -> Result<u64, PersistError> {
        self.count(&self.get_new(), template).await
    }

    /// Number of entities matching both the example and the template.
    ///
    /// # Errors
    ///
    /// Returns a storage or transaction error.
    #[tracing::instrument(
        skip_all,
        fields(pattern = ?template.search_pattern, mode = ?template.search_mode)
    )]
    pub async fn count(&self, example: &E, template: &SearchTemplate) -> Result<u64, PersistError> {
        let mut tx = self.begin(TransactionMode::ReadOnly).await?;
        let result = self.dao.count(&mut tx, example, template).await;
        complete(tx, result).await
    }

    // ---------------------------------------------------------------------
    // Helpers running inside an already open transaction
    // ---------------------------------------------------------------------

    async fn begin(&self, mode: TransactionMode) -> Result<M::Transaction, PersistError> {
        tracing::trace!(%mode, "beginning transaction");
        self.transactions.begin(mode).await
    }

    async fn retrieve_by_id(
        &self,
        tx: &mut M::Transaction,
        id: E::Id,
    ) -> Result<Option<E>, PersistError> {
        let mut example = self.get_new();
        example.set_id(id);
        self.dao.retrieve(tx, &example).await
    }

    async fn delete_in(
        &self,
        tx: &mut M::Transaction,
        entity: Option<&E>,
    ) -> Result<(), PersistError> {
        match entity {
            Some(entity) => self.dao.delete(tx, entity).await,
            None => {
                tracing::debug!("skipping deletion of absent entity");
                Ok(())
            }
        }
    }

    /// Fetch at most two matches instead of running a separate count.
    async fn probe_unique(
        &self,
        tx: &mut M::Transaction,
        example: &E,
        template: &SearchTemplate,
    ) -> Result<Option<E>, PersistError> {
        let bounded = template.first_page(UNIQUENESS_PROBE);
        let mut results = self.dao.find(tx, example, &bounded).await?;

        if results.len() > 1 {
            return Err(UniquenessViolation::MoreThanOne {
                sample: format!("{example:?}"),
            }
            .into());
        }

        Ok(results.pop())
    }
}

/// Commit on success, roll back on failure, and hand the operation's result back.
async fn complete<T, X>(tx: X, result: Result<T, PersistError>) -> Result<T, PersistError>
where
    X: Transaction,
{
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            let mode = tx.mode();
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(%mode, error = %rollback_err, "failed to roll back transaction");
            }
            Err(err)
        }
    }
}
