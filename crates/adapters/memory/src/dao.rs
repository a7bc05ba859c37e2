//! In-memory implementation of [`Dao`].

use std::future::Future;
use std::sync::Arc;

use persistkit_app::ports::Dao;
use persistkit_domain::error::PersistError;
use persistkit_domain::identifiable::Identifiable;
use persistkit_domain::search::SearchTemplate;

use crate::error::InMemoryError;
use crate::matching::{Searchable, matches};
use crate::sequence::SequenceId;
use crate::store::{Changes, InMemoryTransaction, Rows, Shared, Writes};

/// DAO over an [`InMemoryStore`](crate::InMemoryStore).
///
/// Identifiers are drawn from a store-wide sequence that is not rolled back
/// with the transaction that consumed it.
pub struct InMemoryDao<E: Identifiable> {
    shared: Arc<Shared<E>>,
}

impl<E: Identifiable> Clone for InMemoryDao<E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<E: Identifiable> InMemoryDao<E> {
    pub(crate) fn new(shared: Arc<Shared<E>>) -> Self {
        Self { shared }
    }
}

impl<E> InMemoryDao<E>
where
    E: Searchable,
    E::Id: Ord + SequenceId,
{
    fn insert(&self, writes: &mut Writes<'_, E>, entity: &mut E) -> Result<(), InMemoryError> {
        match entity.id() {
            Some(id) if writes.contains(id) => {
                return Err(InMemoryError::AlreadyExists {
                    id: format!("{id:?}"),
                });
            }
            Some(_) => {}
            None => entity.set_id(E::Id::from_sequence(self.shared.next_entity_sequence())),
        }

        if let Some(id) = entity.id().cloned() {
            writes.put(id, entity.clone());
        }
        Ok(())
    }

    fn find_in(rows: &Rows<E>, example: &E, template: &SearchTemplate) -> Vec<E> {
        let take = template
            .max_results
            .map_or(usize::MAX, |max| max as usize);
        rows.values()
            .filter(|candidate| matches(*candidate, example, template))
            .skip(template.first_result as usize)
            .take(take)
            .cloned()
            .collect()
    }
}

impl<E> Dao<E> for InMemoryDao<E>
where
    E: Searchable + Send + Sync,
    E::Id: Ord + SequenceId,
{
    type Transaction = InMemoryTransaction<E>;

    fn persist(
        &self,
        tx: &mut InMemoryTransaction<E>,
        entity: &mut E,
    ) -> impl Future<Output = Result<(), PersistError>> + Send {
        let result = tx
            .writes("persist")
            .and_then(|mut writes| self.insert(&mut writes, entity))
            .map_err(PersistError::from);
        async { result }
    }

    fn bulk_persist(
        &self,
        entities: Vec<E>,
    ) -> impl Future<Output = Result<(), PersistError>> + Send {
        let count = entities.len();
        let result = {
            // The lock is held until the batch is published.
            let mut rows = self.shared.rows();
            let mut staged: Rows<E> = rows.clone();
            let mut changes = Changes::new();
            let mut writes = Writes::new(&mut staged, &mut changes);
            let outcome = entities
                .into_iter()
                .try_for_each(|mut entity| self.insert(&mut writes, &mut entity));
            if outcome.is_ok() {
                *rows = staged;
            }
            outcome.map_err(PersistError::from)
        };
        tracing::trace!(count, "bulk insert");
        async { result }
    }

    fn merge(
        &self,
        tx: &mut InMemoryTransaction<E>,
        mut entity: E,
    ) -> impl Future<Output = Result<E, PersistError>> + Send {
        let result = tx.writes("merge").and_then(|mut writes| {
            let Some(id) = entity.id().cloned() else {
                self.insert(&mut writes, &mut entity)?;
                return Ok(entity);
            };
            if !writes.contains(&id) {
                return Err(InMemoryError::NotFound {
                    id: format!("{id:?}"),
                });
            }
            writes.put(id, entity.clone());
            Ok(entity)
        });
        let result = result.map_err(PersistError::from);
        async { result }
    }

    fn retrieve(
        &self,
        tx: &mut InMemoryTransaction<E>,
        example: &E,
    ) -> impl Future<Output = Result<Option<E>, PersistError>> + Send {
        let found = example.id().and_then(|id| tx.rows().get(id).cloned());
        async { Ok(found) }
    }

    fn delete(
        &self,
        tx: &mut InMemoryTransaction<E>,
        example: &E,
    ) -> impl Future<Output = Result<(), PersistError>> + Send {
        let result = tx
            .writes("delete")
            .and_then(|mut writes| {
                let id = example
                    .id()
                    .ok_or(InMemoryError::Unidentified { operation: "delete" })?;
                writes.remove(id);
                Ok(())
            })
            .map_err(PersistError::from);
        async { result }
    }

    fn delete_all(
        &self,
        tx: &mut InMemoryTransaction<E>,
        entities: &[E],
    ) -> impl Future<Output = Result<(), PersistError>> + Send {
        let result = tx
            .writes("delete")
            .map(|mut writes| {
                for id in entities.iter().filter_map(|entity| entity.id()) {
                    writes.remove(id);
                }
            })
            .map_err(PersistError::from);
        async { result }
    }

    fn refresh(
        &self,
        tx: &mut InMemoryTransaction<E>,
        entity: &mut E,
    ) -> impl Future<Output = Result<(), PersistError>> + Send {
        let result = match entity.id().cloned() {
            None => Err(InMemoryError::Unidentified {
                operation: "refresh",
            }),
            Some(id) => match tx.rows().get(&id) {
                Some(stored) => {
                    *entity = stored.clone();
                    Ok(())
                }
                None => Err(InMemoryError::NotFound {
                    id: format!("{id:?}"),
                }),
            },
        };
        let result = result.map_err(PersistError::from);
        async { result }
    }

    fn find(
        &self,
        tx: &mut InMemoryTransaction<E>,
        example: &E,
        template: &SearchTemplate,
    ) -> impl Future<Output = Result<Vec<E>, PersistError>> + Send {
        let found = Self::find_in(tx.rows(), example, template);
        async { Ok(found) }
    }

    fn count(
        &self,
        tx: &mut InMemoryTransaction<E>,
        example: &E,
        template: &SearchTemplate,
    ) -> impl Future<Output = Result<u64, PersistError>> + Send {
        let count = tx
            .rows()
            .values()
            .filter(|candidate| matches(*candidate, example, template))
            .count() as u64;
        async move { Ok(count) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use persistkit_app::ports::{Transaction, TransactionManager, TransactionMode};
    use persistkit_domain::search::SearchMode;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Item {
        id: Option<u64>,
        name: String,
    }

    impl Item {
        fn named(name: &str) -> Self {
            Self {
                name: name.to_string(),
                ..Self::default()
            }
        }
    }

    impl Identifiable for Item {
        type Id = u64;

        fn id(&self) -> Option<&u64> {
            self.id.as_ref()
        }

        fn set_id(&mut self, id: u64) {
            self.id = Some(id);
        }
    }

    impl Searchable for Item {
        fn matches_example(&self, example: &Self) -> bool {
            example.name.is_empty() || self.name == example.name
        }

        fn search_fields(&self) -> Vec<&str> {
            vec![self.name.as_str()]
        }
    }

    async fn seeded(names: &[&str]) -> InMemoryStore<Item> {
        let store = InMemoryStore::new();
        store
            .dao()
            .bulk_persist(names.iter().map(|name| Item::named(name)).collect())
            .await
            .unwrap();
        store
    }

    async fn read(store: &InMemoryStore<Item>) -> InMemoryTransaction<Item> {
        store
            .transactions()
            .begin(TransactionMode::ReadOnly)
            .await
            .unwrap()
    }

    async fn write(store: &InMemoryStore<Item>) -> InMemoryTransaction<Item> {
        store
            .transactions()
            .begin(TransactionMode::ReadWrite)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn should_assign_sequential_ids_on_bulk_insert() {
        let store = seeded(&["john", "joseph", "mark"]).await;

        let ids: Vec<u64> = store.snapshot().iter().filter_map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(store.journal().is_empty());
    }

    #[tokio::test]
    async fn should_insert_nothing_when_bulk_insert_fails() {
        let store = seeded(&["john"]).await;
        let batch = vec![
            Item::named("mark"),
            Item {
                id: Some(1),
                name: "impostor".to_string(),
            },
        ];

        let result = store.dao().bulk_persist(batch).await;

        assert!(matches!(result, Err(PersistError::Storage(_))));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn should_persist_and_retrieve_within_transaction() {
        let store = InMemoryStore::<Item>::new();
        let dao = store.dao();
        let mut tx = write(&store).await;
        let mut item = Item::named("john");

        dao.persist(&mut tx, &mut item).await.unwrap();
        let found = dao.retrieve(&mut tx, &item).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(item.id, Some(1));
        assert_eq!(found, Some(item.clone()));
        assert_eq!(store.snapshot(), vec![item]);
    }

    #[tokio::test]
    async fn should_reject_persist_of_existing_id() {
        let store = seeded(&["john"]).await;
        let dao = store.dao();
        let mut tx = write(&store).await;
        let mut duplicate = Item {
            id: Some(1),
            name: "other".to_string(),
        };

        let result = dao.persist(&mut tx, &mut duplicate).await;

        let Err(PersistError::Storage(source)) = result else {
            panic!("expected storage error");
        };
        assert!(matches!(
            source.downcast_ref::<InMemoryError>(),
            Some(InMemoryError::AlreadyExists { .. })
        ));
    }

    #[tokio::test]
    async fn should_reject_writes_in_read_only_transaction() {
        let store = InMemoryStore::<Item>::new();
        let dao = store.dao();
        let mut tx = read(&store).await;

        let result = dao.persist(&mut tx, &mut Item::named("john")).await;

        assert!(matches!(result, Err(PersistError::Storage(_))));
    }

    #[tokio::test]
    async fn should_merge_existing_and_insert_new() {
        let store = seeded(&["john"]).await;
        let dao = store.dao();
        let mut tx = write(&store).await;

        let updated = dao
            .merge(
                &mut tx,
                Item {
                    id: Some(1),
                    name: "johnny".to_string(),
                },
            )
            .await
            .unwrap();
        let inserted = dao.merge(&mut tx, Item::named("mark")).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(updated.name, "johnny");
        assert_eq!(inserted.id, Some(2));
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn should_fail_merge_of_unknown_id() {
        let store = seeded(&["john"]).await;
        let dao = store.dao();
        let mut tx = write(&store).await;

        let result = dao
            .merge(
                &mut tx,
                Item {
                    id: Some(99),
                    name: "ghost".to_string(),
                },
            )
            .await;

        assert!(matches!(result, Err(PersistError::Storage(_))));
    }

    #[tokio::test]
    async fn should_delete_by_identity_and_batch() {
        let store = seeded(&["john", "joseph", "mark"]).await;
        let dao = store.dao();
        let all = store.snapshot();
        let mut tx = write(&store).await;

        dao.delete(&mut tx, &all[0]).await.unwrap();
        dao.delete_all(&mut tx, &all[1..]).await.unwrap();
        tx.commit().await.unwrap();

        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn should_refresh_from_transaction_snapshot() {
        let store = seeded(&["john"]).await;
        let dao = store.dao();
        let mut tx = read(&store).await;
        let mut stale = Item {
            id: Some(1),
            name: "stale".to_string(),
        };

        dao.refresh(&mut tx, &mut stale).await.unwrap();

        assert_eq!(stale.name, "john");
    }

    #[tokio::test]
    async fn should_fail_refresh_of_missing_entity() {
        let store = InMemoryStore::<Item>::new();
        let dao = store.dao();
        let mut tx = read(&store).await;
        let mut missing = Item {
            id: Some(5),
            name: String::new(),
        };

        let result = dao.refresh(&mut tx, &mut missing).await;

        assert!(matches!(result, Err(PersistError::Storage(_))));
    }

    #[tokio::test]
    async fn should_paginate_find_and_ignore_pagination_in_count() {
        let store = seeded(&["john", "joseph", "jordan", "mark"]).await;
        let dao = store.dao();
        let mut tx = read(&store).await;
        let template = SearchTemplate::new()
            .with_search_pattern("jo")
            .with_search_mode(SearchMode::StartingLike)
            .with_first_result(1)
            .with_max_results(1);

        let found = dao.find(&mut tx, &Item::default(), &template).await.unwrap();
        let count = dao.count(&mut tx, &Item::default(), &template).await.unwrap();

        assert_eq!(found, vec![Item {
            id: Some(2),
            name: "joseph".to_string(),
        }]);
        assert_eq!(count, 3);
    }

    #[tokio::test]
    async fn should_find_by_example() {
        let store = seeded(&["john", "mark", "john"]).await;
        let dao = store.dao();
        let mut tx = read(&store).await;

        let found = dao
            .find(&mut tx, &Item::named("john"), &SearchTemplate::default())
            .await
            .unwrap();

        let ids: Vec<u64> = found.iter().filter_map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }
}
