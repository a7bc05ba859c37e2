//! Shared table, transactions and their journal.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use persistkit_app::ports::{Transaction, TransactionManager, TransactionMode};
use persistkit_domain::error::PersistError;
use persistkit_domain::identifiable::Identifiable;

use crate::dao::InMemoryDao;
use crate::error::InMemoryError;

pub(crate) type Rows<E> = BTreeMap<<E as Identifiable>::Id, E>;

/// Pending change per identifier: `Some` stores the entity, `None` removes it.
pub(crate) type Changes<E> = BTreeMap<<E as Identifiable>::Id, Option<E>>;

/// Lifecycle step of an in-memory transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionEvent {
    Began { id: u64, mode: TransactionMode },
    Committed { id: u64 },
    RolledBack { id: u64 },
}

pub(crate) struct Shared<E: Identifiable> {
    rows: Mutex<Rows<E>>,
    journal: Mutex<Vec<TransactionEvent>>,
    entity_sequence: AtomicU64,
    transaction_sequence: AtomicU64,
}

impl<E: Identifiable> Shared<E>
where
    E::Id: Ord,
{
    pub(crate) fn rows(&self) -> MutexGuard<'_, Rows<E>> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn next_entity_sequence(&self) -> u64 {
        self.entity_sequence.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Publish only the keys a transaction touched.
    fn apply(&self, changes: Changes<E>) {
        let mut rows = self.rows();
        for (id, change) in changes {
            match change {
                Some(entity) => {
                    rows.insert(id, entity);
                }
                None => {
                    rows.remove(&id);
                }
            }
        }
    }

    fn record(&self, event: TransactionEvent) {
        tracing::trace!(?event, "in-memory transaction");
        self.journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

/// Entities of one type kept in memory, ordered by identifier.
///
/// Cloning is cheap and shares the underlying table.
pub struct InMemoryStore<E: Identifiable> {
    shared: Arc<Shared<E>>,
}

impl<E: Identifiable> Clone for InMemoryStore<E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<E: Identifiable> Default for InMemoryStore<E>
where
    E::Id: Ord,
{
    fn default() -> Self {
        Self {
            shared: Arc::new(Shared {
                rows: Mutex::new(BTreeMap::new()),
                journal: Mutex::new(Vec::new()),
                entity_sequence: AtomicU64::new(0),
                transaction_sequence: AtomicU64::new(0),
            }),
        }
    }
}

impl<E: Identifiable + Clone> InMemoryStore<E>
where
    E::Id: Ord,
{
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// DAO reading and writing this store.
    #[must_use]
    pub fn dao(&self) -> InMemoryDao<E> {
        InMemoryDao::new(Arc::clone(&self.shared))
    }

    /// Transaction manager for this store.
    #[must_use]
    pub fn transactions(&self) -> InMemoryTransactionManager<E> {
        InMemoryTransactionManager {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Committed entities in identifier order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<E> {
        self.shared.rows().values().cloned().collect()
    }

    /// Number of committed entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.rows().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every transaction lifecycle event recorded so far.
    #[must_use]
    pub fn journal(&self) -> Vec<TransactionEvent> {
        self.shared
            .journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Opens [`InMemoryTransaction`]s over a store.
pub struct InMemoryTransactionManager<E: Identifiable> {
    shared: Arc<Shared<E>>,
}

impl<E> TransactionManager for InMemoryTransactionManager<E>
where
    E: Identifiable + Clone + Send + Sync,
    E::Id: Ord,
{
    type Transaction = InMemoryTransaction<E>;

    fn begin(
        &self,
        mode: TransactionMode,
    ) -> impl Future<Output = Result<InMemoryTransaction<E>, PersistError>> + Send {
        let id = self
            .shared
            .transaction_sequence
            .fetch_add(1, Ordering::Relaxed)
            + 1;
        let rows = self.shared.rows().clone();
        self.shared.record(TransactionEvent::Began { id, mode });

        let tx = InMemoryTransaction {
            id,
            mode,
            rows,
            changes: Changes::new(),
            shared: Arc::clone(&self.shared),
            finished: false,
        };
        async { Ok(tx) }
    }
}

/// Snapshot of the table taken when the transaction began.
///
/// Read-write transactions apply their changes to the snapshot and remember
/// which keys they touched; commit writes only those keys to the shared table,
/// so concurrent commits on other keys survive. Dropping an unfinished
/// transaction rolls it back.
pub struct InMemoryTransaction<E: Identifiable>
where
    E::Id: Ord,
{
    id: u64,
    mode: TransactionMode,
    rows: Rows<E>,
    changes: Changes<E>,
    shared: Arc<Shared<E>>,
    finished: bool,
}

impl<E: Identifiable> InMemoryTransaction<E>
where
    E::Id: Ord,
{
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn rows(&self) -> &Rows<E> {
        &self.rows
    }

    fn finish(&mut self, commit: bool) {
        let changes = std::mem::take(&mut self.changes);
        if commit && !changes.is_empty() {
            self.shared.apply(changes);
        }
        let event = if commit {
            TransactionEvent::Committed { id: self.id }
        } else {
            TransactionEvent::RolledBack { id: self.id }
        };
        self.shared.record(event);
        self.finished = true;
    }
}

impl<E> InMemoryTransaction<E>
where
    E: Identifiable + Clone,
    E::Id: Ord,
{
    /// Write access to the snapshot, refused in read-only transactions.
    pub(crate) fn writes(
        &mut self,
        operation: &'static str,
    ) -> Result<Writes<'_, E>, InMemoryError> {
        if self.mode.is_read_only() {
            return Err(InMemoryError::ReadOnlyTransaction { operation });
        }
        Ok(Writes::new(&mut self.rows, &mut self.changes))
    }
}

/// Rows being written, with every touched key recorded.
pub(crate) struct Writes<'a, E: Identifiable> {
    rows: &'a mut Rows<E>,
    changes: &'a mut Changes<E>,
}

impl<'a, E> Writes<'a, E>
where
    E: Identifiable + Clone,
    E::Id: Ord,
{
    pub(crate) fn new(rows: &'a mut Rows<E>, changes: &'a mut Changes<E>) -> Self {
        Self { rows, changes }
    }

    pub(crate) fn contains(&self, id: &E::Id) -> bool {
        self.rows.contains_key(id)
    }

    pub(crate) fn put(&mut self, id: E::Id, entity: E) {
        self.changes.insert(id.clone(), Some(entity.clone()));
        self.rows.insert(id, entity);
    }

    pub(crate) fn remove(&mut self, id: &E::Id) {
        if self.rows.remove(id).is_some() {
            self.changes.insert(id.clone(), None);
        }
    }
}

impl<E> Transaction for InMemoryTransaction<E>
where
    E: Identifiable + Send + Sync,
    E::Id: Ord,
{
    fn mode(&self) -> TransactionMode {
        self.mode
    }

    fn commit(mut self) -> impl Future<Output = Result<(), PersistError>> + Send {
        self.finish(true);
        async { Ok(()) }
    }

    fn rollback(mut self) -> impl Future<Output = Result<(), PersistError>> + Send {
        self.finish(false);
        async { Ok(()) }
    }
}

impl<E: Identifiable> Drop for InMemoryTransaction<E>
where
    E::Id: Ord,
{
    fn drop(&mut self) {
        if !self.finished {
            tracing::debug!(id = self.id, "rolling back abandoned transaction");
            self.finish(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Note {
        id: Option<u64>,
        text: String,
    }

    impl Identifiable for Note {
        type Id = u64;

        fn id(&self) -> Option<&u64> {
            self.id.as_ref()
        }

        fn set_id(&mut self, id: u64) {
            self.id = Some(id);
        }
    }

    fn note(id: u64, text: &str) -> Note {
        Note {
            id: Some(id),
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn should_publish_writes_on_commit() {
        let store = InMemoryStore::<Note>::new();
        let mut tx = store
            .transactions()
            .begin(TransactionMode::ReadWrite)
            .await
            .unwrap();

        tx.writes("insert").unwrap().put(1, note(1, "hello"));
        assert!(store.is_empty());

        tx.commit().await.unwrap();
        assert_eq!(store.snapshot(), vec![note(1, "hello")]);
    }

    #[tokio::test]
    async fn should_discard_writes_on_rollback() {
        let store = InMemoryStore::<Note>::new();
        let mut tx = store
            .transactions()
            .begin(TransactionMode::ReadWrite)
            .await
            .unwrap();

        tx.writes("insert").unwrap().put(1, note(1, "hello"));
        tx.rollback().await.unwrap();

        assert!(store.is_empty());
        assert_eq!(
            store.journal(),
            vec![
                TransactionEvent::Began {
                    id: 1,
                    mode: TransactionMode::ReadWrite
                },
                TransactionEvent::RolledBack { id: 1 },
            ]
        );
    }

    #[tokio::test]
    async fn should_roll_back_when_dropped_unfinished() {
        let store = InMemoryStore::<Note>::new();
        {
            let mut tx = store
                .transactions()
                .begin(TransactionMode::ReadWrite)
                .await
                .unwrap();
            tx.writes("insert").unwrap().put(1, note(1, "lost"));
        }

        assert!(store.is_empty());
        assert_eq!(
            store.journal().last(),
            Some(&TransactionEvent::RolledBack { id: 1 })
        );
    }

    #[tokio::test]
    async fn should_refuse_writes_in_read_only_transaction() {
        let store = InMemoryStore::<Note>::new();
        let mut tx = store
            .transactions()
            .begin(TransactionMode::ReadOnly)
            .await
            .unwrap();

        let result = tx.writes("insert");
        assert!(matches!(
            result,
            Err(InMemoryError::ReadOnlyTransaction { operation: "insert" })
        ));
    }

    #[tokio::test]
    async fn should_number_transactions_sequentially() {
        let store = InMemoryStore::<Note>::new();
        let manager = store.transactions();

        let first = manager.begin(TransactionMode::ReadOnly).await.unwrap();
        let second = manager.begin(TransactionMode::ReadOnly).await.unwrap();

        assert_eq!(first.id(), 1);
        assert_eq!(second.id(), 2);
    }

    #[tokio::test]
    async fn should_keep_concurrent_commit_when_idle_transaction_commits() {
        let store = InMemoryStore::<Note>::new();
        let manager = store.transactions();
        let idle = manager.begin(TransactionMode::ReadWrite).await.unwrap();

        let mut busy = manager.begin(TransactionMode::ReadWrite).await.unwrap();
        busy.writes("insert").unwrap().put(1, note(1, "kept"));
        busy.commit().await.unwrap();
        idle.commit().await.unwrap();

        assert_eq!(store.snapshot(), vec![note(1, "kept")]);
    }

    #[tokio::test]
    async fn should_publish_only_touched_keys_on_commit() {
        let store = InMemoryStore::<Note>::new();
        let manager = store.transactions();
        let mut first = manager.begin(TransactionMode::ReadWrite).await.unwrap();
        let mut second = manager.begin(TransactionMode::ReadWrite).await.unwrap();

        first.writes("insert").unwrap().put(1, note(1, "first"));
        second.writes("insert").unwrap().put(2, note(2, "second"));
        first.commit().await.unwrap();
        second.commit().await.unwrap();

        assert_eq!(store.snapshot(), vec![note(1, "first"), note(2, "second")]);
    }

    #[tokio::test]
    async fn should_publish_removal_on_commit() {
        let store = InMemoryStore::<Note>::new();
        let manager = store.transactions();
        let mut seed = manager.begin(TransactionMode::ReadWrite).await.unwrap();
        seed.writes("insert").unwrap().put(1, note(1, "gone"));
        seed.commit().await.unwrap();

        let mut tx = manager.begin(TransactionMode::ReadWrite).await.unwrap();
        tx.writes("delete").unwrap().remove(&1);
        tx.commit().await.unwrap();

        assert!(store.is_empty());
    }
}
