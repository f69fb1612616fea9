pub mod error;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::instrument;

use journal_store::types::{Task, TaskOrder, TaskPatch};
use journal_store::{Store, Tx};

pub use error::{Result, TaskError};

/// Serializes task-list mutations per user: `create`/`complete`/`delete`/
/// `reorder` on the same user's list must not interleave, or recompaction
/// could observe a stale ordering.
///
/// Keyed `user:{id}:tasks` in a `DashMap`, the same keyed-lock-table shape
/// used for per-session locks elsewhere, guarding a `tokio::sync::Mutex<()>`
/// critical section per user.
pub struct TaskManager {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl TaskManager {
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    async fn lock_for(&self, user_id: &str) -> OwnedMutexGuard<()> {
        let key = format!("user:{user_id}:tasks");
        let lock = self
            .locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    #[instrument(skip(self, store, tx))]
    pub async fn list_tasks(
        &self,
        store: &Store,
        tx: &Tx<'_>,
        user_id: &str,
        include_completed: bool,
    ) -> Result<Vec<Task>> {
        let _guard = self.lock_for(user_id).await;
        Ok(store.list_tasks(tx, user_id, include_completed)?)
    }

    #[instrument(skip(self, store, tx))]
    pub async fn get_task(&self, store: &Store, tx: &Tx<'_>, user_id: &str, task_id: &str) -> Result<Option<Task>> {
        let _guard = self.lock_for(user_id).await;
        Ok(store.get_task(tx, user_id, task_id)?)
    }

    #[instrument(skip(self, store, tx))]
    #[allow(clippy::too_many_arguments)]
    pub async fn create_task(
        &self,
        store: &Store,
        tx: &Tx<'_>,
        user_id: &str,
        title: &str,
        description: Option<&str>,
        priority: Option<i64>,
        due_date: Option<&str>,
        source_session_id: Option<&str>,
    ) -> Result<Task> {
        let _guard = self.lock_for(user_id).await;
        Ok(store.create_task(tx, user_id, title, description, priority, due_date, source_session_id)?)
    }

    #[instrument(skip(self, store, tx, patch))]
    pub async fn update_task(
        &self,
        store: &Store,
        tx: &Tx<'_>,
        user_id: &str,
        task_id: &str,
        patch: &TaskPatch,
    ) -> Result<Task> {
        let _guard = self.lock_for(user_id).await;
        Ok(store.update_task(tx, user_id, task_id, patch)?)
    }

    #[instrument(skip(self, store, tx))]
    pub async fn complete_task(&self, store: &Store, tx: &Tx<'_>, user_id: &str, task_id: &str) -> Result<Task> {
        let _guard = self.lock_for(user_id).await;
        Ok(store.complete_task(tx, user_id, task_id)?)
    }

    #[instrument(skip(self, store, tx))]
    pub async fn delete_task(&self, store: &Store, tx: &Tx<'_>, user_id: &str, task_id: &str) -> Result<()> {
        let _guard = self.lock_for(user_id).await;
        Ok(store.delete_task(tx, user_id, task_id)?)
    }

    #[instrument(skip(self, store, tx, orderings))]
    pub async fn reorder_tasks(
        &self,
        store: &Store,
        tx: &Tx<'_>,
        user_id: &str,
        orderings: &[TaskOrder],
    ) -> Result<()> {
        let _guard = self.lock_for(user_id).await;
        Ok(store.reorder_tasks(tx, user_id, orderings)?)
    }
}

impl Default for TaskManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn open() -> Store {
        Store::new(Connection::open_in_memory().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn create_and_list_round_trip() {
        let store = open();
        let tx = store.begin().unwrap();
        let user = store.create_user(&tx, "alice", None, "hash").unwrap();
        let manager = TaskManager::new();
        manager
            .create_task(&store, &tx, &user.id, "write docs", None, None, None, None)
            .await
            .unwrap();
        let tasks = manager.list_tasks(&store, &tx, &user.id, false).await.unwrap();
        assert_eq!(tasks.len(), 1);
        tx.commit().unwrap();
    }

    #[tokio::test]
    async fn reorder_rejects_partial_coverage_without_mutating_state() {
        let store = open();
        let tx = store.begin().unwrap();
        let user = store.create_user(&tx, "bob", None, "hash").unwrap();
        let manager = TaskManager::new();
        let t1 = manager
            .create_task(&store, &tx, &user.id, "t1", None, None, None, None)
            .await
            .unwrap();
        manager
            .create_task(&store, &tx, &user.id, "t2", None, None, None, None)
            .await
            .unwrap();

        let err = manager
            .reorder_tasks(&store, &tx, &user.id, &[TaskOrder { task_id: t1.id.clone(), new_priority: 1 }])
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::Store(journal_store::StoreError::Conflict(_))));
        tx.commit().unwrap();
    }

    #[tokio::test]
    async fn same_user_lock_key_is_reused_across_calls() {
        let store = open();
        let tx = store.begin().unwrap();
        let user = store.create_user(&tx, "carol", None, "hash").unwrap();
        let manager = TaskManager::new();
        for i in 0..5 {
            manager
                .create_task(&store, &tx, &user.id, &format!("t{i}"), None, None, None, None)
                .await
                .unwrap();
        }
        assert_eq!(manager.locks.len(), 1);
        let tasks = manager.list_tasks(&store, &tx, &user.id, false).await.unwrap();
        let priorities: Vec<i64> = tasks.iter().map(|t| t.priority).collect();
        assert_eq!(priorities, vec![1, 2, 3, 4, 5]);
        tx.commit().unwrap();
    }
}
