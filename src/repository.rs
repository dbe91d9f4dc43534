//! Task CRUD over the durable store.
//!
//! The whole collection is stored as one JSON array. Every write re-reads
//! the array, changes it in memory and writes it back whole.

use crate::categorize::{categorize, sort_tasks};
use crate::clock::{Clock, SystemClock};
use crate::error::{StorageError, TaskError, TaskResult};
use crate::store::{KeyValueStore, TASKS_KEY, get_item, set_item};
use crate::types::{Category, Task, TaskData, TaskPatch, TasksByCategory};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

/// Owner of the persisted task collection.
pub struct TaskRepository {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    key: String,
    /// Held across each read-modify-write so writes never interleave.
    write_lock: Mutex<()>,
}

impl TaskRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            key: TASKS_KEY.to_string(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Store the collection under a different key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Raw collection in stored order.
    async fn load(&self) -> Result<Vec<Task>, StorageError> {
        Ok(get_item::<Vec<Task>, _>(&*self.store, &self.key)
            .await?
            .unwrap_or_default())
    }

    /// Run one read-modify-write cycle. Nothing is persisted if `apply` fails.
    async fn rewrite<T, F>(&self, wrap: fn(StorageError) -> TaskError, apply: F) -> TaskResult<T>
    where
        F: FnOnce(&mut Vec<Task>, i64) -> TaskResult<T>,
    {
        let _guard = self.write_lock.lock().await;
        let mut tasks = self.load().await.map_err(wrap)?;
        let out = apply(&mut tasks, self.clock.now_ms())?;
        set_item(&*self.store, &self.key, &tasks)
            .await
            .map_err(wrap)?;
        Ok(out)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Every task, due date ascending then creation order.
    pub async fn get_all(&self) -> TaskResult<Vec<Task>> {
        let mut tasks = self.load().await.map_err(TaskError::Fetch)?;
        sort_tasks(&mut tasks);
        Ok(tasks)
    }

    pub async fn get_by_id(&self, id: &str) -> TaskResult<Option<Task>> {
        Ok(self.get_all().await?.into_iter().find(|t| t.id == id))
    }

    pub async fn get_by_category(&self, category: Category) -> TaskResult<Vec<Task>> {
        Ok(self.get_all_categorized().await?.into_bucket(category))
    }

    /// Every task in exactly one bucket, each bucket in global sort order.
    pub async fn get_all_categorized(&self) -> TaskResult<TasksByCategory> {
        let tasks = self.get_all().await?;
        Ok(categorize(tasks, self.clock.today()))
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Append a new task with a fresh id.
    pub async fn create(&self, data: &TaskData) -> TaskResult<Task> {
        let task = self
            .rewrite(TaskError::Create, |tasks, now| {
                let task = Task {
                    id: Uuid::new_v4().to_string(),
                    title: data.title.clone(),
                    description: data.description.clone(),
                    completed: false,
                    due_date: data.due_date.clone(),
                    created_at: now,
                    updated_at: now,
                };
                tasks.push(task.clone());
                Ok(task)
            })
            .await?;
        info!(task_id = %task.id, due_date = %task.due_date, "Task created");
        Ok(task)
    }

    /// Merge `patch` over the stored record and stamp `updated_at`.
    pub async fn update(&self, id: &str, patch: &TaskPatch) -> TaskResult<Task> {
        let task = self
            .rewrite(TaskError::Update, |tasks, now| {
                apply_patch(tasks, id, patch, now)
            })
            .await?;
        debug!(task_id = %id, "Task updated");
        Ok(task)
    }

    pub async fn update_due_date(&self, id: &str, due_date: &str) -> TaskResult<Task> {
        self.update(id, &TaskPatch::due_date(due_date)).await
    }

    /// Flip `completed`.
    pub async fn toggle_complete(&self, id: &str) -> TaskResult<Task> {
        let task = self
            .rewrite(TaskError::Update, |tasks, now| {
                let current = tasks
                    .iter()
                    .find(|t| t.id == id)
                    .ok_or_else(|| TaskError::NotFound(id.to_string()))?;
                let patch = TaskPatch::completed(!current.completed);
                apply_patch(tasks, id, &patch, now)
            })
            .await?;
        debug!(task_id = %id, completed = task.completed, "Task toggled");
        Ok(task)
    }

    pub async fn delete(&self, id: &str) -> TaskResult<()> {
        self.rewrite(TaskError::Delete, |tasks, _| {
            let before = tasks.len();
            tasks.retain(|t| t.id != id);
            if tasks.len() == before {
                return Err(TaskError::NotFound(id.to_string()));
            }
            Ok(())
        })
        .await?;
        info!(task_id = %id, "Task deleted");
        Ok(())
    }

    /// Persist an empty collection.
    pub async fn delete_all(&self) -> TaskResult<()> {
        let _guard = self.write_lock.lock().await;
        set_item(&*self.store, &self.key, &Vec::<Task>::new())
            .await
            .map_err(TaskError::Delete)?;
        info!("All tasks deleted");
        Ok(())
    }
}

/// Replace the record `id` with `patch` merged over it.
///
/// `updated_at` never moves backwards even if the clock does.
fn apply_patch(tasks: &mut [Task], id: &str, patch: &TaskPatch, now: i64) -> TaskResult<Task> {
    let slot = tasks
        .iter_mut()
        .find(|t| t.id == id)
        .ok_or_else(|| TaskError::NotFound(id.to_string()))?;
    let mut merged = slot.merged(patch);
    merged.updated_at = now.max(slot.updated_at);
    *slot = merged.clone();
    Ok(merged)
}
