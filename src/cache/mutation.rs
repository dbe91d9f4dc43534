//! Optimistic mutations.
//!
//! Every write follows the same sequence against the "all tasks" view:
//!
//! 1. **Pending**: cancel in-flight refreshes of the view, snapshot it.
//! 2. **Predicted**: write the expected result into the cache.
//! 3. **Committing**: run the repository write.
//! 4. **Committed**: invalidate derived views so they are re-read, or
//!    **RolledBack**: put the snapshot back and return the error.
//!
//! Mutations on the same view run one at a time, so one mutation's rollback
//! can never overwrite another's prediction.

use super::{CachedView, MutationKind, QueryCache, ViewKey};
use crate::categorize::sort_tasks;
use crate::error::{TaskError, TaskResult};
use crate::repository::TaskRepository;
use crate::types::{Task, TaskData, TaskPatch};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Lifecycle of one mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationPhase {
    Pending,
    Predicted,
    Committing,
    Committed,
    RolledBack,
}

impl MutationPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MutationPhase::Committed | MutationPhase::RolledBack)
    }
}

/// Bookkeeping for one in-flight mutation.
///
/// If the caller drops the mutation future before it reaches a terminal
/// phase the prediction is left unsettled, so the view is marked stale and
/// will be re-read from the repository. A write that still succeeds
/// invalidates the derived views from its own task.
struct MutationGuard<'a> {
    cache: &'a QueryCache,
    key: ViewKey,
    op: &'static str,
    phase: MutationPhase,
}

impl<'a> MutationGuard<'a> {
    fn begin(cache: &'a QueryCache, key: ViewKey, op: &'static str) -> Self {
        cache.begin_mutation(&key);
        debug!(op, view = %key, phase = ?MutationPhase::Pending, "Mutation started");
        Self {
            cache,
            key,
            op,
            phase: MutationPhase::Pending,
        }
    }

    fn advance(&mut self, next: MutationPhase) {
        debug!(op = self.op, view = %self.key, from = ?self.phase, to = ?next, "Mutation phase");
        self.phase = next;
    }
}

impl Drop for MutationGuard<'_> {
    fn drop(&mut self) {
        self.cache.end_mutation(&self.key);
        if !self.phase.is_terminal() {
            warn!(op = self.op, view = %self.key, phase = ?self.phase, "Mutation abandoned; view marked stale");
            self.cache.invalidate_view(&self.key);
        }
    }
}

/// Write side of the cache.
#[derive(Clone)]
pub struct TaskMutator {
    repo: Arc<TaskRepository>,
    cache: Arc<QueryCache>,
    /// Serializes mutations of the "all tasks" view.
    serial: Arc<Mutex<()>>,
}

impl TaskMutator {
    pub fn new(repo: Arc<TaskRepository>, cache: Arc<QueryCache>) -> Self {
        Self {
            repo,
            cache,
            serial: Arc::new(Mutex::new(())),
        }
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    /// The optimistic primitive.
    ///
    /// * `predict` gets the snapshot of the view (if cached) and the current
    ///   millis, and returns the list to show until the write settles; `None`
    ///   leaves the view untouched.
    /// * `commit` performs the durable write.
    /// * `reconcile` names what changed, which decides what gets invalidated.
    ///
    /// `commit` and the invalidation that follows a successful write are
    /// spawned together, so both happen even if the caller stops waiting.
    pub async fn run<T, P, C, Fut, R>(
        &self,
        op: &'static str,
        predict: P,
        commit: C,
        reconcile: R,
    ) -> TaskResult<T>
    where
        T: Send + 'static,
        P: FnOnce(Option<&[Task]>, i64) -> Option<Vec<Task>>,
        C: FnOnce(Arc<TaskRepository>) -> Fut,
        Fut: Future<Output = TaskResult<T>> + Send + 'static,
        R: FnOnce(&T) -> MutationKind + Send + 'static,
    {
        let key = ViewKey::AllTasks;
        let _serial = self.serial.lock().await;

        // Pending
        let mut guard = MutationGuard::begin(&self.cache, key.clone(), op);
        self.cache.cancel_fetches(&key);
        let snapshot = self.cache.get_tasks(&key);

        // Predicted
        let now = self.repo.clock().now_ms();
        if let Some(mut predicted) = predict(snapshot.as_deref(), now) {
            sort_tasks(&mut predicted);
            self.cache.set(key.clone(), CachedView::Tasks(predicted));
        }
        guard.advance(MutationPhase::Predicted);

        // Committing
        guard.advance(MutationPhase::Committing);
        let write = commit(Arc::clone(&self.repo));
        let cache = Arc::clone(&self.cache);
        let handle = tokio::spawn(async move {
            let value = write.await?;
            let signal = cache.invalidate(reconcile(&value));
            debug!(op, invalidated = signal.views.len(), "Mutation committed");
            Ok::<T, TaskError>(value)
        });
        let result = match handle.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(TaskError::Cancelled(key.to_string())),
        };

        match result {
            Ok(value) => {
                guard.advance(MutationPhase::Committed);
                Ok(value)
            }
            Err(e) => {
                match snapshot {
                    Some(tasks) => self.cache.set(key.clone(), CachedView::Tasks(tasks)),
                    None => self.cache.remove(&key),
                }
                guard.advance(MutationPhase::RolledBack);
                warn!(op, error = %e, "Mutation rolled back");
                Err(e)
            }
        }
    }

    /// Create a task. The input is only borrowed, so callers keep it for a
    /// retry if this fails.
    pub async fn create(&self, data: &TaskData) -> TaskResult<Task> {
        data.validate()?;
        let input = data.clone();
        let prediction = data.clone();
        self.run(
            "create",
            move |snapshot, now| {
                let placeholder = Task {
                    id: format!("temp-{}", now),
                    title: prediction.title,
                    description: prediction.description,
                    completed: false,
                    due_date: prediction.due_date,
                    created_at: now,
                    updated_at: now,
                };
                let mut tasks = snapshot.map(<[Task]>::to_vec).unwrap_or_default();
                tasks.push(placeholder);
                Some(tasks)
            },
            move |repo| async move { repo.create(&input).await },
            |task: &Task| MutationKind::Created {
                id: task.id.clone(),
            },
        )
        .await
    }

    pub async fn update(&self, id: &str, patch: &TaskPatch) -> TaskResult<Task> {
        patch.validate()?;
        let id = id.to_string();
        let commit_id = id.clone();
        let commit_patch = patch.clone();
        let patch = patch.clone();
        self.run(
            "update",
            move |snapshot, now| {
                predict_replace(snapshot, &id, now, |task| task.merged(&patch))
            },
            move |repo| async move { repo.update(&commit_id, &commit_patch).await },
            |task: &Task| MutationKind::Updated {
                id: task.id.clone(),
            },
        )
        .await
    }

    pub async fn update_due_date(&self, id: &str, due_date: &str) -> TaskResult<Task> {
        self.update(id, &TaskPatch::due_date(due_date)).await
    }

    pub async fn toggle(&self, id: &str) -> TaskResult<Task> {
        let id = id.to_string();
        let commit_id = id.clone();
        self.run(
            "toggle",
            move |snapshot, now| {
                predict_replace(snapshot, &id, now, |task| {
                    task.merged(&TaskPatch::completed(!task.completed))
                })
            },
            move |repo| async move { repo.toggle_complete(&commit_id).await },
            |task: &Task| MutationKind::Updated {
                id: task.id.clone(),
            },
        )
        .await
    }

    pub async fn delete(&self, id: &str) -> TaskResult<()> {
        let id = id.to_string();
        let commit_id = id.clone();
        let kind = MutationKind::Deleted { id: id.clone() };
        self.run(
            "delete",
            move |snapshot, _| {
                snapshot.map(|tasks| tasks.iter().filter(|t| t.id != id).cloned().collect())
            },
            move |repo| async move { repo.delete(&commit_id).await },
            move |_: &()| kind,
        )
        .await
    }

    pub async fn delete_all(&self) -> TaskResult<()> {
        self.run(
            "delete_all",
            |_, _| Some(Vec::new()),
            |repo| async move { repo.delete_all().await },
            |_: &()| MutationKind::Cleared,
        )
        .await
    }
}

/// Replace the cached record `id` with `change` applied and `updated_at`
/// refreshed. An uncached view stays uncached.
fn predict_replace<F>(snapshot: Option<&[Task]>, id: &str, now: i64, change: F) -> Option<Vec<Task>>
where
    F: FnOnce(&Task) -> Task,
{
    let mut tasks = snapshot?.to_vec();
    if let Some(slot) = tasks.iter_mut().find(|t| t.id == id) {
        let mut next = change(slot);
        next.updated_at = now.max(slot.updated_at);
        *slot = next;
    }
    Some(tasks)
}
