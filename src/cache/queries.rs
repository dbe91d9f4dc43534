//! Cached reads.

use super::{CachedView, QueryCache, ViewKey};
use crate::error::TaskResult;
use crate::repository::TaskRepository;
use crate::types::{Category, Task, TasksByCategory};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// How long a fetched view is served without going back to the repository.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(5 * 60);

/// Read side of the cache: serve fresh views, otherwise refresh from the
/// repository.
#[derive(Clone)]
pub struct TaskQueries {
    repo: Arc<TaskRepository>,
    cache: Arc<QueryCache>,
    stale_after: Duration,
}

impl TaskQueries {
    pub fn new(repo: Arc<TaskRepository>, cache: Arc<QueryCache>) -> Self {
        Self {
            repo,
            cache,
            stale_after: DEFAULT_STALE_AFTER,
        }
    }

    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    /// Every task in sort order.
    pub async fn all(&self) -> TaskResult<Vec<Task>> {
        let repo = &self.repo;
        let view = self
            .read_through(ViewKey::AllTasks, || async move {
                repo.get_all().await.map(CachedView::Tasks)
            })
            .await?;
        Ok(view.into_tasks().unwrap_or_default())
    }

    /// Tasks bucketed by due date relative to today.
    pub async fn categorized(&self) -> TaskResult<TasksByCategory> {
        let repo = &self.repo;
        let today = self.repo.clock().today();
        let view = self
            .read_through(ViewKey::Categorized, || async move {
                repo.get_all_categorized()
                    .await
                    .map(|buckets| CachedView::Categorized(today, buckets))
            })
            .await?;
        match view {
            CachedView::Categorized(_, buckets) => Ok(buckets),
            _ => Ok(TasksByCategory::default()),
        }
    }

    pub async fn by_category(&self, category: Category) -> TaskResult<Vec<Task>> {
        let repo = &self.repo;
        let today = self.repo.clock().today();
        let view = self
            .read_through(ViewKey::ByCategory(category), || async move {
                repo.get_by_category(category)
                    .await
                    .map(|tasks| CachedView::Bucket(today, tasks))
            })
            .await?;
        Ok(view.into_tasks().unwrap_or_default())
    }

    pub async fn by_id(&self, id: &str) -> TaskResult<Option<Task>> {
        let repo = &self.repo;
        let view = self
            .read_through(ViewKey::Detail(id.to_string()), || async move {
                repo.get_by_id(id).await.map(CachedView::Task)
            })
            .await?;
        match view {
            CachedView::Task(task) => Ok(task),
            _ => Ok(None),
        }
    }

    /// Serve `key` from cache when possible, otherwise run `fetch` as a
    /// cancellable refresh.
    ///
    /// While an optimistic write to `key` is in flight the cached prediction
    /// is served instead of reading durable state that predates it. A refresh
    /// cancelled by a write falls back to the cached entry, or starts over
    /// when there is none.
    async fn read_through<F, Fut>(&self, key: ViewKey, fetch: F) -> TaskResult<CachedView>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = TaskResult<CachedView>>,
    {
        loop {
            let today = self.repo.clock().today();
            if let Some(view) = self.cache.get_fresh(&key, self.stale_after, today) {
                return Ok(view);
            }
            if self.cache.has_pending_mutation(&key) {
                if let Some(view) = self.cache.get(&key) {
                    debug!(view = %key, "Serving optimistic view during mutation");
                    return Ok(view);
                }
            }

            let ticket = self.cache.begin_fetch(&key);
            tokio::select! {
                biased;
                _ = ticket.token().cancelled() => {
                    if let Some(view) = self.cache.get(&key) {
                        debug!(view = %key, "Refresh cancelled");
                        return Ok(view);
                    }
                    debug!(view = %key, "Refresh cancelled with nothing cached, retrying");
                }
                result = fetch() => {
                    let view = result?;
                    if self.cache.finish_fetch(&ticket, view.clone()) {
                        return Ok(view);
                    }
                    // A newer write landed while we were reading
                    return Ok(self.cache.get(&key).unwrap_or(view));
                }
            }
        }
    }
}
