//! Client-side view cache with optimistic writes.
//!
//! The cache is a derived, possibly stale copy of the durable collection
//! kept for fast rendering. Readers go through [`TaskQueries`]; only the
//! [`TaskMutator`] writes predictions into it. Every committed write marks
//! the affected views stale so the next read recomputes them from the
//! repository.

pub mod invalidation;
pub mod mutation;
pub mod queries;

pub use invalidation::{Invalidation, InvalidationBus, MutationKind};
pub use mutation::{MutationPhase, TaskMutator};
pub use queries::TaskQueries;

use crate::types::{Category, Task, TasksByCategory};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Identity of a cached view.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ViewKey {
    /// Full list in sort order.
    AllTasks,
    /// Full list split into date buckets.
    Categorized,
    /// One date bucket.
    ByCategory(Category),
    /// Single-item lookup.
    Detail(String),
}

impl fmt::Display for ViewKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewKey::AllTasks => write!(f, "todos"),
            ViewKey::Categorized => write!(f, "todos/categorized"),
            ViewKey::ByCategory(c) => write!(f, "todos/category/{}", c),
            ViewKey::Detail(id) => write!(f, "todos/{}", id),
        }
    }
}

/// Data held for a view.
///
/// Date-bucketed views carry the day they were computed for; they go stale
/// when the local date changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedView {
    Tasks(Vec<Task>),
    Categorized(NaiveDate, TasksByCategory),
    Bucket(NaiveDate, Vec<Task>),
    Task(Option<Task>),
}

impl CachedView {
    fn computed_for(&self) -> Option<NaiveDate> {
        match self {
            CachedView::Categorized(day, _) | CachedView::Bucket(day, _) => Some(*day),
            CachedView::Tasks(_) | CachedView::Task(_) => None,
        }
    }

    pub fn into_tasks(self) -> Option<Vec<Task>> {
        match self {
            CachedView::Tasks(tasks) | CachedView::Bucket(_, tasks) => Some(tasks),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Entry {
    view: CachedView,
    stored_at: Instant,
    invalidated: bool,
}

/// Per-view refresh bookkeeping.
#[derive(Debug, Default)]
struct FetchSlot {
    /// Bumped whenever an in-flight refresh must not land.
    generation: u64,
    token: Option<CancellationToken>,
    /// Optimistic mutations currently between Pending and a terminal state.
    pending_mutations: usize,
}

/// Proof that a refresh was started at a given generation.
#[derive(Debug, Clone)]
pub struct FetchTicket {
    pub key: ViewKey,
    generation: u64,
    token: CancellationToken,
}

impl FetchTicket {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<ViewKey, Entry>,
    slots: HashMap<ViewKey, FetchSlot>,
}

/// Shared view cache.
///
/// Thread-safe: uses an internal `Mutex` so it can be shared across async
/// tasks without requiring `&mut self`. The lock is never held across an
/// await.
#[derive(Debug, Default)]
pub struct QueryCache {
    state: Mutex<CacheState>,
    bus: InvalidationBus,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Listen for invalidation signals.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Invalidation> {
        self.bus.subscribe()
    }

    /// Current data for `key`, fresh or not.
    pub fn get(&self, key: &ViewKey) -> Option<CachedView> {
        self.state().entries.get(key).map(|e| e.view.clone())
    }

    /// Current task list for a list-shaped view.
    pub fn get_tasks(&self, key: &ViewKey) -> Option<Vec<Task>> {
        self.get(key).and_then(CachedView::into_tasks)
    }

    /// Data for `key` only if it can be served without refetching.
    pub fn get_fresh(&self, key: &ViewKey, stale_after: Duration, today: NaiveDate) -> Option<CachedView> {
        let state = self.state();
        let entry = state.entries.get(key)?;
        if entry.invalidated || entry.stored_at.elapsed() >= stale_after {
            return None;
        }
        if entry.view.computed_for().is_some_and(|day| day != today) {
            return None;
        }
        Some(entry.view.clone())
    }

    pub fn is_invalidated(&self, key: &ViewKey) -> bool {
        self.state()
            .entries
            .get(key)
            .is_some_and(|e| e.invalidated)
    }

    /// Overwrite `key`. Any refresh already in flight for it will not land.
    pub fn set(&self, key: ViewKey, view: CachedView) {
        let mut state = self.state();
        state.slots.entry(key.clone()).or_default().generation += 1;
        state.entries.insert(
            key,
            Entry {
                view,
                stored_at: Instant::now(),
                invalidated: false,
            },
        );
    }

    /// Drop `key` entirely.
    pub fn remove(&self, key: &ViewKey) {
        let mut state = self.state();
        if let Some(slot) = state.slots.get_mut(key) {
            slot.generation += 1;
        }
        state.entries.remove(key);
    }

    // =========================================================================
    // Refresh coordination
    // =========================================================================

    /// Register a refresh of `key`.
    pub fn begin_fetch(&self, key: &ViewKey) -> FetchTicket {
        let mut state = self.state();
        let slot = state.slots.entry(key.clone()).or_default();
        let token = match slot.token {
            Some(ref token) if !token.is_cancelled() => token.clone(),
            _ => {
                let token = CancellationToken::new();
                slot.token = Some(token.clone());
                token
            }
        };
        FetchTicket {
            key: key.clone(),
            generation: slot.generation,
            token,
        }
    }

    /// Store a refresh result if nothing newer was written since the ticket
    /// was issued. Returns whether it landed.
    pub fn finish_fetch(&self, ticket: &FetchTicket, view: CachedView) -> bool {
        let mut state = self.state();
        let current = state
            .slots
            .get(&ticket.key)
            .map(|s| s.generation)
            .unwrap_or_default();
        if current != ticket.generation || ticket.token.is_cancelled() {
            debug!(view = %ticket.key, "Discarding superseded refresh");
            return false;
        }
        state.entries.insert(
            ticket.key.clone(),
            Entry {
                view,
                stored_at: Instant::now(),
                invalidated: false,
            },
        );
        true
    }

    /// Cancel outstanding refreshes of `key`; their results are discarded.
    pub fn cancel_fetches(&self, key: &ViewKey) {
        let mut state = self.state();
        let slot = state.slots.entry(key.clone()).or_default();
        slot.generation += 1;
        if let Some(token) = slot.token.take() {
            token.cancel();
            debug!(view = %key, "Cancelled in-flight refresh");
        }
    }

    pub(crate) fn begin_mutation(&self, key: &ViewKey) {
        self.state()
            .slots
            .entry(key.clone())
            .or_default()
            .pending_mutations += 1;
    }

    pub(crate) fn end_mutation(&self, key: &ViewKey) {
        if let Some(slot) = self.state().slots.get_mut(key) {
            slot.pending_mutations = slot.pending_mutations.saturating_sub(1);
        }
    }

    /// Whether an optimistic write to `key` has not reached a terminal state.
    pub fn has_pending_mutation(&self, key: &ViewKey) -> bool {
        self.state()
            .slots
            .get(key)
            .is_some_and(|s| s.pending_mutations > 0)
    }

    // =========================================================================
    // Invalidation
    // =========================================================================

    /// Mark every view `kind` affects as stale and publish the signal.
    ///
    /// Refreshes started before this point are discarded when they finish.
    pub fn invalidate(&self, kind: MutationKind) -> Invalidation {
        let mut views = vec![ViewKey::AllTasks, ViewKey::Categorized];
        {
            let mut state = self.state();
            let CacheState { entries, slots } = &mut *state;
            for (key, entry) in entries.iter_mut() {
                if kind.affects(key) {
                    entry.invalidated = true;
                    if !views.contains(key) {
                        views.push(key.clone());
                    }
                }
            }
            for key in &views {
                slots.entry(key.clone()).or_default().generation += 1;
            }
        }
        debug!(?kind, count = views.len(), "Invalidated views");
        let signal = Invalidation { kind, views };
        self.bus.publish(signal.clone());
        signal
    }

    /// Mark a single view stale without a mutation.
    pub fn invalidate_view(&self, key: &ViewKey) {
        let mut state = self.state();
        if let Some(entry) = state.entries.get_mut(key) {
            entry.invalidated = true;
        }
        state.slots.entry(key.clone()).or_default().generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str) -> Task {
        Task {
            id: id.to_string(),
            title: id.to_string(),
            description: None,
            completed: false,
            due_date: "2026-01-13".to_string(),
            created_at: 1,
            updated_at: 1,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 13).unwrap()
    }

    const LONG: Duration = Duration::from_secs(300);

    #[test]
    fn test_set_then_get_fresh() {
        let cache = QueryCache::new();
        cache.set(ViewKey::AllTasks, CachedView::Tasks(vec![task("1")]));
        assert_eq!(
            cache.get_fresh(&ViewKey::AllTasks, LONG, today()),
            Some(CachedView::Tasks(vec![task("1")]))
        );
        assert!(cache.get_fresh(&ViewKey::AllTasks, Duration::ZERO, today()).is_none());
    }

    #[test]
    fn test_day_tagged_views_expire_at_midnight() {
        let cache = QueryCache::new();
        cache.set(
            ViewKey::Categorized,
            CachedView::Categorized(today(), TasksByCategory::default()),
        );
        assert!(cache.get_fresh(&ViewKey::Categorized, LONG, today()).is_some());
        let next_day = today().succ_opt().unwrap();
        assert!(cache.get_fresh(&ViewKey::Categorized, LONG, next_day).is_none());
    }

    #[test]
    fn test_superseded_fetch_does_not_land() {
        let cache = QueryCache::new();
        let ticket = cache.begin_fetch(&ViewKey::AllTasks);
        cache.set(ViewKey::AllTasks, CachedView::Tasks(vec![task("new")]));

        assert!(!cache.finish_fetch(&ticket, CachedView::Tasks(vec![task("old")])));
        assert_eq!(
            cache.get_tasks(&ViewKey::AllTasks),
            Some(vec![task("new")])
        );
    }

    #[test]
    fn test_cancel_fetches_trips_token() {
        let cache = QueryCache::new();
        let ticket = cache.begin_fetch(&ViewKey::AllTasks);
        cache.cancel_fetches(&ViewKey::AllTasks);
        assert!(ticket.token().is_cancelled());
        assert!(!cache.finish_fetch(&ticket, CachedView::Tasks(vec![])));
        assert!(cache.get(&ViewKey::AllTasks).is_none());

        // a later refresh gets a live token
        let next = cache.begin_fetch(&ViewKey::AllTasks);
        assert!(!next.token().is_cancelled());
        assert!(cache.finish_fetch(&next, CachedView::Tasks(vec![])));
    }

    #[test]
    fn test_invalidate_marks_and_reports() {
        let cache = QueryCache::new();
        let mut rx = cache.subscribe();
        cache.set(ViewKey::AllTasks, CachedView::Tasks(vec![task("1")]));
        cache.set(ViewKey::Detail("1".into()), CachedView::Task(Some(task("1"))));
        cache.set(ViewKey::Detail("2".into()), CachedView::Task(Some(task("2"))));

        let signal = cache.invalidate(MutationKind::Updated { id: "1".into() });

        assert!(cache.is_invalidated(&ViewKey::AllTasks));
        assert!(cache.is_invalidated(&ViewKey::Detail("1".into())));
        assert!(!cache.is_invalidated(&ViewKey::Detail("2".into())));
        assert!(signal.views.contains(&ViewKey::Categorized));
        assert!(signal.views.contains(&ViewKey::Detail("1".into())));
        assert_eq!(rx.try_recv().unwrap(), signal);

        // stale data is still readable for rendering
        assert_eq!(cache.get_tasks(&ViewKey::AllTasks), Some(vec![task("1")]));
        assert!(cache.get_fresh(&ViewKey::AllTasks, LONG, today()).is_none());
    }

    #[test]
    fn test_pending_mutation_counter() {
        let cache = QueryCache::new();
        assert!(!cache.has_pending_mutation(&ViewKey::AllTasks));
        cache.begin_mutation(&ViewKey::AllTasks);
        cache.begin_mutation(&ViewKey::AllTasks);
        cache.end_mutation(&ViewKey::AllTasks);
        assert!(cache.has_pending_mutation(&ViewKey::AllTasks));
        cache.end_mutation(&ViewKey::AllTasks);
        assert!(!cache.has_pending_mutation(&ViewKey::AllTasks));
    }
}
