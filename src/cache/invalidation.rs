//! Derived-view invalidation.
//!
//! After a committed write the mutator reports what kind of change happened;
//! [`MutationKind::affects`] maps that to the cached views that must be
//! recomputed, and the [`InvalidationBus`] broadcasts the result so renderers
//! know to re-read.

use super::ViewKey;
use tokio::sync::broadcast;

/// Categories of committed writes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MutationKind {
    /// A task was appended.
    Created { id: String },
    /// A task's fields (including `completed`) changed.
    Updated { id: String },
    /// A task was removed.
    Deleted { id: String },
    /// The whole collection was emptied.
    Cleared,
}

impl MutationKind {
    /// Whether a cached view may be stale after this mutation.
    ///
    /// List views always are; a single-item lookup only when it names the
    /// touched id.
    pub fn affects(&self, key: &ViewKey) -> bool {
        match key {
            ViewKey::AllTasks | ViewKey::Categorized | ViewKey::ByCategory(_) => true,
            ViewKey::Detail(detail_id) => match self {
                MutationKind::Created { .. } => false,
                MutationKind::Updated { id } | MutationKind::Deleted { id } => id == detail_id,
                MutationKind::Cleared => true,
            },
        }
    }
}

/// Signal published after every committed mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invalidation {
    pub kind: MutationKind,
    /// Views that were marked stale. Always includes the list views, even
    /// when nothing had cached them yet.
    pub views: Vec<ViewKey>,
}

const CHANNEL_CAPACITY: usize = 64;

/// Fan-out of [`Invalidation`] signals to any number of listeners.
#[derive(Debug, Clone)]
pub struct InvalidationBus {
    sender: broadcast::Sender<Invalidation>,
}

impl InvalidationBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Invalidation> {
        self.sender.subscribe()
    }

    /// Publish to current listeners. Returns how many received it.
    pub fn publish(&self, signal: Invalidation) -> usize {
        // No listeners is fine
        self.sender.send(signal).unwrap_or(0)
    }
}

impl Default for InvalidationBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Category;

    #[test]
    fn test_list_views_always_affected() {
        let kinds = [
            MutationKind::Created { id: "1".into() },
            MutationKind::Updated { id: "1".into() },
            MutationKind::Deleted { id: "1".into() },
            MutationKind::Cleared,
        ];
        for kind in &kinds {
            assert!(kind.affects(&ViewKey::AllTasks));
            assert!(kind.affects(&ViewKey::Categorized));
            assert!(kind.affects(&ViewKey::ByCategory(Category::Other)));
        }
    }

    #[test]
    fn test_detail_only_for_matching_id() {
        let updated = MutationKind::Updated { id: "1".into() };
        assert!(updated.affects(&ViewKey::Detail("1".into())));
        assert!(!updated.affects(&ViewKey::Detail("2".into())));

        let created = MutationKind::Created { id: "1".into() };
        assert!(!created.affects(&ViewKey::Detail("1".into())));

        assert!(MutationKind::Cleared.affects(&ViewKey::Detail("9".into())));
    }

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let bus = InvalidationBus::new();
        assert_eq!(
            bus.publish(Invalidation {
                kind: MutationKind::Cleared,
                views: vec![],
            }),
            0
        );

        let mut rx = bus.subscribe();
        let signal = Invalidation {
            kind: MutationKind::Deleted { id: "1".into() },
            views: vec![ViewKey::AllTasks],
        };
        assert_eq!(bus.publish(signal.clone()), 1);
        assert_eq!(rx.recv().await.unwrap(), signal);
    }
}
