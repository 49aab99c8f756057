//! Latest-value snapshot store. Publishers swap in a new immutable snapshot;
//! the render loop loads the newest `Arc` without blocking.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::snapshot::{Snapshot, TopicUpdate};

/// Pull interface the renderer reads from once per frame.
pub trait SnapshotSource: Send + Sync {
    /// The most recently published snapshot.
    fn latest(&self) -> Arc<Snapshot>;
}

pub struct SnapshotStore {
    current: ArcSwap<Snapshot>,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new(Snapshot::default())
    }
}

impl SnapshotStore {
    pub fn new(initial: Snapshot) -> Self {
        Self { current: ArcSwap::from_pointee(initial) }
    }

    /// Publish one topic record. The previous snapshot stays valid for readers holding it.
    pub fn publish(&self, update: TopicUpdate) {
        self.current.rcu(|cur| {
            let mut next = Snapshot::clone(cur);
            next.apply(update.clone());
            next.version = cur.version + 1;
            next
        });
    }

    /// Publish several records as one new snapshot version.
    pub fn publish_all(&self, updates: impl IntoIterator<Item = TopicUpdate>) {
        let updates: Vec<TopicUpdate> = updates.into_iter().collect();
        self.current.rcu(|cur| {
            let mut next = Snapshot::clone(cur);
            for u in &updates {
                next.apply(u.clone());
            }
            next.version = cur.version + 1;
            next
        });
    }

    /// Replace the whole snapshot (fixtures, replay).
    pub fn replace(&self, snapshot: Snapshot) {
        self.current.rcu(|cur| {
            let mut next = snapshot.clone();
            next.version = cur.version + 1;
            next
        });
    }
}

impl SnapshotSource for SnapshotStore {
    fn latest(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::CarState;

    #[test]
    fn publish_bumps_version_and_keeps_old_reader_intact() {
        let store = SnapshotStore::default();
        let before = store.latest();
        store.publish(TopicUpdate::CarState(CarState { v_ego: 12.0, ..Default::default() }));
        let after = store.latest();
        assert_eq!(before.version, 0);
        assert_eq!(after.version, 1);
        assert_eq!(before.car_state.v_ego, 0.0);
        assert_eq!(after.car_state.v_ego, 12.0);
    }

    #[test]
    fn unpublished_topics_keep_last_known_value() {
        let store = SnapshotStore::default();
        store.publish(TopicUpdate::CarState(CarState { v_ego: 5.0, ..Default::default() }));
        store.publish_all([TopicUpdate::Ui(Default::default())]);
        let snap = store.latest();
        assert_eq!(snap.car_state.v_ego, 5.0);
        assert_eq!(snap.version, 2);
    }

    #[test]
    fn concurrent_publishers_do_not_lose_updates() {
        let store = Arc::new(SnapshotStore::default());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        store.publish(TopicUpdate::CarState(CarState::default()));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.latest().version, 200);
    }

    #[test]
    fn replace_and_publish_never_share_a_version() {
        let store = Arc::new(SnapshotStore::default());
        let replacer = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for _ in 0..100 {
                    store.replace(Snapshot::default());
                }
            })
        };
        let publisher = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for _ in 0..100 {
                    store.publish(TopicUpdate::CarState(CarState::default()));
                }
            })
        };
        replacer.join().unwrap();
        publisher.join().unwrap();
        assert_eq!(store.latest().version, 200);
    }
}
