//! Named per-entity locks

use alert_history::EntityId;
use std::collections::HashSet;
use std::sync::{Condvar, Mutex, PoisonError};
use tracing::trace;

/// Registry of named locks, one per entity key.
///
/// A key is held by at most one [`EntityGuard`] at a time. Acquisition blocks
/// without timeout. Keys are dropped from the registry on release, so the
/// registry only holds entities currently being reconciled.
#[derive(Debug)]
pub struct EntityLocks {
    prefix: String,
    held: Mutex<HashSet<String>>,
    released: Condvar,
}

impl EntityLocks {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            held: Mutex::new(HashSet::new()),
            released: Condvar::new(),
        }
    }

    /// Lock name for an entity
    pub fn key(&self, entity_id: EntityId) -> String {
        format!("{}{}", self.prefix, entity_id)
    }

    /// Block until the entity's lock is free, then take it
    pub fn acquire(&self, entity_id: EntityId) -> EntityGuard<'_> {
        let key = self.key(entity_id);
        let held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        let mut held = self
            .released
            .wait_while(held, |held| held.contains(&key))
            .unwrap_or_else(PoisonError::into_inner);
        held.insert(key.clone());
        trace!(lock = %key, "acquired entity lock");

        EntityGuard { locks: self, key }
    }

    /// Take the entity's lock only if nobody holds it
    pub fn try_acquire(&self, entity_id: EntityId) -> Option<EntityGuard<'_>> {
        let key = self.key(entity_id);
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        if !held.insert(key.clone()) {
            return None;
        }
        Some(EntityGuard { locks: self, key })
    }

    pub fn is_held(&self, entity_id: EntityId) -> bool {
        let key = self.key(entity_id);
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&key)
    }

    fn release(&self, key: &str) {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        held.remove(key);
        drop(held);
        self.released.notify_all();
        trace!(lock = %key, "released entity lock");
    }
}

/// Holds one entity's lock until dropped
#[derive(Debug)]
pub struct EntityGuard<'a> {
    locks: &'a EntityLocks,
    key: String,
}

impl EntityGuard<'_> {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for EntityGuard<'_> {
    fn drop(&mut self) {
        self.locks.release(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_key_format() {
        let locks = EntityLocks::new("prom_alert_receiver_topic_");
        assert_eq!(locks.key(42), "prom_alert_receiver_topic_42");
        assert_eq!(locks.acquire(42).key(), "prom_alert_receiver_topic_42");
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let locks = EntityLocks::new("t_");
        {
            let _guard = locks.acquire(1);
            assert!(locks.is_held(1));
            assert!(locks.try_acquire(1).is_none());
            // Other entities are independent
            assert!(locks.try_acquire(2).is_some());
        }
        assert!(!locks.is_held(1));
        assert!(!locks.is_held(2));
    }

    #[test]
    fn test_same_entity_is_serialized() {
        let locks = Arc::new(EntityLocks::new("t_"));
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let inside = Arc::clone(&inside);
                let max_inside = Arc::clone(&max_inside);
                thread::spawn(move || {
                    for _ in 0..20 {
                        let _guard = locks.acquire(7);
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_inside.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(Duration::from_micros(50));
                        inside.fetch_sub(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert!(!locks.is_held(7));
    }

    #[test]
    fn test_panic_releases_lock() {
        let locks = Arc::new(EntityLocks::new("t_"));
        let worker = Arc::clone(&locks);

        let result = thread::spawn(move || {
            let _guard = worker.acquire(3);
            panic!("reconciliation blew up");
        })
        .join();

        assert!(result.is_err());
        assert!(!locks.is_held(3));
        let _guard = locks.acquire(3);
    }
}
