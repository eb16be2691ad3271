// SPDX-FileCopyrightText: 2026 Leadpool Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-(worker, category) in-flight guard for allocation requests.
//!
//! A repeat request from the same worker for the same category is refused
//! with [`LeadpoolError::InFlight`] while the first one runs, instead of
//! queueing behind the storage lock.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use leadpool_core::{LeadpoolError, WorkerId};
use tracing::debug;

type Key = (WorkerId, String);

/// Bounded concurrent set of running allocation requests.
#[derive(Debug)]
pub struct InFlightSet {
    entries: DashMap<Key, Instant>,
    len: AtomicUsize,
    capacity: usize,
}

impl InFlightSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            len: AtomicUsize::new(0),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Requests currently holding a guard.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, worker: &WorkerId, category: &str) -> bool {
        self.entries
            .contains_key(&(worker.clone(), category.to_string()))
    }

    /// Mark `(worker, category)` as running. The mark is removed when the
    /// returned guard drops, on every exit path.
    pub fn try_acquire(
        &self,
        worker: &WorkerId,
        category: &str,
    ) -> Result<InFlightGuard<'_>, LeadpoolError> {
        if self.len.fetch_add(1, Ordering::AcqRel) >= self.capacity {
            self.len.fetch_sub(1, Ordering::AcqRel);
            return Err(LeadpoolError::Overloaded {
                capacity: self.capacity,
            });
        }

        let key = (worker.clone(), category.to_string());
        match self.entries.entry(key.clone()) {
            Entry::Occupied(_) => {
                self.len.fetch_sub(1, Ordering::AcqRel);
                Err(LeadpoolError::InFlight {
                    worker_id: worker.to_string(),
                    category: category.to_string(),
                })
            }
            Entry::Vacant(slot) => {
                slot.insert(Instant::now());
                Ok(InFlightGuard { set: self, key })
            }
        }
    }
}

/// Releases its `(worker, category)` mark on drop.
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    set: &'a InFlightSet,
    key: Key,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if let Some((_, started)) = self.set.entries.remove(&self.key) {
            debug!(
                worker = %self.key.0,
                category = %self.key.1,
                held_ms = started.elapsed().as_millis() as u64,
                "in-flight guard released"
            );
        }
        self.set.len.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeat_request_is_refused_until_release() {
        let set = InFlightSet::new(8);
        let worker = WorkerId::from("w1");

        let guard = set.try_acquire(&worker, "telegram").unwrap();
        assert!(set.contains(&worker, "telegram"));
        let err = set.try_acquire(&worker, "telegram").unwrap_err();
        assert!(matches!(err, LeadpoolError::InFlight { .. }));

        // Other category and other worker are independent.
        let _vk = set.try_acquire(&worker, "vk").unwrap();
        let _other = set.try_acquire(&WorkerId::from("w2"), "telegram").unwrap();
        assert_eq!(set.len(), 3);

        drop(guard);
        assert!(!set.contains(&worker, "telegram"));
        assert!(set.try_acquire(&worker, "telegram").is_ok());
    }

    #[test]
    fn capacity_bounds_the_set() {
        let set = InFlightSet::new(2);
        let _a = set.try_acquire(&WorkerId::from("a"), "vk").unwrap();
        let _b = set.try_acquire(&WorkerId::from("b"), "vk").unwrap();
        let err = set.try_acquire(&WorkerId::from("c"), "vk").unwrap_err();
        assert!(matches!(err, LeadpoolError::Overloaded { capacity: 2 }));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn guard_released_on_panic() {
        let set = InFlightSet::new(4);
        let worker = WorkerId::from("w1");
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = set.try_acquire(&worker, "ok").unwrap();
            panic!("handler failed");
        }));
        assert!(result.is_err());
        assert!(set.is_empty());
        assert!(!set.contains(&worker, "ok"));
    }
}
