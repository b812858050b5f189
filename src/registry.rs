//! Process-wide, type-keyed registry with compile-once cells.
//!
//! Each key owns one `OnceLock`. The first caller for a key runs the
//! initializer; concurrent callers for the same key block on that cell and
//! observe the single published value. Different keys never contend beyond a
//! `DashMap` shard lookup.

use dashmap::DashMap;
use std::any::TypeId;
use std::sync::{Arc, LazyLock, OnceLock};

pub(crate) struct Registry<V> {
    cells: LazyLock<DashMap<TypeId, Arc<OnceLock<V>>>>,
}

impl<V: Clone> Registry<V> {
    pub(crate) const fn new() -> Self {
        Registry {
            cells: LazyLock::new(DashMap::new),
        }
    }

    /// Returns the published value for `key`, initializing it on first use.
    ///
    /// The shard lock is released before `init` runs, so initializers may
    /// consult the registry for other keys.
    pub(crate) fn get_or_init(&self, key: TypeId, init: impl FnOnce() -> V) -> V {
        let cell = self.cells.entry(key).or_default().clone();
        cell.get_or_init(init).clone()
    }

    pub(crate) fn contains(&self, key: TypeId) -> bool {
        self.cells
            .get(&key)
            .is_some_and(|cell| cell.get().is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn test_initializes_once_under_contention() {
        static REGISTRY: Registry<usize> = Registry::new();
        static RUNS: AtomicUsize = AtomicUsize::new(0);

        let barrier = Arc::new(Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    REGISTRY.get_or_init(TypeId::of::<u8>(), || {
                        RUNS.fetch_add(1, Ordering::SeqCst);
                        42
                    })
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 42);
        }
        assert_eq!(RUNS.load(Ordering::SeqCst), 1);
        assert!(REGISTRY.contains(TypeId::of::<u8>()));
        assert!(!REGISTRY.contains(TypeId::of::<u16>()));
    }
}
