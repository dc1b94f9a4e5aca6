//! Keyed coalescing of async computations for orchestrators.

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

type SharedResult<V, E> = Shared<BoxFuture<'static, Arc<Result<V, E>>>>;

/// An explicit keyed store guaranteeing at-most-one in-flight computation
/// per key.
///
/// Orchestrators that re-run pipelines on demand use this to coalesce
/// concurrent requests for the same input: the first caller starts the
/// computation, every concurrent caller for the same key awaits the same
/// shared future, and the entry is removed once the computation settles.
pub struct SingleFlight<K, V, E = String> {
    inflight: Mutex<HashMap<K, SharedResult<V, E>>>,
}

impl<K, V, E> Default for SingleFlight<K, V, E> {
    fn default() -> Self {
        Self {
            inflight: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, V, E> SingleFlight<K, V, E>
where
    K: Eq + Hash + Clone,
    V: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of computations currently in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.inflight.lock().len()
    }

    /// Runs (or joins) the computation for `key`.
    ///
    /// `make` is invoked only when no computation for `key` is in flight;
    /// otherwise the caller awaits the existing one. The shared result is
    /// returned behind an `Arc` so every joiner observes the same value.
    pub async fn run<F, Fut>(&self, key: K, make: F) -> Arc<Result<V, E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let (shared, leader) = {
            let mut guard = self.inflight.lock();
            match guard.get(&key) {
                Some(existing) => (existing.clone(), false),
                None => {
                    let shared = make().map(Arc::new).boxed().shared();
                    guard.insert(key.clone(), shared.clone());
                    (shared, true)
                }
            }
        };

        let result = shared.await;
        if leader {
            self.inflight.lock().remove(&key);
        }
        result
    }
}
