//! Join concurrent work for the same key onto a single spawned task.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};

type Pending<T> = Shared<BoxFuture<'static, Option<T>>>;
type PendingMap<T> = Arc<Mutex<HashMap<String, Pending<T>>>>;

/// Map of in-progress operations keyed by string.
///
/// The first caller for a key spawns its work; every caller, including ones
/// arriving while it runs, awaits a shared handle to that task. Dropping a
/// waiter never cancels or restarts the work. The task removes its own entry
/// when it finishes, panics included, so a later call starts fresh.
pub struct InFlight<T> {
    pending: PendingMap<T>,
}

impl<T> Default for InFlight<T> {
    fn default() -> Self {
        Self { pending: Arc::new(Mutex::new(HashMap::new())) }
    }
}

fn lock<T>(pending: &Mutex<HashMap<String, Pending<T>>>) -> MutexGuard<'_, HashMap<String, Pending<T>>> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Removes the key when the owning task ends, however it ends.
struct Release<T> {
    pending: PendingMap<T>,
    key: String,
}

impl<T> Drop for Release<T> {
    fn drop(&mut self) {
        lock(&self.pending).remove(&self.key);
    }
}

impl<T: Clone + Send + Sync + 'static> InFlight<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `work` for `key`, or join the task already running for it.
    ///
    /// Returns `None` if the task panicked.
    pub async fn run<F, Fut>(&self, key: &str, work: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let pending = {
            let mut map = lock(&self.pending);
            match map.get(key) {
                Some(pending) => pending.clone(),
                None => {
                    // inserted under the lock, so the task's release always finds its own entry
                    let release = Release { pending: Arc::clone(&self.pending), key: key.to_string() };
                    let fut = work();
                    let handle = tokio::spawn(async move {
                        let _release = release;
                        fut.await
                    });

                    let owner = key.to_string();
                    let pending = async move {
                        match handle.await {
                            Ok(value) => Some(value),
                            Err(e) => {
                                tracing::error!(key = %owner, "in-flight task failed: {e}");
                                None
                            }
                        }
                    }
                    .boxed()
                    .shared();
                    map.insert(key.to_string(), pending.clone());
                    pending
                }
            }
        };

        pending.await
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        lock(&self.pending).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    async fn counted(runs: Arc<AtomicUsize>, delay: Duration, value: u32) -> u32 {
        runs.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(delay).await;
        value
    }

    async fn explode() -> u32 {
        panic!("work failed")
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_run() {
        let inflight = Arc::new(InFlight::<u32>::new());
        let runs = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let inflight = Arc::clone(&inflight);
            let runs = Arc::clone(&runs);
            handles.push(tokio::spawn(async move {
                inflight
                    .run("/blog", move || counted(runs, Duration::from_millis(50), 7))
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Some(7));
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(inflight.is_empty());
    }

    #[tokio::test]
    async fn test_sequential_calls_run_again() {
        let inflight = InFlight::<u32>::new();
        let runs = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let runs = Arc::clone(&runs);
            let got = inflight.run("/a", move || counted(runs, Duration::ZERO, 1)).await;
            assert_eq!(got, Some(1));
        }
        assert_eq!(runs.load(Ordering::SeqCst), 3);
        assert!(inflight.is_empty());
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_block_each_other() {
        let inflight = InFlight::<&'static str>::new();
        let (a, b) = tokio::join!(
            inflight.run("/a", || async { "a" }),
            inflight.run("/b", || async { "b" }),
        );
        assert_eq!((a, b), (Some("a"), Some("b")));
    }

    #[tokio::test]
    async fn test_dropped_first_caller_does_not_restart_work() {
        let inflight = Arc::new(InFlight::<u32>::new());
        let runs = Arc::new(AtomicUsize::new(0));

        let spawn_caller = || {
            let inflight = Arc::clone(&inflight);
            let runs = Arc::clone(&runs);
            tokio::spawn(async move {
                inflight
                    .run("/blog", move || counted(runs, Duration::from_millis(200), 7))
                    .await
            })
        };

        let first = spawn_caller();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let second = spawn_caller();
        tokio::time::sleep(Duration::from_millis(20)).await;
        first.abort();

        assert_eq!(second.await.unwrap(), Some(7));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(inflight.is_empty());
    }

    #[tokio::test]
    async fn test_work_finishes_after_every_caller_leaves() {
        let inflight = Arc::new(InFlight::<u32>::new());
        let runs = Arc::new(AtomicUsize::new(0));

        let caller = {
            let inflight = Arc::clone(&inflight);
            let runs = Arc::clone(&runs);
            tokio::spawn(async move {
                inflight
                    .run("/blog", move || counted(runs, Duration::from_millis(50), 7))
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        caller.abort();
        assert!(!inflight.is_empty());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(inflight.is_empty());
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panicking_work_releases_the_key() {
        let inflight = InFlight::<u32>::new();
        let got = inflight.run("/boom", explode).await;
        assert_eq!(got, None);
        assert!(inflight.is_empty());

        assert_eq!(inflight.run("/boom", || async { 3 }).await, Some(3));
    }
}
