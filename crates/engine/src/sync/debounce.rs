//! Keyed trailing-edge debouncer.
//!
//! Each key has at most one waiting task. Arming a key again before its delay
//! elapses replaces the waiting task and restarts the delay, so a burst of
//! arms runs exactly one task, the last one, one delay after the burst ends.
//! A task that has started running is never cancelled.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::trace;

/// Trailing-edge debouncer keyed by `K`.
///
/// Dropping the debouncer cancels every waiting task.
pub struct Debouncer<K> {
    delay: Duration,
    state: Arc<Mutex<State<K>>>,
}

struct State<K> {
    next_generation: u64,
    pending: HashMap<K, Pending>,
}

/// A waiting task. Dropping `fire` cancels it; sending on it runs it now.
struct Pending {
    generation: u64,
    fire: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl<K> Debouncer<K>
where
    K: Eq + Hash + Clone + std::fmt::Debug + Send + 'static,
{
    /// Create a debouncer with a fixed quiet period.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            state: Arc::new(Mutex::new(State {
                next_generation: 0,
                pending: HashMap::new(),
            })),
        }
    }

    /// Run `task` once `key` has been quiet for the delay.
    ///
    /// Replaces any task still waiting under `key`. `task` is not polled until
    /// it fires, so values it reads are read at fire time.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn arm<F>(&self, key: K, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (fire, fired) = oneshot::channel::<()>();
        let delay = self.delay;
        let state = Arc::clone(&self.state);

        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let generation = guard.next_generation;
        guard.next_generation += 1;

        let task_key = key.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                signal = fired => {
                    if signal.is_err() {
                        trace!(key = ?task_key, "Debounced task cancelled");
                        return;
                    }
                }
            }

            {
                let mut guard = state.lock().unwrap_or_else(PoisonError::into_inner);
                if guard
                    .pending
                    .get(&task_key)
                    .is_some_and(|p| p.generation == generation)
                {
                    guard.pending.remove(&task_key);
                }
            }

            trace!(key = ?task_key, "Debounced task firing");
            task.await;
        });

        // The replaced entry's sender drops here, cancelling it.
        guard.pending.insert(
            key,
            Pending {
                generation,
                fire,
                handle,
            },
        );
    }

    /// Cancel the task waiting under `key`. Returns whether one was waiting.
    pub fn cancel(&self, key: &K) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .remove(key)
            .is_some()
    }

    /// Cancel every waiting task.
    pub fn cancel_all(&self) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .clear();
    }

    /// Whether a task is waiting under `key`.
    #[must_use]
    pub fn is_armed(&self, key: &K) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .contains_key(key)
    }

    /// Number of waiting tasks.
    #[must_use]
    pub fn armed_count(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .len()
    }

    /// Run every waiting task now and wait for them to finish.
    pub async fn flush(&self) {
        let pending: Vec<Pending> = self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .drain()
            .map(|(_, p)| p)
            .collect();

        let mut handles = Vec::with_capacity(pending.len());
        for p in pending {
            // Err means the delay elapsed concurrently; the task is running anyway.
            let _ = p.fire.send(());
            handles.push(p.handle);
        }
        for handle in handles {
            let _ = handle.await;
        }
    }
}

impl<K> Drop for Debouncer<K> {
    fn drop(&mut self) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .clear();
    }
}

impl<K> std::fmt::Debug for Debouncer<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let armed = self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .len();
        f.debug_struct("Debouncer")
            .field("delay", &self.delay)
            .field("armed", &armed)
            .finish()
    }
}
