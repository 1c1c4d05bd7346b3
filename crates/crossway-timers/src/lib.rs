//! Cancellable scheduled tasks keyed by their owner.
//!
//! The server runs two kinds of deferred work that race against player
//! actions: the per-room blitz countdown and the per-player disconnect
//! grace timer. Both share one discipline:
//!
//! - at most ONE task per key may exist - arming a key always cancels the
//!   task it replaces, so overlapping timers are impossible by construction;
//! - any event that invalidates a pending task cancels it by key;
//! - a task that fires anyway must re-check current state itself, because
//!   cancellation and firing can race at the boundary.
//!
//! [`TaskKeeper`] implements the first two; the third is the callback
//! author's contract (re-lock, re-fetch, trust nothing captured at spawn
//! time except the key).

use std::collections::HashMap;
use std::hash::Hash;

use tokio::task::JoinHandle;

/// A registry of spawned timer tasks, at most one per key.
///
/// Dropping the keeper aborts everything still armed, so timers cannot
/// outlive the state they would act on.
pub struct TaskKeeper<K> {
    tasks: HashMap<K, JoinHandle<()>>,
}

impl<K: Eq + Hash> TaskKeeper<K> {
    /// Creates an empty keeper.
    pub fn new() -> Self {
        Self {
            tasks: HashMap::new(),
        }
    }

    /// Spawns `future` as the task for `key`, aborting and replacing any
    /// task previously armed under the same key.
    pub fn spawn<F>(&mut self, key: K, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        self.arm(key, tokio::spawn(future));
    }

    /// Registers an already-spawned task for `key`, aborting any
    /// predecessor.
    pub fn arm(&mut self, key: K, handle: JoinHandle<()>) {
        if let Some(previous) = self.tasks.insert(key, handle) {
            previous.abort();
        }
    }

    /// Cancels the task for `key`, if one is armed. Returns whether a task
    /// was actually aborted before finishing.
    pub fn cancel(&mut self, key: &K) -> bool {
        match self.tasks.remove(key) {
            Some(handle) => {
                let live = !handle.is_finished();
                handle.abort();
                live
            }
            None => false,
        }
    }

    /// Cancels every armed task.
    pub fn cancel_all(&mut self) {
        for (_, handle) in self.tasks.drain() {
            handle.abort();
        }
    }

    /// Whether a task is currently registered for `key` (it may already
    /// have run to completion; see [`reap`](Self::reap)).
    pub fn contains(&self, key: &K) -> bool {
        self.tasks.contains_key(key)
    }

    /// Drops registry entries whose task has already finished, bounding
    /// the map to live timers. Call from periodic housekeeping.
    pub fn reap(&mut self) {
        self.tasks.retain(|_, handle| !handle.is_finished());
    }

    /// Number of registered tasks (including finished, un-reaped ones).
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether no tasks are registered.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl<K: Eq + Hash> Default for TaskKeeper<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Drop for TaskKeeper<K> {
    fn drop(&mut self) {
        for handle in self.tasks.values() {
            handle.abort();
        }
    }
}
