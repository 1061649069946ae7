//! Recursion guard.
//!
//! While a rewrite for a key is pending, the host may re-enter the directory
//! stage for the same key (the rewrite's own sub-resolution does exactly
//! that). The guard short-circuits those re-entries.
//!
//! Releasing a key is deferred to the next scheduler tick so callbacks
//! chained from the same event still see it as in flight. Each entry carries
//! a generation; a deferred release only clears the entry if the generation
//! still matches, so a later `leave` supersedes an earlier pending one and a
//! `reset` makes every pending release a no-op.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Identity of a rewrite attempt: requesting directory plus normalized request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecursionKey {
    pub base_path: PathBuf,
    pub request: String,
}

impl RecursionKey {
    #[must_use]
    pub fn new(base_path: PathBuf, request: String) -> Self {
        Self { base_path, request }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    InFlight(u64),
    Releasing(u64),
}

#[derive(Debug, Default)]
struct GuardState {
    next_generation: u64,
    entries: HashMap<RecursionKey, Entry>,
}

impl GuardState {
    fn generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }
}

/// Tracks in-flight rewrite attempts.
///
/// Cloning yields another handle to the same state.
#[derive(Debug, Clone, Default)]
pub struct RecursionGuard {
    state: Arc<Mutex<GuardState>>,
}

impl RecursionGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `key` in flight. Returns `false` if it already is (or is still releasing).
    pub fn try_enter(&self, key: &RecursionKey) -> bool {
        let mut state = self.lock();
        if state.entries.contains_key(key) {
            return false;
        }
        let generation = state.generation();
        state.entries.insert(key.clone(), Entry::InFlight(generation));
        true
    }

    /// Release `key` on the next scheduler tick.
    ///
    /// Calling `leave` again before that tick reschedules the release. Without
    /// a running tokio runtime the key is released immediately.
    ///
    /// "Next tick" is exact on a current-thread runtime. On a multi-thread
    /// runtime the release can overlap the rest of the caller's tick, so
    /// hosts that rely on the window should drive resolution on a
    /// current-thread runtime.
    pub fn leave(&self, key: &RecursionKey) {
        let generation = {
            let mut state = self.lock();
            if !state.entries.contains_key(key) {
                return;
            }
            let generation = state.generation();
            state
                .entries
                .insert(key.clone(), Entry::Releasing(generation));
            generation
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let guard = self.clone();
                let key = key.clone();
                handle.spawn(async move {
                    // A worker may pick the task up at once; give the
                    // releasing caller's tick a chance to finish first.
                    tokio::task::yield_now().await;
                    guard.release(&key, generation);
                });
            }
            Err(_) => self.release(key, generation),
        }
    }

    /// Forget every entry. Pending releases become no-ops.
    pub fn reset(&self) {
        self.lock().entries.clear();
    }

    /// Whether `key` is in flight or waiting for its release.
    #[must_use]
    pub fn is_held(&self, key: &RecursionKey) -> bool {
        self.lock().entries.contains_key(key)
    }

    /// Number of held keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether no key is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    fn release(&self, key: &RecursionKey, generation: u64) {
        let mut state = self.lock();
        if state.entries.get(key) == Some(&Entry::Releasing(generation)) {
            state.entries.remove(key);
            tracing::trace!(request = %key.request, generation, "released");
        }
    }

    fn lock(&self) -> MutexGuard<'_, GuardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
