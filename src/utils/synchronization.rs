//! Synchronization utilities for concurrent metadata resolution.
//!
//! This module provides the keyed synchronization primitive used by both resolver caches.
//! It extends a concurrent map with an at-most-once-concurrently build discipline, so that
//! expensive, side-effecting construction never runs twice for the same key at the same
//! time.
//!
//! # Key Components
//!
//! - [`SingleFlight`] - A keyed cache where concurrent misses for one key share a single build
//!
//! # Design Principles
//!
//! - **Non-blocking reads**: Lookups only touch the completed-value map and never wait on a build
//! - **Per-key serialization**: Builders for different keys never block each other
//! - **No partial entries**: A value becomes visible only after its builder returned successfully
//! - **Failure transparency**: A failed build leaves no entry, the next caller builds again

use std::sync::{Arc, Mutex};

use dashmap::DashMap;

use crate::{Error, Result};

/// A keyed cache with single-flight construction.
///
/// Completed values live in a [`DashMap`] that supports concurrent readers. Each key owns
/// a build gate (a [`Mutex`]) which is taken only on a cache miss. The first caller to
/// take the gate runs the builder; callers arriving while the build is in flight block on
/// the gate and, once released, find the completed value and return it without building.
///
/// Values are cloned out of the cache, so `V` is usually an [`Arc`].
///
/// # Examples
///
/// ```rust
/// use mapscope::utils::synchronization::SingleFlight;
/// use std::sync::Arc;
///
/// let cache: SingleFlight<Arc<String>> = SingleFlight::new();
/// let value = cache.get_or_try_init("key", || Ok(Arc::new("built".to_string())))?;
/// assert_eq!(value.as_str(), "built");
///
/// // The second call is a cache hit, the builder is never invoked
/// let again = cache.get_or_try_init("key", || unreachable!())?;
/// assert!(Arc::ptr_eq(&value, &again));
/// # Ok::<(), mapscope::Error>(())
/// ```
pub struct SingleFlight<V> {
    /// Completed values, visible to readers
    ready: DashMap<String, V>,
    /// Per-key build gates, held for the duration of a build
    gates: DashMap<String, Arc<Mutex<()>>>,
}

impl<V: Clone> SingleFlight<V> {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        SingleFlight {
            ready: DashMap::new(),
            gates: DashMap::new(),
        }
    }

    /// Returns the completed value for `key`, if present.
    ///
    /// Never blocks on an in-flight build.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<V> {
        self.ready.get(key).map(|entry| entry.value().clone())
    }

    /// Returns `true` if a completed value exists for `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.ready.contains_key(key)
    }

    /// Unconditionally stores `value` under `key`, replacing any previous value.
    ///
    /// Bypasses the build gate entirely.
    pub fn insert(&self, key: &str, value: V) {
        self.ready.insert(key.to_string(), value);
    }

    /// Number of completed values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ready.len()
    }

    /// Returns `true` if no value has been completed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ready.is_empty()
    }

    /// Snapshot of all completed values, in no particular order.
    #[must_use]
    pub fn values(&self) -> Vec<V> {
        self.ready.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Returns the value for `key`, building it with `init` on a miss.
    ///
    /// At most one `init` runs per key at any time. Callers racing on the same missing key
    /// block until the running build finishes and then reuse its value. If `init` fails,
    /// no value is stored and the error is returned to that caller only; a waiting caller
    /// then runs its own `init`.
    ///
    /// # Arguments
    ///
    /// * `key` - The cache key
    /// * `init` - Builder invoked only if the key is still missing once the gate is held
    ///
    /// # Errors
    ///
    /// Returns whatever `init` returns, or [`Error::LockError`] if the gate was poisoned by
    /// a panicking builder.
    pub fn get_or_try_init<F>(&self, key: &str, init: F) -> Result<V>
    where
        F: FnOnce() -> Result<V>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }

        // Clone the gate out so the map shard is released before we block on it
        let gate = self.gates.entry(key.to_string()).or_default().clone();
        let _held = gate.lock().map_err(|_| Error::LockError)?;

        if let Some(value) = self.get(key) {
            return Ok(value);
        }

        let value = init()?;
        self.ready.insert(key.to_string(), value.clone());
        Ok(value)
    }
}

impl<V: Clone> Default for SingleFlight<V> {
    fn default() -> Self {
        Self::new()
    }
}
