//! Mutex-guarded key/value store with per-entry expiry.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// A single cached value and the instant it stops being served.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
  value: V,
  /// `None` means the entry lives until explicitly removed
  expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
  fn is_expired(&self, now: Instant) -> bool {
    self.expires_at.is_some_and(|at| now > at)
  }
}

/// Response cache shared between the API client and the auth manager.
///
/// None of the operations can fail. The map sits behind a mutex so the
/// cache can be shared through an `Arc`; a poisoned lock is recovered
/// rather than reported, since every operation leaves the map consistent.
#[derive(Debug)]
pub struct ResponseCache<V = serde_json::Value> {
  entries: Mutex<HashMap<String, CacheEntry<V>>>,
}

impl<V> Default for ResponseCache<V> {
  fn default() -> Self {
    Self {
      entries: Mutex::new(HashMap::new()),
    }
  }
}

impl<V: Clone> ResponseCache<V> {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Store a value. With a TTL the entry expires `ttl` from now, otherwise never.
  pub fn set(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
    self.set_at(key, value, ttl, Instant::now());
  }

  fn set_at(&self, key: impl Into<String>, value: V, ttl: Option<Duration>, now: Instant) {
    let expires_at = ttl.map(|ttl| now + ttl);
    self.lock().insert(key.into(), CacheEntry { value, expires_at });
  }

  /// Get a live value. An expired entry is removed as a side effect.
  pub fn get(&self, key: &str) -> Option<V> {
    self.get_at(key, Instant::now())
  }

  fn get_at(&self, key: &str, now: Instant) -> Option<V> {
    let mut entries = self.lock();
    match entries.get(key) {
      Some(entry) if entry.is_expired(now) => {
        entries.remove(key);
        tracing::trace!(key, "cache entry expired");
        None
      }
      Some(entry) => Some(entry.value.clone()),
      None => None,
    }
  }

  /// Same liveness rule as `get`, without cloning the value.
  pub fn has(&self, key: &str) -> bool {
    self.has_at(key, Instant::now())
  }

  fn has_at(&self, key: &str, now: Instant) -> bool {
    let mut entries = self.lock();
    match entries.get(key) {
      Some(entry) if entry.is_expired(now) => {
        entries.remove(key);
        false
      }
      Some(_) => true,
      None => false,
    }
  }

  /// Remove one entry, returning whether it existed.
  pub fn delete(&self, key: &str) -> bool {
    self.lock().remove(key).is_some()
  }

  /// Remove everything, or only the keys containing `pattern` as a substring.
  pub fn clear(&self, pattern: Option<&str>) {
    let mut entries = self.lock();
    match pattern {
      None => entries.clear(),
      Some(pattern) => {
        let before = entries.len();
        entries.retain(|key, _| !key.contains(pattern));
        tracing::debug!(pattern, removed = before - entries.len(), "cache invalidated");
      }
    }
  }

  /// Number of stored entries, expired ones included until they are touched.
  pub fn len(&self) -> usize {
    self.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.lock().is_empty()
  }
}
