//! Time-bounded in-memory caches for AzuraCast responses
//!
//! - `TtlCache`: a keyed map whose entries expire after a fixed TTL
//! - `ApiCache`: the two caches used by the client (station list and
//!   per-station now-playing payloads)
//!
//! Reads re-check the age of every entry, so `sweep()` is housekeeping only:
//! it bounds memory in a long-lived process but never affects what `get`
//! returns. Timestamps come from `tokio::time::Instant`, so tests can drive
//! expiry with a paused clock.
//!
//! Responses are stamped with the moment their request started, not the
//! moment they arrived, so network latency never extends a TTL.

use crate::constants::{channel_cache_ttl, metadata_cache_ttl};
use crate::models::Station;
use serde_json::Value;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Single fixed key of the station list cache
pub const STATIONS_KEY: &str = "stations";

// ============================================================================
// CacheEntry
// ============================================================================

/// A cached value and the moment it was stored
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub stored_at: Instant,
}

impl<T> CacheEntry<T> {
    fn at(value: T, stored_at: Instant) -> Self {
        Self { value, stored_at }
    }

    /// Age of the entry at `now`
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.stored_at)
    }

    /// An entry is fresh while `now - stored_at < ttl`
    pub fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        self.age(now) < ttl
    }
}

// ============================================================================
// TtlCache
// ============================================================================

/// Keyed cache with a single TTL for all entries
#[derive(Debug)]
pub struct TtlCache<K, V> {
    name: &'static str,
    ttl: Duration,
    entries: Mutex<HashMap<K, CacheEntry<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<K, CacheEntry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached value for `key`, only if still fresh
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = Instant::now();
        self.entries()
            .get(key)
            .filter(|entry| entry.is_fresh(now, self.ttl))
            .map(|entry| entry.value.clone())
    }

    /// Store `value`, replacing any previous entry
    pub fn put(&self, key: K, value: V) {
        self.put_at(key, value, Instant::now());
    }

    /// Store `value` as of `stored_at`; its age counts from that instant
    pub fn put_at(&self, key: K, value: V, stored_at: Instant) {
        self.entries().insert(key, CacheEntry::at(value, stored_at));
    }

    /// Drop expired entries, returning how many were removed
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let ttl = self.ttl;
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_fresh(now, ttl));
        before - entries.len()
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    /// Number of stored entries, fresh or not
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// ApiCache
// ============================================================================

/// The client's response caches
#[derive(Debug)]
pub struct ApiCache {
    stations: TtlCache<&'static str, Vec<Station>>,
    now_playing: TtlCache<String, Value>,
}

impl Default for ApiCache {
    fn default() -> Self {
        Self::with_ttls(channel_cache_ttl(), metadata_cache_ttl())
    }
}

impl ApiCache {
    /// Caches with the standard TTLs (5 minutes / 30 seconds)
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttls(stations_ttl: Duration, now_playing_ttl: Duration) -> Self {
        Self {
            stations: TtlCache::new("stations", stations_ttl),
            now_playing: TtlCache::new("now_playing", now_playing_ttl),
        }
    }

    /// Fresh station list, if any
    pub fn stations(&self) -> Option<Vec<Station>> {
        self.stations.get(STATIONS_KEY)
    }

    pub fn put_stations(&self, stations: Vec<Station>) {
        self.put_stations_at(stations, Instant::now());
    }

    /// Store a station list fetched by a request started at `requested_at`
    pub fn put_stations_at(&self, stations: Vec<Station>, requested_at: Instant) {
        self.stations.put_at(STATIONS_KEY, stations, requested_at);
    }

    /// Fresh now-playing payload for a station shortcode, if any
    pub fn now_playing(&self, shortcode: &str) -> Option<Value> {
        self.now_playing.get(shortcode)
    }

    pub fn put_now_playing(&self, shortcode: impl Into<String>, payload: Value) {
        self.put_now_playing_at(shortcode, payload, Instant::now());
    }

    pub fn put_now_playing_at(
        &self,
        shortcode: impl Into<String>,
        payload: Value,
        requested_at: Instant,
    ) {
        self.now_playing.put_at(shortcode.into(), payload, requested_at);
    }

    /// Sweep both caches, returning the number of evicted entries
    pub fn sweep(&self) -> usize {
        self.stations.sweep() + self.now_playing.sweep()
    }

    pub fn clear(&self) {
        self.stations.clear();
        self.now_playing.clear();
    }

    /// (station list entries, now-playing entries)
    pub fn stats(&self) -> (usize, usize) {
        (self.stations.len(), self.now_playing.len())
    }
}
