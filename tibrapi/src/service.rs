//! High-level AzuraCast client with caching
//!
//! `AzuraCastApi` combines the deduplicating [`HttpClient`], the [`ApiCache`]
//! and the station model into the API used by the player and the panel:
//!
//! - **Station list**: cached for 5 minutes; only one directory fetch
//!   (request + parsing) runs at a time, later callers join it
//! - **Now playing**: cached per station for 30 seconds
//! - **Janitor**: a background task sweeps expired cache entries and stale
//!   in-flight bookkeeping every minute
//!
//! Fetch failures never reach the caller: the station list degrades to an
//! empty vector and now-playing to `None`, with a warning in the log. The
//! panel always has something to render.
//!
//! # Example
//!
//! ```no_run
//! use tibrapi::AzuraCastApi;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let api = AzuraCastApi::new()?;
//!     api.start_janitor();
//!
//!     for station in api.get_channels().await {
//!         let payload = api.get_now_playing(&station.shortcode).await;
//!         let track = AzuraCastApi::parse_track_info(payload.as_ref());
//!         println!("{}: {} - {}", station.name, track.artist, track.title);
//!     }
//!
//!     api.destroy();
//!     Ok(())
//! }
//! ```

use crate::cache::ApiCache;
use crate::client::HttpClient;
use crate::constants::cache_sweep_interval;
use crate::error::Result;
use crate::models::{parse_stations, Station, TrackInfo};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Directory endpoint
pub const STATIONS_ENDPOINT: &str = "/stations";

/// Now-playing endpoint for a station shortcode
pub fn now_playing_endpoint(shortcode: &str) -> String {
    format!("/nowplaying/{}", shortcode)
}

type SharedStations = Shared<BoxFuture<'static, Vec<Station>>>;

/// The directory fetch currently running, tagged so that only the fetch that
/// created the slot clears it
#[derive(Default)]
struct DirectoryFetch {
    running: Option<(u64, SharedStations)>,
    next_id: u64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Caching AzuraCast client
///
/// All methods take `&self` and are safe to call concurrently; share the
/// client behind an `Arc`.
pub struct AzuraCastApi {
    http: HttpClient,
    cache: Arc<ApiCache>,
    directory: Arc<Mutex<DirectoryFetch>>,
    janitor: Mutex<Option<JoinHandle<()>>>,
}

impl AzuraCastApi {
    /// Client against the public API with default settings
    pub fn new() -> Result<Self> {
        Ok(Self::with_client(HttpClient::builder().build()?))
    }

    /// Client over a preconfigured [`HttpClient`]
    pub fn with_client(http: HttpClient) -> Self {
        Self::with_parts(http, ApiCache::new())
    }

    /// Client over a preconfigured [`HttpClient`] and cache
    pub fn with_parts(http: HttpClient, cache: ApiCache) -> Self {
        Self {
            http,
            cache: Arc::new(cache),
            directory: Arc::new(Mutex::new(DirectoryFetch::default())),
            janitor: Mutex::new(None),
        }
    }

    /// Get the underlying HTTP client
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Get the response cache
    pub fn cache(&self) -> &ApiCache {
        &self.cache
    }

    // ========================================================================
    // Station directory
    // ========================================================================

    /// Get the station list, using the cache when fresh
    ///
    /// On a cache miss, joins the directory fetch already running or starts
    /// one. Returns an empty vector if the fetch fails; an empty list is
    /// never cached, so the next call retries.
    pub async fn get_channels(&self) -> Vec<Station> {
        if let Some(stations) = self.cache.stations() {
            debug!(count = stations.len(), "Using cached station list");
            return stations;
        }

        let fetch = {
            let mut directory = lock(&self.directory);
            match &directory.running {
                Some((_, fetch)) => {
                    debug!("Joining running directory fetch");
                    fetch.clone()
                }
                None => {
                    directory.next_id += 1;
                    let id = directory.next_id;
                    let fetch = self.directory_fetch(id);
                    directory.running = Some((id, fetch.clone()));
                    fetch
                }
            }
        };

        fetch.await
    }

    fn directory_fetch(&self, id: u64) -> SharedStations {
        let http = self.http.clone();
        let cache = Arc::clone(&self.cache);
        let directory = Arc::clone(&self.directory);

        async move {
            let requested_at = Instant::now();
            let stations = match fetch_stations(&http).await {
                Ok(stations) => {
                    info!(count = stations.len(), "Fetched station directory");
                    if !stations.is_empty() {
                        cache.put_stations_at(stations.clone(), requested_at);
                    }
                    stations
                }
                Err(err) => {
                    warn!("Error fetching channels: {err}");
                    Vec::new()
                }
            };

            let mut directory = lock(&directory);
            if matches!(directory.running, Some((running, _)) if running == id) {
                directory.running = None;
            }

            stations
        }
        .boxed()
        .shared()
    }

    // ========================================================================
    // Now playing
    // ========================================================================

    /// Get the raw now-playing payload for a station, using the cache when
    /// fresh
    ///
    /// The cached payload ages from the moment the request was sent.
    /// Returns `None` if the request or JSON parsing fails.
    pub async fn get_now_playing(&self, shortcode: &str) -> Option<Value> {
        if let Some(payload) = self.cache.now_playing(shortcode) {
            debug!(station = shortcode, "Using cached now playing");
            return Some(payload);
        }

        let requested_at = Instant::now();
        match self.fetch_now_playing(shortcode).await {
            Ok(payload) => {
                self.cache
                    .put_now_playing_at(shortcode, payload.clone(), requested_at);
                Some(payload)
            }
            Err(err) => {
                warn!(station = shortcode, "Error fetching now playing: {err}");
                None
            }
        }
    }

    async fn fetch_now_playing(&self, shortcode: &str) -> Result<Value> {
        let body = self.http.get(&now_playing_endpoint(shortcode)).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Normalize a now-playing payload into [`TrackInfo`]
    ///
    /// `None` or a payload without a current song gives the "Unknown"
    /// defaults.
    pub fn parse_track_info(payload: Option<&Value>) -> TrackInfo {
        payload
            .map(TrackInfo::from_now_playing)
            .unwrap_or_default()
    }

    /// Warm the caches: station list, then the first station's now playing
    pub async fn prefetch(&self) {
        let stations = self.get_channels().await;
        match stations.first() {
            Some(first) => {
                if self.get_now_playing(&first.shortcode).await.is_none() {
                    debug!(station = %first.shortcode, "Prefetch of now playing failed");
                }
            }
            None => debug!("Prefetch found no stations"),
        }
    }

    // ========================================================================
    // Housekeeping
    // ========================================================================

    /// Start the periodic sweep of caches and in-flight bookkeeping
    ///
    /// Restarts the janitor if it was already running.
    pub fn start_janitor(&self) {
        self.start_janitor_every(cache_sweep_interval());
    }

    /// Start the janitor with a custom period
    pub fn start_janitor_every(&self, period: Duration) {
        let cache = Arc::clone(&self.cache);
        let http = self.http.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let evicted = cache.sweep();
                let released = http.sweep_stale();
                if evicted + released > 0 {
                    debug!(evicted, released, "Cache sweep");
                }
            }
        });

        if let Some(previous) = lock(&self.janitor).replace(handle) {
            previous.abort();
        }
    }

    /// Whether the janitor task is running
    pub fn janitor_running(&self) -> bool {
        lock(&self.janitor)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Empty both caches and drop in-flight bookkeeping
    ///
    /// Used when cached state may be stale, e.g. after a network reconnect.
    pub fn clear_caches(&self) {
        self.cache.clear();
        self.http.clear();
        lock(&self.directory).running = None;
        debug!("Cleared all caches");
    }

    /// Stop the janitor, abort running requests and clear everything
    ///
    /// Safe to call more than once.
    pub fn destroy(&self) {
        if let Some(janitor) = lock(&self.janitor).take() {
            janitor.abort();
        }
        self.http.shutdown();
        self.cache.clear();
        lock(&self.directory).running = None;
    }

    /// (cached station lists, cached now-playing entries)
    pub fn cache_stats(&self) -> (usize, usize) {
        self.cache.stats()
    }
}

async fn fetch_stations(http: &HttpClient) -> Result<Vec<Station>> {
    let body = http.get(STATIONS_ENDPOINT).await?;
    parse_stations(&body)
}

impl Drop for AzuraCastApi {
    fn drop(&mut self) {
        if let Some(janitor) = lock(&self.janitor).take() {
            janitor.abort();
        }
    }
}

impl std::fmt::Debug for AzuraCastApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (stations, now_playing) = self.cache_stats();
        f.debug_struct("AzuraCastApi")
            .field("http", &self.http)
            .field("cached_station_lists", &stations)
            .field("cached_now_playing", &now_playing)
            .finish()
    }
}
