//! Constants for The Indie Beat Radio client.
//!
//! These values are fixed at build time. The HTTP layer exposes builder
//! overrides for the base URL, timeout and user agent (mostly for tests);
//! everything else is hardcoded here.

use std::time::Duration;

// ============================================================================
// Naming and versioning
// ============================================================================

/// Application name reported to the AzuraCast server and in stream URLs
pub const APP_NAME: &str = "TheIndieBeat-GNOME";

/// Application version, bumped on each release
pub const APP_VERSION: &str = "1.0-dev";

/// User agent for API requests and the `ua=` stream parameter
///
/// Value: TheIndieBeat-GNOME/1.0-dev
pub const USER_AGENT: &str = "TheIndieBeat-GNOME/1.0-dev";

/// Client name announced to the audio sink
pub const CLIENT_NAME: &str = "tibr-radio";

// ============================================================================
// API Configuration
// ============================================================================

/// AzuraCast API base URL
///
/// Endpoints (`/stations`, `/nowplaying/{shortcode}`) are appended verbatim.
pub const API_BASE_URL: &str = "https://azura.theindiebeat.fm/api";

/// Base for public listen URLs, used when a station exposes no mount
pub const LISTEN_BASE_URL: &str = "https://azura.theindiebeat.fm/listen";

/// API request timeout (seconds)
pub const REQUEST_TIMEOUT_SECONDS: u64 = 10;

/// Idle connections kept per host by the HTTP pool
pub const MAX_CONNS_PER_HOST: usize = 2;

// ============================================================================
// Cache durations
// ============================================================================

/// Station list validity (milliseconds)
///
/// Value: 5 minutes
pub const CHANNEL_CACHE_DURATION_MS: u64 = 5 * 60 * 1000;

/// Now-playing payload validity (milliseconds)
///
/// Value: 30 seconds
pub const METADATA_CACHE_DURATION_MS: u64 = 30 * 1000;

/// Delay before a completed request leaves the in-flight table (milliseconds)
///
/// Callers arriving inside this window attach to the already resolved
/// outcome instead of issuing a new request.
///
/// Value: 1 second
pub const REQUEST_DEBOUNCE_MS: u64 = 1000;

/// Janitor period for expired cache entries (milliseconds)
///
/// Value: 1 minute
pub const CACHE_SWEEP_INTERVAL_MS: u64 = 60 * 1000;

// ============================================================================
// Playback
// ============================================================================

/// Now-playing refresh period while a station is playing (milliseconds)
///
/// Value: 30 seconds
pub const METADATA_UPDATE_INTERVAL_MS: u64 = 30 * 1000;

/// Volume applied when the player is created
pub const DEFAULT_VOLUME: f64 = 0.5;

/// Delay after which a stopped player asks the UI to reset (milliseconds)
///
/// Value: 10 minutes
pub const INACTIVE_RESET_TIMEOUT_MS: u64 = 10 * 60 * 1000;

/// Helper to get the station list TTL as Duration
pub fn channel_cache_ttl() -> Duration {
    Duration::from_millis(CHANNEL_CACHE_DURATION_MS)
}

/// Helper to get the now-playing TTL as Duration
pub fn metadata_cache_ttl() -> Duration {
    Duration::from_millis(METADATA_CACHE_DURATION_MS)
}

/// Helper to get the request debounce window as Duration
pub fn request_debounce() -> Duration {
    Duration::from_millis(REQUEST_DEBOUNCE_MS)
}

/// Helper to get the cache sweep period as Duration
pub fn cache_sweep_interval() -> Duration {
    Duration::from_millis(CACHE_SWEEP_INTERVAL_MS)
}

/// Helper to get the metadata poll period as Duration
pub fn metadata_update_interval() -> Duration {
    Duration::from_millis(METADATA_UPDATE_INTERVAL_MS)
}

/// Helper to get the inactivity reset delay as Duration
pub fn inactive_reset_timeout() -> Duration {
    Duration::from_millis(INACTIVE_RESET_TIMEOUT_MS)
}

/// Helper to get the API timeout as Duration
pub fn request_timeout() -> Duration {
    Duration::from_secs(REQUEST_TIMEOUT_SECONDS)
}
