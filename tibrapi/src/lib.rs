//! AzuraCast client library for The Indie Beat Radio
//!
//! This crate is the data layer behind the TIBR panel: it fetches the
//! station directory and now-playing metadata from the AzuraCast API and
//! keeps the network quiet while doing so.
//!
//! # Features
//!
//! - **Request deduplication**: concurrent GETs for the same endpoint share
//!   one physical request ([`HttpClient`])
//! - **TTL caches**: station list for 5 minutes, now playing for 30 seconds,
//!   with a periodic janitor ([`ApiCache`])
//! - **Station model**: normalized records with stream URL resolution
//!   ([`Station`])
//! - **Graceful degradation**: [`AzuraCastApi`] never surfaces fetch
//!   errors; callers get an empty list or `None`
//!
//! # Example
//!
//! ```no_run
//! use tibrapi::{AzuraCastApi, sort_for_menu};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let api = AzuraCastApi::new()?;
//!
//!     for station in sort_for_menu(&api.get_channels().await) {
//!         println!("{} -> {}", station.display_name(), station.resolved_stream_url());
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod client;
pub mod constants;
pub mod error;
pub mod models;
pub mod service;

// Re-exports
pub use cache::{ApiCache, CacheEntry, TtlCache};
pub use client::{ClientBuilder, HttpClient, ReqwestTransport, Transport};
pub use error::{Error, Result};
pub use models::{parse_stations, sort_for_menu, Mount, Station, TrackInfo};
pub use service::AzuraCastApi;
