//! Data models for AzuraCast API responses
//!
//! Station records are normalized into [`Station`] by plain deserialization:
//! optional fields fall back to their defaults instead of failing. The
//! now-playing payload stays a raw [`serde_json::Value`]; [`TrackInfo`] is
//! derived from it on demand.

use crate::constants::LISTEN_BASE_URL;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

/// Station id that always heads the channel menu
pub const FEATURED_STATION_ID: u64 = 1;

/// Placeholder shown when the payload carries no value
pub const UNKNOWN: &str = "Unknown";

// ============================================================================
// Station directory
// ============================================================================

/// An alternate stream endpoint of a station
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Mount {
    /// Stream URL
    #[serde(default)]
    pub url: String,
    /// Whether the station flags this mount as its primary one
    #[serde(default)]
    pub is_default: bool,
    /// Human-readable mount name
    #[serde(default)]
    pub name: Option<String>,
}

impl Mount {
    pub fn new(url: impl Into<String>, is_default: bool) -> Self {
        Self {
            url: url.into(),
            is_default,
            name: None,
        }
    }
}

/// A streamable radio source from the `/stations` directory
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Station {
    /// Unique station id
    pub id: u64,
    /// Display name
    pub name: String,
    /// Short identifier, used as the now-playing key
    pub shortcode: String,
    /// Station homepage
    #[serde(default)]
    pub url: Option<String>,
    /// Public listen URL advertised by the server
    #[serde(default)]
    pub listen_url: Option<String>,
    /// Mount points, in server order
    #[serde(default, deserialize_with = "null_as_empty")]
    pub mounts: Vec<Mount>,
    /// Station artwork
    #[serde(default)]
    pub art: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<Mount>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<Mount>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Station {
    /// Create a station with no mounts, art or listen URL
    pub fn new(id: u64, name: impl Into<String>, shortcode: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            shortcode: shortcode.into(),
            url: None,
            listen_url: None,
            mounts: Vec::new(),
            art: None,
        }
    }

    /// Replace the mount list
    pub fn with_mounts(mut self, mounts: Vec<Mount>) -> Self {
        self.mounts = mounts;
        self
    }

    /// Set the advertised listen URL
    pub fn with_listen_url(mut self, listen_url: impl Into<String>) -> Self {
        self.listen_url = Some(listen_url.into());
        self
    }

    /// Build a station from one raw directory record
    pub fn from_record(record: &Value) -> Result<Self> {
        Ok(Station::deserialize(record)?)
    }

    /// Name shown in menus and the panel label
    pub fn display_name(&self) -> &str {
        &self.name
    }

    /// Stream URL to hand to the pipeline
    ///
    /// Picks the mount flagged default, then the first mount, then the
    /// advertised listen URL, and finally the conventional AzuraCast listen
    /// path for the shortcode. Never empty.
    pub fn resolved_stream_url(&self) -> String {
        let mounts = || self.mounts.iter().filter(|m| !m.url.is_empty());

        if let Some(mount) = mounts().find(|m| m.is_default).or_else(|| mounts().next()) {
            return mount.url.clone();
        }

        match self.listen_url.as_deref() {
            Some(listen_url) if !listen_url.is_empty() => listen_url.to_string(),
            _ => format!("{}/{}/radio.mp3", LISTEN_BASE_URL, self.shortcode),
        }
    }
}

/// Parse the `/stations` response body
pub fn parse_stations(body: &str) -> Result<Vec<Station>> {
    Ok(serde_json::from_str(body)?)
}

/// Order stations for the channel menu
///
/// The featured station (id 1) comes first, the rest follow by name,
/// case-insensitively.
pub fn sort_for_menu(stations: &[Station]) -> Vec<Station> {
    let mut sorted = stations.to_vec();
    sorted.sort_by(|a, b| {
        match (a.id == FEATURED_STATION_ID, b.id == FEATURED_STATION_ID) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        }
    });
    sorted
}

// ============================================================================
// Now playing
// ============================================================================

/// Track details shown by the panel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackInfo {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub artwork: Option<String>,
    pub external_link: Option<String>,
}

impl Default for TrackInfo {
    fn default() -> Self {
        Self {
            title: UNKNOWN.to_string(),
            artist: UNKNOWN.to_string(),
            album: UNKNOWN.to_string(),
            artwork: None,
            external_link: None,
        }
    }
}

impl TrackInfo {
    /// Extract the current song from a `/nowplaying/{shortcode}` payload
    ///
    /// Missing or empty fields fall back to [`UNKNOWN`] / `None`; a payload
    /// without `now_playing.song` yields [`TrackInfo::default`].
    pub fn from_now_playing(payload: &Value) -> Self {
        let Some(song) = payload
            .get("now_playing")
            .and_then(|np| np.get("song"))
            .filter(|song| song.is_object())
        else {
            return Self::default();
        };

        let text = |field: &str| non_empty(song.get(field)).map(str::to_string);

        Self {
            title: text("title").unwrap_or_else(|| UNKNOWN.to_string()),
            artist: text("artist").unwrap_or_else(|| UNKNOWN.to_string()),
            album: text("album").unwrap_or_else(|| UNKNOWN.to_string()),
            artwork: text("art"),
            external_link: non_empty(
                song.get("custom_fields")
                    .and_then(|fields| fields.get("ext_links")),
            )
            .map(str::to_string),
        }
    }

    /// Whether every field still holds its placeholder
    pub fn is_unknown(&self) -> bool {
        *self == Self::default()
    }
}

fn non_empty(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}
