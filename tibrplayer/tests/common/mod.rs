//! Fakes shared by the player integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tibrapi::{AzuraCastApi, Error, HttpClient, Result, Station, Transport};
use tibrplayer::{MediaPipeline, PipelineState};

pub const BASE_URL: &str = "http://azura.test/api";

/// AzuraCast stand-in answering from a route table
#[derive(Default)]
pub struct FakeAzuraCast {
    routes: Mutex<HashMap<String, Result<String>>>,
    calls: Mutex<HashMap<String, usize>>,
    total: AtomicUsize,
    latency: Mutex<Duration>,
}

impl FakeAzuraCast {
    pub fn new() -> Arc<Self> {
        let fake = Arc::new(Self::default());
        fake.route("/stations", stations_body());
        fake.route("/nowplaying/main", now_playing_body("Main Track"));
        fake.route("/nowplaying/chill", now_playing_body("Chill Track"));
        fake
    }

    pub fn route(&self, endpoint: &str, body: impl Into<String>) {
        self.routes
            .lock()
            .unwrap()
            .insert(format!("{BASE_URL}{endpoint}"), Ok(body.into()));
    }

    pub fn fail(&self, endpoint: &str, err: Error) {
        self.routes
            .lock()
            .unwrap()
            .insert(format!("{BASE_URL}{endpoint}"), Err(err));
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = latency;
    }

    pub fn calls(&self, endpoint: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(&format!("{BASE_URL}{endpoint}"))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    pub fn api(self: &Arc<Self>) -> AzuraCastApi {
        AzuraCastApi::with_client(HttpClient::new(self.clone(), BASE_URL))
    }
}

#[async_trait]
impl Transport for FakeAzuraCast {
    async fn get_text(&self, url: &str) -> Result<String> {
        self.total.fetch_add(1, Ordering::SeqCst);
        *self.calls.lock().unwrap().entry(url.to_string()).or_default() += 1;

        let latency = *self.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        self.routes
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or(Err(Error::Network { status: 404 }))
    }
}

pub fn stations_body() -> String {
    serde_json::json!([
        {"id": 2, "name": "Chill", "shortcode": "chill",
         "listen_url": "http://x/chill.mp3?bitrate=128"},
        {"id": 1, "name": "Main", "shortcode": "main", "mounts": [
            {"url": "http://x/main", "is_default": true},
            {"url": "http://x/alt", "is_default": false}
        ]}
    ])
    .to_string()
}

pub fn now_playing_body(title: &str) -> String {
    serde_json::json!({
        "now_playing": {"song": {"title": title, "artist": "Artist", "album": "Album"}}
    })
    .to_string()
}

pub fn main_station() -> Station {
    Station::new(1, "Main", "main").with_listen_url("http://x/main")
}

pub fn chill_station() -> Station {
    Station::new(2, "Chill", "chill").with_listen_url("http://x/chill")
}

/// Commands received by [`RecordingPipeline`]
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Uri(String),
    Volume(f64),
    Mute(bool),
    State(PipelineState),
    RecalculateLatency,
}

/// Pipeline that only records what it is told
#[derive(Clone, Default)]
pub struct RecordingPipeline {
    commands: Arc<Mutex<Vec<Command>>>,
}

impl RecordingPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<Command> {
        self.commands.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.commands.lock().unwrap().clear();
    }

    pub fn last_uri(&self) -> Option<String> {
        self.commands().into_iter().rev().find_map(|c| match c {
            Command::Uri(uri) => Some(uri),
            _ => None,
        })
    }

    pub fn last_state(&self) -> Option<PipelineState> {
        self.commands().into_iter().rev().find_map(|c| match c {
            Command::State(state) => Some(state),
            _ => None,
        })
    }

    fn push(&self, command: Command) {
        self.commands.lock().unwrap().push(command);
    }
}

impl MediaPipeline for RecordingPipeline {
    fn set_uri(&mut self, uri: &str) {
        self.push(Command::Uri(uri.to_string()));
    }

    fn set_volume(&mut self, volume: f64) {
        self.push(Command::Volume(volume));
    }

    fn set_mute(&mut self, mute: bool) {
        self.push(Command::Mute(mute));
    }

    fn set_state(&mut self, state: PipelineState) {
        self.push(Command::State(state));
    }

    fn recalculate_latency(&mut self) {
        self.push(Command::RecalculateLatency);
    }
}

/// Counts callback invocations and keeps the last payload
#[derive(Clone, Default)]
pub struct Recorder<T> {
    seen: Arc<Mutex<Vec<T>>>,
}

impl<T: Clone> Recorder<T> {
    pub fn new() -> Self {
        Self {
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn record(&self, value: T) {
        self.seen.lock().unwrap().push(value);
    }

    pub fn count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn all(&self) -> Vec<T> {
        self.seen.lock().unwrap().clone()
    }
}
