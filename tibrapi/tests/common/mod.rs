//! Scripted transport shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tibrapi::{Error, HttpClient, Result, Transport};

pub const BASE_URL: &str = "http://azura.test/api";

/// Answers GETs from a route table after a fixed latency and counts
/// physical calls per endpoint
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, Result<String>>>,
    calls: Mutex<HashMap<String, usize>>,
    total: AtomicUsize,
    latency: Mutex<Duration>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
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

    pub fn client(self: &Arc<Self>) -> HttpClient {
        HttpClient::new(self.clone(), BASE_URL)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
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
        {"id": 1, "name": "Main", "shortcode": "main", "mounts": [
            {"url": "http://x/main", "is_default": true},
            {"url": "http://x/alt", "is_default": false}
        ]},
        {"id": 2, "name": "Chill", "shortcode": "chill"}
    ])
    .to_string()
}

pub fn now_playing_body(title: &str) -> String {
    serde_json::json!({
        "now_playing": {"song": {"title": title, "artist": "Artist", "album": "Album"}}
    })
    .to_string()
}
