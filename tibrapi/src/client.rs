//! HTTP client for the AzuraCast API
//!
//! `HttpClient` issues GET requests against a base URL and collapses
//! concurrent identical requests: while a request for an endpoint is in
//! flight, later callers receive the same shared outcome instead of
//! triggering a second network call. Once a request completes, its entry
//! stays in the in-flight table for a short debounce window (1 second) so
//! that bursts of near-simultaneous callers still attach to the finished
//! result.
//!
//! The client never caches response bodies; that is the job of the layer
//! above it (see [`crate::service::AzuraCastApi`]).
//!
//! # Example
//!
//! ```no_run
//! use tibrapi::HttpClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = HttpClient::builder().build()?;
//!     let body = client.get("/stations").await?;
//!     println!("{} bytes", body.len());
//!     Ok(())
//! }
//! ```

use crate::constants::{
    request_debounce, request_timeout, API_BASE_URL, MAX_CONNS_PER_HOST, USER_AGENT,
};
use crate::error::{Error, Result};
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{debug, warn};
use url::Url;

// ============================================================================
// Transport
// ============================================================================

/// The raw GET primitive used by [`HttpClient`]
///
/// Implementations return the body of a successful response and map
/// failures to [`Error::Network`] (non-success status) or
/// [`Error::Transport`] (connection, timeout).
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get_text(&self, url: &str) -> Result<String>;
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Network {
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }
}

// ============================================================================
// In-flight table
// ============================================================================

type SharedResponse = Shared<BoxFuture<'static, Result<String>>>;

struct InFlight {
    outcome: SharedResponse,
    generation: u64,
    started_at: Instant,
    request: AbortHandle,
    release: Option<AbortHandle>,
}

impl InFlight {
    fn is_resolved(&self) -> bool {
        self.outcome.peek().is_some()
    }

    fn cancel_release(&mut self) {
        if let Some(release) = self.release.take() {
            release.abort();
        }
    }
}

#[derive(Default)]
struct InFlightTable {
    entries: HashMap<String, InFlight>,
    next_generation: u64,
}

fn lock(table: &Mutex<InFlightTable>) -> MutexGuard<'_, InFlightTable> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// HttpClient
// ============================================================================

/// Deduplicating GET client bound to one API base URL
///
/// Cloning is cheap and clones share the in-flight table.
#[derive(Clone)]
pub struct HttpClient {
    transport: Arc<dyn Transport>,
    base_url: String,
    debounce: Duration,
    in_flight: Arc<Mutex<InFlightTable>>,
}

impl HttpClient {
    /// Client over a custom transport, with the standard debounce window
    pub fn new(transport: Arc<dyn Transport>, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            debounce: request_debounce(),
            in_flight: Arc::new(Mutex::new(InFlightTable::default())),
        }
    }

    /// Create a builder for a reqwest-backed client
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Override the delay between completion and release of an entry
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `base_url + endpoint` and return the body text
    ///
    /// Concurrent calls for the same endpoint share one request and observe
    /// the same outcome.
    pub async fn get(&self, endpoint: &str) -> Result<String> {
        self.request(endpoint).await
    }

    fn request(&self, endpoint: &str) -> SharedResponse {
        let mut table = lock(&self.in_flight);

        if let Some(entry) = table.entries.get(endpoint) {
            debug!(endpoint, resolved = entry.is_resolved(), "Joining in-flight request");
            return entry.outcome.clone();
        }

        table.next_generation += 1;
        let generation = table.next_generation;

        let url = format!("{}{}", self.base_url, endpoint);
        let transport = Arc::clone(&self.transport);
        let weak_table = Arc::downgrade(&self.in_flight);
        let key = endpoint.to_string();
        let debounce = self.debounce;

        debug!(endpoint, %url, "Issuing request");

        // The request runs on its own task so it completes even if every
        // caller goes away; callers only hold the shared outcome.
        let task = tokio::spawn(async move {
            let result = transport.get_text(&url).await;
            match &result {
                Ok(body) => debug!(%url, bytes = body.len(), "Request completed"),
                Err(err) => warn!(%url, "Request failed: {err}"),
            }
            schedule_release(weak_table, key, generation, debounce);
            result
        });

        let request = task.abort_handle();
        let outcome = async move {
            match task.await {
                Ok(result) => result,
                Err(err) if err.is_cancelled() => {
                    Err(Error::Transport("request cancelled".into()))
                }
                Err(err) => Err(Error::Transport(format!("request task failed: {err}"))),
            }
        }
        .boxed()
        .shared();

        table.entries.insert(
            endpoint.to_string(),
            InFlight {
                outcome: outcome.clone(),
                generation,
                started_at: Instant::now(),
                request,
                release: None,
            },
        );

        outcome
    }

    /// Number of entries in the in-flight table
    pub fn in_flight_len(&self) -> usize {
        lock(&self.in_flight).entries.len()
    }

    /// Drop resolved entries older than twice the debounce window
    ///
    /// Entries whose request is still running are kept, so the sweep never
    /// lets a second request for an endpoint start. [`Self::clear`] is the
    /// one operation that can.
    pub fn sweep_stale(&self) -> usize {
        let now = Instant::now();
        let max_age = self.debounce * 2;
        let mut table = lock(&self.in_flight);
        let before = table.entries.len();

        table.entries.retain(|endpoint, entry| {
            let stale =
                entry.is_resolved() && now.saturating_duration_since(entry.started_at) > max_age;
            if stale {
                debug!(endpoint, "Sweeping stale in-flight entry");
                entry.cancel_release();
            }
            !stale
        });

        before - table.entries.len()
    }

    /// Forget every in-flight entry
    ///
    /// Running requests are left to finish for the callers already waiting
    /// on them; the next call for the same endpoint issues a new request
    /// even while the old one is still outstanding.
    pub fn clear(&self) {
        let mut table = lock(&self.in_flight);
        for entry in table.entries.values_mut() {
            entry.cancel_release();
        }
        table.entries.clear();
    }

    /// Abort running requests and forget every entry
    ///
    /// Callers still waiting receive [`Error::Transport`].
    pub fn shutdown(&self) {
        let mut table = lock(&self.in_flight);
        for (_, mut entry) in table.entries.drain() {
            entry.cancel_release();
            entry.request.abort();
        }
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .field("debounce", &self.debounce)
            .field("in_flight", &self.in_flight_len())
            .finish()
    }
}

/// Remove the entry for `key` once the debounce window has elapsed
///
/// The generation check keeps a late timer from removing an entry created
/// after `clear()` or after an earlier release.
fn schedule_release(
    table: Weak<Mutex<InFlightTable>>,
    key: String,
    generation: u64,
    delay: Duration,
) {
    let Some(strong) = table.upgrade() else {
        return;
    };

    let timer_key = key.clone();
    let timer = tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let Some(table) = table.upgrade() else {
            return;
        };
        let mut table = lock(&table);
        if table
            .entries
            .get(&timer_key)
            .is_some_and(|entry| entry.generation == generation)
        {
            table.entries.remove(&timer_key);
            debug!(endpoint = %timer_key, "Released in-flight entry");
        }
    });

    let mut table = lock(&strong);
    match table.entries.get_mut(&key) {
        Some(entry) if entry.generation == generation => {
            entry.cancel_release();
            entry.release = Some(timer.abort_handle());
        }
        _ => timer.abort(),
    }
}

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for a reqwest-backed [`HttpClient`]
#[derive(Debug)]
pub struct ClientBuilder {
    client: Option<reqwest::Client>,
    base_url: String,
    timeout: Duration,
    user_agent: String,
    max_conns_per_host: usize,
    debounce: Duration,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            client: None,
            base_url: API_BASE_URL.to_string(),
            timeout: request_timeout(),
            user_agent: USER_AGENT.to_string(),
            max_conns_per_host: MAX_CONNS_PER_HOST,
            debounce: request_debounce(),
        }
    }
}

impl ClientBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a custom reqwest client
    ///
    /// Timeout, user agent and pool settings are then taken from that client.
    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the API base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set a custom User-Agent header
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the debounce window of the in-flight table
    pub fn debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Build the client
    pub fn build(self) -> Result<HttpClient> {
        Url::parse(&self.base_url)?;

        let client = match self.client {
            Some(client) => client,
            None => reqwest::Client::builder()
                .user_agent(&self.user_agent)
                .timeout(self.timeout)
                .pool_max_idle_per_host(self.max_conns_per_host)
                .build()
                .map_err(|e| Error::other(format!("Cannot build HTTP client: {e}")))?,
        };

        Ok(HttpClient::new(Arc::new(ReqwestTransport::new(client)), self.base_url)
            .with_debounce(self.debounce))
    }
}
