//! Playback coordinator
//!
//! [`RadioPlayer`] owns the media pipeline and drives it through a small
//! state machine:
//!
//! ```text
//!            select_channel            play
//!   Idle ─────────────────▶ Stopped ─────────▶ Playing
//!                             ▲  ▲     stop       │
//!                             │  └────────────────┤
//!                 stop/select │                   │ fatal error / EOS
//!                             └────── Error ◀─────┘
//! ```
//!
//! While `Playing`, a background task polls now-playing metadata: once
//! immediately, then every 30 seconds. Every poll carries the epoch it was
//! started in; stopping or switching channels bumps the epoch and aborts the
//! task, so a poll that was already on the wire is discarded instead of
//! reaching the presentation layer.
//!
//! Pipeline events (buffering, clock loss, errors...) are fed through
//! [`RadioPlayer::handle_event`], either directly or from a channel with
//! [`RadioPlayer::spawn_event_pump`].
//!
//! All methods must be called from within a tokio runtime.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use tibrapi::constants::{metadata_update_interval, DEFAULT_VOLUME, USER_AGENT};
use tibrapi::{AzuraCastApi, Station, TrackInfo};

use crate::error::PlayerError;
use crate::idle::IdleReset;
use crate::pipeline::{MediaPipeline, PipelineEvent, PipelineState};

/// Coordinator state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    /// No channel selected
    Idle,
    /// Channel selected, pipeline at rest
    Stopped,
    /// Pipeline active, metadata poll loop running
    Playing,
    /// The pipeline reported a fatal error; behaves like `Stopped`
    Error,
}

/// Snapshot of the player for the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSession {
    pub state: PlayerState,
    pub station: Option<Station>,
    pub volume: f64,
    pub muted: bool,
}

type Callback = Arc<dyn Fn() + Send + Sync>;
type MetadataCallback = Arc<dyn Fn(TrackInfo) + Send + Sync>;
type NotificationCallback = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Default)]
struct Callbacks {
    on_error: Option<Callback>,
    on_metadata_changed: Option<MetadataCallback>,
    on_notification: Option<NotificationCallback>,
    on_idle_reset: Option<Callback>,
}

struct Inner {
    me: Weak<Mutex<Inner>>,
    api: Option<Arc<AzuraCastApi>>,
    pipeline: Option<Box<dyn MediaPipeline>>,
    state: PlayerState,
    current: Option<Station>,
    volume: f64,
    muted: bool,

    /// Bumped every time polling stops; polls from older epochs are dropped
    epoch: u64,
    poll: Option<JoinHandle<()>>,
    /// One-shot refresh triggered by a stream restart
    refresh: Option<JoinHandle<()>>,
    /// The next stream start is covered by the poll loop's first tick
    stream_start_pending: bool,

    idle: IdleReset,
    pump: Option<JoinHandle<()>>,
    callbacks: Callbacks,
    released: bool,
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Append the client identification to a stream URL
pub fn stream_uri(base: &str) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}ua={}", urlencoding::encode(USER_AGENT))
}

impl Inner {
    fn command(&mut self, f: impl FnOnce(&mut dyn MediaPipeline)) {
        if let Some(pipeline) = self.pipeline.as_mut() {
            f(pipeline.as_mut());
        }
    }

    fn halt_polling(&mut self) {
        self.epoch += 1;
        self.stream_start_pending = false;
        if let Some(poll) = self.poll.take() {
            poll.abort();
        }
        if let Some(refresh) = self.refresh.take() {
            refresh.abort();
        }
    }

    /// Pipeline to rest, polling cancelled
    fn stop_playback(&mut self) {
        self.command(|p| p.set_state(PipelineState::Null));
        self.halt_polling();
        self.state = if self.current.is_some() {
            PlayerState::Stopped
        } else {
            PlayerState::Idle
        };
    }

    fn select(&mut self, station: Station) {
        self.stop_playback();

        let uri = stream_uri(&station.resolved_stream_url());
        debug!(station = %station.shortcode, %uri, "Setting stream URI");
        self.command(|p| p.set_uri(&uri));

        info!(station = %station.shortcode, "Selected channel {}", station.display_name());
        self.current = Some(station);
        self.state = PlayerState::Stopped;
    }

    fn start_polling(&mut self, shortcode: String) {
        let Some(api) = self.api.clone() else {
            return;
        };
        let weak = self.me.clone();
        let epoch = self.epoch;

        self.poll = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(metadata_update_interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                // First tick completes immediately
                ticker.tick().await;
                if !refresh_metadata(&weak, epoch, &api, &shortcode).await {
                    break;
                }
            }
        }));
    }

    fn spawn_refresh(&mut self) {
        let (Some(api), Some(station)) = (self.api.clone(), self.current.as_ref()) else {
            return;
        };
        let shortcode = station.shortcode.clone();
        let weak = self.me.clone();
        let epoch = self.epoch;

        let task = tokio::spawn(async move {
            refresh_metadata(&weak, epoch, &api, &shortcode).await;
        });
        if let Some(previous) = self.refresh.replace(task) {
            previous.abort();
        }
    }

    fn arm_idle(&mut self) {
        let weak = self.me.clone();
        self.idle.arm(move || on_idle_expired(weak));
    }
}

/// Fetch now playing and dispatch it if the poll is still current
///
/// Returns false once the epoch is over.
async fn refresh_metadata(
    weak: &Weak<Mutex<Inner>>,
    epoch: u64,
    api: &AzuraCastApi,
    shortcode: &str,
) -> bool {
    let payload = api.get_now_playing(shortcode).await;

    let Some(inner) = weak.upgrade() else {
        return false;
    };
    let callback = {
        let guard = lock(&inner);
        if guard.epoch != epoch || guard.state != PlayerState::Playing {
            debug!(station = shortcode, epoch, "Discarding stale now playing");
            return false;
        }
        guard.callbacks.on_metadata_changed.clone()
    };

    match payload {
        Some(payload) => {
            let track = AzuraCastApi::parse_track_info(Some(&payload));
            debug!(station = shortcode, title = %track.title, "Now playing updated");
            if let Some(callback) = callback {
                callback(track);
            }
        }
        None => warn!(station = shortcode, "No now playing data, skipping update"),
    }
    true
}

fn on_idle_expired(weak: Weak<Mutex<Inner>>) {
    let Some(inner) = weak.upgrade() else {
        return;
    };
    let callback = {
        let mut guard = lock(&inner);
        if guard.released {
            return;
        }
        if guard.state == PlayerState::Playing {
            guard.arm_idle();
            return;
        }
        guard.callbacks.on_idle_reset.clone()
    };

    info!("Player idle, resetting presentation");
    if let Some(callback) = callback {
        callback();
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.halt_polling();
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

/// Radio playback coordinator
///
/// Cheap to clone; clones share the same player.
#[derive(Clone)]
pub struct RadioPlayer {
    inner: Arc<Mutex<Inner>>,
}

impl RadioPlayer {
    /// Take ownership of `pipeline` and apply the default volume
    pub fn new<P>(pipeline: P, api: Arc<AzuraCastApi>) -> Self
    where
        P: MediaPipeline + 'static,
    {
        let mut pipeline: Box<dyn MediaPipeline> = Box::new(pipeline);
        pipeline.set_volume(DEFAULT_VOLUME);

        let inner = Arc::new_cyclic(|me| {
            Mutex::new(Inner {
                me: me.clone(),
                api: Some(api),
                pipeline: Some(pipeline),
                state: PlayerState::Idle,
                current: None,
                volume: DEFAULT_VOLUME,
                muted: false,
                epoch: 0,
                poll: None,
                refresh: None,
                stream_start_pending: false,
                idle: IdleReset::default(),
                pump: None,
                callbacks: Callbacks::default(),
                released: false,
            })
        });

        Self { inner }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        lock(&self.inner)
    }

    // ========================================================================
    // Callbacks
    // ========================================================================

    /// Called once per fatal pipeline error
    pub fn set_on_error<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.lock().callbacks.on_error = Some(Arc::new(callback));
    }

    pub fn set_on_metadata_changed<F>(&self, callback: F)
    where
        F: Fn(TrackInfo) + Send + Sync + 'static,
    {
        self.lock().callbacks.on_metadata_changed = Some(Arc::new(callback));
    }

    /// Sink for user-facing error messages
    pub fn set_on_notification<F>(&self, callback: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.lock().callbacks.on_notification = Some(Arc::new(callback));
    }

    /// Called when the player stayed stopped for the inactivity timeout
    pub fn set_on_idle_reset<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.lock().callbacks.on_idle_reset = Some(Arc::new(callback));
    }

    // ========================================================================
    // Transport controls
    // ========================================================================

    /// Stop playback and point the pipeline at `station`
    ///
    /// Does not resume playback.
    pub fn select_channel(&self, station: Station) {
        let mut inner = self.lock();
        if inner.released {
            warn!(station = %station.shortcode, "Player released, ignoring channel selection");
            return;
        }
        inner.select(station);
    }

    /// Start playback of the current channel; no-op without one
    pub fn play(&self) {
        let mut inner = self.lock();
        if inner.released {
            return;
        }
        let Some(shortcode) = inner.current.as_ref().map(|s| s.shortcode.clone()) else {
            debug!("No channel selected, ignoring play");
            return;
        };

        inner.idle.cancel();
        inner.halt_polling();
        inner.command(|p| p.set_state(PipelineState::Playing));
        inner.state = PlayerState::Playing;
        inner.stream_start_pending = true;

        info!(station = %shortcode, "Playback started");
        inner.start_polling(shortcode);
    }

    pub fn stop(&self) {
        let mut inner = self.lock();
        if inner.released {
            return;
        }
        inner.stop_playback();
        inner.arm_idle();
        info!(state = ?inner.state, "Playback stopped");
    }

    /// Volume is clamped to `0.0..=1.0`
    pub fn set_volume(&self, volume: f64) {
        let volume = volume.clamp(0.0, 1.0);
        let mut inner = self.lock();
        inner.volume = volume;
        inner.command(|p| p.set_volume(volume));
    }

    /// Mute without touching the volume level
    pub fn set_mute(&self, mute: bool) {
        let mut inner = self.lock();
        inner.muted = mute;
        inner.command(|p| p.set_mute(mute));
    }

    // ========================================================================
    // Pipeline events
    // ========================================================================

    /// React to a message from the pipeline
    pub fn handle_event(&self, event: PipelineEvent) {
        match event {
            PipelineEvent::StreamStart => self.on_stream_start(),
            PipelineEvent::Buffering(percent) => {
                debug!(percent, "Buffering");
                let mut inner = self.lock();
                if percent < 100 {
                    inner.command(|p| p.set_state(PipelineState::Paused));
                } else if inner.state == PlayerState::Playing {
                    inner.command(|p| p.set_state(PipelineState::Playing));
                }
            }
            PipelineEvent::ClockLost => {
                let mut inner = self.lock();
                if inner.state == PlayerState::Playing {
                    debug!("Clock lost, restarting playback");
                    inner.command(|p| {
                        p.set_state(PipelineState::Paused);
                        p.set_state(PipelineState::Playing);
                    });
                }
            }
            PipelineEvent::Latency => {
                debug!("Latency changed, recalculating");
                self.lock().command(|p| p.recalculate_latency());
            }
            PipelineEvent::EndOfStream => self.fail(PlayerError::EndOfStream),
            PipelineEvent::Error { message, debug } => {
                self.fail(PlayerError::Playback { message, debug })
            }
        }
    }

    fn on_stream_start(&self) {
        let mut inner = self.lock();
        if inner.state != PlayerState::Playing {
            debug!(state = ?inner.state, "Stream start while not playing, ignored");
            return;
        }
        if inner.stream_start_pending {
            inner.stream_start_pending = false;
            debug!("Stream started");
            return;
        }
        debug!("Stream restarted, refreshing metadata");
        inner.spawn_refresh();
    }

    fn fail(&self, err: PlayerError) {
        let (notify, on_error) = {
            let mut inner = self.lock();
            if inner.released {
                return;
            }
            match &err {
                PlayerError::Playback {
                    message,
                    debug: details,
                } => error!(?details, "Pipeline error: {message}"),
                other => error!("Pipeline error: {other}"),
            }

            inner.stop_playback();
            // Without a channel there is nothing to recover to
            if inner.current.is_some() {
                inner.state = PlayerState::Error;
                inner.arm_idle();
            }
            (
                inner.callbacks.on_notification.clone(),
                inner.callbacks.on_error.clone(),
            )
        };

        if let Some(notify) = notify {
            notify(&err.notification());
        }
        if let Some(on_error) = on_error {
            on_error();
        }
    }

    /// Feed every event received on `events` to [`Self::handle_event`]
    ///
    /// Replaces a previously started pump.
    pub fn spawn_event_pump(&self, mut events: UnboundedReceiver<PipelineEvent>) {
        let weak = Arc::downgrade(&self.inner);
        let task = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                RadioPlayer { inner }.handle_event(event);
            }
            debug!("Pipeline event stream closed");
        });

        if let Some(previous) = self.lock().pump.replace(task) {
            previous.abort();
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Select the first directory station if no channel is selected yet
    ///
    /// Returns the current channel afterwards.
    pub async fn initialize_first_channel(&self) -> Option<Station> {
        let api = {
            let inner = self.lock();
            if inner.current.is_some() || inner.released {
                return inner.current.clone();
            }
            inner.api.clone()?
        };

        let channels = api.get_channels().await;

        let mut inner = self.lock();
        if inner.current.is_none() && !inner.released {
            match channels.into_iter().next() {
                Some(first) => inner.select(first),
                None => warn!("No channels available"),
            }
        }
        inner.current.clone()
    }

    /// Stop playback and release the metadata service and the pipeline
    ///
    /// Safe to call more than once.
    pub fn cleanup(&self) {
        let mut inner = self.lock();
        if inner.released {
            return;
        }

        inner.stop_playback();
        inner.idle.cancel();
        if let Some(pump) = inner.pump.take() {
            pump.abort();
        }
        if let Some(api) = inner.api.take() {
            api.destroy();
        }
        inner.pipeline = None;
        inner.released = true;
        info!("Player released");
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn is_playing(&self) -> bool {
        self.lock().state == PlayerState::Playing
    }

    pub fn current_channel(&self) -> Option<Station> {
        self.lock().current.clone()
    }

    pub fn state(&self) -> PlayerState {
        self.lock().state
    }

    pub fn volume(&self) -> f64 {
        self.lock().volume
    }

    pub fn is_muted(&self) -> bool {
        self.lock().muted
    }

    /// Whether the inactivity timer is armed
    pub fn idle_pending(&self) -> bool {
        self.lock().idle.is_active()
    }

    pub fn session(&self) -> PlaybackSession {
        let inner = self.lock();
        PlaybackSession {
            state: inner.state,
            station: inner.current.clone(),
            volume: inner.volume,
            muted: inner.muted,
        }
    }
}

impl std::fmt::Debug for RadioPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("RadioPlayer")
            .field("state", &inner.state)
            .field("station", &inner.current.as_ref().map(|s| &s.shortcode))
            .field("volume", &inner.volume)
            .field("muted", &inner.muted)
            .field("released", &inner.released)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_uri_appends_user_agent() {
        assert_eq!(
            stream_uri("https://azura.example/listen/main/radio.mp3"),
            "https://azura.example/listen/main/radio.mp3?ua=TheIndieBeat-GNOME%2F1.0-dev"
        );
    }

    #[test]
    fn test_stream_uri_extends_existing_query() {
        assert_eq!(
            stream_uri("http://x/main?bitrate=128"),
            "http://x/main?bitrate=128&ua=TheIndieBeat-GNOME%2F1.0-dev"
        );
    }
}
