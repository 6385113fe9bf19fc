//! Media pipeline seam
//!
//! The audio backend (a GStreamer playbin in the desktop shell) is external:
//! the player only sends it commands through [`MediaPipeline`] and reacts to
//! the [`PipelineEvent`]s it publishes on a [`PipelineEventBus`]. Tests
//! drive the player with synthetic events on the same bus.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Target state of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Idle, stream released
    Null,
    Paused,
    Playing,
}

/// Messages published by the pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    StreamStart,
    /// Fill level of the network buffer, 0..=100
    Buffering(u8),
    ClockLost,
    /// Latency changed and must be recalculated
    Latency,
    EndOfStream,
    Error {
        message: String,
        debug: Option<String>,
    },
}

/// Command sink of the audio backend
pub trait MediaPipeline: Send {
    fn set_uri(&mut self, uri: &str);
    /// Linear volume, 0.0..=1.0
    fn set_volume(&mut self, volume: f64);
    fn set_mute(&mut self, mute: bool);
    fn set_state(&mut self, state: PipelineState);
    fn recalculate_latency(&mut self);
}

impl<P: MediaPipeline + ?Sized> MediaPipeline for Box<P> {
    fn set_uri(&mut self, uri: &str) {
        (**self).set_uri(uri)
    }

    fn set_volume(&mut self, volume: f64) {
        (**self).set_volume(volume)
    }

    fn set_mute(&mut self, mute: bool) {
        (**self).set_mute(mute)
    }

    fn set_state(&mut self, state: PipelineState) {
        (**self).set_state(state)
    }

    fn recalculate_latency(&mut self) {
        (**self).recalculate_latency()
    }
}

/// Fan-out of pipeline events to any number of subscribers
#[derive(Clone, Default)]
pub struct PipelineEventBus {
    subscribers: Arc<Mutex<Vec<UnboundedSender<PipelineEvent>>>>,
}

impl PipelineEventBus {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn subscribe(&self) -> UnboundedReceiver<PipelineEvent> {
        let (tx, rx) = unbounded_channel::<PipelineEvent>();
        {
            let mut subscribers = self
                .subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            subscribers.push(tx);
        }
        rx
    }

    /// Deliver `event` to every live subscriber, dropping closed ones
    pub fn publish(&self, event: PipelineEvent) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
