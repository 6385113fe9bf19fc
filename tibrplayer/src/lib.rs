//! Playback coordination for The Indie Beat Radio panel
//!
//! The player sits between the audio backend and the panel UI:
//!
//! - [`RadioPlayer`] drives a [`MediaPipeline`] and polls now-playing
//!   metadata while a stream plays
//! - [`PipelineEvent`]s from the backend are turned into self-healing
//!   commands or user-facing errors
//! - [`AppContext`] owns the player and the [`tibrapi::AzuraCastApi`] for the
//!   lifetime of the panel
//!
//! # Example
//!
//! ```no_run
//! use tibrplayer::{AppContext, MediaPipeline, PipelineEventBus, PipelineState};
//!
//! struct NullPipeline;
//!
//! impl MediaPipeline for NullPipeline {
//!     fn set_uri(&mut self, _uri: &str) {}
//!     fn set_volume(&mut self, _volume: f64) {}
//!     fn set_mute(&mut self, _mute: bool) {}
//!     fn set_state(&mut self, _state: PipelineState) {}
//!     fn recalculate_latency(&mut self) {}
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bus = PipelineEventBus::new();
//!     let mut context = AppContext::start(NullPipeline, bus.subscribe())?;
//!
//!     if context.warm_up().await.is_some() {
//!         context.player().play();
//!     }
//!
//!     context.shutdown();
//!     Ok(())
//! }
//! ```

pub mod context;
pub mod error;
pub mod idle;
pub mod pipeline;
pub mod player;

pub use context::{AppContext, PresentationAdapter};
pub use error::PlayerError;
pub use idle::IdleReset;
pub use pipeline::{MediaPipeline, PipelineEvent, PipelineEventBus, PipelineState};
pub use player::{stream_uri, PlaybackSession, PlayerState, RadioPlayer};
