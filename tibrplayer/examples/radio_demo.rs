//! Example: Drive the player against the live API with a logging pipeline
//!
//! Run with: cargo run -p tibrplayer --example radio_demo
//!
//! No audio is produced; the pipeline just logs what it is told. Press
//! Ctrl+C to stop early.

use std::sync::Arc;
use std::time::Duration;

use tibrapi::constants::CLIENT_NAME;
use tibrapi::TrackInfo;
use tibrplayer::{
    AppContext, MediaPipeline, PipelineEvent, PipelineEventBus, PipelineState,
    PresentationAdapter,
};
use tracing::info;

struct LoggingPipeline;

impl LoggingPipeline {
    fn new() -> Self {
        // A PulseAudio sink would carry this as its client name
        info!(client = CLIENT_NAME, "pipeline: ready");
        LoggingPipeline
    }
}

impl MediaPipeline for LoggingPipeline {
    fn set_uri(&mut self, uri: &str) {
        info!(%uri, "pipeline: set uri");
    }

    fn set_volume(&mut self, volume: f64) {
        info!(volume, "pipeline: set volume");
    }

    fn set_mute(&mut self, mute: bool) {
        info!(mute, "pipeline: set mute");
    }

    fn set_state(&mut self, state: PipelineState) {
        info!(?state, "pipeline: set state");
    }

    fn recalculate_latency(&mut self) {
        info!("pipeline: recalculate latency");
    }
}

struct ConsolePanel;

impl PresentationAdapter for ConsolePanel {
    fn on_metadata_changed(&self, track: TrackInfo) {
        println!("Now playing: {} - {} [{}]", track.artist, track.title, track.album);
    }

    fn show_notification(&self, message: &str) {
        println!("!! {}", message);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let bus = PipelineEventBus::new();
    let mut context = AppContext::start(LoggingPipeline::new(), bus.subscribe())?;
    context.attach(Arc::new(ConsolePanel));

    println!("Channels:");
    for station in context.menu_channels().await {
        println!("  {} ({})", station.display_name(), station.shortcode);
    }

    let Some(station) = context.warm_up().await else {
        println!("No channels available");
        return Ok(());
    };
    println!("\nTuning in to {}\n", station.display_name());

    context.player().play();
    // A real backend reports this once the stream is flowing
    bus.publish(PipelineEvent::StreamStart);

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(65)) => {}
        _ = tokio::signal::ctrl_c() => println!("\nInterrupted"),
    }

    context.player().stop();
    context.shutdown();
    Ok(())
}
