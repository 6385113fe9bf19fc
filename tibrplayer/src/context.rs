//! Application context
//!
//! One [`AppContext`] per running panel. It owns the metadata service and
//! the player, and hands them to the presentation layer explicitly.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info};

use tibrapi::{sort_for_menu, AzuraCastApi, Station, TrackInfo};

use crate::error::PlayerError;
use crate::pipeline::{MediaPipeline, PipelineEvent};
use crate::player::RadioPlayer;

/// What the panel UI implements to follow the player
///
/// Every method has an empty default so adapters only override what they
/// render.
pub trait PresentationAdapter: Send + Sync + 'static {
    /// Playback stopped on a fatal error
    fn on_error(&self) {}

    fn on_metadata_changed(&self, _track: TrackInfo) {}

    fn show_notification(&self, _message: &str) {}

    /// The player stayed stopped long enough to reset the panel
    fn on_idle_reset(&self) {}
}

pub struct AppContext {
    api: Arc<AzuraCastApi>,
    player: RadioPlayer,
    shut_down: bool,
}

impl AppContext {
    /// Build the context against the public API
    ///
    /// `events` is the pipeline's event stream, pumped into the player.
    pub fn start<P>(
        pipeline: P,
        events: UnboundedReceiver<PipelineEvent>,
    ) -> Result<Self, PlayerError>
    where
        P: MediaPipeline + 'static,
    {
        let api = AzuraCastApi::new()?;
        Ok(Self::with_api(pipeline, events, api))
    }

    /// Build the context over a preconfigured metadata service
    pub fn with_api<P>(
        pipeline: P,
        events: UnboundedReceiver<PipelineEvent>,
        api: AzuraCastApi,
    ) -> Self
    where
        P: MediaPipeline + 'static,
    {
        let api = Arc::new(api);
        api.start_janitor();

        let player = RadioPlayer::new(pipeline, Arc::clone(&api));
        player.spawn_event_pump(events);

        info!("Application context started");
        Self {
            api,
            player,
            shut_down: false,
        }
    }

    pub fn api(&self) -> &Arc<AzuraCastApi> {
        &self.api
    }

    pub fn player(&self) -> &RadioPlayer {
        &self.player
    }

    /// Route the player's callbacks to `adapter`
    pub fn attach(&self, adapter: Arc<dyn PresentationAdapter>) {
        let target = Arc::clone(&adapter);
        self.player.set_on_error(move || target.on_error());

        let target = Arc::clone(&adapter);
        self.player
            .set_on_metadata_changed(move |track| target.on_metadata_changed(track));

        let target = Arc::clone(&adapter);
        self.player
            .set_on_notification(move |message| target.show_notification(message));

        self.player.set_on_idle_reset(move || adapter.on_idle_reset());
    }

    /// Prefetch the directory and select the first channel
    pub async fn warm_up(&self) -> Option<Station> {
        self.api.prefetch().await;
        self.player.initialize_first_channel().await
    }

    /// Stations in menu order
    pub async fn menu_channels(&self) -> Vec<Station> {
        sort_for_menu(&self.api.get_channels().await)
    }

    /// Drop possibly stale state after a reconnect and reload the directory
    pub async fn on_network_available(&self) -> Vec<Station> {
        info!("Network available, reloading channels");
        self.api.clear_caches();
        self.menu_channels().await
    }

    /// Release the player and the metadata service; safe to call twice
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.player.cleanup();
        self.api.destroy();
        self.shut_down = true;
        debug!("Application context shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }
}

impl Drop for AppContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}
