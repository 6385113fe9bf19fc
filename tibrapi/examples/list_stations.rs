//! Example: List The Indie Beat Radio stations with what is playing
//!
//! Run with: cargo run -p tibrapi --example list_stations

use tibrapi::{sort_for_menu, AzuraCastApi};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    println!("Fetching The Indie Beat Radio stations...\n");

    let api = AzuraCastApi::new()?;
    let stations = sort_for_menu(&api.get_channels().await);

    if stations.is_empty() {
        println!("No channels available");
        return Ok(());
    }

    println!("Found {} stations:\n", stations.len());

    for station in &stations {
        let payload = api.get_now_playing(&station.shortcode).await;
        let track = AzuraCastApi::parse_track_info(payload.as_ref());

        println!("  {} ({})", station.display_name(), station.shortcode);
        println!("    Stream: {}", station.resolved_stream_url());
        println!("    Now:    {} - {} [{}]", track.artist, track.title, track.album);
        if let Some(link) = &track.external_link {
            println!("    Link:   {}", link);
        }
    }

    let (lists, entries) = api.cache_stats();
    println!("\nCache: {} station list, {} now-playing entries", lists, entries);

    api.destroy();
    Ok(())
}
