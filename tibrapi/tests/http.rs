//! Integration tests for tibrapi against a mock AzuraCast server

use serde_json::json;
use std::time::Duration;
use tibrapi::constants::USER_AGENT;
use tibrapi::{AzuraCastApi, Error, HttpClient};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Create a mock `/stations` response
fn mock_stations_json() -> serde_json::Value {
    json!([
        {
            "id": 1,
            "name": "The Indie Beat",
            "shortcode": "main",
            "url": "https://theindiebeat.fm",
            "listen_url": "https://azura.example/listen/main/radio.mp3",
            "art": "https://azura.example/art/main.png",
            "mounts": [
                {"url": "https://azura.example/listen/main/radio.mp3", "is_default": true},
                {"url": "https://azura.example/listen/main/low.mp3", "is_default": false}
            ]
        },
        {
            "id": 2,
            "name": "Fediverse Rock",
            "shortcode": "rock",
            "mounts": []
        }
    ])
}

/// Create a mock `/nowplaying/{shortcode}` response
fn mock_now_playing_json() -> serde_json::Value {
    json!({
        "station": {"shortcode": "main"},
        "now_playing": {
            "elapsed": 42,
            "song": {
                "title": "Paper Boats",
                "artist": "Small Harbour",
                "album": "Tidewater",
                "art": "https://azura.example/art/song.jpg",
                "custom_fields": {"ext_links": "https://small-harbour.example"}
            }
        }
    })
}

fn client_for(server: &MockServer) -> HttpClient {
    HttpClient::builder()
        .base_url(format!("{}/api", server.uri()))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_get_returns_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/stations"))
        .and(header("user-agent", USER_AGENT))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_stations_json()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let body = client.get("/stations").await.unwrap();

    let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(parsed, mock_stations_json());
}

#[tokio::test]
async fn test_non_success_status_is_network_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/nowplaying/ghost"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let err = client.get("/nowplaying/ghost").await.unwrap_err();

    assert_eq!(err, Error::Network { status: 404 });
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn test_connection_failure_is_transport_error() {
    // Nothing listens on the discard port
    let client = HttpClient::builder()
        .base_url("http://127.0.0.1:9/api")
        .timeout(Duration::from_secs(2))
        .build()
        .unwrap();

    let err = client.get("/stations").await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)), "got {err:?}");
}

#[tokio::test]
async fn test_timeout_is_transport_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/stations"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&mock_server)
        .await;

    let client = HttpClient::builder()
        .base_url(format!("{}/api", mock_server.uri()))
        .timeout(Duration::from_millis(100))
        .build()
        .unwrap();

    let err = client.get("/stations").await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)), "got {err:?}");
}

#[tokio::test]
async fn test_concurrent_requests_hit_server_once() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/nowplaying/main"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(mock_now_playing_json())
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let (a, b, c) = tokio::join!(
        client.get("/nowplaying/main"),
        client.get("/nowplaying/main"),
        client.get("/nowplaying/main"),
    );

    let a = a.unwrap();
    assert_eq!(a, b.unwrap());
    assert_eq!(a, c.unwrap());
}

#[tokio::test]
async fn test_service_caches_station_list() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/stations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_stations_json()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let api = AzuraCastApi::with_client(client_for(&mock_server));

    let first = api.get_channels().await;
    let second = api.get_channels().await;

    assert_eq!(first.len(), 2);
    assert_eq!(first, second);
    assert_eq!(
        first[0].resolved_stream_url(),
        "https://azura.example/listen/main/radio.mp3"
    );
    assert_eq!(first[1].mounts.len(), 0);
    assert_eq!(first[1].art, None);
}

#[tokio::test]
async fn test_service_parses_now_playing() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/nowplaying/main"))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_now_playing_json()))
        .mount(&mock_server)
        .await;

    let api = AzuraCastApi::with_client(client_for(&mock_server));
    let payload = api.get_now_playing("main").await;
    let track = AzuraCastApi::parse_track_info(payload.as_ref());

    assert_eq!(track.title, "Paper Boats");
    assert_eq!(track.artist, "Small Harbour");
    assert_eq!(track.album, "Tidewater");
    assert_eq!(track.external_link.as_deref(), Some("https://small-harbour.example"));
}

#[tokio::test]
async fn test_service_absorbs_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/stations"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/nowplaying/main"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&mock_server)
        .await;

    let api = AzuraCastApi::with_client(client_for(&mock_server));

    assert!(api.get_channels().await.is_empty());
    assert!(api.get_now_playing("main").await.is_none());
    assert_eq!(api.cache_stats(), (0, 0));
}
