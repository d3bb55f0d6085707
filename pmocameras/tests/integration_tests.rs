//! Integration tests for pmocameras against mock HTTP cameras

use pmocameras::{
    CameraClient, ConfigStatus, Error, HttpConfigSource, PollerManager, MAX_POLLED_CAMERAS,
};
use serde_json::json;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const JPEG_MAGIC: [u8; 4] = [0xFF, 0xD8, 0xFF, 0xE0];

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("pmocameras=debug")
        .with_test_writer()
        .try_init();
}

async fn mount_config(server: &MockServer, config: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/cameras"))
        .respond_with(ResponseTemplate::new(200).set_body_json(config))
        .mount(server)
        .await;
}

async fn mount_image(server: &MockServer, route: &str, media_type: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(JPEG_MAGIC.to_vec(), media_type))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_fetch_image_keeps_declared_media_type() {
    let server = MockServer::start().await;
    mount_image(&server, "/snap.png", "image/png").await;

    let client = CameraClient::new().unwrap();
    let image = client
        .fetch_image(&format!("{}/snap.png", server.uri()))
        .await
        .unwrap();

    assert_eq!(image.media_type(), "image/png");
    assert_eq!(&image.data()[..], &JPEG_MAGIC[..]);
    assert!(image.data_url().starts_with("data:image/png;base64,"));
}

#[tokio::test]
async fn test_fetch_image_without_content_type_is_jpeg() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/snap"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(JPEG_MAGIC.to_vec()))
        .mount(&server)
        .await;

    let client = CameraClient::new().unwrap();
    let image = client
        .fetch_image(&format!("{}/snap", server.uri()))
        .await
        .unwrap();

    assert_eq!(image.media_type(), "image/jpeg");
    assert_eq!(image.len(), 4);
}

#[tokio::test]
async fn test_fetch_image_non_success_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/snap"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = CameraClient::new().unwrap();
    let err = client
        .fetch_image(&format!("{}/snap", server.uri()))
        .await
        .unwrap_err();

    match err {
        Error::Status { status, .. } => assert_eq!(status.as_u16(), 503),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_fetch_polling_config_shapes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pascal"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "DefaultIntervalMs": 750,
            "Cameras": [ { "Name": "porch", "Url": "http://porch", "IntervalMs": 100 } ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/null"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{ not json"))
        .mount(&server)
        .await;

    let client = CameraClient::new().unwrap();

    let config = client
        .fetch_polling_config(&format!("{}/pascal", server.uri()))
        .await
        .unwrap();
    assert_eq!(config.default_interval_ms, 750);
    assert_eq!(config.cameras[0].interval_ms, Some(100));

    let config = client
        .fetch_polling_config(&format!("{}/null", server.uri()))
        .await
        .unwrap();
    assert!(config.cameras.is_empty());
    assert_eq!(config.default_interval_ms, 2000);

    let err = client
        .fetch_polling_config(&format!("{}/broken", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Json(_)));
}

#[tokio::test]
async fn test_poller_delivers_images_from_http_config() {
    init_tracing();
    let server = MockServer::start().await;
    mount_config(
        &server,
        json!({
            "defaultIntervalMs": 2000,
            "cameras": [
                { "name": "porch", "url": format!("{}/porch.jpg", server.uri()), "intervalMs": 50 },
                { "name": "yard", "url": format!("{}/yard.png", server.uri()), "intervalMs": 50 }
            ]
        }),
    )
    .await;
    mount_image(&server, "/porch.jpg", "image/jpeg").await;
    mount_image(&server, "/yard.png", "image/png").await;

    let client = CameraClient::new().unwrap();
    let poller = PollerManager::with_client(client.clone());
    let mut rx = poller.subscribe(64);

    let report = poller
        .start(
            &HttpConfigSource::new(client, &server.uri()),
            &CancellationToken::new(),
        )
        .await;
    assert_eq!(report.cameras, 2);

    let mut seen_porch = false;
    let mut seen_yard = false;
    while !(seen_porch && seen_yard) {
        let event = timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no image within 5s")
            .unwrap();
        match event.camera_name.as_str() {
            "porch" => {
                assert_eq!(event.payload.media_type(), "image/jpeg");
                seen_porch = true;
            }
            "yard" => {
                assert_eq!(event.payload.media_type(), "image/png");
                seen_yard = true;
            }
            other => panic!("unexpected camera {other}"),
        }
    }

    poller.shutdown().await;
}

#[tokio::test]
async fn test_failed_tick_is_followed_by_success() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gate.jpg"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_image(&server, "/gate.jpg", "image/jpeg").await;
    mount_config(
        &server,
        json!({ "cameras": [ { "name": "gate", "url": format!("{}/gate.jpg", server.uri()), "intervalMs": 50 } ] }),
    )
    .await;

    let client = CameraClient::new().unwrap();
    let poller = PollerManager::with_client(client.clone());
    let mut rx = poller.subscribe(16);
    poller
        .start(
            &HttpConfigSource::new(client, &server.uri()),
            &CancellationToken::new(),
        )
        .await;

    let event = timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("no image after the failed tick")
        .unwrap();
    assert_eq!(event.camera_name, "gate");

    let statuses = poller.statuses();
    let status = &statuses[0];
    assert_eq!(status.failures, 1);
    assert!(status.updates >= 1);
    assert!(status.last_error.as_deref().unwrap_or_default().contains("500"));

    poller.shutdown().await;
}

#[tokio::test]
async fn test_unavailable_config_starts_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/cameras"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = CameraClient::new().unwrap();
    let poller = PollerManager::with_client(client.clone());

    let report = poller
        .start(
            &HttpConfigSource::new(client, &server.uri()),
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(report.cameras, 0);
    assert!(matches!(poller.config_status(), ConfigStatus::Unavailable { .. }));
    assert_eq!(poller.active_loops(), 0);
    assert!(poller.statuses().is_empty());
}

#[tokio::test]
async fn test_cap_applies_to_http_config() {
    let server = MockServer::start().await;
    let cameras: Vec<_> = (0..20)
        .map(|i| json!({ "name": format!("cam{i}"), "url": format!("{}/cam{i}", server.uri()) }))
        .collect();
    mount_config(&server, json!({ "cameras": cameras })).await;
    for i in 0..20 {
        mount_image(&server, &format!("/cam{i}"), "image/jpeg").await;
    }

    let client = CameraClient::new().unwrap();
    let poller = PollerManager::with_client(client.clone());
    let report = poller
        .start(
            &HttpConfigSource::new(client, &server.uri()),
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(report.cameras, MAX_POLLED_CAMERAS);
    let names: Vec<_> = poller.statuses().into_iter().map(|s| s.name).collect();
    assert_eq!(names.first().map(String::as_str), Some("cam0"));
    assert_eq!(names.last().map(String::as_str), Some("cam15"));

    poller.shutdown().await;
}

#[tokio::test]
async fn test_no_event_after_stop_with_fetch_in_flight() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow.jpg"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(JPEG_MAGIC.to_vec(), "image/jpeg")
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;
    mount_config(
        &server,
        json!({ "cameras": [ { "name": "slow", "url": format!("{}/slow.jpg", server.uri()) } ] }),
    )
    .await;

    let client = CameraClient::new().unwrap();
    let poller = PollerManager::with_client(client.clone());
    let mut rx = poller.subscribe(16);
    let source = HttpConfigSource::new(client, &server.uri());

    let first = poller.start(&source, &CancellationToken::new()).await;
    // Let the first fetch go out, then stop while the response is delayed
    sleep(Duration::from_millis(100)).await;
    poller.stop();

    sleep(Duration::from_millis(600)).await;
    assert!(rx.try_recv().is_err());

    // A new generation delivers again, tagged with its own id
    let second = poller.start(&source, &CancellationToken::new()).await;
    assert!(second.generation > first.generation);
    let event = timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("restarted generation delivered nothing")
        .unwrap();
    assert_eq!(event.generation, second.generation);

    poller.shutdown().await;
}
