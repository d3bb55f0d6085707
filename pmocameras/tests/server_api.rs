//! End-to-end test: the server echoes `CameraConfig`, the poller reads it back
//! over HTTP and polls a mock camera.

#![cfg(feature = "server")]

use pmocameras::{CameraClient, CamerasExt, CamerasState, HttpConfigSource, PollerManager};
use pmoconfig::Config;
use pmoserver::ServerBuilder;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_server_config_drives_poller() {
    let camera = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/snapshot"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![1u8, 2, 3], "image/webp"))
        .mount(&camera)
        .await;

    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("config.yaml"),
        format!(
            "CameraConfig:\n  DefaultIntervalMs: 2000\n  Cameras:\n    - Name: porch\n      Url: {}/snapshot\n      IntervalMs: 100\n",
            camera.uri()
        ),
    )
    .unwrap();
    let config = Arc::new(Config::load_config(dir.path().to_str().unwrap()).unwrap());

    let mut server = ServerBuilder::new("PMOCamera-Test", "localhost", 0).build();
    let client = CameraClient::new().unwrap();
    let poller = Arc::new(PollerManager::with_client(client.clone()));
    let cancel = CancellationToken::new();

    // Only used by POST /restart, which this test does not call
    let restart_source = HttpConfigSource::new(client.clone(), "http://127.0.0.1:1");
    let state = CamerasState::new(
        poller.clone(),
        config,
        Arc::new(restart_source),
        cancel.clone(),
    );
    server.init_cameras_api_with_state(state).await.unwrap();
    let addr = server.start().await.unwrap();
    let base = format!("http://127.0.0.1:{}", addr.port());

    // Echo keeps the original key casing
    let echoed: serde_json::Value = client
        .http_client()
        .get(format!("{base}/api/cameras"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(echoed["Cameras"][0]["Name"], "porch");
    assert_eq!(echoed["Cameras"][0]["IntervalMs"], 100);

    let mut rx = poller.subscribe(16);
    let report = poller
        .start(&HttpConfigSource::new(client.clone(), &base), &cancel)
        .await;
    assert_eq!(report.cameras, 1);

    let event = timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("no image from the configured camera")
        .unwrap();
    assert_eq!(event.camera_name, "porch");
    assert_eq!(event.payload.media_type(), "image/webp");

    let status: serde_json::Value = client
        .http_client()
        .get(format!("{base}/api/cameras/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["running"], true);
    assert_eq!(status["cameras"][0]["name"], "porch");
    assert_eq!(status["cameras"][0]["intervalMs"], 100);

    let stopped = client
        .http_client()
        .post(format!("{base}/api/cameras/stop"))
        .send()
        .await
        .unwrap();
    assert!(stopped.status().is_success());
    assert!(!poller.is_running());

    server.stop();
    timeout(Duration::from_secs(5), server.wait())
        .await
        .expect("server did not stop");
}

#[tokio::test]
async fn test_missing_camera_config_is_404() {
    let dir = TempDir::new().unwrap();
    let config = Arc::new(Config::load_config(dir.path().to_str().unwrap()).unwrap());

    let mut server = ServerBuilder::new("PMOCamera-Test", "localhost", 0).build();
    let client = CameraClient::new().unwrap();
    let poller = Arc::new(PollerManager::with_client(client.clone()));
    let source = Arc::new(HttpConfigSource::new(client.clone(), "http://127.0.0.1:1"));
    server
        .init_cameras_api_with_state(CamerasState::new(
            poller,
            config,
            source,
            CancellationToken::new(),
        ))
        .await
        .unwrap();
    let addr = server.start().await.unwrap();

    let response = client
        .http_client()
        .get(format!("http://127.0.0.1:{}/api/cameras", addr.port()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "CameraConfig not found in configuration");

    server.stop();
}
