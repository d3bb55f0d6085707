//! Endpoints API REST pour les caméras
//!
//! Routes relatives, montées sous `/api/cameras` par [`CamerasExt`](crate::CamerasExt).

use crate::config_ext::CameraConfigExt;
use crate::diagnostics::PollerStatus;
use crate::events::DEFAULT_SUBSCRIBER_CAPACITY;
use crate::poller::StartReport;
use crate::pmoserver_ext::CamerasState;
use async_stream::stream;
use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::debug;

/// Message renvoyé quand la section `CameraConfig` est absente
pub const CAMERA_CONFIG_NOT_FOUND: &str = "CameraConfig not found in configuration";

// ============ Gestion des erreurs ============

/// Erreur API rendue en `{ "error": ... }`
pub enum AppError {
    NotFound(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

/// Image poussée sur le flux SSE
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageUpdatePayload {
    pub camera_name: String,
    pub camera_index: usize,
    pub generation: u64,
    pub media_type: String,
    /// `data:<media type>;base64,...`
    pub data_url: String,
}

/// Crée le router pour l'API caméras
pub fn create_router(state: CamerasState) -> Router {
    Router::new()
        .route("/", get(get_camera_config))
        .route("/status", get(get_status))
        .route("/events", get(image_events))
        .route("/restart", post(restart))
        .route("/stop", post(stop))
        .with_state(state)
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET /api/cameras - Section `CameraConfig` telle quelle
#[utoipa::path(
    get,
    path = "/api/cameras",
    tag = "cameras",
    responses(
        (status = 200, description = "CameraConfig section", body = serde_json::Value),
        (status = 404, description = "CameraConfig not found in configuration")
    )
)]
pub async fn get_camera_config(
    State(state): State<CamerasState>,
) -> Result<Json<serde_json::Value>, AppError> {
    match state.config.get_camera_config_section() {
        Ok(Some(section)) => Ok(Json(section)),
        Ok(None) => Err(AppError::NotFound(CAMERA_CONFIG_NOT_FOUND.to_string())),
        Err(e) => Err(AppError::Internal(e.to_string())),
    }
}

/// GET /api/cameras/status - État du poller
#[utoipa::path(
    get,
    path = "/api/cameras/status",
    tag = "cameras",
    responses(
        (status = 200, description = "Poller status", body = PollerStatus)
    )
)]
pub async fn get_status(State(state): State<CamerasState>) -> Json<PollerStatus> {
    Json(state.poller.status())
}

/// GET /api/cameras/events - Flux SSE des images
#[utoipa::path(
    get,
    path = "/api/cameras/events",
    tag = "cameras",
    responses(
        (status = 200, description = "Server-Sent Events stream of ImageUpdatePayload", content_type = "text/event-stream")
    )
)]
pub async fn image_events(State(state): State<CamerasState>) -> impl IntoResponse {
    let mut rx = state.poller.subscribe(DEFAULT_SUBSCRIBER_CAPACITY);
    let cancel = state.cancel.clone();
    debug!("New image events subscriber");

    // The stream ends with the external signal
    let stream = stream! {
        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => break,
                event = rx.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };
            let payload = ImageUpdatePayload {
                camera_name: event.camera_name,
                camera_index: event.camera_index,
                generation: event.generation,
                media_type: event.payload.media_type().to_string(),
                data_url: event.payload.data_url(),
            };
            yield Event::default().event("image").json_data(payload);
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// POST /api/cameras/restart - Relance le polling
#[utoipa::path(
    post,
    path = "/api/cameras/restart",
    tag = "cameras",
    responses(
        (status = 200, description = "New polling generation", body = StartReport)
    )
)]
pub async fn restart(State(state): State<CamerasState>) -> Json<StartReport> {
    let report = state.poller.start(state.source.as_ref(), &state.cancel).await;
    Json(report)
}

/// POST /api/cameras/stop - Arrête le polling
#[utoipa::path(
    post,
    path = "/api/cameras/stop",
    tag = "cameras",
    responses(
        (status = 200, description = "Polling stopped", body = PollerStatus)
    )
)]
pub async fn stop(State(state): State<CamerasState>) -> Json<PollerStatus> {
    state.poller.stop();
    Json(state.poller.status())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::CameraClient;
    use crate::models::PollingConfig;
    use crate::poller::PollerManager;
    use crate::source::StaticConfigSource;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use pmoconfig::Config;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;

    fn state_with(yaml: &str) -> (TempDir, CamerasState) {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("config.yaml"), yaml).unwrap();
        let config = Arc::new(Config::load_config(dir.path().to_str().unwrap()).unwrap());
        let poller = Arc::new(PollerManager::with_client(CameraClient::new().unwrap()));
        let source = Arc::new(StaticConfigSource::new(PollingConfig::default()));
        (
            dir,
            CamerasState::new(poller, config, source, CancellationToken::new()),
        )
    }

    async fn call(router: Router, method: &str, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_echo_section() {
        let (_dir, state) = state_with(
            "CameraConfig:\n  DefaultIntervalMs: 1000\n  Cameras:\n    - Name: porch\n      Url: http://porch\n",
        );

        let (status, body) = call(create_router(state), "GET", "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["DefaultIntervalMs"], 1000);
        assert_eq!(body["Cameras"][0]["Name"], "porch");
    }

    #[tokio::test]
    async fn test_missing_section_is_404() {
        let (_dir, state) = state_with("host:\n  http_port: 8080\n");

        let (status, body) = call(create_router(state), "GET", "/").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], CAMERA_CONFIG_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_restart_and_stop() {
        let (_dir, state) = state_with("host:\n  http_port: 8080\n");
        let router = create_router(state.clone());

        let (status, body) = call(router.clone(), "POST", "/restart").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cameras"], 0);
        assert_eq!(body["config"]["state"], "loaded");
        assert!(state.poller.is_running());

        let (_, body) = call(router.clone(), "GET", "/status").await;
        assert_eq!(body["running"], true);

        let (status, body) = call(router, "POST", "/stop").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["running"], false);
        assert_eq!(body["config"]["state"], "notStarted");
    }
}
