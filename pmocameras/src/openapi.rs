//! Documentation OpenAPI de l'API caméras

use crate::api_rest::ImageUpdatePayload;
use crate::diagnostics::{CameraStatus, ConfigStatus, PollerStatus};
use crate::poller::StartReport;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api_rest::get_camera_config,
        crate::api_rest::get_status,
        crate::api_rest::image_events,
        crate::api_rest::restart,
        crate::api_rest::stop,
    ),
    components(
        schemas(
            PollerStatus,
            CameraStatus,
            ConfigStatus,
            StartReport,
            ImageUpdatePayload,
        )
    ),
    tags(
        (name = "cameras", description = "Camera polling configuration, status and image stream")
    ),
    info(
        title = "PMOCamera Cameras API",
        version = "1.0.0",
        description = "Configuration echo, poller status and live camera images"
    )
)]
pub struct CamerasApiDoc;
