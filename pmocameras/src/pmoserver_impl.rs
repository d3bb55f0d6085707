//! Implémentation du trait CamerasExt pour pmoserver::Server

use crate::api_rest::create_router;
use crate::openapi::CamerasApiDoc;
use crate::pmoserver_ext::{CamerasExt, CamerasState};
use crate::poller::PollerManager;
use crate::source::ConfigSource;
use anyhow::Result;
use pmoserver::Server;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use utoipa::OpenApi;

impl CamerasExt for Server {
    async fn init_cameras_api(
        &mut self,
        poller: Arc<PollerManager>,
        source: Arc<dyn ConfigSource>,
        cancel: CancellationToken,
    ) -> Result<Arc<CamerasState>> {
        let config = pmoconfig::get_config();
        let state = CamerasState::new(poller, config, source, cancel);
        self.init_cameras_api_with_state(state).await
    }

    async fn init_cameras_api_with_state(
        &mut self,
        state: CamerasState,
    ) -> Result<Arc<CamerasState>> {
        info!("Initializing cameras API...");

        let router = create_router(state.clone());
        self.add_openapi(router, CamerasApiDoc::openapi(), "cameras")
            .await;

        info!("Cameras API available at /api/cameras");
        Ok(Arc::new(state))
    }
}
