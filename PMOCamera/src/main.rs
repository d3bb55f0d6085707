use pmocameras::events::DEFAULT_SUBSCRIBER_CAPACITY;
use pmocameras::{CameraClient, CameraConfigExt, CamerasExt, HttpConfigSource, PollerManager};
use pmoconfig::get_config;
use pmoserver::{ConfigExt, ServerBuilder};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = get_config();

    // ========== PHASE 1 : Serveur HTTP ==========

    let mut server = ServerBuilder::new_configured().build();
    server.init_logging().await;

    server
        .add_route("/info", || async {
            serde_json::json!({"name": "PMOCamera", "version": env!("CARGO_PKG_VERSION")})
        })
        .await;

    info!("⚙️ Registering configuration API...");
    server.init_config_api().await;

    // ========== PHASE 2 : Poller ==========

    let client = CameraClient::builder()
        .timeout(config.get_camera_request_timeout()?)
        .build()?;
    let poller = Arc::new(PollerManager::with_client(client.clone()));

    // Le poller relit sa configuration sur /api/cameras, comme le ferait un client distant
    let source = Arc::new(HttpConfigSource::new(client, &config.get_api_base_url()));
    let cancel = server.shutdown_token().child_token();

    info!("📷 Registering cameras API...");
    server
        .init_cameras_api(poller.clone(), source.clone(), cancel.clone())
        .await?;

    // ========== PHASE 3 : Démarrage ==========

    info!("🌐 Starting HTTP server...");
    server.start().await?;

    let mut updates = poller.subscribe(DEFAULT_SUBSCRIBER_CAPACITY);
    let update_logger = tokio::spawn(async move {
        while let Some(event) = updates.recv().await {
            debug!(
                camera = %event.camera_name,
                generation = event.generation,
                "Image update: {} bytes of {}",
                event.payload.len(),
                event.payload.media_type()
            );
        }
    });

    if config.get_camera_polling_enabled()? {
        let report = poller.start(source.as_ref(), &cancel).await;
        info!(
            "✅ {} camera(s) polled (generation {})",
            report.cameras, report.generation
        );
    } else {
        info!("Camera polling disabled (poller.enabled = false)");
    }

    info!("✅ PMOCamera is ready!");
    info!("Press Ctrl+C to stop...");
    server.wait().await;

    let grace = Duration::from_millis(config.get_shutdown_grace_ms()?);
    if tokio::time::timeout(grace, poller.shutdown()).await.is_err() {
        warn!("Camera loops still running after {:?}, exiting anyway", grace);
    }
    update_logger.abort();

    info!("👋 PMOCamera stopped");
    Ok(())
}
