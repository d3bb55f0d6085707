//! Extension pmoserver pour les caméras
//!
//! Ce module fournit un trait d'extension pour ajouter l'API caméras à un
//! serveur pmoserver.

use crate::poller::PollerManager;
use crate::source::ConfigSource;
use anyhow::Result;
use pmoconfig::Config;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// État partagé pour les handlers caméras
#[derive(Clone)]
pub struct CamerasState {
    pub poller: Arc<PollerManager>,
    pub config: Arc<Config>,
    /// Source relue par `POST /api/cameras/restart`
    pub source: Arc<dyn ConfigSource>,
    /// Signal externe passé à chaque `start`
    pub cancel: CancellationToken,
}

impl CamerasState {
    pub fn new(
        poller: Arc<PollerManager>,
        config: Arc<Config>,
        source: Arc<dyn ConfigSource>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            poller,
            config,
            source,
            cancel,
        }
    }
}

/// Trait pour étendre pmoserver avec l'API caméras
///
/// `pmoserver` ne connaît pas `pmocameras` : c'est cette crate qui ajoute ses
/// routes au serveur via ce trait.
///
/// # Routes enregistrées
///
/// - `GET /api/cameras` - Section `CameraConfig` telle quelle (404 si absente)
/// - `GET /api/cameras/status` - État du poller et diagnostics par caméra
/// - `GET /api/cameras/events` - Flux SSE des images reçues
/// - `POST /api/cameras/restart` - Relance le polling
/// - `POST /api/cameras/stop` - Arrête le polling
///
/// # Exemple
///
/// ```rust,no_run
/// use pmocameras::{CameraClient, CamerasExt, HttpConfigSource, PollerManager};
/// use pmoserver::ServerBuilder;
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let mut server = ServerBuilder::new_configured().build();
///     let client = CameraClient::new()?;
///     let poller = Arc::new(PollerManager::with_client(client.clone()));
///     let source = Arc::new(HttpConfigSource::new(client, "http://localhost:8080"));
///
///     server
///         .init_cameras_api(poller, source, CancellationToken::new())
///         .await?;
///
///     server.start().await?;
///     server.wait().await;
///     Ok(())
/// }
/// ```
pub trait CamerasExt {
    /// Enregistre l'API caméras avec la configuration globale
    async fn init_cameras_api(
        &mut self,
        poller: Arc<PollerManager>,
        source: Arc<dyn ConfigSource>,
        cancel: CancellationToken,
    ) -> Result<Arc<CamerasState>>;

    /// Variante avec un état déjà construit (tests, configuration explicite)
    async fn init_cameras_api_with_state(
        &mut self,
        state: CamerasState,
    ) -> Result<Arc<CamerasState>>;
}

// L'implémentation du trait est dans pmoserver_impl.rs
