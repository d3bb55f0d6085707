//! # pmoserver - Serveur web haut niveau basé sur Axum
//!
//! Cette crate fournit une abstraction simple pour créer le serveur HTTP de PMOCamera.
//!
//! ## Fonctionnalités
//!
//! - **API de haut niveau** : Interface simple pour créer des serveurs HTTP avec Axum
//! - **Logging** : Initialisation du tracing et réglage du niveau à chaud
//! - **Documentation OpenAPI** : Génération automatique de Swagger UI
//! - **Arrêt gracieux** : Gestion propre de l'arrêt sur Ctrl+C
//!
//! ## Architecture
//!
//! - [`server`] : Implémentation du serveur principal et du builder
//! - [`logs`] : Initialisation du logging et API `/api/logs/log_setup`
//! - [`config_ext`] : Extension exposant l'API REST de `pmoconfig`
//!
//! ## Exemple d'utilisation
//!
//! ```rust,no_run
//! use pmoserver::ServerBuilder;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut server = ServerBuilder::new("MyServer", "localhost", 8080).build();
//!     server.init_logging().await;
//!
//!     server.add_route("/api/status", || async {
//!         serde_json::json!({"status": "ok"})
//!     }).await;
//!
//!     server.start().await?;
//!     server.wait().await;
//!     Ok(())
//! }
//! ```

pub mod config_ext;
pub mod logs;
pub mod server;

pub use config_ext::ConfigExt;
pub use logs::{LogState, init_logging};
pub use server::{Server, ServerBuilder, ServerInfo};
