//! Extension pour intégrer l'API de configuration de pmoconfig dans pmoserver
//!
//! Ce module fournit le trait `ConfigExt` qui permet d'ajouter facilement
//! l'API REST de configuration au serveur.

use crate::Server;
use pmoconfig::{Config, api, get_config, ApiDoc};
use std::sync::Arc;
use utoipa::OpenApi;

/// Trait d'extension pour ajouter l'API de configuration à pmoserver
pub trait ConfigExt {
    /// Initialise l'API de configuration et enregistre les routes HTTP
    ///
    /// # Routes enregistrées
    ///
    /// - `GET /api/config` - Récupérer toute la configuration
    /// - `GET /api/config/{path}` - Récupérer une valeur spécifique (ex: host.http_port)
    /// - `POST /api/config` - Mettre à jour une valeur
    /// - `GET /swagger-ui/config` - Documentation interactive Swagger
    async fn init_config_api(&mut self);

    /// Variante avec une configuration explicite (tests, instances multiples)
    async fn init_config_api_with(&mut self, config: Arc<Config>);
}

impl ConfigExt for Server {
    async fn init_config_api(&mut self) {
        self.init_config_api_with(get_config()).await;
    }

    async fn init_config_api_with(&mut self, config: Arc<Config>) {
        let api_router = api::create_router(config);
        self.add_openapi(api_router, ApiDoc::openapi(), "config").await;
    }
}
