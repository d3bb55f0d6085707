//! Where the poller gets its camera list from

use crate::client::CameraClient;
use crate::error::Result;
use crate::models::PollingConfig;
use async_trait::async_trait;

/// Path of the configuration endpoint, relative to the API base URL
pub const CAMERAS_API_PATH: &str = "/api/cameras";

/// Provider of a [`PollingConfig`]
///
/// Failures are returned as errors; the poller is the one deciding to fall
/// back to an empty configuration.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn load(&self) -> Result<PollingConfig>;

    /// Human readable origin, used in logs and status reports
    fn describe(&self) -> String;
}

/// Fetches the configuration from the server's `/api/cameras` endpoint
#[derive(Debug, Clone)]
pub struct HttpConfigSource {
    client: CameraClient,
    url: String,
}

impl HttpConfigSource {
    /// Source reading `<base_url>/api/cameras`
    pub fn new(client: CameraClient, base_url: &str) -> Self {
        let url = format!("{}{}", base_url.trim_end_matches('/'), CAMERAS_API_PATH);
        Self { client, url }
    }

    /// Source reading an arbitrary URL
    pub fn with_url(client: CameraClient, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ConfigSource for HttpConfigSource {
    async fn load(&self) -> Result<PollingConfig> {
        self.client.fetch_polling_config(&self.url).await
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Injected configuration, mostly for embedding and tests
#[derive(Debug, Clone, Default)]
pub struct StaticConfigSource {
    config: PollingConfig,
}

impl StaticConfigSource {
    pub fn new(config: PollingConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ConfigSource for StaticConfigSource {
    async fn load(&self) -> Result<PollingConfig> {
        Ok(self.config.clone())
    }

    fn describe(&self) -> String {
        "static".to_string()
    }
}
