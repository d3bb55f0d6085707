//! HTTP client shared by every camera loop
//!
//! One [`CameraClient`] wraps one pooled `reqwest::Client`; cloning it is cheap
//! and all loops share the same connection pool.
//!
//! # Example
//!
//! ```no_run
//! use pmocameras::CameraClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = CameraClient::new()?;
//!
//!     let image = client.fetch_image("http://10.0.0.12/snapshot.jpg").await?;
//!     println!("{} bytes of {}", image.len(), image.media_type());
//!
//!     Ok(())
//! }
//! ```

use crate::error::{Error, Result};
use crate::models::{ImagePayload, PollingConfig};
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client};
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Default User-Agent
pub const DEFAULT_USER_AGENT: &str = "PMOCamera/0.1.0 (pmocameras)";

/// Something able to fetch one camera image
///
/// Poll loops only see this trait, so tests can swap the HTTP transport.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Fetches the image at `url`; any non-2xx answer is an error
    async fn fetch_image(&self, url: &str) -> Result<ImagePayload>;
}

/// Camera HTTP client
#[derive(Debug, Clone)]
pub struct CameraClient {
    client: Client,
}

impl CameraClient {
    /// Create a new client with default settings
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Create a builder for configuring the client
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Create a client with a custom reqwest::Client
    ///
    /// Useful for sharing HTTP connection pools or custom proxy settings
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Get the internal HTTP client
    pub fn http_client(&self) -> &Client {
        &self.client
    }

    /// Fetches one image and reads its full body
    pub async fn fetch_image(&self, url: &str) -> Result<ImagePayload> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                url: url.to_string(),
                status,
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = response.bytes().await?;

        Ok(ImagePayload::from_content_type(content_type.as_deref(), body))
    }

    /// Fetches and parses a polling configuration document
    ///
    /// A literal `null` body yields the empty configuration.
    pub async fn fetch_polling_config(&self, url: &str) -> Result<PollingConfig> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                url: url.to_string(),
                status,
            });
        }

        let body = response.bytes().await?;
        let config: Option<PollingConfig> = serde_json::from_slice(&body)?;
        Ok(config.unwrap_or_default())
    }
}

#[async_trait]
impl ImageFetcher for CameraClient {
    async fn fetch_image(&self, url: &str) -> Result<ImagePayload> {
        CameraClient::fetch_image(self, url).await
    }
}

/// Builder for [`CameraClient`]
#[derive(Debug)]
pub struct ClientBuilder {
    client: Option<Client>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    user_agent: String,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            client: None,
            timeout: Some(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)),
            connect_timeout: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ClientBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a custom HTTP client (other settings are then ignored)
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the whole-request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the connection timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set a custom User-Agent header
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Build the client
    pub fn build(self) -> Result<CameraClient> {
        if let Some(client) = self.client {
            return Ok(CameraClient { client });
        }

        let mut builder = Client::builder().user_agent(&self.user_agent);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = self.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }

        Ok(CameraClient {
            client: builder.build()?,
        })
    }
}
