//! Extension pour intégrer les caméras dans pmoconfig
//!
//! Ce module fournit le trait `CameraConfigExt`, qui ajoute à
//! `pmoconfig::Config` l'accès à la section `CameraConfig` et aux réglages du
//! poller (section `poller`).
//!
//! ```yaml
//! CameraConfig:
//!   DefaultIntervalMs: 2000
//!   Cameras:
//!     - Name: porch
//!       Url: http://10.0.0.12/snapshot.jpg
//!       IntervalMs: 1000
//! poller:
//!   enabled: true
//!   request_timeout_ms: 10000
//!   api_base_url: ""
//! ```
//!
//! # Exemple
//!
//! ```no_run
//! use pmoconfig::get_config;
//! use pmocameras::CameraConfigExt;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = get_config();
//!
//! if let Some(polling) = config.get_polling_config()? {
//!     println!("{} camera(s) configured", polling.cameras.len());
//! }
//! println!("Poller fetches {}/api/cameras", config.get_api_base_url());
//! # Ok(())
//! # }
//! ```

use crate::client::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::error::Error;
use crate::models::PollingConfig;
use crate::source::ConfigSource;
use anyhow::Result;
use async_trait::async_trait;
use pmoconfig::Config;
use serde_yaml::Value;
use std::time::Duration;

/// Name of the configuration section echoed on `/api/cameras`
pub const CAMERA_CONFIG_SECTION: &str = "CameraConfig";

/// Trait d'extension pour la configuration des caméras
///
/// Les getters du poller persistent leur valeur par défaut quand elle manque,
/// comme les autres extensions de configuration.
pub trait CameraConfigExt {
    /// Section `CameraConfig` telle quelle, convertie en JSON
    ///
    /// `None` si la section est absente ou vaut `null`.
    fn get_camera_config_section(&self) -> Result<Option<serde_json::Value>>;

    /// Section `CameraConfig` typée
    fn get_polling_config(&self) -> Result<Option<PollingConfig>>;

    /// URL de base à laquelle le poller lit `/api/cameras`
    ///
    /// `poller.api_base_url` s'il est renseigné, sinon `http://localhost:<http_port>`.
    fn get_api_base_url(&self) -> String;

    /// Timeout HTTP appliqué à chaque requête (défaut : 10 s)
    fn get_camera_request_timeout(&self) -> Result<Duration>;

    fn set_camera_request_timeout(&self, timeout: Duration) -> Result<()>;

    /// Vérifie si le poller doit être démarré (défaut : `true`)
    fn get_camera_polling_enabled(&self) -> Result<bool>;

    fn set_camera_polling_enabled(&self, enabled: bool) -> Result<()>;
}

impl CameraConfigExt for Config {
    fn get_camera_config_section(&self) -> Result<Option<serde_json::Value>> {
        match self.get_section(&[CAMERA_CONFIG_SECTION])? {
            Some(value) => Ok(Some(serde_json::to_value(value)?)),
            None => Ok(None),
        }
    }

    fn get_polling_config(&self) -> Result<Option<PollingConfig>> {
        match self.get_camera_config_section()? {
            Some(json) => Ok(Some(serde_json::from_value(json)?)),
            None => Ok(None),
        }
    }

    fn get_api_base_url(&self) -> String {
        match self.get_value(&["poller", "api_base_url"]) {
            Ok(Value::String(s)) if !s.trim().is_empty() => s.trim_end_matches('/').to_string(),
            _ => format!("http://localhost:{}", self.get_http_port()),
        }
    }

    fn get_camera_request_timeout(&self) -> Result<Duration> {
        match self.get_value(&["poller", "request_timeout_ms"]) {
            Ok(Value::Number(n)) if n.as_u64().is_some_and(|ms| ms > 0) => {
                Ok(Duration::from_millis(n.as_u64().unwrap_or_default()))
            }
            _ => {
                let timeout = Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS);
                self.set_camera_request_timeout(timeout)?;
                Ok(timeout)
            }
        }
    }

    fn set_camera_request_timeout(&self, timeout: Duration) -> Result<()> {
        self.set_value(
            &["poller", "request_timeout_ms"],
            Value::Number(serde_yaml::Number::from(timeout.as_millis() as u64)),
        )
    }

    fn get_camera_polling_enabled(&self) -> Result<bool> {
        match self.get_value(&["poller", "enabled"]) {
            Ok(Value::Bool(b)) => Ok(b),
            _ => {
                self.set_camera_polling_enabled(true)?;
                Ok(true)
            }
        }
    }

    fn set_camera_polling_enabled(&self, enabled: bool) -> Result<()> {
        self.set_value(&["poller", "enabled"], Value::Bool(enabled))
    }
}

/// The local configuration file as a source: reads its `CameraConfig` section
///
/// An absent section is an unavailable configuration, like a 404 on `/api/cameras`.
#[async_trait]
impl ConfigSource for Config {
    async fn load(&self) -> crate::Result<PollingConfig> {
        self.get_polling_config()
            .map_err(Error::Config)?
            .ok_or_else(|| Error::other("CameraConfig not found in configuration"))
    }

    fn describe(&self) -> String {
        format!("{}/config.yaml", self.directory())
    }
}
