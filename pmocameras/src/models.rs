//! Data models for camera polling
//!
//! The JSON shape mirrors the `CameraConfig` section served on `/api/cameras`:
//!
//! ```json
//! {
//!   "defaultIntervalMs": 2000,
//!   "cameras": [
//!     { "name": "porch", "url": "http://10.0.0.12/snapshot.jpg", "intervalMs": 1000 }
//!   ]
//! }
//! ```
//!
//! PascalCase keys (`DefaultIntervalMs`, `Cameras`, `Name`, ...) are accepted too,
//! and unknown fields are ignored.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

/// Default polling interval when the configuration does not give one
pub const DEFAULT_INTERVAL_MS: i64 = 2000;

/// Lower bound applied to the fallback interval (never to a per-camera interval)
pub const MIN_FALLBACK_INTERVAL_MS: i64 = 500;

/// Maximum number of cameras polled at the same time
pub const MAX_POLLED_CAMERAS: usize = 16;

/// Media type used when a camera does not declare a content-type
pub const DEFAULT_MEDIA_TYPE: &str = "image/jpeg";

fn default_interval_ms() -> i64 {
    DEFAULT_INTERVAL_MS
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<CameraDescriptor>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<CameraDescriptor>>::deserialize(deserializer)?.unwrap_or_default())
}

/// One camera endpoint to poll
///
/// Identity is the name, but uniqueness is not enforced: two descriptors with
/// the same name simply run two independent loops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CameraDescriptor {
    #[serde(default, alias = "Name")]
    pub name: String,

    #[serde(default, alias = "Url")]
    pub url: String,

    /// Per-camera interval in milliseconds; only used when positive
    #[serde(default, alias = "IntervalMs", skip_serializing_if = "Option::is_none")]
    pub interval_ms: Option<i64>,
}

impl CameraDescriptor {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            interval_ms: None,
        }
    }

    pub fn with_interval_ms(mut self, interval_ms: i64) -> Self {
        self.interval_ms = Some(interval_ms);
        self
    }

    /// Interval actually used by this camera's loop
    ///
    /// A positive per-camera interval wins as is, even below 500 ms. Otherwise
    /// the default interval applies, floored at [`MIN_FALLBACK_INTERVAL_MS`].
    pub fn effective_interval(&self, default_interval_ms: i64) -> Duration {
        let ms = match self.interval_ms {
            Some(ms) if ms > 0 => ms,
            _ => default_interval_ms.max(MIN_FALLBACK_INTERVAL_MS),
        };
        Duration::from_millis(ms as u64)
    }
}

/// Polling configuration as loaded from a [`ConfigSource`](crate::ConfigSource)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollingConfig {
    #[serde(default = "default_interval_ms", alias = "DefaultIntervalMs")]
    pub default_interval_ms: i64,

    #[serde(default, alias = "Cameras", deserialize_with = "null_as_empty")]
    pub cameras: Vec<CameraDescriptor>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            default_interval_ms: DEFAULT_INTERVAL_MS,
            cameras: Vec::new(),
        }
    }
}

impl PollingConfig {
    pub fn new(default_interval_ms: i64, cameras: Vec<CameraDescriptor>) -> Self {
        Self {
            default_interval_ms,
            cameras,
        }
    }

    /// Cameras that actually get a loop: the first [`MAX_POLLED_CAMERAS`], in order
    pub fn polled_cameras(&self) -> &[CameraDescriptor] {
        let count = self.cameras.len().min(MAX_POLLED_CAMERAS);
        &self.cameras[..count]
    }

    /// Number of configured cameras beyond the cap
    pub fn dropped_cameras(&self) -> usize {
        self.cameras.len().saturating_sub(MAX_POLLED_CAMERAS)
    }

    /// Effective interval for `camera` under this configuration
    pub fn interval_for(&self, camera: &CameraDescriptor) -> Duration {
        camera.effective_interval(self.default_interval_ms)
    }
}

/// An encoded image ready for display
///
/// The bytes are kept opaque; nothing here decodes the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    media_type: String,
    data: Bytes,
}

impl ImagePayload {
    pub fn new(media_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            media_type: media_type.into(),
            data: data.into(),
        }
    }

    /// Builds a payload from a raw `Content-Type` header value
    ///
    /// Parameters such as `; charset=...` are dropped; a missing or empty
    /// header falls back to [`DEFAULT_MEDIA_TYPE`].
    pub fn from_content_type(content_type: Option<&str>, data: impl Into<Bytes>) -> Self {
        Self::new(media_type_of(content_type), data)
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// `data:<media type>;base64,<bytes>` URL, directly usable as an image source
    pub fn data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.media_type,
            BASE64.encode(&self.data)
        )
    }
}

fn media_type_of(content_type: Option<&str>) -> String {
    content_type
        .and_then(|ct| ct.split(';').next())
        .map(str::trim)
        .filter(|mt| !mt.is_empty())
        .unwrap_or(DEFAULT_MEDIA_TYPE)
        .to_string()
}

/// A freshly fetched image for one camera
///
/// Ephemeral: produced per successful fetch and handed to subscribers.
#[derive(Debug, Clone)]
pub struct ImageUpdateEvent {
    pub camera_name: String,
    pub payload: ImagePayload,
    /// Position of the camera in the configuration (distinguishes duplicate names)
    pub camera_index: usize,
    /// Polling generation that produced this event
    pub generation: u64,
}
