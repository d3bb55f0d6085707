//! # pmocameras - Polling de caméras HTTP
//!
//! This crate polls a small set of camera snapshot endpoints, each at its own
//! cadence, and publishes every freshly fetched image to subscribers.
//!
//! ## Features
//!
//! - **Independent loops**: one task per camera (at most 16), a slow or failing
//!   camera never delays the others
//! - **Generations**: every `start` supersedes the previous one; after `stop`
//!   no event from the stopped generation is ever delivered
//! - **Error isolation**: failed ticks are skipped and recorded in a diagnostics
//!   table, never returned to the caller
//! - **Non-blocking fan-out**: subscribers get a bounded channel each
//!
//! ## Quick Start
//!
//! ```no_run
//! use pmocameras::{CameraDescriptor, PollerManager, PollingConfig, StaticConfigSource};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let poller = PollerManager::with_client(pmocameras::CameraClient::new()?);
//!     let source = StaticConfigSource::new(PollingConfig::new(
//!         2000,
//!         vec![CameraDescriptor::new("porch", "http://10.0.0.12/snapshot.jpg")],
//!     ));
//!
//!     let mut updates = poller.subscribe(16);
//!     poller.start(&source, &CancellationToken::new()).await;
//!
//!     if let Some(event) = updates.recv().await {
//!         println!("{} -> {}", event.camera_name, event.payload.media_type());
//!     }
//!
//!     poller.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Cargo features
//!
//! - `pmoconfig` (default): [`CameraConfigExt`] and the local configuration as a
//!   [`ConfigSource`]
//! - `server`: REST and SSE endpoints under `/api/cameras` via [`CamerasExt`]

pub mod client;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod models;
pub mod poller;
pub mod source;

#[cfg(feature = "pmoconfig")]
pub mod config_ext;

#[cfg(feature = "server")]
pub mod api_rest;
#[cfg(feature = "server")]
pub mod openapi;
#[cfg(feature = "server")]
pub mod pmoserver_ext;
#[cfg(feature = "server")]
mod pmoserver_impl;

// Re-exports
pub use client::{CameraClient, ClientBuilder, ImageFetcher};
pub use diagnostics::{CameraDiagnostics, CameraStatus, ConfigStatus, PollerStatus};
pub use error::{Error, Result};
pub use events::{EventPublisher, EventReceiver};
pub use models::{
    CameraDescriptor, ImagePayload, ImageUpdateEvent, PollingConfig, DEFAULT_INTERVAL_MS,
    MAX_POLLED_CAMERAS,
};
pub use poller::{PollerManager, StartReport};
pub use source::{ConfigSource, HttpConfigSource, StaticConfigSource};

#[cfg(feature = "pmoconfig")]
pub use config_ext::{CameraConfigExt, CAMERA_CONFIG_SECTION};

#[cfg(feature = "server")]
pub use openapi::CamerasApiDoc;
#[cfg(feature = "server")]
pub use pmoserver_ext::{CamerasExt, CamerasState};
