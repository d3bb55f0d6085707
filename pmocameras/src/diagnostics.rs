//! Per-camera health table and configuration status
//!
//! Poll loops never surface their failures; they record them here instead so
//! that the status endpoint and the logs can tell a dead camera from a quiet one.

use crate::models::CameraDescriptor;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

/// Consecutive failures after which a camera is reported at `warn` level
pub const FAILURE_WARN_THRESHOLD: u32 = 5;

/// Outcome of the configuration fetch of the current generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum ConfigStatus {
    /// Start has never been called, or Stop was called since
    #[default]
    NotStarted,

    /// Configuration loaded
    #[serde(rename_all = "camelCase")]
    Loaded {
        source: String,
        cameras: usize,
        dropped: usize,
    },

    /// Configuration could not be fetched or parsed; polling runs with zero cameras
    #[serde(rename_all = "camelCase")]
    Unavailable { source: String, error: String },
}

impl ConfigStatus {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// Health of one polled camera
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct CameraStatus {
    /// Position in the configuration
    pub index: usize,
    pub name: String,
    pub url: String,
    /// Effective polling interval
    pub interval_ms: u64,
    pub updates: u64,
    pub failures: u64,
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
    pub last_success: Option<DateTime<Utc>>,
}

impl CameraStatus {
    fn new(index: usize, camera: &CameraDescriptor, interval: Duration) -> Self {
        Self {
            index,
            name: camera.name.clone(),
            url: camera.url.clone(),
            interval_ms: interval.as_millis() as u64,
            updates: 0,
            failures: 0,
            consecutive_failures: 0,
            last_error: None,
            last_success: None,
        }
    }
}

/// Diagnostics of one polling generation
///
/// Each loop only writes its own slot, addressed by camera index.
#[derive(Debug, Default)]
pub struct CameraDiagnostics {
    slots: RwLock<Vec<CameraStatus>>,
}

impl CameraDiagnostics {
    pub fn new<'a, I>(cameras: I) -> Self
    where
        I: IntoIterator<Item = (&'a CameraDescriptor, Duration)>,
    {
        let slots = cameras
            .into_iter()
            .enumerate()
            .map(|(index, (camera, interval))| CameraStatus::new(index, camera, interval))
            .collect();
        Self {
            slots: RwLock::new(slots),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<CameraStatus>> {
        self.slots.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<CameraStatus>> {
        self.slots
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Records a delivered image and resets the failure streak
    pub fn record_success(&self, index: usize) {
        if let Some(slot) = self.write().get_mut(index) {
            slot.updates += 1;
            slot.consecutive_failures = 0;
            slot.last_success = Some(Utc::now());
        }
    }

    /// Records a swallowed tick failure
    ///
    /// Returns the length of the current failure streak.
    pub fn record_failure(&self, index: usize, error: &impl std::fmt::Display) -> u32 {
        match self.write().get_mut(index) {
            Some(slot) => {
                slot.failures += 1;
                slot.consecutive_failures = slot.consecutive_failures.saturating_add(1);
                slot.last_error = Some(error.to_string());
                slot.consecutive_failures
            }
            None => 0,
        }
    }

    pub fn get(&self, index: usize) -> Option<CameraStatus> {
        self.read().get(index).cloned()
    }

    pub fn snapshot(&self) -> Vec<CameraStatus> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

/// Point-in-time view of a [`PollerManager`](crate::PollerManager)
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct PollerStatus {
    /// Identifier of the running generation, 0 when idle
    pub generation: u64,
    pub running: bool,
    pub config: ConfigStatus,
    pub cameras: Vec<CameraStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> CameraDiagnostics {
        let porch = CameraDescriptor::new("porch", "http://porch");
        let yard = CameraDescriptor::new("yard", "http://yard").with_interval_ms(250);
        CameraDiagnostics::new([
            (&porch, Duration::from_millis(2000)),
            (&yard, Duration::from_millis(250)),
        ])
    }

    #[test]
    fn test_failure_streak_resets_on_success() {
        let diag = table();

        assert_eq!(diag.record_failure(0, &"timeout"), 1);
        assert_eq!(diag.record_failure(0, &"HTTP 503"), 2);

        let status = diag.get(0).unwrap();
        assert_eq!(status.consecutive_failures, 2);
        assert_eq!(status.last_error.as_deref(), Some("HTTP 503"));
        assert!(status.last_success.is_none());

        diag.record_success(0);
        let status = diag.get(0).unwrap();
        assert_eq!(status.consecutive_failures, 0);
        assert_eq!(status.failures, 2);
        assert_eq!(status.updates, 1);
        assert!(status.last_success.is_some());
        // The last error stays visible after recovery
        assert_eq!(status.last_error.as_deref(), Some("HTTP 503"));
    }

    #[test]
    fn test_slots_are_independent() {
        let diag = table();
        diag.record_failure(1, &"refused");

        assert_eq!(diag.get(0).unwrap().failures, 0);
        assert_eq!(diag.get(1).unwrap().failures, 1);
        assert_eq!(diag.get(1).unwrap().interval_ms, 250);
        assert_eq!(diag.record_failure(7, &"out of range"), 0);
        assert_eq!(diag.len(), 2);
    }

    #[test]
    fn test_config_status_json() {
        let status = ConfigStatus::Unavailable {
            source: "http://localhost:8080/api/cameras".into(),
            error: "connection refused".into(),
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["state"], "unavailable");
        assert_eq!(json["error"], "connection refused");

        let json = serde_json::to_value(ConfigStatus::NotStarted).unwrap();
        assert_eq!(json["state"], "notStarted");
    }
}
