//! Poller manager: one independent polling task per camera
//!
//! A call to [`PollerManager::start`] creates a *generation*: a cancellation
//! token linked to the caller's signal plus one task per polled camera. Any
//! previous generation is cancelled first, so at most one generation runs at a
//! time. [`PollerManager::stop`] cancels the current generation; once it
//! returns, no event of that generation reaches a subscriber.
//!
//! # Example
//!
//! ```no_run
//! use pmocameras::{CameraClient, HttpConfigSource, PollerManager};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = CameraClient::new()?;
//!     let source = HttpConfigSource::new(client.clone(), "http://localhost:8080");
//!     let poller = PollerManager::with_client(client);
//!
//!     let mut updates = poller.subscribe(16);
//!     poller.start(&source, &CancellationToken::new()).await;
//!
//!     while let Some(event) = updates.recv().await {
//!         println!("{}: {} bytes", event.camera_name, event.payload.len());
//!     }
//!     Ok(())
//! }
//! ```

use crate::client::{CameraClient, ImageFetcher};
use crate::diagnostics::{
    CameraDiagnostics, CameraStatus, ConfigStatus, PollerStatus, FAILURE_WARN_THRESHOLD,
};
use crate::error::Error;
use crate::events::{EventPublisher, EventReceiver};
use crate::models::{ImageUpdateEvent, PollingConfig};
use crate::source::ConfigSource;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What a call to [`PollerManager::start`] ended up doing
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct StartReport {
    pub generation: u64,
    /// Number of poll loops launched
    pub cameras: usize,
    pub config: ConfigStatus,
    /// A concurrent `start` or `stop` won the race; nothing was launched
    pub superseded: bool,
}

struct Generation {
    id: u64,
    token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    diagnostics: Arc<CameraDiagnostics>,
}

impl Generation {
    fn cancel(&self) {
        self.token.cancel();
        for task in &self.tasks {
            task.abort();
        }
    }
}

#[derive(Default)]
struct ManagerState {
    current: Option<Generation>,
    config: ConfigStatus,
}

/// Starts, supersedes and stops camera polling generations
pub struct PollerManager {
    fetcher: Arc<dyn ImageFetcher>,
    publisher: EventPublisher<ImageUpdateEvent>,
    state: Mutex<ManagerState>,
    /// Bumped by every start and stop; a start only installs its generation
    /// if nobody bumped it in the meantime
    epoch: AtomicU64,
}

impl PollerManager {
    pub fn new(fetcher: Arc<dyn ImageFetcher>) -> Self {
        Self {
            fetcher,
            publisher: EventPublisher::new(),
            state: Mutex::new(ManagerState::default()),
            epoch: AtomicU64::new(0),
        }
    }

    /// Manager fetching images through `client`
    pub fn with_client(client: CameraClient) -> Self {
        Self::new(Arc::new(client))
    }

    fn lock(&self) -> MutexGuard<'_, ManagerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Subscribes to image updates
    ///
    /// Subscriptions survive restarts. A subscriber whose buffer is full misses
    /// events rather than slowing the loops down.
    pub fn subscribe(&self, capacity: usize) -> EventReceiver<ImageUpdateEvent> {
        self.publisher.subscribe(capacity)
    }

    /// Starts a new polling generation
    ///
    /// Cancels the previous generation, loads the configuration from `source`
    /// and launches one loop per polled camera. Never fails: an unavailable
    /// configuration is replaced by an empty one and reported in the returned
    /// [`StartReport`] and in [`config_status`](Self::config_status). If
    /// `cancel` has fired, nothing is launched and the status is `NotStarted`.
    pub async fn start(&self, source: &dyn ConfigSource, cancel: &CancellationToken) -> StartReport {
        let id = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.cancel_current();

        let origin = source.describe();
        let loaded = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            result = source.load() => result,
        };

        let (config, status) = match loaded {
            Err(e) if e.is_cancelled() => (PollingConfig::default(), ConfigStatus::NotStarted),
            Ok(config) => {
                let status = ConfigStatus::Loaded {
                    source: origin,
                    cameras: config.polled_cameras().len(),
                    dropped: config.dropped_cameras(),
                };
                (config, status)
            }
            Err(e) => {
                warn!(
                    generation = id,
                    "Camera configuration unavailable from {}, polling nothing: {}", origin, e
                );
                let status = ConfigStatus::Unavailable {
                    source: origin,
                    error: e.to_string(),
                };
                (PollingConfig::default(), status)
            }
        };

        if config.dropped_cameras() > 0 {
            debug!(
                generation = id,
                "Ignoring {} camera(s) beyond the first {}",
                config.dropped_cameras(),
                config.polled_cameras().len()
            );
        }

        let mut state = self.lock();
        if self.epoch.load(Ordering::SeqCst) != id {
            debug!(generation = id, "Start superseded before launch");
            return StartReport {
                generation: id,
                cameras: 0,
                config: status,
                superseded: true,
            };
        }
        if let Some(previous) = state.current.take() {
            previous.cancel();
        }
        if cancel.is_cancelled() {
            debug!(generation = id, "Start cancelled, polling nothing");
            state.config = ConfigStatus::NotStarted;
            return StartReport {
                generation: id,
                cameras: 0,
                config: ConfigStatus::NotStarted,
                superseded: false,
            };
        }

        let generation = self.launch(id, &config, cancel);
        let cameras = generation.tasks.len();
        info!(generation = id, cameras, "Camera polling started");

        state.current = Some(generation);
        state.config = status.clone();
        drop(state);
        self.publisher.fence();

        StartReport {
            generation: id,
            cameras,
            config: status,
            superseded: false,
        }
    }

    fn launch(&self, id: u64, config: &PollingConfig, cancel: &CancellationToken) -> Generation {
        let token = cancel.child_token();
        let polled = config.polled_cameras();
        let diagnostics = Arc::new(CameraDiagnostics::new(
            polled.iter().map(|camera| (camera, config.interval_for(camera))),
        ));

        let tasks = polled
            .iter()
            .enumerate()
            .map(|(index, camera)| {
                let poll = CameraLoop {
                    index,
                    name: camera.name.clone(),
                    url: camera.url.clone(),
                    interval: config.interval_for(camera),
                    generation: id,
                    token: token.clone(),
                    fetcher: Arc::clone(&self.fetcher),
                    publisher: self.publisher.clone(),
                    diagnostics: Arc::clone(&diagnostics),
                };
                tokio::spawn(poll.run())
            })
            .collect();

        Generation {
            id,
            token,
            tasks,
            diagnostics,
        }
    }

    /// Cancels the current generation without waiting for its tasks
    ///
    /// Idempotent. When it returns, no event of the stopped generation will be
    /// published any more, even if one of its fetches completes later.
    pub fn stop(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        let stopped = {
            let mut state = self.lock();
            state.config = ConfigStatus::NotStarted;
            state.current.take()
        };

        if let Some(generation) = stopped {
            generation.cancel();
            info!(generation = generation.id, "Camera polling stopped");
        }
        self.publisher.fence();
    }

    /// Stops the current generation and waits for all its tasks to finish
    pub async fn shutdown(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        let stopped = {
            let mut state = self.lock();
            state.config = ConfigStatus::NotStarted;
            state.current.take()
        };
        self.publisher.fence();

        if let Some(generation) = stopped {
            generation.token.cancel();
            self.publisher.fence();
            for task in generation.tasks {
                if let Err(e) = task.await {
                    if !e.is_cancelled() {
                        warn!(generation = generation.id, "Camera task failed: {}", e);
                    }
                }
            }
            info!(generation = generation.id, "Camera polling shut down");
        }
    }

    fn cancel_current(&self) {
        let previous = self.lock().current.take();
        if let Some(generation) = previous {
            generation.cancel();
            debug!(generation = generation.id, "Previous generation cancelled");
        }
        self.publisher.fence();
    }

    /// Whether a generation is installed and not cancelled
    pub fn is_running(&self) -> bool {
        self.lock()
            .current
            .as_ref()
            .is_some_and(|g| !g.token.is_cancelled())
    }

    /// Identifier of the installed generation, if any
    pub fn generation(&self) -> Option<u64> {
        self.lock().current.as_ref().map(|g| g.id)
    }

    /// Number of loops of the installed generation that have not finished
    pub fn active_loops(&self) -> usize {
        self.lock()
            .current
            .as_ref()
            .map(|g| g.tasks.iter().filter(|t| !t.is_finished()).count())
            .unwrap_or(0)
    }

    pub fn config_status(&self) -> ConfigStatus {
        self.lock().config.clone()
    }

    /// Diagnostics of the installed generation, in configuration order
    pub fn statuses(&self) -> Vec<CameraStatus> {
        self.lock()
            .current
            .as_ref()
            .map(|g| g.diagnostics.snapshot())
            .unwrap_or_default()
    }

    pub fn status(&self) -> PollerStatus {
        let state = self.lock();
        let current = state.current.as_ref();
        PollerStatus {
            generation: current.map(|g| g.id).unwrap_or(0),
            running: current.is_some_and(|g| !g.token.is_cancelled()),
            config: state.config.clone(),
            cameras: current.map(|g| g.diagnostics.snapshot()).unwrap_or_default(),
        }
    }
}

impl Drop for PollerManager {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(generation) = state.current.take() {
            generation.cancel();
        }
    }
}

/// State owned by one camera's poll loop
struct CameraLoop {
    index: usize,
    name: String,
    url: String,
    interval: Duration,
    generation: u64,
    token: CancellationToken,
    fetcher: Arc<dyn ImageFetcher>,
    publisher: EventPublisher<ImageUpdateEvent>,
    diagnostics: Arc<CameraDiagnostics>,
}

impl CameraLoop {
    async fn run(self) {
        debug!(
            camera = %self.name,
            generation = self.generation,
            "Polling {} every {:?}", self.url, self.interval
        );

        // The first tick completes immediately
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let result = tokio::select! {
                biased;
                _ = self.token.cancelled() => break,
                result = self.fetcher.fetch_image(&self.url) => result,
            };

            match result {
                Ok(payload) => {
                    let size = payload.len();
                    let event = ImageUpdateEvent {
                        camera_name: self.name.clone(),
                        payload,
                        camera_index: self.index,
                        generation: self.generation,
                    };
                    let Some(delivered) = self.publisher.publish_unless_cancelled(event, &self.token)
                    else {
                        break;
                    };
                    self.diagnostics.record_success(self.index);
                    debug!(
                        camera = %self.name,
                        generation = self.generation,
                        "Image of {} bytes delivered to {} subscriber(s)", size, delivered
                    );
                }
                Err(e) if e.is_cancelled() => break,
                Err(e) => {
                    let streak = self.diagnostics.record_failure(self.index, &e);
                    debug!(
                        camera = %self.name,
                        generation = self.generation,
                        consecutive_failures = streak,
                        "Fetch failed, skipping tick: {}", e
                    );
                    if streak == FAILURE_WARN_THRESHOLD {
                        warn!(
                            camera = %self.name,
                            generation = self.generation,
                            "{} consecutive failures fetching {}: {}", streak, self.url, e
                        );
                    }
                }
            }
        }

        debug!(camera = %self.name, generation = self.generation, "Poll loop stopped");
    }
}
