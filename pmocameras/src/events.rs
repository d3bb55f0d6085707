//! Fan-out of image updates to subscribers
//!
//! Every subscriber owns a bounded channel. Publishing uses `try_send`, so a
//! slow or absent subscriber never blocks a poll loop: when its buffer is full
//! the event is dropped for that subscriber only. An event published while
//! nobody listens is simply lost.

use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

/// Default buffer size of a subscription
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 16;

/// Publisher of events of type `E`
///
/// Cloning shares the same subscriber list.
pub struct EventPublisher<E> {
    subscribers: Arc<Mutex<Vec<mpsc::Sender<E>>>>,
}

impl<E> Clone for EventPublisher<E> {
    fn clone(&self) -> Self {
        Self {
            subscribers: Arc::clone(&self.subscribers),
        }
    }
}

impl<E: Clone + Send + 'static> EventPublisher<E> {
    /// Crée un nouveau publisher vide
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<mpsc::Sender<E>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Ajoute un subscriber via un channel
    pub fn subscribe_sender(&self, tx: mpsc::Sender<E>) {
        self.lock().push(tx);
    }

    /// Creates a new subscription with a buffer of `capacity` events
    pub fn subscribe(&self, capacity: usize) -> EventReceiver<E> {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        self.subscribe_sender(tx);
        EventReceiver::new(rx)
    }

    /// Publishes to every live subscriber without waiting
    ///
    /// Returns how many subscribers accepted the event. Closed subscriptions
    /// are pruned on the way.
    pub fn publish(&self, event: E) -> usize {
        let mut subscribers = self.lock();
        Self::dispatch(&mut subscribers, event)
    }

    /// Publishes only if `token` is still active
    ///
    /// The check and the dispatch happen under the subscriber lock; paired with
    /// [`fence`](Self::fence) this guarantees that nothing is delivered once
    /// the token has been cancelled and the fence passed.
    pub fn publish_unless_cancelled(&self, event: E, token: &CancellationToken) -> Option<usize> {
        let mut subscribers = self.lock();
        if token.is_cancelled() {
            return None;
        }
        Some(Self::dispatch(&mut subscribers, event))
    }

    /// Waits for any in-progress publication to finish
    pub fn fence(&self) {
        drop(self.lock());
    }

    /// Retourne le nombre de subscribers actifs
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.lock();
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }

    fn dispatch(subscribers: &mut Vec<mpsc::Sender<E>>, event: E) -> usize {
        let mut delivered = 0;
        subscribers.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => true,
            Err(TrySendError::Closed(_)) => false,
        });
        delivered
    }
}

impl<E: Clone + Send + 'static> Default for EventPublisher<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving end of a subscription
pub struct EventReceiver<E> {
    rx: mpsc::Receiver<E>,
}

impl<E> EventReceiver<E> {
    pub fn new(rx: mpsc::Receiver<E>) -> Self {
        Self { rx }
    }

    /// Attend le prochain événement
    pub async fn recv(&mut self) -> Option<E> {
        self.rx.recv().await
    }

    /// Tente de recevoir un événement sans bloquer
    pub fn try_recv(&mut self) -> Result<E, mpsc::error::TryRecvError> {
        self.rx.try_recv()
    }
}
