//! Handle for an in-flight request
//!
//! A [`PendingRequest`] moves from `Pending` to exactly one terminal state:
//! `Delivered` when the outcome is published, or `Cancelled` when the caller
//! cancels first. The transition happens under a single lock, so a cancel
//! racing with completion has exactly one winner.
//!
//! The outcome has two observers fed by the same transition: the completion
//! callback given at submission, and any number of futures from
//! [`PendingRequest::response`]. Cancellation silences both. Cleanup
//! callbacks registered with [`PendingRequest::finally`] run exactly once
//! after either terminal transition.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Notify, watch};
use tracing::debug;
use uuid::Uuid;

use crate::error::DistanceMatrixError;
use crate::models::{ClientResponse, DistanceMatrixResponse};

/// Outcome delivered to the completion observers
pub type RequestResult = Result<ClientResponse<DistanceMatrixResponse>, DistanceMatrixError>;

pub(crate) type CompletionCallback = Box<dyn FnOnce(RequestResult) + Send + 'static>;
type CleanupCallback = Box<dyn FnOnce() + Send + 'static>;

/// Lifecycle state of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestState {
    /// Submitted, no outcome yet
    Pending,
    /// Outcome delivered to the observers
    Delivered,
    /// Cancelled before an outcome was delivered
    Cancelled,
}

impl RequestState {
    /// Whether no further transition is possible
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

struct Slots {
    state: RequestState,
    on_complete: Option<CompletionCallback>,
    cleanup: Vec<CleanupCallback>,
}

/// Runs the taken cleanup callbacks when dropped, including during unwinding
struct CleanupGuard(Vec<CleanupCallback>);

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        for f in self.0.drain(..) {
            f();
        }
    }
}

/// State shared between a handle and the task driving the exchange
pub(crate) struct RequestShared {
    id: Uuid,
    slots: Mutex<Slots>,
    outcome: watch::Sender<Option<RequestResult>>,
    cancel: Notify,
}

impl RequestShared {
    pub(crate) fn new(on_complete: Option<CompletionCallback>) -> Arc<Self> {
        let (outcome, _) = watch::channel(None);
        Arc::new(Self {
            id: Uuid::new_v4(),
            slots: Mutex::new(Slots {
                state: RequestState::Pending,
                on_complete,
                cleanup: Vec::new(),
            }),
            outcome,
            cancel: Notify::new(),
        })
    }

    pub(crate) const fn id(&self) -> Uuid {
        self.id
    }

    pub(crate) fn state(&self) -> RequestState {
        self.slots.lock().state
    }

    /// Publish the outcome; returns false if the request was already terminal
    pub(crate) fn complete(&self, outcome: RequestResult) -> bool {
        let (callback, cleanup) = {
            let mut slots = self.slots.lock();
            if slots.state.is_terminal() {
                return false;
            }
            slots.state = RequestState::Delivered;
            (slots.on_complete.take(), std::mem::take(&mut slots.cleanup))
        };

        let _cleanup = CleanupGuard(cleanup);
        debug!(request_id = %self.id, ok = outcome.is_ok(), "Request completed");

        if let Some(callback) = callback {
            self.outcome.send_replace(Some(outcome.clone()));
            callback(outcome);
        } else {
            self.outcome.send_replace(Some(outcome));
        }
        true
    }

    /// Cancel the request; returns false if it was already terminal
    pub(crate) fn cancel(&self) -> bool {
        let (callback, cleanup) = {
            let mut slots = self.slots.lock();
            if slots.state.is_terminal() {
                return false;
            }
            slots.state = RequestState::Cancelled;
            (slots.on_complete.take(), std::mem::take(&mut slots.cleanup))
        };

        let _cleanup = CleanupGuard(cleanup);
        debug!(request_id = %self.id, "Request cancelled");
        drop(callback);
        self.cancel.notify_one();
        true
    }

    /// Resolves once `cancel` has been called
    pub(crate) async fn cancelled(&self) {
        self.cancel.notified().await;
    }

    fn add_cleanup(&self, f: CleanupCallback) {
        let f = {
            let mut slots = self.slots.lock();
            if !slots.state.is_terminal() {
                slots.cleanup.push(f);
                return;
            }
            f
        };
        f();
    }
}

/// Handle for one submitted query
///
/// Dropping the handle does not cancel the request.
pub struct PendingRequest {
    shared: Arc<RequestShared>,
}

impl PendingRequest {
    pub(crate) const fn new(shared: Arc<RequestShared>) -> Self {
        Self { shared }
    }

    /// Identifier used in log output for this request
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.shared.id()
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> RequestState {
        self.shared.state()
    }

    /// Whether the request is still in flight
    #[must_use]
    pub fn is_pending(&self) -> bool {
        !self.state().is_terminal()
    }

    /// Cancel the request
    ///
    /// If the request is still pending, the completion callback is dropped
    /// without being called, [`response`](Self::response) futures never
    /// resolve, and the in-flight exchange is abandoned. Returns false if
    /// the request had already completed or been cancelled.
    pub fn cancel(&self) -> bool {
        self.shared.cancel()
    }

    /// Register a cleanup callback
    ///
    /// Called exactly once when the request completes, fails or is
    /// cancelled. Runs immediately if the request is already terminal.
    pub fn finally<F>(&self, f: F) -> &Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.add_cleanup(Box::new(f));
        self
    }

    /// Future resolving to the request outcome
    ///
    /// Observes the same outcome as the completion callback. Each call
    /// returns an independent future. If the request is cancelled the future
    /// never resolves; select it against your own signal when cancelling.
    pub fn response(&self) -> impl Future<Output = RequestResult> + Send + 'static {
        let mut rx = self.shared.outcome.subscribe();
        async move {
            let outcome = rx
                .wait_for(Option::is_some)
                .await
                .ok()
                .and_then(|value| value.clone());
            match outcome {
                Some(result) => result,
                None => std::future::pending().await,
            }
        }
    }
}

impl fmt::Debug for PendingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingRequest")
            .field("id", &self.id())
            .field("state", &self.state())
            .finish()
    }
}
