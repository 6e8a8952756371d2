//! Request lifecycle events.

use crate::{HttpClientError, Request, Response};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// Event listener callback.
pub type Listener = Arc<dyn Fn(&HttpEvent<'_>) + Send + Sync>;

/// Events emitted by [`EventMiddleware`](crate::middleware::EventMiddleware).
#[derive(Debug)]
pub enum HttpEvent<'a> {
    /// The request is about to continue down the chain.
    RequestSending {
        /// The outgoing request.
        request: &'a Request,
    },
    /// A response came back.
    ResponseReceived {
        /// The request that was sent.
        request: &'a Request,
        /// The response.
        response: &'a Response,
        /// Time spent in the rest of the chain.
        duration: Duration,
    },
    /// The rest of the chain returned an error.
    RequestFailed {
        /// The request that was sent.
        request: &'a Request,
        /// The error, re-raised after dispatch.
        error: &'a HttpClientError,
        /// Time spent in the rest of the chain.
        duration: Duration,
    },
}

impl HttpEvent<'_> {
    /// Name of the `RequestSending` event.
    pub const REQUEST_SENDING: &'static str = "request.sending";
    /// Name of the `ResponseReceived` event.
    pub const RESPONSE_RECEIVED: &'static str = "response.received";
    /// Name of the `RequestFailed` event.
    pub const REQUEST_FAILED: &'static str = "request.failed";

    /// Event name listeners subscribe to.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RequestSending { .. } => Self::REQUEST_SENDING,
            Self::ResponseReceived { .. } => Self::RESPONSE_RECEIVED,
            Self::RequestFailed { .. } => Self::REQUEST_FAILED,
        }
    }

    /// The request the event concerns.
    pub fn request(&self) -> &Request {
        match self {
            Self::RequestSending { request }
            | Self::ResponseReceived { request, .. }
            | Self::RequestFailed { request, .. } => request,
        }
    }

    /// Time spent in the rest of the chain, if the call has finished.
    pub fn duration(&self) -> Option<Duration> {
        match self {
            Self::RequestSending { .. } => None,
            Self::ResponseReceived { duration, .. } | Self::RequestFailed { duration, .. } => {
                Some(*duration)
            }
        }
    }
}

/// Routes events to listeners registered by event name.
///
/// Listeners run synchronously, in registration order.
#[derive(Clone, Default)]
pub struct EventDispatcher {
    listeners: Arc<RwLock<HashMap<String, Vec<Listener>>>>,
}

impl EventDispatcher {
    /// Create a dispatcher with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for `event`.
    pub fn listen<F>(&self, event: impl Into<String>, listener: F)
    where
        F: Fn(&HttpEvent<'_>) + Send + Sync + 'static,
    {
        let event = event.into();
        trace!(event = %event, "Registering event listener");
        self.listeners
            .write()
            .entry(event)
            .or_default()
            .push(Arc::new(listener));
    }

    /// Call every listener registered for the event's name.
    pub fn dispatch(&self, event: &HttpEvent<'_>) {
        let listeners = match self.listeners.read().get(event.name()) {
            Some(listeners) => listeners.clone(),
            None => return,
        };

        for listener in listeners {
            listener(event);
        }
    }

    /// Remove every listener for `event`.
    pub fn forget(&self, event: &str) {
        self.listeners.write().remove(event);
    }

    /// Whether any listener is registered for `event`.
    pub fn has_listeners(&self, event: &str) -> bool {
        self.listeners
            .read()
            .get(event)
            .is_some_and(|listeners| !listeners.is_empty())
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let listeners = self.listeners.read();
        let mut events: Vec<_> = listeners.keys().collect();
        events.sort();
        f.debug_struct("EventDispatcher")
            .field("events", &events)
            .finish()
    }
}
