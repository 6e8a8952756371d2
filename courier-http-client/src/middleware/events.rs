//! Lifecycle event middleware.

use super::{Middleware, Next};
use crate::events::{EventDispatcher, HttpEvent};
use crate::{Request, Response, Result};
use async_trait::async_trait;
use std::time::Instant;

/// Announces each request to an [`EventDispatcher`].
///
/// Emits `request.sending` before continuing, then `response.received` or
/// `request.failed` with the time spent in the rest of the chain. Errors
/// are returned unchanged after dispatch.
#[derive(Debug, Clone, Default)]
pub struct EventMiddleware {
    dispatcher: EventDispatcher,
}

impl EventMiddleware {
    /// Dispatch to `dispatcher`.
    pub fn new(dispatcher: EventDispatcher) -> Self {
        Self { dispatcher }
    }

    /// The dispatcher events go to.
    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }
}

#[async_trait]
impl Middleware for EventMiddleware {
    async fn handle(&self, request: Request, next: Next<'_>) -> Result<Response> {
        self.dispatcher
            .dispatch(&HttpEvent::RequestSending { request: &request });

        let start = Instant::now();
        let result = next.run(request.clone()).await;
        let duration = start.elapsed();

        match &result {
            Ok(response) => self.dispatcher.dispatch(&HttpEvent::ResponseReceived {
                request: &request,
                response,
                duration,
            }),
            Err(error) => self.dispatcher.dispatch(&HttpEvent::RequestFailed {
                request: &request,
                error,
                duration,
            }),
        }

        result
    }
}
