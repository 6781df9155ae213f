//! Executor trait definition

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::request::{Request, Response};

/// The HTTP execution primitive driven by the scheduler
///
/// One call issues exactly one request. The session is owned by the scheduler
/// and handed to every execution, so cookies set by one response are visible
/// to every request dispatched after it. Per-request timeouts belong here,
/// not in the scheduler.
#[async_trait]
pub trait Executor: Send + Sync + 'static {
    /// Shared session state (cookie jar) threaded through every request
    type Session: Send + Sync + 'static;

    async fn execute(&self, request: &Request, session: &Self::Session) -> Result<Response, TransportError>;
}

#[async_trait]
impl<E: Executor> Executor for Arc<E> {
    type Session = E::Session;

    async fn execute(&self, request: &Request, session: &Self::Session) -> Result<Response, TransportError> {
        (**self).execute(request, session).await
    }
}
