//! Scheduler - client interface to the event loop

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use crate::executor::Executor;
use crate::request::{Request, Response};

use super::core::{Command, SchedulerCore};
use super::queue::{SchedulerStats, SubmitOptions, Task};

/// Handle to a running scheduler
///
/// Cloneable; every clone feeds the same event loop, queue and session. The
/// loop keeps running until all handles are dropped and the queue drains.
pub struct Scheduler<E: Executor> {
    tx: mpsc::UnboundedSender<Command>,
    session: Arc<E::Session>,
    next_id: Arc<AtomicU64>,
    max_retries: u32,
}

impl<E: Executor> Clone for Scheduler<E> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            session: Arc::clone(&self.session),
            next_id: Arc::clone(&self.next_id),
            max_retries: self.max_retries,
        }
    }
}

impl<E: Executor> Scheduler<E> {
    /// Start the event loop on the current tokio runtime
    pub fn spawn(config: SchedulerConfig, executor: E, session: E::Session) -> Self {
        debug!(?config, "Scheduler::spawn: called");
        let (tx, rx) = mpsc::unbounded_channel();
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        let session = Arc::new(session);
        let max_retries = config.max_retries;

        let core = SchedulerCore::new(config, Arc::new(executor), Arc::clone(&session), done_tx);
        tokio::spawn(core.run(rx, done_rx));

        Self {
            tx,
            session,
            next_id: Arc::new(AtomicU64::new(1)),
            max_retries,
        }
    }

    /// Queue a request; the returned future resolves with its final outcome
    ///
    /// The request is enqueued before this returns, so submission order is
    /// call order regardless of when the future is first polled.
    pub fn submit(&self, request: Request, options: SubmitOptions) -> Submission {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(task_id = id, method = %request.method, url = %request.url, ?options, "Scheduler::submit: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        let task = Task::new(id, request, options, self.max_retries, reply_tx);

        match self.tx.send(Command::Submit(task)) {
            Ok(()) => Submission::pending(reply_rx),
            Err(_) => {
                debug!(task_id = id, "Scheduler::submit: event loop gone");
                Submission::failed(SchedulerError::Closed)
            }
        }
    }

    /// Submit with default options
    pub fn request(&self, request: Request) -> Submission {
        self.submit(request, SubmitOptions::default())
    }

    /// The session shared by every dispatched request
    pub fn session(&self) -> &E::Session {
        &self.session
    }

    /// Snapshot of counters and live throttle state
    pub async fn stats(&self) -> Result<SchedulerStats, SchedulerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Command::Stats { reply_tx })
            .map_err(|_| SchedulerError::Closed)?;
        reply_rx.await.map_err(|_| SchedulerError::Closed)
    }
}

/// Eventual outcome of one submitted request
#[must_use = "a Submission does nothing unless awaited, though the request is already queued"]
pub struct Submission {
    state: SubmissionState,
}

enum SubmissionState {
    Pending(oneshot::Receiver<Result<Response, SchedulerError>>),
    Failed(Option<SchedulerError>),
}

impl Submission {
    fn pending(rx: oneshot::Receiver<Result<Response, SchedulerError>>) -> Self {
        Self {
            state: SubmissionState::Pending(rx),
        }
    }

    fn failed(err: SchedulerError) -> Self {
        Self {
            state: SubmissionState::Failed(Some(err)),
        }
    }
}

impl Future for Submission {
    type Output = Result<Response, SchedulerError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().state {
            SubmissionState::Pending(rx) => Pin::new(rx).poll(cx).map(|reply| match reply {
                Ok(result) => result,
                Err(_) => Err(SchedulerError::Closed),
            }),
            SubmissionState::Failed(err) => Poll::Ready(Err(err.take().unwrap_or(SchedulerError::Closed))),
        }
    }
}
