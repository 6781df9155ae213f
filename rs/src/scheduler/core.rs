//! Scheduler event loop
//!
//! All throttle state lives in one task. It wakes for three things: a
//! submission, a dispatch completing, or the throttle deadline passing.
//! Every wake-up ends with an admission pass.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

use crate::config::SchedulerConfig;
use crate::error::{SchedulerError, TransportError};
use crate::executor::Executor;
use crate::request::Response;

use super::queue::{SchedulerStats, Task, TaskQueue};
use super::throttle::{Cooldown, RateWindow, Throttle, ThrottleReason, backoff};

/// Requests from scheduler handles
pub(crate) enum Command {
    Submit(Task),
    Stats { reply_tx: oneshot::Sender<SchedulerStats> },
}

/// A finished dispatch reporting back to the loop
pub(crate) struct Completion {
    task: Task,
    outcome: Result<Response, TransportError>,
}

pub(crate) struct SchedulerCore<E: Executor> {
    config: SchedulerConfig,
    executor: Arc<E>,
    session: Arc<E::Session>,
    queue: TaskQueue,
    available_slots: usize,
    cooldown: Cooldown,
    rate_window: RateWindow,
    throttle: Throttle,
    done_tx: mpsc::UnboundedSender<Completion>,
    stats: SchedulerStats,
}

impl<E: Executor> SchedulerCore<E> {
    pub(crate) fn new(
        config: SchedulerConfig,
        executor: Arc<E>,
        session: Arc<E::Session>,
        done_tx: mpsc::UnboundedSender<Completion>,
    ) -> Self {
        let origin = Instant::now();
        Self {
            available_slots: config.slots(),
            cooldown: Cooldown::new(config.cooldown_every(), config.cooldown()),
            rate_window: RateWindow::new(origin, config.rate_window(), config.window_limit()),
            throttle: Throttle::default(),
            queue: TaskQueue::default(),
            stats: SchedulerStats::default(),
            config,
            executor,
            session,
            done_tx,
        }
    }

    /// Run until every handle is gone and no work remains
    pub(crate) async fn run(
        mut self,
        mut rx: mpsc::UnboundedReceiver<Command>,
        mut done_rx: mpsc::UnboundedReceiver<Completion>,
    ) {
        info!(config = ?self.config, "Scheduler started");
        let mut open = true;

        loop {
            if !open && self.queue.is_empty() && self.in_flight() == 0 {
                break;
            }

            let deadline = self.throttle.deadline();
            tokio::select! {
                cmd = rx.recv(), if open => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => {
                        debug!("run: all handles dropped, draining");
                        open = false;
                    }
                },
                Some(done) = done_rx.recv() => self.handle_completion(done),
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.handle_timer();
                }
            }

            self.admit();
        }

        info!(stats = ?self.stats, "Scheduler stopped");
    }

    fn in_flight(&self) -> usize {
        self.config.slots() - self.available_slots
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Submit(task) => {
                debug!(task_id = task.id, url = %task.request.url, priority = task.priority, "handle_command: submit");
                self.stats.total_submitted += 1;
                self.queue.push(task);
                self.stats.peak_queue_depth = self.stats.peak_queue_depth.max(self.queue.len());
            }
            Command::Stats { reply_tx } => {
                let _ = reply_tx.send(self.snapshot());
            }
        }
    }

    fn snapshot(&mut self) -> SchedulerStats {
        self.rate_window.refresh(Instant::now());
        SchedulerStats {
            in_flight: self.in_flight(),
            queued: self.queue.len(),
            throttled: self.throttle.reason(),
            window_remaining: self.rate_window.remaining(),
            ..self.stats.clone()
        }
    }

    fn handle_timer(&mut self) {
        let reason = self.throttle.reason();
        if self.throttle.expire() {
            self.cooldown.reset();
        }
        debug!(?reason, "handle_timer: throttle lifted");
    }

    /// Dispatch queued tasks while every throttle allows it
    fn admit(&mut self) {
        loop {
            if self.throttle.is_active() || self.available_slots == 0 || self.queue.is_empty() {
                return;
            }

            let now = Instant::now();
            self.rate_window.refresh(now);
            if self.rate_window.exhausted() {
                let until = self.rate_window.resets_at();
                warn!(
                    wait_ms = until.saturating_duration_since(now).as_millis() as u64,
                    queued = self.queue.len(),
                    "Rate window exhausted, pausing"
                );
                self.stats.rate_limited += 1;
                self.throttle.extend(until, ThrottleReason::RateWindow);
                return;
            }

            match self.queue.pop() {
                Some(task) => self.dispatch(task),
                None => return,
            }
        }
    }

    fn dispatch(&mut self, mut task: Task) {
        self.available_slots -= 1;
        self.rate_window.take();
        task.attempts += 1;

        self.stats.total_dispatched += 1;
        self.stats.peak_in_flight = self.stats.peak_in_flight.max(self.in_flight());
        debug!(
            task_id = task.id,
            method = %task.request.method,
            url = %task.request.url,
            attempt = task.attempts,
            "dispatch: sending"
        );

        let executor = Arc::clone(&self.executor);
        let session = Arc::clone(&self.session);
        let request = Arc::clone(&task.request);
        let done_tx = self.done_tx.clone();
        tokio::spawn(async move {
            let execution = tokio::spawn(async move { executor.execute(&request, &session).await });
            // A panicking executor still yields a completion
            let outcome = match execution.await {
                Ok(outcome) => outcome,
                Err(e) => Err(TransportError::other(format!("executor task failed: {e}"))),
            };
            let _ = done_tx.send(Completion { task, outcome });
        });
    }

    fn handle_completion(&mut self, Completion { mut task, outcome }: Completion) {
        self.available_slots += 1;
        let now = Instant::now();

        if !self.throttle.is_active() && self.cooldown.record() {
            info!(pause_ms = self.cooldown.pause().as_millis() as u64, "Cooldown pause");
            self.stats.cooldowns += 1;
            self.throttle.extend(now + self.cooldown.pause(), ThrottleReason::Cooldown);
        }

        let retriable = match &outcome {
            Ok(response) => task.is_retriable(response),
            Err(e) => e.is_connection_reset(),
        };

        if retriable && task.retry_count < self.config.max_retries {
            task.retry_count += 1;
            let delay = backoff(self.config.retry_backoff(), task.retry_count);
            match &outcome {
                Ok(response) => warn!(
                    task_id = task.id,
                    url = %task.request.url,
                    status = response.status,
                    retry = task.retry_count,
                    backoff_ms = delay.as_millis() as u64,
                    "Retrying after unsatisfactory response"
                ),
                Err(e) => warn!(
                    task_id = task.id,
                    url = %task.request.url,
                    error = %e,
                    retry = task.retry_count,
                    backoff_ms = delay.as_millis() as u64,
                    "Retrying after transport error"
                ),
            }
            self.stats.total_retried += 1;
            self.queue.requeue(task);
            self.throttle.extend(now + delay, ThrottleReason::Backoff);
            return;
        }

        let attempts = task.attempts;
        let result = match outcome {
            Ok(response) if !retriable => Ok(response),
            Ok(response) => Err(SchedulerError::Response {
                attempts,
                status: response.status,
                url: response.url.clone(),
                response: Box::new(response),
            }),
            Err(source) => Err(SchedulerError::Transport { attempts, source }),
        };

        match &result {
            Ok(response) => {
                debug!(task_id = task.id, status = response.status, attempts, "handle_completion: resolved");
                self.stats.total_resolved += 1;
            }
            Err(e) => {
                warn!(task_id = task.id, url = %task.request.url, error = %e, "Request failed");
                self.stats.total_rejected += 1;
            }
        }
        task.complete(result);
    }
}
