//! Queue types for the scheduler

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::oneshot;

use crate::error::SchedulerError;
use crate::request::{Request, Response};

use super::throttle::ThrottleReason;

/// Decides whether a completed response should be retried
pub type RetryPredicate = Arc<dyn Fn(&Response) -> bool + Send + Sync>;

/// Gateway-class statuses (502, 503, 504)
pub fn is_gateway_error(response: &Response) -> bool {
    matches!(response.status, 502..=504)
}

pub fn default_retry_predicate() -> RetryPredicate {
    Arc::new(is_gateway_error)
}

/// Per-request submission options
#[derive(Clone, Default)]
pub struct SubmitOptions {
    /// Insert ahead of every non-priority task
    pub priority: bool,

    /// Retry classification for responses; gateway errors when unset
    pub retry_predicate: Option<RetryPredicate>,

    /// Start with the retry budget exhausted
    pub no_retry: bool,
}

impl SubmitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn priority(mut self) -> Self {
        self.priority = true;
        self
    }

    pub fn no_retry(mut self) -> Self {
        self.no_retry = true;
        self
    }

    pub fn retry_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Response) -> bool + Send + Sync + 'static,
    {
        self.retry_predicate = Some(Arc::new(predicate));
        self
    }
}

impl fmt::Debug for SubmitOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmitOptions")
            .field("priority", &self.priority)
            .field("retry_predicate", &self.retry_predicate.as_ref().map(|_| "custom"))
            .field("no_retry", &self.no_retry)
            .finish()
    }
}

pub(crate) type Completion = oneshot::Sender<Result<Response, SchedulerError>>;

/// One pending or in-flight request
pub(crate) struct Task {
    pub id: u64,
    pub request: Arc<Request>,
    pub retry_count: u32,
    pub attempts: u32,
    pub retry_predicate: RetryPredicate,
    pub priority: bool,
    /// Priority tasks and requeued retries sit in the head run of the queue
    head: bool,
    completion: Completion,
}

impl Task {
    pub fn new(id: u64, request: Request, options: SubmitOptions, max_retries: u32, completion: Completion) -> Self {
        Self {
            id,
            request: Arc::new(request),
            retry_count: if options.no_retry { max_retries } else { 0 },
            attempts: 0,
            retry_predicate: options.retry_predicate.unwrap_or_else(default_retry_predicate),
            priority: options.priority,
            head: options.priority,
            completion,
        }
    }

    pub fn is_retriable(&self, response: &Response) -> bool {
        (self.retry_predicate)(response)
    }

    /// Deliver the outcome; consuming the task makes this happen once
    pub fn complete(self, result: Result<Response, SchedulerError>) {
        // A dropped Submission just means nobody is listening
        let _ = self.completion.send(result);
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("method", &self.request.method)
            .field("url", &self.request.url)
            .field("retry_count", &self.retry_count)
            .field("attempts", &self.attempts)
            .field("priority", &self.priority)
            .finish()
    }
}

/// Pending tasks, head is next to be considered for dispatch
#[derive(Debug, Default)]
pub(crate) struct TaskQueue {
    tasks: VecDeque<Task>,
}

impl TaskQueue {
    /// Enqueue a new task: priority tasks go behind the head run, others at the tail
    pub fn push(&mut self, task: Task) {
        if task.head {
            let at = self.tasks.iter().take_while(|t| t.head).count();
            self.tasks.insert(at, task);
        } else {
            self.tasks.push_back(task);
        }
    }

    /// Put a retried task back at the very front
    pub fn requeue(&mut self, mut task: Task) {
        task.head = true;
        self.tasks.push_front(task);
    }

    pub fn pop(&mut self) -> Option<Task> {
        self.tasks.pop_front()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Statistics for the scheduler
#[derive(Debug, Default, Clone, Serialize)]
pub struct SchedulerStats {
    pub total_submitted: u64,
    pub total_dispatched: u64,
    pub total_retried: u64,
    pub total_resolved: u64,
    pub total_rejected: u64,
    pub cooldowns: u64,
    pub rate_limited: u64,
    pub peak_in_flight: usize,
    pub peak_queue_depth: usize,
    pub in_flight: usize,
    pub queued: usize,
    pub throttled: Option<ThrottleReason>,
    /// Dispatches left in the current rate window, None when unlimited
    pub window_remaining: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: u64, priority: bool) -> (Task, oneshot::Receiver<Result<Response, SchedulerError>>) {
        let (tx, rx) = oneshot::channel();
        let options = SubmitOptions {
            priority,
            ..Default::default()
        };
        (Task::new(id, Request::get(format!("/{id}")), options, 3, tx), rx)
    }

    fn drain(queue: &mut TaskQueue) -> Vec<u64> {
        std::iter::from_fn(|| queue.pop()).map(|t| t.id).collect()
    }

    #[test]
    fn test_fifo_within_class() {
        let mut queue = TaskQueue::default();
        for (id, priority) in [(1, false), (2, true), (3, false), (4, true)] {
            queue.push(task(id, priority).0);
        }
        assert_eq!(queue.len(), 4);
        assert_eq!(drain(&mut queue), vec![2, 4, 1, 3]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_requeued_task_goes_first() {
        let mut queue = TaskQueue::default();
        queue.push(task(1, false).0);
        queue.push(task(2, true).0);
        queue.requeue(task(3, false).0);

        // Work submitted after the failure lines up behind the retry
        queue.push(task(4, true).0);
        assert_eq!(drain(&mut queue), vec![3, 2, 4, 1]);
    }

    #[test]
    fn test_no_retry_exhausts_budget() {
        let (tx, _rx) = oneshot::channel();
        let task = Task::new(1, Request::get("/"), SubmitOptions::new().no_retry(), 5, tx);
        assert_eq!(task.retry_count, 5);
        assert_eq!(task.attempts, 0);
    }

    #[test]
    fn test_default_predicate_is_gateway_errors() {
        let (t, _rx) = task(1, false);
        for status in [502, 503, 504] {
            assert!(t.is_retriable(&Response::new(status, "")));
        }
        for status in [200, 404, 429, 500, 505] {
            assert!(!t.is_retriable(&Response::new(status, "")));
        }
    }

    #[test]
    fn test_custom_predicate() {
        let (tx, _rx) = oneshot::channel();
        let options = SubmitOptions::new().retry_when(|r| r.status == 429);
        let task = Task::new(1, Request::get("/"), options, 3, tx);
        assert!(task.is_retriable(&Response::new(429, "")));
        assert!(!task.is_retriable(&Response::new(503, "")));
    }

    #[tokio::test]
    async fn test_complete_delivers_once() {
        let (t, rx) = task(7, false);
        t.complete(Ok(Response::new(200, "/7")));
        assert_eq!(rx.await.unwrap().unwrap().status, 200);
    }

    #[test]
    fn test_options_debug_hides_closure() {
        let options = SubmitOptions::new().priority().retry_when(|_| true);
        let rendered = format!("{options:?}");
        assert!(rendered.contains("priority: true"));
        assert!(rendered.contains("custom"));
    }
}
