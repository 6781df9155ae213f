//! reqsched - outbound request scheduler
//!
//! Accepts request descriptors and returns futures of responses, while
//! keeping traffic to a single upstream host inside its limits:
//!
//! - **Concurrency**: at most `max-concurrent` requests in flight
//! - **Rate window**: at most `max-requests-per-window` dispatches per window
//! - **Cooldown**: a fixed pause after every `requests-per-cooldown` requests
//! - **Retry**: connection resets and caller-classified responses are retried
//!   at the head of the queue with linearly growing backoff
//!
//! The HTTP work itself is done by an injected [`Executor`], which receives
//! the scheduler-owned session (cookie jar) with every request.
//!
//! # Example
//!
//! ```ignore
//! use reqsched::{Request, Scheduler, SchedulerConfig, SubmitOptions};
//!
//! let scheduler = Scheduler::spawn(SchedulerConfig::default(), executor, session);
//! let page = scheduler.submit(Request::get(url), SubmitOptions::new().priority()).await?;
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod request;
pub mod scheduler;

pub use config::SchedulerConfig;
pub use error::{SchedulerError, TransportError, TransportErrorKind};
pub use executor::Executor;
pub use request::{Body, Method, Request, Response};
pub use scheduler::{
    RetryPredicate, Scheduler, SchedulerStats, SubmitOptions, Submission, ThrottleReason, default_retry_predicate,
    is_gateway_error,
};
