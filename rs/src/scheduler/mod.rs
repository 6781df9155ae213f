//! Request scheduler
//!
//! Drives HTTP requests against one upstream host under three independent
//! throttles (concurrency, fixed rate window, periodic cooldown) and retries
//! transient failures with growing backoff.

mod core;
mod handle;
mod queue;
mod throttle;

pub use handle::{Scheduler, Submission};
pub use queue::{RetryPredicate, SchedulerStats, SubmitOptions, default_retry_predicate, is_gateway_error};
pub use throttle::ThrottleReason;
