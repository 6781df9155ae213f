//! Scripted executor shared by the integration tests

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqsched::{Executor, Request, Response, TransportError};
use tokio::time::Instant;

pub type Outcome = Result<Response, TransportError>;

/// One observed execution
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub url: String,
    /// Order in which executions began
    pub seq: usize,
    pub started: Instant,
    pub finished: Instant,
}

/// Executor replaying per-URL outcomes, then answering 200
///
/// Every execution takes `latency` (tokio time, so paused clocks advance it)
/// and is recorded with its start/finish instants.
pub struct ScriptedExecutor {
    scripts: Mutex<HashMap<String, VecDeque<Outcome>>>,
    latency: Duration,
    log: Mutex<Vec<Dispatch>>,
    started: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedExecutor {
    pub fn new(latency: Duration) -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            latency,
            log: Mutex::new(Vec::new()),
            started: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn script(self, url: &str, outcomes: Vec<Outcome>) -> Self {
        self.scripts.lock().unwrap().insert(url.to_string(), outcomes.into());
        self
    }

    pub fn log(&self) -> Vec<Dispatch> {
        self.log.lock().unwrap().clone()
    }

    /// URLs in dispatch-start order
    pub fn dispatch_order(&self) -> Vec<String> {
        let mut log = self.log();
        log.sort_by_key(|d| (d.started, d.seq));
        log.into_iter().map(|d| d.url).collect()
    }

    pub fn attempts(&self, url: &str) -> usize {
        self.log.lock().unwrap().iter().filter(|d| d.url == url).count()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Executor for ScriptedExecutor {
    type Session = ();

    async fn execute(&self, request: &Request, _session: &()) -> Result<Response, TransportError> {
        let started = Instant::now();
        let seq = self.started.fetch_add(1, Ordering::SeqCst);
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);

        tokio::time::sleep(self.latency).await;

        let outcome = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&request.url)
            .and_then(|outcomes| outcomes.pop_front())
            .unwrap_or_else(|| Ok(Response::new(200, request.url.clone())));

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.log.lock().unwrap().push(Dispatch {
            url: request.url.clone(),
            seq,
            started,
            finished: Instant::now(),
        });
        outcome
    }
}

pub fn status(code: u16, url: &str) -> Outcome {
    Ok(Response::new(code, url))
}

pub fn reset() -> Outcome {
    Err(TransportError::connection_reset("connection reset by peer"))
}
