//! versionscraper - scraping client built on the reqsched request scheduler
//!
//! [`Client`] owns one [`reqsched::Scheduler`] driving an [`HttpExecutor`],
//! so every page fetch shares one cookie session and one set of throttles.

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod report;

pub use client::Client;
pub use config::{Config, ServiceConfig};
pub use error::ClientError;
pub use http::HttpExecutor;
pub use report::{FetchOutcome, FetchReport};
