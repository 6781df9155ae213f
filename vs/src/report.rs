//! Per-run fetch report

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use eyre::{Context, Result};
use reqsched::{Response, SchedulerStats};
use serde::Serialize;

use crate::error::ClientError;

const SUMMARY_FILE: &str = "summary.json";

/// Result of fetching one path
#[derive(Debug, Clone, Serialize)]
pub struct FetchOutcome {
    pub path: String,
    pub status: Option<u16>,
    pub bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl FetchOutcome {
    pub fn from_result(path: &str, result: &Result<Response, ClientError>) -> Self {
        match result {
            Ok(resp) => Self {
                path: path.to_string(),
                status: Some(resp.status),
                bytes: resp.body.len(),
                attempts: None,
                error: None,
                file: None,
            },
            Err(e) => Self {
                path: path.to_string(),
                status: e.status(),
                bytes: 0,
                attempts: e.attempts(),
                error: Some(e.to_string()),
                file: None,
            },
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Summary of a `vs fetch` run, written as `summary.json`
#[derive(Debug, Clone, Serialize)]
pub struct FetchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub outcomes: Vec<FetchOutcome>,
    pub stats: Option<SchedulerStats>,
}

impl FetchReport {
    pub fn start() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            outcomes: Vec::new(),
            stats: None,
        }
    }

    pub fn finish(&mut self, stats: Option<SchedulerStats>) {
        self.finished_at = Some(Utc::now());
        self.stats = stats;
    }

    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_ok()).count()
    }

    /// Write `summary.json` into `dir`
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(SUMMARY_FILE);
        let json = serde_json::to_string_pretty(self).context("Failed to serialize fetch report")?;
        fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}

/// File name a fetched path is saved under
///
/// Everything outside `[A-Za-z0-9._-]` becomes `_`; an empty result is `index`.
pub fn file_name_for(path: &str) -> String {
    let trimmed = path
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(path)
        .trim_matches('/');
    let name: String = trimmed
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if name.is_empty() { "index".to_string() } else { name }
}

/// One distinct file name per path, in order
///
/// Names come from [`file_name_for`]. A name already taken in the batch (or
/// the summary file's name) gets a `-2`, `-3`, ... suffix.
pub fn unique_file_names<S: AsRef<str>>(paths: &[S]) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::from([SUMMARY_FILE.to_string()]);
    paths
        .iter()
        .map(|path| {
            let base = file_name_for(path.as_ref());
            let mut name = base.clone();
            let mut n = 1;
            while !used.insert(name.clone()) {
                n += 1;
                name = format!("{}-{}", base, n);
            }
            name
        })
        .collect()
}
