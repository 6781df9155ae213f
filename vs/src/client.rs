//! Upstream client: one cookie session, one scheduler

use futures::future::join_all;
use reqsched::{Request, Response, Scheduler, SchedulerStats, SubmitOptions};
use reqwest::Url;
use reqwest::cookie::CookieStore;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::ClientError;
use crate::http::HttpExecutor;

/// Logged-in view of the upstream service
///
/// Every request goes through the client's own scheduler, so each client
/// holds an independent session and its own throttle state. Must be created
/// inside a tokio runtime.
pub struct Client {
    base_url: Url,
    login_path: String,
    scheduler: Scheduler<HttpExecutor>,
}

impl Client {
    pub fn new(config: &Config) -> Result<Self, ClientError> {
        let base_url = Url::parse(&config.service.base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", config.service.base_url, e)))?;
        let executor = HttpExecutor::new(&config.service)?;
        let scheduler = Scheduler::spawn(config.scheduler.clone(), executor, Default::default());

        info!(base_url = %base_url, "Client created");
        Ok(Self {
            base_url,
            login_path: config.service.login_path.clone(),
            scheduler,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a path (or absolute URL) against the base URL
    pub fn resolve(&self, path: &str) -> Result<Url, ClientError> {
        if let Ok(url) = Url::parse(path) {
            return Ok(url);
        }
        self.base_url
            .join(path)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", path, e)))
    }

    /// Log in; the session cookie is kept for every later request
    pub async fn login(&self, email: &str, password: &str) -> Result<(), ClientError> {
        let url = self.resolve(&self.login_path)?;
        debug!(%url, "Client::login: called");

        let request = Request::post(url.as_str()).form([("email", email), ("password", password)]);
        let resp = self.scheduler.submit(request, SubmitOptions::new().priority()).await?;

        if !(200..400).contains(&resp.status) {
            warn!(status = resp.status, "Client::login: rejected");
            return Err(ClientError::LoginFailed(format!("HTTP {} from {}", resp.status, resp.url)));
        }
        if self.scheduler.session().cookies(&self.base_url).is_none() {
            warn!("Client::login: no session cookie");
            return Err(ClientError::LoginFailed("no session cookie was set".to_string()));
        }

        info!("Logged in");
        Ok(())
    }

    pub async fn get(&self, path: &str) -> Result<Response, ClientError> {
        self.get_with(path, SubmitOptions::default()).await
    }

    /// GET through the scheduler; non-2xx statuses become errors
    pub async fn get_with(&self, path: &str, options: SubmitOptions) -> Result<Response, ClientError> {
        let url = self.resolve(path)?;
        debug!(%url, ?options, "Client::get_with: called");

        let resp = self.scheduler.submit(Request::get(url.as_str()), options).await?;
        check_status(resp)
    }

    /// Fetch every path; results come back in the order given
    ///
    /// All requests are queued before the first one is awaited, so the
    /// scheduler sees the whole batch at once.
    pub async fn fetch_all<S>(&self, paths: &[S], options: SubmitOptions) -> Vec<Result<Response, ClientError>>
    where
        S: AsRef<str>,
    {
        debug!(count = paths.len(), "Client::fetch_all: called");
        let pending: Vec<_> = paths
            .iter()
            .map(|path| {
                let submitted = self
                    .resolve(path.as_ref())
                    .map(|url| self.scheduler.submit(Request::get(url.as_str()), options.clone()));
                async move {
                    match submitted {
                        Ok(submission) => submission.await.map_err(ClientError::from).and_then(check_status),
                        Err(e) => Err(e),
                    }
                }
            })
            .collect();
        join_all(pending).await
    }

    pub async fn stats(&self) -> Result<SchedulerStats, ClientError> {
        Ok(self.scheduler.stats().await?)
    }
}

fn check_status(resp: Response) -> Result<Response, ClientError> {
    if resp.is_success() {
        Ok(resp)
    } else {
        Err(ClientError::Status {
            status: resp.status,
            url: resp.url,
        })
    }
}
