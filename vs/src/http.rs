//! reqwest-backed executor threading a cookie jar through every request

use std::error::Error as StdError;
use std::io;

use async_trait::async_trait;
use reqsched::{Body, Executor, Method, Request, Response, TransportError, TransportErrorKind};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{COOKIE, LOCATION, SET_COOKIE};
use reqwest::{StatusCode, Url};
use tracing::debug;

use crate::config::ServiceConfig;

/// Redirect hops followed before giving up
const MAX_REDIRECTS: usize = 10;

/// Executes request descriptors over HTTP
///
/// Redirects are followed here rather than by reqwest so that cookies set on
/// intermediate hops (a login POST answering 302 with `Set-Cookie`) land in
/// the jar.
pub struct HttpExecutor {
    client: reqwest::Client,
}

impl HttpExecutor {
    pub fn new(config: &ServiceConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { client })
    }

    async fn send_once(
        &self,
        method: reqwest::Method,
        url: &Url,
        request: &Request,
        with_body: bool,
        jar: &Jar,
    ) -> Result<reqwest::Response, TransportError> {
        let mut builder = self.client.request(method, url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(cookie) = jar.cookies(url) {
            builder = builder.header(COOKIE, cookie);
        }
        if with_body {
            builder = match &request.body {
                Body::Empty => builder,
                Body::Form(fields) => builder.form(fields),
                Body::Bytes(bytes) => builder.body(bytes.clone()),
            };
        }

        let resp = builder.send().await.map_err(classify)?;

        let mut set_cookies = resp.headers().get_all(SET_COOKIE).iter().peekable();
        if set_cookies.peek().is_some() {
            jar.set_cookies(&mut set_cookies, url);
        }
        Ok(resp)
    }
}

#[async_trait]
impl Executor for HttpExecutor {
    type Session = Jar;

    async fn execute(&self, request: &Request, jar: &Jar) -> Result<Response, TransportError> {
        let mut url =
            Url::parse(&request.url).map_err(|e| TransportError::other(format!("invalid url {}: {}", request.url, e)))?;
        let mut method = to_reqwest_method(request.method);
        let mut with_body = true;

        for _ in 0..=MAX_REDIRECTS {
            let resp = self.send_once(method.clone(), &url, request, with_body, jar).await?;
            let status = resp.status();

            let location = resp.headers().get(LOCATION).and_then(|v| v.to_str().ok());
            if status.is_redirection()
                && let Some(next) = location.and_then(|loc| url.join(loc).ok())
            {
                debug!(%status, from = %url, to = %next, "HttpExecutor::execute: following redirect");
                if matches!(
                    status,
                    StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND | StatusCode::SEE_OTHER
                ) && method != reqwest::Method::GET
                    && method != reqwest::Method::HEAD
                {
                    method = reqwest::Method::GET;
                    with_body = false;
                }
                url = next;
                continue;
            }

            let headers = resp
                .headers()
                .iter()
                .map(|(name, value)| {
                    (
                        name.as_str().to_string(),
                        String::from_utf8_lossy(value.as_bytes()).into_owned(),
                    )
                })
                .collect();
            let final_url = resp.url().to_string();
            let body = resp.bytes().await.map_err(classify)?;

            return Ok(Response {
                status: status.as_u16(),
                url: final_url,
                headers,
                body: body.to_vec(),
            });
        }

        // Only reached when the last allowed hop redirected again
        Err(TransportError::other(format!(
            "too many redirects from {}",
            request.url
        )))
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
        Method::Head => reqwest::Method::HEAD,
        Method::Patch => reqwest::Method::PATCH,
    }
}

/// Map a reqwest failure onto the scheduler's transport taxonomy
fn classify(err: reqwest::Error) -> TransportError {
    let message = error_chain(&err);
    let kind = if is_reset(&err) {
        TransportErrorKind::ConnectionReset
    } else if err.is_timeout() {
        TransportErrorKind::Timeout
    } else if err.is_connect() {
        TransportErrorKind::Connect
    } else {
        TransportErrorKind::Other
    };
    TransportError::new(kind, message)
}

/// True when any error in the source chain is a reset or aborted socket
fn is_reset(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(io_err) = e.downcast_ref::<io::Error>()
            && matches!(
                io_err.kind(),
                io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted
            )
        {
            return true;
        }
        current = e.source();
    }
    false
}

fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut current = err.source();
    while let Some(e) = current {
        message.push_str(": ");
        message.push_str(&e.to_string());
        current = e.source();
    }
    message
}
