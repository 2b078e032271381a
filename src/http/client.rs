//! Blocking HTTP client with configurable politeness (delay between requests).

use super::{Fetch, Method, Request};
use crate::error::SourceError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::sync::Mutex;
use std::time::{Duration, Instant};

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";
/// Request timeout used when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Delay between requests used when none is configured.
pub const DEFAULT_DELAY_MS: u64 = 500;
const MAX_REDIRECTS: usize = 10;

/// Blocking HTTP client that enforces a delay between requests.
///
/// Shareable across threads: the politeness slot is reserved under a lock and the
/// sleep happens outside it.
#[derive(Debug)]
pub struct PoliteClient {
    inner: reqwest::blocking::Client,
    delay: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl PoliteClient {
    /// Build a polite client with default User-Agent, timeout, and delay.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::builder().build()
    }

    pub fn builder() -> PoliteClientBuilder {
        PoliteClientBuilder::default()
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    fn wait_delay(&self) {
        let wait = {
            let mut slot = match self.next_slot.lock() {
                Ok(g) => g,
                Err(poisoned) => poisoned.into_inner(),
            };
            let now = Instant::now();
            let start = match *slot {
                Some(at) if at > now => at,
                _ => now,
            };
            *slot = Some(start + self.delay);
            start - now
        };
        if !wait.is_zero() {
            std::thread::sleep(wait);
        }
    }
}

impl Fetch for PoliteClient {
    /// Send once; no retry. Non-2xx becomes [`SourceError::HttpStatus`].
    fn fetch(&self, request: &Request) -> Result<String, SourceError> {
        self.wait_delay();
        let mut builder = match request.method {
            Method::Get => self.inner.get(&request.url),
            Method::Post => self.inner.post(&request.url).form(&request.form),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        tracing::debug!(method = ?request.method, url = %request.url, "fetch");
        let response = builder.send().map_err(|e| SourceError::Network {
            url: request.url.clone(),
            source: e,
        })?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), url = %request.url, "non-success status");
            return Err(SourceError::HttpStatus {
                status: status.as_u16(),
                url: request.url.clone(),
            });
        }
        response.text().map_err(|e| SourceError::BodyRead {
            url: request.url.clone(),
            source: e,
        })
    }
}

/// Builder for PoliteClient with optional User-Agent, delay, timeout and default headers.
#[derive(Debug)]
pub struct PoliteClientBuilder {
    user_agent: Option<String>,
    delay_ms: u64,
    timeout_secs: u64,
    headers: Vec<(String, String)>,
}

impl Default for PoliteClientBuilder {
    fn default() -> Self {
        Self {
            user_agent: None,
            delay_ms: DEFAULT_DELAY_MS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            headers: Vec::new(),
        }
    }
}

impl PoliteClientBuilder {
    /// Set a custom User-Agent. If not set, a browser-like default is used.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Set delay between requests in milliseconds. Default 500.
    pub fn delay_ms(mut self, ms: u64) -> Self {
        self.delay_ms = ms;
        self
    }

    /// Set request timeout in seconds. Default 30.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs.max(1);
        self
    }

    /// Add a header sent with every request.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Build the blocking client and polite wrapper.
    ///
    /// Header names or values that are not valid HTTP are skipped with a warning.
    pub fn build(self) -> Result<PoliteClient, reqwest::Error> {
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let mut defaults = HeaderMap::new();
        for (name, value) in &self.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(n), Ok(v)) => {
                    defaults.insert(n, v);
                }
                _ => tracing::warn!(header = %name, "ignoring invalid header"),
            }
        }
        let inner = reqwest::blocking::Client::builder()
            .cookie_store(true)
            .user_agent(user_agent)
            .default_headers(defaults)
            .timeout(Duration::from_secs(self.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;
        Ok(PoliteClient {
            inner,
            delay: Duration::from_millis(self.delay_ms),
            next_slot: Mutex::new(None),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_applies_delay() -> Result<(), reqwest::Error> {
        let client = PoliteClient::builder()
            .delay_ms(1500)
            .timeout_secs(5)
            .header("Accept-Language", "en-US")
            .build()?;
        assert_eq!(client.delay(), Duration::from_millis(1500));
        Ok(())
    }

    #[test]
    fn invalid_header_is_skipped() -> Result<(), reqwest::Error> {
        let client = PoliteClient::builder()
            .header("bad header", "x")
            .delay_ms(0)
            .build()?;
        assert_eq!(client.delay(), Duration::ZERO);
        Ok(())
    }

    #[test]
    fn first_request_does_not_wait() -> Result<(), reqwest::Error> {
        let client = PoliteClient::builder().delay_ms(60_000).build()?;
        let start = Instant::now();
        client.wait_delay();
        assert!(start.elapsed() < Duration::from_secs(1));
        Ok(())
    }
}
