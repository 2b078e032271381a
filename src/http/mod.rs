//! Request values built by sources, the fetch capability, and response-body detection.

mod client;

pub use client::{
    PoliteClient, PoliteClientBuilder, DEFAULT_DELAY_MS, DEFAULT_TIMEOUT_SECS,
};

use crate::error::SourceError;
use reqwest::Url;
use serde::Deserialize;

/// HTTP method of a source request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A fully-built request. Sources produce these; a [`Fetch`] implementation sends them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    /// Static per-source headers (e.g. `Referer`), sent in addition to client defaults.
    pub headers: Vec<(String, String)>,
    /// Form-encoded body; only used with [`Method::Post`].
    pub form: Vec<(String, String)>,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            form: Vec::new(),
        }
    }

    pub fn post_form<K, V>(url: impl Into<String>, form: &[(K, V)]) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        Self {
            method: Method::Post,
            url: url.into(),
            headers: Vec::new(),
            form: form
                .iter()
                .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string()))
                .collect(),
        }
    }

    /// GET `url` with `params` appended as an encoded query string.
    pub fn get_with_query<K, V>(url: &str, params: &[(K, V)]) -> Result<Self, SourceError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let parsed = Url::parse_with_params(
            url,
            params.iter().map(|(k, v)| (k.as_ref(), v.as_ref())),
        )
        .map_err(|e| SourceError::InvalidUrl {
            input: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::get(parsed.to_string()))
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Sends a [`Request`] and returns the body of a 2xx response.
///
/// Implementations report transport problems, non-2xx statuses and unreadable bodies as
/// the fetch family of [`SourceError`].
pub trait Fetch: Send + Sync {
    fn fetch(&self, request: &Request) -> Result<String, SourceError>;
}

#[derive(Debug, Deserialize)]
struct HtmlEnvelope {
    #[serde(default)]
    html: String,
}

/// A response body that is either plain HTML or a JSON envelope carrying HTML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseBody<'a> {
    Html(&'a str),
    /// The `html` field of a `{ "html": "..." }` envelope.
    Envelope(String),
}

impl<'a> ResponseBody<'a> {
    /// Classify `body` by its first non-whitespace character.
    ///
    /// A body starting with `{` must be a JSON object; otherwise it is returned as HTML.
    pub fn detect(body: &'a str) -> Result<Self, SourceError> {
        if body.trim_start().starts_with('{') {
            let envelope: HtmlEnvelope = serde_json::from_str(body)
                .map_err(|e| SourceError::parse("JSON envelope", e.to_string()))?;
            Ok(ResponseBody::Envelope(envelope.html))
        } else {
            Ok(ResponseBody::Html(body))
        }
    }

    pub fn html(&self) -> &str {
        match self {
            ResponseBody::Html(h) => h,
            ResponseBody::Envelope(h) => h,
        }
    }
}
