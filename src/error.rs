//! Shared error type for sources, the HTTP layer and the filter compiler.

use thiserror::Error;

/// Errors surfaced by source operations.
///
/// Callers see the fetch family, [`SourceError::Validation`], URL resolution, and
/// [`SourceError::Parse`] for a malformed JSON envelope. Other parse problems are absorbed
/// by the field resolver and the content normalizer, which degrade to defaults, and by
/// the pagination engine, which retries the page.
#[derive(Debug, Error)]
pub enum SourceError {
    // Site / URL
    #[error("Invalid URL: {input}: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("Could not detect source from URL host '{host}'. Use --site to pick one.")]
    UnrecognizedHost { host: String },

    #[error("Unknown source id '{id}'.")]
    UnknownSource { id: String },

    // Fetch
    #[error("Network error: could not reach {url}: {source}")]
    Network { url: String, source: reqwest::Error },

    #[error("HTTP {status} when fetching: {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Failed to read response body from {url}: {source}")]
    BodyRead { url: String, source: reqwest::Error },

    // Markup
    #[error("Could not parse {what}: {message}")]
    Parse { what: String, message: String },

    // Filters
    #[error("Invalid value for filter '{filter}': {message}")]
    Validation { filter: String, message: String },
}

impl SourceError {
    pub fn parse(what: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            what: what.into(),
            message: message.into(),
        }
    }

    pub fn validation(filter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            filter: filter.into(),
            message: message.into(),
        }
    }

    /// True for network, timeout, non-2xx and body-read failures.
    pub fn is_fetch(&self) -> bool {
        matches!(
            self,
            SourceError::Network { .. }
                | SourceError::HttpStatus { .. }
                | SourceError::BodyRead { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_classification() {
        let status = SourceError::HttpStatus {
            status: 503,
            url: "https://example.com".into(),
        };
        assert!(status.is_fetch());
        assert!(!SourceError::parse("chapter list", "missing").is_fetch());
        assert!(!SourceError::validation("Rating", "out of range").is_fetch());
    }

    #[test]
    fn validation_message_names_filter() {
        let e = SourceError::validation("Rating Value (Max 5)", "must be between 0 and 5");
        assert_eq!(
            e.to_string(),
            "Invalid value for filter 'Rating Value (Max 5)': must be between 0 and 5"
        );
    }
}
