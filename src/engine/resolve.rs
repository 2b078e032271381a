//! Field resolver: ordered fallback chains of pure extraction strategies.
//!
//! Each metadata field is described by a slice of [`Strategy`] values. The resolver
//! walks the slice in order and returns the first trimmed, non-blank result. Missing
//! nodes, missing attributes and even invalid selectors only count as a miss, so a
//! site changing its markup degrades to the default instead of failing the call.

use crate::error::SourceError;
use crate::model::WorkStatus;
use scraper::{ElementRef, Selector};

/// Compile a CSS selector, mapping failures to [`SourceError::Parse`].
pub fn selector(css: &str) -> Result<Selector, SourceError> {
    Selector::parse(css)
        .map_err(|e| SourceError::parse("selector", format!("invalid selector {:?}: {}", css, e)))
}

/// One way of pulling a string out of a document or element.
#[derive(Debug, Clone, Copy)]
pub enum Strategy {
    /// Normalized text of the first match.
    Text(&'static str),
    /// Attribute of the first match.
    Attr(&'static str, &'static str),
    /// First non-blank attribute, in order, of the first match (lazy images: `data-src`, `src`).
    AttrAny(&'static str, &'static [&'static str]),
    /// `content` of `<meta property=..>` or `<meta name=..>`.
    Meta(&'static str),
    /// Own text of the parent of the first `selector` match whose text contains `label`.
    /// Covers `<p><b>Author:</b> Jane Doe</p>`.
    Labelled {
        selector: &'static str,
        label: &'static str,
    },
    /// Text of every match joined with `separator`.
    JoinText {
        selector: &'static str,
        separator: &'static str,
    },
    /// Document `<title>` with the first matching site suffix removed.
    Title(&'static [&'static str]),
    /// Site-specific extractor.
    Custom(fn(ElementRef<'_>) -> Option<String>),
}

impl Strategy {
    /// Run this strategy against `scope`. `Ok(None)` is a plain miss.
    pub fn extract(&self, scope: ElementRef<'_>) -> Result<Option<String>, SourceError> {
        let value = match *self {
            Strategy::Text(css) => scope.select(&selector(css)?).next().map(element_text),
            Strategy::Attr(css, attr) => scope
                .select(&selector(css)?)
                .next()
                .and_then(|e| e.value().attr(attr))
                .map(str::to_string),
            Strategy::AttrAny(css, attrs) => scope.select(&selector(css)?).next().and_then(|e| {
                attrs
                    .iter()
                    .filter_map(|a| e.value().attr(a))
                    .find(|v| !v.trim().is_empty())
                    .map(str::to_string)
            }),
            Strategy::Meta(key) => {
                let css = format!("meta[property=\"{0}\"], meta[name=\"{0}\"]", key);
                scope
                    .select(&selector(&css)?)
                    .find_map(|e| e.value().attr("content").filter(|c| !c.trim().is_empty()))
                    .map(str::to_string)
            }
            Strategy::Labelled { selector: css, label } => scope
                .select(&selector(css)?)
                .find(|e| e.text().collect::<String>().contains(label))
                .and_then(|e| e.parent().and_then(ElementRef::wrap))
                .map(own_text),
            Strategy::JoinText {
                selector: css,
                separator,
            } => {
                let parts: Vec<String> = scope
                    .select(&selector(css)?)
                    .map(element_text)
                    .filter(|t| !t.is_empty())
                    .collect();
                Some(parts.join(separator))
            }
            Strategy::Title(suffixes) => scope
                .select(&selector("title")?)
                .next()
                .map(element_text)
                .map(|t| strip_title_site_suffix(&t, suffixes)),
            Strategy::Custom(f) => f(scope),
        };
        Ok(value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty()))
    }
}

/// Return the first non-blank strategy result, else `default`.
pub fn resolve(scope: ElementRef<'_>, strategies: &[Strategy], default: &str) -> String {
    resolve_opt(scope, strategies).unwrap_or_else(|| default.to_string())
}

/// Like [`resolve`] but reports exhaustion as `None`.
pub fn resolve_opt(scope: ElementRef<'_>, strategies: &[Strategy]) -> Option<String> {
    strategies.iter().find_map(|s| match s.extract(scope) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(strategy = ?s, error = %e, "strategy skipped");
            None
        }
    })
}

/// How to collect a multi-valued field such as genres.
#[derive(Debug, Clone, Copy)]
pub enum ListStrategy {
    /// Text of each match is one item.
    Each(&'static str),
    /// A single resolved value split on a separator (`"Action, Drama"`).
    Split(Strategy, char),
}

/// Return the items of the first list strategy that yields anything.
///
/// Items are trimmed, blank items dropped and duplicates removed keeping first occurrence.
pub fn resolve_list(scope: ElementRef<'_>, strategies: &[ListStrategy]) -> Vec<String> {
    for s in strategies {
        let items: Vec<String> = match *s {
            ListStrategy::Each(css) => match selector(css) {
                Ok(sel) => scope.select(&sel).map(element_text).collect(),
                Err(e) => {
                    tracing::debug!(error = %e, "list strategy skipped");
                    continue;
                }
            },
            ListStrategy::Split(inner, sep) => match inner.extract(scope) {
                Ok(Some(v)) => v.split(sep).map(str::to_string).collect(),
                Ok(None) => continue,
                Err(e) => {
                    tracing::debug!(error = %e, "list strategy skipped");
                    continue;
                }
            },
        };
        let mut out: Vec<String> = Vec::with_capacity(items.len());
        for item in items.into_iter().map(|i| i.trim().to_string()) {
            if !item.is_empty() && !out.contains(&item) {
                out.push(item);
            }
        }
        if !out.is_empty() {
            return out;
        }
    }
    Vec::new()
}

const STATUS_VOCABULARY: &[(&str, WorkStatus)] = &[
    ("completed", WorkStatus::Completed),
    ("ongoing", WorkStatus::Ongoing),
    ("dropped", WorkStatus::Cancelled),
    ("cancelled", WorkStatus::Cancelled),
    ("canceled", WorkStatus::Cancelled),
];

/// Map free status text to [`WorkStatus`] by case-insensitive substring match.
pub fn parse_status(text: &str) -> WorkStatus {
    parse_status_with(text, &[])
}

/// [`parse_status`] with extra site words checked before the shared vocabulary.
pub fn parse_status_with(text: &str, extra: &[(&str, WorkStatus)]) -> WorkStatus {
    let lower = text.to_lowercase();
    extra
        .iter()
        .chain(STATUS_VOCABULARY)
        .find(|(word, _)| lower.contains(word))
        .map(|(_, status)| *status)
        .unwrap_or(WorkStatus::Unknown)
}

/// Strip a known site suffix from the end of a page title (e.g. " - NovelFire"), so
/// titles that contain " - " themselves are preserved.
pub fn strip_title_site_suffix(s: &str, suffixes: &[&str]) -> String {
    let mut t = s.trim();
    for suffix in suffixes {
        if t.ends_with(suffix) {
            t = t[..t.len() - suffix.len()].trim();
            break;
        }
    }
    t.to_string()
}

/// Text of an element and its descendants with whitespace runs collapsed.
pub fn element_text(e: ElementRef<'_>) -> String {
    e.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ")
}

/// Text of the element's direct text children only, whitespace collapsed.
pub fn own_text(e: ElementRef<'_>) -> String {
    e.children()
        .filter_map(|n| n.value().as_text())
        .flat_map(|t| t.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}
