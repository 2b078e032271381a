//! Content normalizer: pick the chapter container, drop noise nodes, serialize the rest.

use crate::engine::resolve::selector;
use scraper::{ElementRef, Html};

/// Returned when no candidate container holds any markup.
pub const CONTENT_NOT_FOUND: &str = "Content not found";

/// Noise that every site shares: scripts, styles and ad slots.
pub const COMMON_NOISE: &[&str] = &["script", "style", "noscript", "iframe", ".adsbygoogle"];

/// Where a site keeps its chapter text and what to strip from it.
#[derive(Debug, Clone, Copy)]
pub struct ContentRules {
    /// Expected containers, tried in order.
    pub primary: &'static [&'static str],
    /// Fallback containers when no primary selector matches.
    pub secondary: &'static [&'static str],
    /// Selectors removed from whichever container is chosen (in addition to [`COMMON_NOISE`]).
    pub noise: &'static [&'static str],
}

/// Extract sanitized chapter markup from a parsed page.
///
/// Tries primary containers, then secondary, then `<body>`. A candidate that is empty
/// after cleaning falls through to the next. Never fails; the last resort is
/// [`CONTENT_NOT_FOUND`].
pub fn normalize_content(doc: &Html, rules: &ContentRules) -> String {
    let root = doc.root_element();
    let candidates = rules
        .primary
        .iter()
        .chain(rules.secondary)
        .chain(std::iter::once(&"body"));
    for css in candidates {
        let Some(container) = first_match(root, css) else {
            continue;
        };
        let cleaned = clean_container(container, rules.noise);
        if !cleaned.is_empty() {
            return cleaned;
        }
        tracing::debug!(container = css, "content container empty after cleaning");
    }
    CONTENT_NOT_FOUND.to_string()
}

/// Serialize the inner markup of `container` without noise nodes, trimmed.
pub fn clean_container(container: ElementRef<'_>, noise: &[&str]) -> String {
    clean_fragment(&container.inner_html(), noise)
}

/// Remove nodes matching `noise` (and [`COMMON_NOISE`]) from an HTML fragment.
///
/// Paragraphs and line breaks are kept as they are; only matched subtrees go.
pub fn clean_fragment(html: &str, noise: &[&str]) -> String {
    let mut frag = Html::parse_fragment(html);
    let mut doomed = Vec::new();
    for css in COMMON_NOISE.iter().chain(noise) {
        match selector(css) {
            Ok(sel) => doomed.extend(frag.select(&sel).map(|e| e.id())),
            Err(e) => tracing::debug!(error = %e, "noise selector skipped"),
        }
    }
    for id in doomed {
        if let Some(mut node) = frag.tree.get_mut(id) {
            node.detach();
        }
    }
    frag.root_element().inner_html().trim().to_string()
}

fn first_match<'a>(root: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    match selector(css) {
        Ok(sel) => root.select(&sel).next(),
        Err(e) => {
            tracing::debug!(error = %e, "container selector skipped");
            None
        }
    }
}
