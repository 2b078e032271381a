//! Site adapters. Site detection, the source trait, shared markup helpers, and adapters.

pub mod freewebnovel;
pub mod nova;
pub mod novelbin;
pub mod novelfire;
pub mod ops;

use crate::engine::resolve::{element_text, selector};
use crate::engine::urls::{absolute_url, relative_path};
use crate::engine::{ChapterOrder, ChapterPage, FilterList};
use crate::error::SourceError;
use crate::http::{Request, ResponseBody};
use crate::model::{ChapterContent, ListingPage, Work, WorkEntry};
use reqwest::Url;
use scraper::{ElementRef, Html};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Static description of one site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteProfile {
    /// Short id used on the command line (`novelfire`).
    pub id: &'static str,
    pub name: &'static str,
    pub base_url: &'static str,
    pub lang: &'static str,
    /// Hosts (without `www.`) whose URLs belong to this site.
    #[serde(skip)]
    pub hosts: &'static [&'static str],
}

impl SiteProfile {
    /// Absolute URL for a site-relative path or an already absolute URL.
    pub fn absolute(&self, raw: &str) -> String {
        absolute_url(raw, self.base_url)
    }

    pub fn relative(&self, url: &str) -> String {
        relative_path(url, self.base_url)
    }

    /// GET for a path on this site with the site's static headers.
    pub fn get(&self, path: &str) -> Request {
        self.with_headers(Request::get(self.absolute(path)))
    }

    pub fn with_headers(&self, request: Request) -> Request {
        request.header("Referer", format!("{}/", self.base_url))
    }

    fn owns_host(&self, host: &str) -> bool {
        let host = host.trim_start_matches("www.");
        self.hosts
            .iter()
            .any(|h| host == *h || host.ends_with(&format!(".{}", h)))
    }
}

/// Which catalog listing to browse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingKind {
    Popular,
    Latest,
}

/// Trait implemented by site adapters.
///
/// Request builders and parsers are pure: the operations in [`ops`] do the fetching.
/// Parsers never fail on missing fields; they fall back to empty values.
pub trait Source: Send + Sync {
    fn profile(&self) -> &SiteProfile;

    fn listing_request(&self, kind: ListingKind, page: u32) -> Request;

    fn parse_listing(&self, kind: ListingKind, doc: &Html) -> ListingPage;

    /// Default filter set offered for advanced search. Empty when the site has none.
    fn filters(&self) -> FilterList {
        FilterList::default()
    }

    /// Quick search when `query` is not blank, else advanced search built from `filters`.
    ///
    /// Fails with [`SourceError::Validation`] before any request exists when a filter
    /// value is invalid.
    fn search_request(
        &self,
        query: &str,
        filters: &FilterList,
        page: u32,
    ) -> Result<Request, SourceError>;

    /// Parse a search response, which may be plain HTML or a JSON envelope.
    fn parse_search(&self, body: &str) -> ListingPage;

    fn details_request(&self, work_url: &str) -> Request {
        self.profile().get(work_url)
    }

    /// Metadata of a details page. `url` is left empty for the caller to fill in.
    fn parse_details(&self, doc: &Html) -> Work;

    fn chapter_list_request(&self, work_url: &str, page: u32) -> Request;

    fn chapter_list_start_page(&self) -> u32 {
        1
    }

    /// Chapters on one chapter-list page in the site's native order.
    fn parse_chapter_list(&self, doc: &Html, page: u32) -> Result<ChapterPage, SourceError>;

    fn chapter_order(&self) -> ChapterOrder;

    fn chapter_request(&self, chapter_url: &str) -> Request {
        self.profile().get(chapter_url)
    }

    fn parse_chapter_content(&self, doc: &Html, url: &str) -> ChapterContent;
}

/// Supported site. Used for dispatch and for the --site override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Site {
    NovelFire,
    NovelBin,
    FreeWebNovel,
    Nova,
}

static NOVELFIRE: novelfire::NovelFire = novelfire::NovelFire;
static NOVELBIN: novelbin::NovelBin = novelbin::NovelBin;
static FREEWEBNOVEL: freewebnovel::FreeWebNovel = freewebnovel::FreeWebNovel;
static NOVA: nova::Nova = nova::Nova;

impl Site {
    pub const ALL: [Site; 4] = [Site::NovelFire, Site::NovelBin, Site::FreeWebNovel, Site::Nova];

    pub fn source(self) -> &'static dyn Source {
        match self {
            Site::NovelFire => &NOVELFIRE,
            Site::NovelBin => &NOVELBIN,
            Site::FreeWebNovel => &FREEWEBNOVEL,
            Site::Nova => &NOVA,
        }
    }

    pub fn id(self) -> &'static str {
        self.source().profile().id
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Site {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Site::ALL
            .into_iter()
            .find(|site| {
                let p = site.source().profile();
                p.id.eq_ignore_ascii_case(wanted) || p.name.eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| SourceError::UnknownSource {
                id: wanted.to_string(),
            })
    }
}

/// Resolve which site to use from URL and optional override.
///
/// Site-relative paths (`/book/x`) carry no host, so they need the override.
pub fn resolve_site(url_input: &str, override_site: Option<Site>) -> Result<Site, SourceError> {
    if let Some(site) = override_site {
        return Ok(site);
    }
    let url = Url::parse(url_input).map_err(|e| SourceError::InvalidUrl {
        input: url_input.to_string(),
        reason: e.to_string(),
    })?;
    let host = url.host_str().ok_or_else(|| SourceError::InvalidUrl {
        input: url_input.to_string(),
        reason: "URL has no host".to_string(),
    })?;
    Site::ALL
        .into_iter()
        .find(|site| site.source().profile().owns_host(host))
        .ok_or_else(|| SourceError::UnrecognizedHost {
            host: host.to_string(),
        })
}

// Shared markup helpers for adapters. Invalid selectors are logged and treated as no match.

pub(crate) fn select_all<'a>(scope: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match selector(css) {
        Ok(sel) => scope.select(&sel).collect(),
        Err(e) => {
            tracing::debug!(error = %e, "selector skipped");
            Vec::new()
        }
    }
}

pub(crate) fn select_first<'a>(scope: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    select_all(scope, css).into_iter().next()
}

pub(crate) fn has_match(scope: ElementRef<'_>, css: &str) -> bool {
    select_first(scope, css).is_some()
}

/// True when some link's text contains one of `needles` (`Next`, `>>`), ignoring case.
pub(crate) fn has_link_text(scope: ElementRef<'_>, needles: &[&str]) -> bool {
    let needles: Vec<String> = needles.iter().map(|n| n.to_lowercase()).collect();
    select_all(scope, "a")
        .into_iter()
        .map(|a| element_text(a).to_lowercase())
        .any(|t| needles.iter().any(|n| t.contains(n.as_str())))
}

/// First non-blank attribute among `attrs`.
pub(crate) fn attr_any(e: ElementRef<'_>, attrs: &[&str]) -> Option<String> {
    attrs
        .iter()
        .filter_map(|a| e.value().attr(a))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

/// Build a listing entry, dropping items without a link.
pub(crate) fn work_entry(
    profile: &SiteProfile,
    href: Option<&str>,
    title: String,
    thumbnail: Option<String>,
) -> Option<WorkEntry> {
    let href = href.map(str::trim).filter(|h| !h.is_empty())?;
    Some(WorkEntry {
        url: profile.relative(href),
        title,
        thumbnail_url: thumbnail
            .map(|t| profile.absolute(&t))
            .unwrap_or_default(),
    })
}

/// Parse a search body, unwrapping a JSON envelope. `None` when the envelope is broken.
pub(crate) fn search_document(body: &str) -> Option<(Html, bool)> {
    match ResponseBody::detect(body) {
        Ok(detected) => {
            let envelope = matches!(detected, ResponseBody::Envelope(_));
            Some((Html::parse_document(detected.html()), envelope))
        }
        Err(e) => {
            tracing::debug!(error = %e, "search body unreadable");
            None
        }
    }
}
