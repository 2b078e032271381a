//! The standard host operations: a [`Source`] composed with a [`Fetch`].
//!
//! Single-shot operations propagate fetch and envelope errors. The chapter list goes through the
//! pagination engine, which retries failed pages and never fails as a whole.

use super::{ListingKind, Source};
use crate::engine::{
    CancelFlag, FilterList, Paginated, PaginationPolicy, Paginator, Sleeper, ThreadSleeper,
};
use crate::error::SourceError;
use crate::http::{Fetch, ResponseBody};
use crate::model::{ChapterContent, ListingPage, Work};
use scraper::Html;

/// Parse a response body, unwrapping a `{ "html": ... }` envelope first.
///
/// A body that starts like JSON but is not a valid envelope is a [`SourceError::Parse`].
fn document(body: &str) -> Result<Html, SourceError> {
    let detected = ResponseBody::detect(body)?;
    if let ResponseBody::Envelope(_) = detected {
        tracing::trace!("response body is a JSON envelope");
    }
    Ok(Html::parse_document(detected.html()))
}

/// Browse the popular or latest catalog.
pub fn fetch_listing(
    source: &dyn Source,
    fetch: &dyn Fetch,
    kind: ListingKind,
    page: u32,
) -> Result<ListingPage, SourceError> {
    let body = fetch.fetch(&source.listing_request(kind, page))?;
    let listing = source.parse_listing(kind, &document(&body)?);
    tracing::debug!(
        source = source.profile().id,
        ?kind,
        page,
        entries = listing.entries.len(),
        "listing parsed"
    );
    Ok(listing)
}

/// Quick search for a non-blank `query`, else advanced search from `filters`.
///
/// Invalid filter values fail here, before anything is sent.
pub fn search(
    source: &dyn Source,
    fetch: &dyn Fetch,
    query: &str,
    filters: &FilterList,
    page: u32,
) -> Result<ListingPage, SourceError> {
    let request = source.search_request(query, filters, page)?;
    let body = fetch.fetch(&request)?;
    Ok(source.parse_search(&body))
}

/// Full metadata for the work at `work_url` (absolute or site-relative).
pub fn fetch_details(
    source: &dyn Source,
    fetch: &dyn Fetch,
    work_url: &str,
) -> Result<Work, SourceError> {
    let body = fetch.fetch(&source.details_request(work_url))?;
    let mut work = source.parse_details(&document(&body)?);
    work.url = source.profile().relative(work_url);
    Ok(work)
}

/// Knobs for [`fetch_chapter_list`].
pub struct ChapterListOptions<'a> {
    /// `start_page` is replaced by the source's own start page.
    pub policy: PaginationPolicy,
    pub sleeper: &'a dyn Sleeper,
    pub cancel: CancelFlag,
    pub progress: Option<&'a dyn Fn(u32, usize)>,
}

impl Default for ChapterListOptions<'_> {
    fn default() -> Self {
        Self {
            policy: PaginationPolicy::default(),
            sleeper: &ThreadSleeper,
            cancel: CancelFlag::default(),
            progress: None,
        }
    }
}

/// Every chapter of a work, oldest first and numbered from 1.
///
/// Pages that fail to fetch or parse are retried with backoff. When the failure cap is
/// hit or the run is cancelled, the chapters gathered so far are returned with the
/// matching [`crate::engine::StopReason`].
pub fn fetch_chapter_list(
    source: &dyn Source,
    fetch: &dyn Fetch,
    work_url: &str,
    options: &ChapterListOptions<'_>,
) -> Paginated {
    let policy = PaginationPolicy {
        start_page: source.chapter_list_start_page(),
        ..options.policy.clone()
    };
    let mut paginator =
        Paginator::new(policy, options.sleeper).with_cancel(options.cancel.clone());
    if let Some(progress) = options.progress {
        paginator = paginator.with_progress(progress);
    }
    let run = paginator.run(|page| {
        let body = fetch.fetch(&source.chapter_list_request(work_url, page))?;
        source.parse_chapter_list(&document(&body)?, page)
    });
    let (stop, pages, failures) = (run.stop, run.pages, run.failures);
    Paginated {
        chapters: run.into_oldest_first(source.chapter_order()),
        stop,
        pages,
        failures,
    }
}

/// Sanitized body of one chapter.
pub fn fetch_chapter_content(
    source: &dyn Source,
    fetch: &dyn Fetch,
    chapter_url: &str,
) -> Result<ChapterContent, SourceError> {
    let body = fetch.fetch(&source.chapter_request(chapter_url))?;
    let relative = source.profile().relative(chapter_url);
    Ok(source.parse_chapter_content(&document(&body)?, &relative))
}
