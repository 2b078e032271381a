//! Pagination engine: fetch chapter-list pages one after another until the site runs
//! out, retrying failed pages with linear backoff.
//!
//! The loop is an explicit state machine over [`Phase`]. Waiting goes through a
//! [`Sleeper`] so tests can record delays instead of sleeping, and a [`CancelFlag`] is
//! checked before every fetch and before every backoff wait. The engine never fails:
//! repeated errors or cancellation only truncate the result.

use crate::error::SourceError;
use crate::model::Chapter;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(2);
const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 10;
const DEFAULT_PAGE_PAUSE: Duration = Duration::from_millis(200);

/// Tuning for one pagination run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationPolicy {
    /// First page index requested from the source.
    pub start_page: u32,
    /// Backoff before retry `n` is `base_delay * n`.
    pub base_delay: Duration,
    /// Give up once more than this many fetches in a row have failed.
    pub max_consecutive_failures: u32,
    /// Pause between successful page fetches.
    pub page_pause: Duration,
}

impl Default for PaginationPolicy {
    fn default() -> Self {
        Self {
            start_page: 1,
            base_delay: DEFAULT_BASE_DELAY,
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
            page_pause: DEFAULT_PAGE_PAUSE,
        }
    }
}

/// Suspends the calling thread between fetches.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Real wall-clock sleeper.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Cooperative cancellation shared between the host and a running operation.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Chapters parsed from one chapter-list page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChapterPage {
    pub chapters: Vec<Chapter>,
    /// Whether the page advertised another page after it.
    pub has_next: bool,
}

/// How a site orders entries on its chapter-list pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChapterOrder {
    NewestFirst,
    OldestFirst,
}

/// Why a pagination run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Last page reached, or a page produced no new chapters.
    Exhausted,
    /// Too many consecutive failures; results are truncated.
    FailureCap,
    /// The host cancelled; results are partial.
    Cancelled,
}

/// Result of a pagination run, in the order pages were fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paginated {
    pub chapters: Vec<Chapter>,
    pub stop: StopReason,
    /// Pages that were fetched and parsed successfully.
    pub pages: u32,
    /// Failed fetches over the whole run.
    pub failures: u32,
}

impl Paginated {
    /// Put the accumulated chapters in oldest-first order and number them from 1.
    pub fn into_oldest_first(self, order: ChapterOrder) -> Vec<Chapter> {
        oldest_first(self.chapters, order)
    }
}

/// Reorder a flat chapter list (as accumulated across pages) to oldest-first and assign
/// 1-based indexes. A newest-first listing is reversed once as a whole, never per page.
pub fn oldest_first(mut chapters: Vec<Chapter>, order: ChapterOrder) -> Vec<Chapter> {
    if order == ChapterOrder::NewestFirst {
        chapters.reverse();
    }
    for (i, ch) in chapters.iter_mut().enumerate() {
        ch.index = i as u32 + 1;
    }
    chapters
}

/// Transient bookkeeping for one run.
#[derive(Debug, Default)]
struct PaginationState {
    page: u32,
    chapters: Vec<Chapter>,
    seen: HashSet<String>,
    consecutive_failures: u32,
    backoff: Duration,
    pages: u32,
    failures: u32,
}

enum Phase {
    Fetching,
    Accumulating(ChapterPage),
    Retrying(SourceError),
    Done(StopReason),
}

/// Drives page fetches for one chapter list.
pub struct Paginator<'a> {
    policy: PaginationPolicy,
    sleeper: &'a dyn Sleeper,
    cancel: CancelFlag,
    progress: Option<&'a dyn Fn(u32, usize)>,
}

impl<'a> Paginator<'a> {
    pub fn new(policy: PaginationPolicy, sleeper: &'a dyn Sleeper) -> Self {
        Self {
            policy,
            sleeper,
            cancel: CancelFlag::default(),
            progress: None,
        }
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Called after each page that added chapters with `(page, total_chapters)`.
    pub fn with_progress(mut self, progress: &'a dyn Fn(u32, usize)) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Run until exhausted, failure cap or cancellation. `fetch_page` receives the page
    /// index and performs the request and parse for that page.
    ///
    /// There is no cap on successfully fetched pages.
    pub fn run<F>(&self, mut fetch_page: F) -> Paginated
    where
        F: FnMut(u32) -> Result<ChapterPage, SourceError>,
    {
        let mut state = PaginationState {
            page: self.policy.start_page,
            ..PaginationState::default()
        };
        let mut phase = Phase::Fetching;
        loop {
            phase = match phase {
                Phase::Fetching => {
                    if self.cancel.is_cancelled() {
                        Phase::Done(StopReason::Cancelled)
                    } else {
                        match fetch_page(state.page) {
                            Ok(page) => Phase::Accumulating(page),
                            Err(e) => Phase::Retrying(e),
                        }
                    }
                }
                Phase::Accumulating(page) => self.accumulate(&mut state, page),
                Phase::Retrying(err) => self.retry(&mut state, err),
                Phase::Done(stop) => {
                    tracing::debug!(
                        ?stop,
                        pages = state.pages,
                        chapters = state.chapters.len(),
                        "chapter pagination finished"
                    );
                    return Paginated {
                        chapters: state.chapters,
                        stop,
                        pages: state.pages,
                        failures: state.failures,
                    };
                }
            };
        }
    }

    fn accumulate(&self, state: &mut PaginationState, page: ChapterPage) -> Phase {
        state.consecutive_failures = 0;
        state.backoff = Duration::ZERO;
        state.pages += 1;

        let before = state.chapters.len();
        for ch in page.chapters {
            if state.seen.insert(ch.url.clone()) {
                state.chapters.push(ch);
            }
        }
        let added = state.chapters.len() - before;
        tracing::debug!(page = state.page, added, has_next = page.has_next, "chapter page parsed");

        if added == 0 {
            return Phase::Done(StopReason::Exhausted);
        }
        if let Some(progress) = self.progress {
            progress(state.page, state.chapters.len());
        }
        if !page.has_next {
            return Phase::Done(StopReason::Exhausted);
        }
        state.page += 1;
        if !self.policy.page_pause.is_zero() {
            self.sleeper.sleep(self.policy.page_pause);
        }
        Phase::Fetching
    }

    fn retry(&self, state: &mut PaginationState, err: SourceError) -> Phase {
        state.consecutive_failures += 1;
        state.failures += 1;
        if state.consecutive_failures > self.policy.max_consecutive_failures {
            tracing::warn!(
                page = state.page,
                failures = state.consecutive_failures,
                error = %err,
                chapters = state.chapters.len(),
                "giving up on chapter list; returning partial result"
            );
            return Phase::Done(StopReason::FailureCap);
        }
        if self.cancel.is_cancelled() {
            return Phase::Done(StopReason::Cancelled);
        }
        state.backoff = self.policy.base_delay * state.consecutive_failures;
        tracing::warn!(
            page = state.page,
            attempt = state.consecutive_failures,
            backoff_ms = state.backoff.as_millis() as u64,
            error = %err,
            "chapter page failed; retrying"
        );
        self.sleeper.sleep(state.backoff);
        Phase::Fetching
    }
}
