//! Site-independent extraction engine shared by every source.

pub mod content;
pub mod dates;
pub mod filters;
pub mod paginate;
pub mod resolve;
pub mod urls;

pub use content::{normalize_content, ContentRules, CONTENT_NOT_FOUND};
pub use dates::parse_chapter_date;
pub use filters::{Filter, FilterList, FilterOptions};
pub use paginate::{
    oldest_first, CancelFlag, ChapterOrder, ChapterPage, Paginated, PaginationPolicy, Paginator,
    Sleeper, StopReason, ThreadSleeper,
};
pub use resolve::{
    parse_status, parse_status_with, resolve, resolve_list, resolve_opt, ListStrategy, Strategy,
};
pub use urls::{absolute_url, relative_path};
