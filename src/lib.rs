//! novelsrc: site adapters for web-novel sites. Browse catalogs, search with typed
//! filters, and extract work metadata, chapter lists and chapter text.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod model;
pub mod sources;

// Re-exports for CLI and consumers.
pub use engine::{Filter, FilterList, Paginated, PaginationPolicy, StopReason};
pub use error::SourceError;
pub use http::{Fetch, PoliteClient, PoliteClientBuilder, Request};
pub use model::{Chapter, ChapterContent, ListingPage, Work, WorkEntry, WorkStatus};
pub use sources::ops::{
    fetch_chapter_content, fetch_chapter_list, fetch_details, fetch_listing, search,
    ChapterListOptions,
};
pub use sources::{resolve_site, ListingKind, Site, SiteProfile, Source};
