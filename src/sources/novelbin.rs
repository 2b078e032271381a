//! NovelBin adapter (novelbin.com).
//!
//! Details use `<b>Label:</b> value` rows. The full chapter list comes from a single
//! archive fragment keyed by the novel slug.

use super::{
    attr_any, search_document, select_all, select_first, work_entry, ListingKind, SiteProfile,
    Source,
};
use crate::engine::resolve::{element_text, selector, ListStrategy, Strategy};
use crate::engine::{
    normalize_content, parse_status, resolve, resolve_list, resolve_opt, ChapterOrder,
    ChapterPage, ContentRules, FilterList,
};
use crate::error::SourceError;
use crate::http::Request;
use crate::model::{Chapter, ChapterContent, ListingPage, Work, WorkEntry};
use scraper::{ElementRef, Html};

const PROFILE: SiteProfile = SiteProfile {
    id: "novelbin",
    name: "NovelBin",
    base_url: "https://novelbin.com",
    lang: "en",
    hosts: &["novelbin.com", "novelbin.me"],
};

const ITEM: &str = "div > h3.novel-title";

const TITLE: &[Strategy] = &[
    Strategy::Text("h1, h2"),
    Strategy::Text("h3.title"),
    Strategy::Title(&[" - NovelBin"]),
];

const AUTHOR: &[Strategy] = &[Strategy::Labelled {
    selector: "b",
    label: "Author:",
}];

const GENRE_LIST: &[ListStrategy] = &[
    ListStrategy::Split(
        Strategy::Labelled {
            selector: "b",
            label: "Genre:",
        },
        ',',
    ),
    ListStrategy::Each(".info a[href*='/genre/']"),
];

const STATUS: &[Strategy] = &[Strategy::Labelled {
    selector: "b",
    label: "Status:",
}];

const DESCRIPTION: &[Strategy] = &[
    Strategy::Text("#tab-description"),
    Strategy::Text(".description"),
    Strategy::Text("p"),
];

const COVER: &[Strategy] = &[
    Strategy::AttrAny("img.cover.lazy", &["src", "data-src"]),
    Strategy::AttrAny(".book img", &["src", "data-src"]),
    Strategy::Attr("meta[itemprop=image]", "content"),
    Strategy::Meta("og:image"),
];

const CONTENT: ContentRules = ContentRules {
    primary: &["#chr-content"],
    secondary: &[],
    noise: &["div[id^='pf-']"],
};

/// The thumbnail sits in the surrounding `.row`, not in the title block.
fn row_cover(title_block: ElementRef<'_>) -> Option<String> {
    let row = title_block
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().classes().any(|c| c == "row"))?;
    attr_any(select_first(row, "img.cover")?, &["src", "data-src"])
}

fn listing_entry(title_block: ElementRef<'_>) -> Option<WorkEntry> {
    let link = select_first(title_block, "a")?;
    let title = link
        .value()
        .attr("title")
        .map(str::to_string)
        .unwrap_or_else(|| element_text(link));
    work_entry(
        &PROFILE,
        link.value().attr("href"),
        title.trim().to_string(),
        row_cover(title_block),
    )
}

fn listing_page(doc: &Html) -> ListingPage {
    ListingPage {
        entries: select_all(doc.root_element(), ITEM)
            .into_iter()
            .filter_map(listing_entry)
            .collect(),
        has_next_page: false,
    }
}

/// Slug after the last `/b/` of a work URL (`/b/lord-of-mysteries` -> `lord-of-mysteries`).
fn novel_id(work_url: &str) -> &str {
    let tail = work_url
        .rsplit_once("/b/")
        .map(|(_, t)| t)
        .unwrap_or(work_url);
    tail.trim_matches('/')
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NovelBin;

impl Source for NovelBin {
    fn profile(&self) -> &SiteProfile {
        &PROFILE
    }

    fn listing_request(&self, kind: ListingKind, page: u32) -> Request {
        match kind {
            ListingKind::Popular => PROFILE.get("/sort/top-hot-novel"),
            ListingKind::Latest => PROFILE.get(&format!("/sort/latest?page={}", page)),
        }
    }

    fn parse_listing(&self, _kind: ListingKind, doc: &Html) -> ListingPage {
        listing_page(doc)
    }

    fn search_request(
        &self,
        query: &str,
        _filters: &FilterList,
        page: u32,
    ) -> Result<Request, SourceError> {
        let url = format!("{}/search", PROFILE.base_url);
        let page = page.to_string();
        Ok(PROFILE.with_headers(Request::get_with_query(
            &url,
            &[("keyword", query.trim()), ("page", page.as_str())],
        )?))
    }

    fn parse_search(&self, body: &str) -> ListingPage {
        search_document(body)
            .map(|(doc, _)| listing_page(&doc))
            .unwrap_or_default()
    }

    fn parse_details(&self, doc: &Html) -> Work {
        let root = doc.root_element();
        Work {
            url: String::new(),
            title: resolve(root, TITLE, ""),
            author: resolve(root, AUTHOR, ""),
            artist: None,
            genres: resolve_list(root, GENRE_LIST),
            status: resolve_opt(root, STATUS)
                .map(|s| parse_status(&s))
                .unwrap_or_default(),
            description: resolve(root, DESCRIPTION, ""),
            thumbnail_url: PROFILE.absolute(&resolve(root, COVER, "")),
        }
    }

    fn chapter_list_request(&self, work_url: &str, _page: u32) -> Request {
        let url = format!(
            "{}/ajax/chapter-archive?novelId={}",
            PROFILE.base_url,
            novel_id(work_url)
        );
        PROFILE.with_headers(Request::get(url))
    }

    fn parse_chapter_list(&self, doc: &Html, _page: u32) -> Result<ChapterPage, SourceError> {
        let link_sel = selector("ul.list-chapter a")?;
        let chapters = doc
            .root_element()
            .select(&link_sel)
            .filter_map(|a| {
                let href = a.value().attr("href")?.trim();
                if href.is_empty() {
                    return None;
                }
                let name = a
                    .value()
                    .attr("title")
                    .map(str::to_string)
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or_else(|| element_text(a));
                Some(Chapter {
                    url: PROFILE.relative(href),
                    name: name.trim().to_string(),
                    date_upload: 0,
                    index: 0,
                })
            })
            .collect();
        Ok(ChapterPage {
            chapters,
            has_next: false,
        })
    }

    fn chapter_order(&self) -> ChapterOrder {
        ChapterOrder::OldestFirst
    }

    fn parse_chapter_content(&self, doc: &Html, url: &str) -> ChapterContent {
        ChapterContent {
            url: url.to_string(),
            html: normalize_content(doc, &CONTENT),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::WorkStatus;

    const LISTING: &str = r#"<html><body><div class="list list-novel">
<div class="row">
  <div class="col-xs-3"><div><img src="https://novelbin.com/media/novel/lotm.jpg" class="cover" alt="LOTM"></div></div>
  <div class="col-xs-7"><div><h3 class="novel-title"><a href="https://novelbin.com/b/lord-of-mysteries" title="Lord of the Mysteries">Lord of the Mysteries</a></h3>
  <span class="author">Cuttlefish That Loves Diving</span></div></div>
</div>
<div class="row">
  <div class="col-xs-3"><div><img data-src="/media/novel/ss.jpg" class="cover lazy"></div></div>
  <div class="col-xs-7"><div><h3 class="novel-title"><a href="/b/shadow-slave">Shadow Slave</a></h3></div></div>
</div>
</div></body></html>"#;

    const DETAILS: &str = r#"<html><head><meta itemprop="image" content="https://novelbin.com/meta.jpg"></head><body>
<div class="book"><img class="lazy" data-src="/media/novel/lotm.jpg"></div>
<h3 class="title">Lord of the Mysteries</h3>
<ul class="info info-meta">
  <li><b>Author:</b> Cuttlefish That Loves Diving</li>
  <li><b>Genre:</b> Action,Adventure, Mystery,</li>
  <li><b>Status:</b> Completed</li>
</ul>
<div id="tab-description"><p>With the rising tide of steam power.</p></div>
</body></html>"#;

    #[test]
    fn requests() -> Result<(), SourceError> {
        assert_eq!(
            NovelBin.listing_request(ListingKind::Popular, 4).url,
            "https://novelbin.com/sort/top-hot-novel"
        );
        assert_eq!(
            NovelBin.listing_request(ListingKind::Latest, 4).url,
            "https://novelbin.com/sort/latest?page=4"
        );
        assert_eq!(
            NovelBin.search_request("lord of", &FilterList::default(), 2)?.url,
            "https://novelbin.com/search?keyword=lord+of&page=2"
        );
        assert_eq!(
            NovelBin.chapter_list_request("/b/lord-of-mysteries", 1).url,
            "https://novelbin.com/ajax/chapter-archive?novelId=lord-of-mysteries"
        );
        Ok(())
    }

    #[test]
    fn listing_takes_cover_from_row() {
        let page = NovelBin.parse_listing(ListingKind::Popular, &Html::parse_document(LISTING));
        assert!(!page.has_next_page);
        assert_eq!(page.entries.len(), 2);
        assert_eq!(page.entries[0].url, "/b/lord-of-mysteries");
        assert_eq!(page.entries[0].title, "Lord of the Mysteries");
        assert_eq!(
            page.entries[0].thumbnail_url,
            "https://novelbin.com/media/novel/lotm.jpg"
        );
        assert_eq!(page.entries[1].title, "Shadow Slave");
        assert_eq!(
            page.entries[1].thumbnail_url,
            "https://novelbin.com/media/novel/ss.jpg"
        );
    }

    #[test]
    fn labelled_details() {
        let work = NovelBin.parse_details(&Html::parse_document(DETAILS));
        assert_eq!(work.title, "Lord of the Mysteries");
        assert_eq!(work.author, "Cuttlefish That Loves Diving");
        assert_eq!(work.genres, vec!["Action", "Adventure", "Mystery"]);
        assert_eq!(work.status, WorkStatus::Completed);
        assert_eq!(work.description, "With the rising tide of steam power.");
        assert_eq!(work.thumbnail_url, "https://novelbin.com/media/novel/lotm.jpg");
    }

    #[test]
    fn archive_is_one_page() -> Result<(), SourceError> {
        let doc = Html::parse_document(
            r#"<ul class="list-chapter">
<li><a href="https://novelbin.com/b/lotm/chapter-1" title="Chapter 1 Crimson"><span>Chapter 1 Crimson</span></a></li>
<li><a href="/b/lotm/chapter-2"><span>Chapter 2 Situation</span></a></li>
</ul>"#,
        );
        let page = NovelBin.parse_chapter_list(&doc, 1)?;
        assert!(!page.has_next);
        let names: Vec<&str> = page.chapters.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Chapter 1 Crimson", "Chapter 2 Situation"]);
        assert_eq!(page.chapters[0].url, "/b/lotm/chapter-1");
        assert_eq!(page.chapters[1].date_upload, 0);
        Ok(())
    }

    #[test]
    fn content_drops_pf_slots() {
        let doc = Html::parse_document(
            r#"<html><body><div id="chr-content"><p>Zhou Mingrui woke.</p><div id="pf-123">ad</div><script>x()</script></div></body></html>"#,
        );
        assert_eq!(
            NovelBin.parse_chapter_content(&doc, "/b/lotm/chapter-1").html,
            "<p>Zhou Mingrui woke.</p>"
        );
    }
}
