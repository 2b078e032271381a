//! FreeWebNovel adapter (freewebnovel.com).

use super::{
    has_link_text, search_document, select_all, select_first, work_entry, ListingKind,
    SiteProfile, Source,
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
    id: "freewebnovel",
    name: "FreeWebNovel",
    base_url: "https://freewebnovel.com",
    lang: "en",
    hosts: &["freewebnovel.com"],
};

const ITEM: &str = ".ul-list1 .li";

const TITLE: &[Strategy] = &[
    Strategy::Meta("og:title"),
    Strategy::Text("h1.tit"),
    Strategy::Title(&[" - Free Web Novel", " | FreeWebNovel"]),
];

const AUTHOR: &[Strategy] = &[Strategy::Meta("og:novel:author")];

const GENRE_LIST: &[ListStrategy] = &[ListStrategy::Split(Strategy::Meta("og:novel:genre"), ',')];

const STATUS: &[Strategy] = &[Strategy::Meta("og:novel:status")];

const DESCRIPTION: &[Strategy] = &[
    Strategy::JoinText {
        selector: ".txt .inner p",
        separator: "\n",
    },
    Strategy::Meta("og:description"),
];

const COVER: &[Strategy] = &[Strategy::Meta("og:image")];

const CONTENT: ContentRules = ContentRules {
    primary: &["div.txt #article"],
    secondary: &[],
    noise: &[],
};

fn listing_entry(item: ElementRef<'_>) -> Option<WorkEntry> {
    let link = select_first(item, ".txt h3.tit a")?;
    let cover = select_first(item, ".pic img")
        .and_then(|img| img.value().attr("src"))
        .map(str::to_string);
    work_entry(&PROFILE, link.value().attr("href"), element_text(link), cover)
}

fn listing_page(doc: &Html, paged: bool) -> ListingPage {
    let root = doc.root_element();
    ListingPage {
        entries: select_all(root, ITEM)
            .into_iter()
            .filter_map(listing_entry)
            .collect(),
        has_next_page: paged && has_link_text(root, &[">>"]),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FreeWebNovel;

impl Source for FreeWebNovel {
    fn profile(&self) -> &SiteProfile {
        &PROFILE
    }

    fn listing_request(&self, kind: ListingKind, page: u32) -> Request {
        let sort = match kind {
            ListingKind::Popular => "most-popular",
            ListingKind::Latest => "latest-novel",
        };
        if page <= 1 {
            PROFILE.get(&format!("/sort/{}", sort))
        } else {
            PROFILE.get(&format!("/sort/{}/{}", sort, page))
        }
    }

    fn parse_listing(&self, _kind: ListingKind, doc: &Html) -> ListingPage {
        listing_page(doc, true)
    }

    /// POST form search; the site has no advanced search, so filters are ignored.
    fn search_request(
        &self,
        query: &str,
        _filters: &FilterList,
        page: u32,
    ) -> Result<Request, SourceError> {
        let url = format!("{}/search?page={}", PROFILE.base_url, page);
        Ok(PROFILE.with_headers(Request::post_form(url, &[("searchkey", query.trim())])))
    }

    fn parse_search(&self, body: &str) -> ListingPage {
        search_document(body)
            .map(|(doc, _)| listing_page(&doc, false))
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

    /// The whole table of contents is on the work page.
    fn chapter_list_request(&self, work_url: &str, _page: u32) -> Request {
        PROFILE.get(work_url)
    }

    fn parse_chapter_list(&self, doc: &Html, _page: u32) -> Result<ChapterPage, SourceError> {
        let link_sel = selector("ul.ul-list5#idData li a")?;
        let chapters = doc
            .root_element()
            .select(&link_sel)
            .filter_map(|a| {
                let href = a.value().attr("href")?.trim();
                if href.is_empty() {
                    return None;
                }
                Some(Chapter {
                    url: PROFILE.relative(href),
                    name: element_text(a),
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
    use crate::http::Method;
    use crate::model::WorkStatus;

    const LISTING: &str = r#"<html><body><div class="ul-list1">
<div class="li"><div class="pic"><a href="/novel/martial-peak"><img src="/files/article/image/0/1/1s.jpg"></a></div>
<div class="txt"><h3 class="tit"><a href="/novel/martial-peak">Martial Peak</a></h3></div></div>
<div class="li"><div class="txt"><h3 class="tit"><a href="https://freewebnovel.com/novel/the-beginning-after-the-end">The Beginning After The End</a></h3></div></div>
</div>
<div class="page"><a href="/sort/most-popular/2">&gt;&gt;</a></div>
</body></html>"#;

    #[test]
    fn path_paged_listing() {
        assert_eq!(
            FreeWebNovel.listing_request(ListingKind::Popular, 1).url,
            "https://freewebnovel.com/sort/most-popular"
        );
        assert_eq!(
            FreeWebNovel.listing_request(ListingKind::Latest, 3).url,
            "https://freewebnovel.com/sort/latest-novel/3"
        );
    }

    #[test]
    fn parses_listing() {
        let page = FreeWebNovel.parse_listing(ListingKind::Popular, &Html::parse_document(LISTING));
        assert!(page.has_next_page);
        assert_eq!(page.entries.len(), 2);
        assert_eq!(page.entries[0].title, "Martial Peak");
        assert_eq!(
            page.entries[0].thumbnail_url,
            "https://freewebnovel.com/files/article/image/0/1/1s.jpg"
        );
        assert_eq!(page.entries[1].url, "/novel/the-beginning-after-the-end");
        assert_eq!(page.entries[1].thumbnail_url, "");
    }

    #[test]
    fn search_posts_form() -> Result<(), SourceError> {
        let req = FreeWebNovel.search_request(" martial ", &FilterList::default(), 2)?;
        assert_eq!(req.method, Method::Post);
        assert_eq!(req.url, "https://freewebnovel.com/search?page=2");
        assert_eq!(req.form, vec![("searchkey".to_string(), "martial".to_string())]);
        let page = FreeWebNovel.parse_search(LISTING);
        assert_eq!(page.entries.len(), 2);
        assert!(!page.has_next_page);
        Ok(())
    }

    #[test]
    fn opengraph_details() {
        let doc = Html::parse_document(
            r#"<html><head>
<meta property="og:title" content="Martial Peak">
<meta property="og:novel:author" content="Momo">
<meta property="og:novel:genre" content="Action, Adventure, Martial Arts">
<meta property="og:novel:status" content="OnGoing">
<meta property="og:description" content="short">
<meta property="og:image" content="https://freewebnovel.com/files/1.jpg">
</head><body><div class="txt"><div class="inner"><p>The journey to the martial peak</p><p>is a lonely one.</p></div></div></body></html>"#,
        );
        let work = FreeWebNovel.parse_details(&doc);
        assert_eq!(work.title, "Martial Peak");
        assert_eq!(work.author, "Momo");
        assert_eq!(work.genres, vec!["Action", "Adventure", "Martial Arts"]);
        assert_eq!(work.status, WorkStatus::Ongoing);
        assert_eq!(
            work.description,
            "The journey to the martial peak\nis a lonely one."
        );
        assert_eq!(work.thumbnail_url, "https://freewebnovel.com/files/1.jpg");
    }

    #[test]
    fn description_falls_back_to_meta() {
        let doc = Html::parse_document(
            r#"<html><head><meta property="og:description" content="short"></head><body></body></html>"#,
        );
        assert_eq!(FreeWebNovel.parse_details(&doc).description, "short");
    }

    #[test]
    fn chapter_list_and_content() -> Result<(), SourceError> {
        let doc = Html::parse_document(
            r#"<ul class="ul-list5" id="idData"><li><a href="/novel/martial-peak/chapter-1">Chapter 1</a></li>
<li><a href="/novel/martial-peak/chapter-2">Chapter 2</a></li></ul>"#,
        );
        let page = FreeWebNovel.parse_chapter_list(&doc, 1)?;
        assert_eq!(page.chapters.len(), 2);
        assert_eq!(page.chapters[1].url, "/novel/martial-peak/chapter-2");

        let doc = Html::parse_document(
            r#"<html><body><div class="txt"><div id="article"><p>Yang Kai.</p><script>z()</script></div></div></body></html>"#,
        );
        assert_eq!(
            FreeWebNovel.parse_chapter_content(&doc, "/novel/martial-peak/chapter-1").html,
            "<p>Yang Kai.</p>"
        );
        Ok(())
    }
}
