//! NovelFire adapter (novelfire.net).
//!
//! Catalog pages and the advanced search share one card layout. Quick search goes through
//! the live-search endpoint, which answers with a JSON envelope around an HTML fragment.
//! Chapter lists are paginated (`/chapters?page=N`) and listed oldest-first.

use super::{
    attr_any, has_link_text, has_match, search_document, select_all, select_first, work_entry,
    ListingKind, SiteProfile, Source,
};
use crate::engine::resolve::{element_text, selector, ListStrategy, Strategy};
use crate::engine::{
    normalize_content, parse_chapter_date, parse_status, resolve, resolve_list, ChapterOrder,
    ChapterPage, ContentRules, Filter, FilterList, FilterOptions,
};
use crate::error::SourceError;
use crate::http::Request;
use crate::model::{Chapter, ChapterContent, ListingPage, Work, WorkEntry, WorkStatus};
use scraper::{ElementRef, Html};

const PROFILE: SiteProfile = SiteProfile {
    id: "novelfire",
    name: "NovelFire",
    base_url: "https://novelfire.net",
    lang: "en",
    hosts: &["novelfire.net"],
};

const CATALOG_ITEM: &str = "ul.novel-list.col6 li.novel-item";
const LIVE_SEARCH_ITEM: &str = "ul.novel-list.horizontal.col2 li.novel-item";
const NEXT_PAGE: &str = "a.page-link[rel=next], a[rel=next]";

const ORIGIN_LANGUAGES: FilterOptions = &[
    ("Chinese Novel", "1"),
    ("Korean Novel", "2"),
    ("Japanese Novel", "3"),
    ("English Novel", "4"),
];

const GENRE_MODES: FilterOptions = &[("and", "and"), ("or", "or"), ("exclude", "exclude")];

const GENRES: FilterOptions = &[
    ("Action", "3"),
    ("Adult", "28"),
    ("Adventure", "4"),
    ("Anime", "46"),
    ("Arts", "47"),
    ("Comedy", "5"),
    ("Drama", "24"),
    ("Ecchi", "26"),
    ("Eastern", "44"),
    ("Fan-Fiction", "48"),
    ("Fantasy", "6"),
    ("Game", "19"),
    ("Gender Bender", "25"),
    ("Historical", "12"),
    ("Horror", "37"),
    ("Isekai", "49"),
    ("Josei", "2"),
    ("Lgbt+", "45"),
    ("Magic", "50"),
    ("Magical realism", "51"),
    ("Manhua", "52"),
    ("Martial Arts", "15"),
    ("Mature", "8"),
    ("Mecha", "34"),
    ("Military", "53"),
    ("Modern life", "54"),
    ("Movies", "55"),
    ("Mystery", "16"),
    ("Other", "64"),
    ("Psychological", "9"),
    ("Realistic fiction", "56"),
    ("Reincarnation", "43"),
    ("Romance", "1"),
    ("School Life", "21"),
    ("Sci-fi", "20"),
    ("Seinen", "10"),
    ("Shoujo", "38"),
    ("Shoujo Ai", "57"),
    ("Shounen", "17"),
    ("Shounen Ai", "39"),
    ("Slice of Life", "13"),
    ("Smut", "29"),
    ("Sports", "42"),
    ("Supernatural", "18"),
    ("System", "58"),
    ("Tragedy", "32"),
    ("Urban", "63"),
    ("Urban Life", "59"),
    ("Video Games", "60"),
    ("War", "61"),
    ("Wuxia", "31"),
    ("Xianxia", "23"),
    ("Xuanhuan", "22"),
    ("Yaoi", "14"),
    ("Yuri", "62"),
];

const CHAPTER_RANGES: FilterOptions = &[
    ("All", "0"),
    ("<50", "1,49"),
    ("50-100", "50,100"),
    ("100-200", "100,200"),
    ("200-500", "200,500"),
    ("500-1000", "500,1000"),
    (">1000", "1001,1000000"),
];

const RATING_MODES: FilterOptions = &[("Minimum", "min"), ("Maximum", "max")];

const TRANSLATION_STATUS: FilterOptions = &[("All", "-1"), ("Ongoing", "0"), ("Completed", "1")];

const SORTS: FilterOptions = &[
    ("Last Updated (Newest)", "date"),
    ("Rank (Top)", "rank-top"),
    ("Review Count (Most)", "review"),
    ("Rating Score (Top)", "rating-score-top"),
    ("Bookmark Count (Top)", "bookmark"),
    ("Title A>Z", "abc"),
    ("Title Z>A", "cba"),
];

const TITLE: &[Strategy] = &[
    Strategy::Text("h1.novel-title"),
    Strategy::Text(".novel-title h1"),
    Strategy::Text("h1.entry-title"),
    Strategy::Meta("og:title"),
    Strategy::Title(&[" - NovelFire"]),
];

const AUTHOR: &[Strategy] = &[
    Strategy::Text(".author a"),
    Strategy::Custom(labelled_author),
    Strategy::Text(".novel-author"),
    Strategy::Text(".author-name"),
    Strategy::Meta("og:novel:author"),
    Strategy::Labelled {
        selector: "b, strong",
        label: "Author",
    },
];

const GENRE_LIST: &[ListStrategy] = &[ListStrategy::Each(".categories ul li a")];

const DESCRIPTION: &[Strategy] = &[
    Strategy::Text(".summary .content"),
    Strategy::Text(".summary .expand-wrapper"),
    Strategy::Text(".novel-summary"),
    Strategy::Meta("og:description"),
    Strategy::Meta("description"),
];

const COVER: &[Strategy] = &[
    Strategy::AttrAny(".cover > img", &["data-src", "src"]),
    Strategy::Meta("og:image"),
];

const CONTENT: ContentRules = ContentRules {
    primary: &["#content", ".chapter-content", ".novel-content"],
    secondary: &[".content"],
    noise: &[".ad", ".notification", "div[id^='nf-']", "div[class^='nf-']"],
};

/// `.author` holds "Author: Name" when there is no inner link.
fn labelled_author(root: ElementRef<'_>) -> Option<String> {
    let text = element_text(select_first(root, ".author")?);
    let name = text
        .strip_prefix("Author:")
        .or_else(|| text.strip_prefix("Author"))
        .unwrap_or(&text);
    Some(name.trim().to_string())
}

fn header_status(root: ElementRef<'_>) -> WorkStatus {
    [".header-stats .ongoing", ".header-stats .completed"]
        .iter()
        .find_map(|css| select_first(root, css))
        .map(|e| parse_status(&element_text(e)))
        .unwrap_or_default()
}

fn catalog_entry(item: ElementRef<'_>) -> Option<WorkEntry> {
    let link =
        select_first(item, "h4.novel-title a").or_else(|| select_first(item, "a[title]"))?;
    let title = link
        .value()
        .attr("title")
        .map(str::to_string)
        .unwrap_or_else(|| element_text(link));
    let cover = select_first(item, "figure.novel-cover img")
        .and_then(|img| attr_any(img, &["data-src", "src"]));
    work_entry(&PROFILE, link.value().attr("href"), title.trim().to_string(), cover)
}

fn search_entry(item: ElementRef<'_>) -> Option<WorkEntry> {
    let link = select_first(item, "a")?;
    let title = select_first(item, "h4.novel-title.text1row")
        .or_else(|| select_first(item, "h4.novel-title"))
        .map(element_text)
        .or_else(|| link.value().attr("title").map(str::to_string))
        .unwrap_or_default();
    let cover = select_first(item, "figure.novel-cover img")
        .and_then(|img| attr_any(img, &["data-src", "src"]));
    work_entry(&PROFILE, link.value().attr("href"), title, cover)
}

fn novel_path(work_url: &str) -> String {
    PROFILE
        .relative(work_url)
        .trim_matches('/')
        .trim_end_matches("/chapters")
        .to_string()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NovelFire;

impl Source for NovelFire {
    fn profile(&self) -> &SiteProfile {
        &PROFILE
    }

    fn listing_request(&self, kind: ListingKind, page: u32) -> Request {
        let sort = match kind {
            ListingKind::Popular => "sort-popular",
            ListingKind::Latest => "sort-new",
        };
        PROFILE.get(&format!("/genre-all/{}/status-all/all-novel?page={}", sort, page))
    }

    fn parse_listing(&self, _kind: ListingKind, doc: &Html) -> ListingPage {
        let root = doc.root_element();
        ListingPage {
            entries: select_all(root, CATALOG_ITEM)
                .into_iter()
                .filter_map(catalog_entry)
                .collect(),
            has_next_page: has_match(root, NEXT_PAGE),
        }
    }

    fn filters(&self) -> FilterList {
        FilterList::new(vec![
            Filter::multi_select("Origin / Raw Language", "country_id[]", ORIGIN_LANGUAGES),
            Filter::select("Genres Mode", "ctgcon", GENRE_MODES, Some("and")),
            Filter::multi_select("Genres", "categories[]", GENRES),
            Filter::select("Chapters", "totalchapter", CHAPTER_RANGES, Some("0")),
            Filter::select("Rating Comparator", "ratcon", RATING_MODES, Some("min")),
            Filter::scalar("Rating Value (Max 5)", "rating", 0, 5),
            Filter::select("Translation Status", "status", TRANSLATION_STATUS, Some("-1")),
            Filter::select("Sort Results By", "sort", SORTS, Some("date")),
        ])
    }

    fn search_request(
        &self,
        query: &str,
        filters: &FilterList,
        page: u32,
    ) -> Result<Request, SourceError> {
        let query = query.trim();
        if !query.is_empty() {
            let url = format!("{}/ajax/searchLive", PROFILE.base_url);
            return Ok(PROFILE
                .with_headers(Request::get_with_query(&url, &[("inputContent", query)])?)
                .header("X-Requested-With", "XMLHttpRequest"));
        }
        let filters = if filters.is_empty() {
            self.filters()
        } else {
            filters.clone()
        };
        let params = filters.compile(page)?;
        let url = format!("{}/search-adv", PROFILE.base_url);
        Ok(PROFILE.with_headers(Request::get_with_query(&url, &params)?))
    }

    fn parse_search(&self, body: &str) -> ListingPage {
        let Some((doc, envelope)) = search_document(body) else {
            return ListingPage::default();
        };
        let root = doc.root_element();
        if envelope {
            return ListingPage {
                entries: select_all(root, LIVE_SEARCH_ITEM)
                    .into_iter()
                    .filter_map(search_entry)
                    .collect(),
                has_next_page: false,
            };
        }
        ListingPage {
            entries: select_all(root, &format!("{}, {}", CATALOG_ITEM, LIVE_SEARCH_ITEM))
                .into_iter()
                .filter_map(search_entry)
                .collect(),
            has_next_page: has_link_text(root, &["Next", ">>"]),
        }
    }

    fn details_request(&self, work_url: &str) -> Request {
        PROFILE.get(&format!("/{}", novel_path(work_url)))
    }

    fn parse_details(&self, doc: &Html) -> Work {
        let root = doc.root_element();
        Work {
            url: String::new(),
            title: resolve(root, TITLE, ""),
            author: resolve(root, AUTHOR, ""),
            artist: None,
            genres: resolve_list(root, GENRE_LIST),
            status: header_status(root),
            description: resolve(root, DESCRIPTION, ""),
            thumbnail_url: PROFILE.absolute(&resolve(root, COVER, "")),
        }
    }

    fn chapter_list_request(&self, work_url: &str, page: u32) -> Request {
        let path = novel_path(work_url);
        if page <= 1 {
            PROFILE.get(&format!("/{}/chapters", path))
        } else {
            PROFILE.get(&format!("/{}/chapters?page={}", path, page))
        }
    }

    fn parse_chapter_list(&self, doc: &Html, _page: u32) -> Result<ChapterPage, SourceError> {
        let root = doc.root_element();
        let item_sel = selector(".chapter-list li a")?;
        let chapters = root
            .select(&item_sel)
            .filter_map(|a| {
                let href = a.value().attr("href")?.trim();
                if href.is_empty() {
                    return None;
                }
                let name = select_first(a, "strong.chapter-title")
                    .map(element_text)
                    .unwrap_or_else(|| element_text(a));
                let datetime = select_first(a, "time.chapter-update")
                    .and_then(|t| t.value().attr("datetime"));
                Some(Chapter {
                    url: PROFILE.relative(href),
                    name,
                    date_upload: parse_chapter_date(datetime),
                    index: 0,
                })
            })
            .collect();
        Ok(ChapterPage {
            chapters,
            has_next: has_match(root, NEXT_PAGE),
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

    const LISTING: &str = r#"<html><body>
<ul class="novel-list col6">
  <li class="novel-item">
    <a href="https://novelfire.net/book/shadow-slave" title="Shadow Slave">
      <figure class="novel-cover"><img data-src="/server-1/shadow-slave.jpg" src="/placeholder.gif"></figure>
    </a>
    <h4 class="novel-title"><a href="/book/shadow-slave" title="Shadow Slave">Shadow Slave</a></h4>
  </li>
  <li class="novel-item">
    <h4 class="novel-title"><a href="/book/lord-of-mysteries">Lord of the Mysteries</a></h4>
    <figure class="novel-cover"><img src="//cdn.novelfire.net/lotm.jpg"></figure>
  </li>
  <li class="novel-item"><span>broken card</span></li>
</ul>
<ul class="pagination"><li><a class="page-link" rel="next" href="?page=2">2</a></li></ul>
</body></html>"#;

    const DETAILS: &str = r#"<html><head>
<title>Shadow Slave - NovelFire</title>
<meta property="og:description" content="og summary">
<meta property="og:image" content="https://novelfire.net/og.jpg">
</head><body>
<div class="cover"><img data-src="/server-1/shadow-slave.jpg"></div>
<h1 class="novel-title">Shadow Slave</h1>
<div class="author"><span>Author:</span> <a href="/author/gs"><span>Guiltythree</span></a></div>
<div class="header-stats"><span><strong class="ongoing">Ongoing</strong><small>Status</small></span></div>
<div class="categories"><ul>
  <li><a href="/genre-action">Action</a></li><li><a href="/genre-fantasy">Fantasy</a></li>
  <li><a href="/genre-action">Action</a></li>
</ul></div>
<div class="summary"><div class="content"><p>Growing up in poverty,</p> <p>Sunny never expected anything good.</p></div></div>
</body></html>"#;

    fn chapter_page(numbers: std::ops::RangeInclusive<u32>, next: bool) -> String {
        let items: String = numbers
            .map(|n| {
                format!(
                    r#"<li><a href="/book/shadow-slave/chapter-{n}" title="Chapter {n}">
<strong class="chapter-title">Chapter {n}</strong>
<time class="chapter-update" datetime="2024-01-02 03:04:05">1 year ago</time></a></li>"#
                )
            })
            .collect();
        let pager = if next {
            r#"<ul class="pagination"><li><a class="page-link" rel="next" href="?page=2">›</a></li></ul>"#
        } else {
            ""
        };
        format!(
            r#"<html><body><ul class="chapter-list">{}</ul>{}</body></html>"#,
            items, pager
        )
    }

    #[test]
    fn listing_requests() {
        let req = NovelFire.listing_request(ListingKind::Popular, 3);
        assert_eq!(
            req.url,
            "https://novelfire.net/genre-all/sort-popular/status-all/all-novel?page=3"
        );
        let req = NovelFire.listing_request(ListingKind::Latest, 1);
        assert_eq!(
            req.url,
            "https://novelfire.net/genre-all/sort-new/status-all/all-novel?page=1"
        );
    }

    #[test]
    fn parses_catalog_cards() {
        let page = NovelFire.parse_listing(ListingKind::Popular, &Html::parse_document(LISTING));
        assert!(page.has_next_page);
        assert_eq!(page.entries.len(), 2);
        assert_eq!(page.entries[0].url, "/book/shadow-slave");
        assert_eq!(page.entries[0].title, "Shadow Slave");
        assert_eq!(
            page.entries[0].thumbnail_url,
            "https://novelfire.net/server-1/shadow-slave.jpg"
        );
        assert_eq!(page.entries[1].title, "Lord of the Mysteries");
        assert_eq!(page.entries[1].thumbnail_url, "https://cdn.novelfire.net/lotm.jpg");
    }

    #[test]
    fn quick_search_uses_live_endpoint() -> Result<(), SourceError> {
        let req = NovelFire.search_request("shadow slave", &NovelFire.filters(), 1)?;
        assert_eq!(req.method, Method::Get);
        assert_eq!(
            req.url,
            "https://novelfire.net/ajax/searchLive?inputContent=shadow+slave"
        );
        Ok(())
    }

    #[test]
    fn advanced_search_compiles_filters() -> Result<(), SourceError> {
        let filters = NovelFire
            .filters()
            .with_value("Genres", "Fantasy, Action")?
            .with_value("Translation Status", "Completed")?
            .with_value("Rating Value (Max 5)", "4")?;
        let req = NovelFire.search_request("  ", &filters, 2)?;
        assert_eq!(
            req.url,
            "https://novelfire.net/search-adv?categories%5B%5D=6&categories%5B%5D=3&rating=4&status=1&page=2"
        );
        Ok(())
    }

    #[test]
    fn advanced_search_with_defaults_sends_only_page() -> Result<(), SourceError> {
        let req = NovelFire.search_request("", &FilterList::default(), 1)?;
        assert_eq!(req.url, "https://novelfire.net/search-adv?page=1");
        Ok(())
    }

    #[test]
    fn invalid_rating_fails_request_build() -> Result<(), SourceError> {
        for bad in ["6", "-1", "abc"] {
            let filters = NovelFire.filters().with_value("Rating Value (Max 5)", bad)?;
            assert!(matches!(
                NovelFire.search_request("", &filters, 1),
                Err(SourceError::Validation { .. })
            ));
        }
        Ok(())
    }

    #[test]
    fn live_search_envelope() {
        let body = r#"{"html":"<ul class=\"novel-list horizontal col2\"><li class=\"novel-item\"><a href=\"/book/shadow-slave\"><figure class=\"novel-cover\"><img src=\"/s.jpg\"></figure><h4 class=\"novel-title text1row\">Shadow Slave</h4></a></li></ul>"}"#;
        let page = NovelFire.parse_search(body);
        assert!(!page.has_next_page);
        assert_eq!(page.entries.len(), 1);
        assert_eq!(page.entries[0].title, "Shadow Slave");
        assert_eq!(page.entries[0].thumbnail_url, "https://novelfire.net/s.jpg");
    }

    #[test]
    fn broken_envelope_is_an_empty_page() {
        assert_eq!(NovelFire.parse_search("{\"html\": "), ListingPage::default());
        assert_eq!(NovelFire.parse_search("{\"total\":0}"), ListingPage::default());
    }

    #[test]
    fn advanced_search_html_detects_next_link() {
        let body = r#"<html><body><ul class="novel-list col6"><li class="novel-item">
<a href="/book/a"><h4 class="novel-title text1row">A</h4></a></li></ul>
<a href="?page=2">Next</a></body></html>"#;
        let page = NovelFire.parse_search(body);
        assert!(page.has_next_page);
        assert_eq!(page.entries[0].url, "/book/a");
    }

    #[test]
    fn parses_details() {
        let work = NovelFire.parse_details(&Html::parse_document(DETAILS));
        assert_eq!(work.title, "Shadow Slave");
        assert_eq!(work.author, "Guiltythree");
        assert_eq!(work.genres, vec!["Action", "Fantasy"]);
        assert_eq!(work.status, WorkStatus::Ongoing);
        assert_eq!(
            work.description,
            "Growing up in poverty, Sunny never expected anything good."
        );
        assert_eq!(
            work.thumbnail_url,
            "https://novelfire.net/server-1/shadow-slave.jpg"
        );
    }

    #[test]
    fn details_degrade_to_fallbacks() {
        let doc = Html::parse_document(
            r#"<html><head><title>Some Book - Part 2 - NovelFire</title>
<meta property="og:description" content="From meta."></head>
<body><div class="author">Author: Jane Roe</div></body></html>"#,
        );
        let work = NovelFire.parse_details(&doc);
        assert_eq!(work.title, "Some Book - Part 2");
        assert_eq!(work.author, "Jane Roe");
        assert_eq!(work.description, "From meta.");
        assert_eq!(work.status, WorkStatus::Unknown);
        assert!(work.genres.is_empty());
        assert_eq!(work.thumbnail_url, "");
    }

    #[test]
    fn chapter_list_requests() {
        assert_eq!(
            NovelFire.chapter_list_request("/book/shadow-slave", 1).url,
            "https://novelfire.net/book/shadow-slave/chapters"
        );
        assert_eq!(
            NovelFire
                .chapter_list_request("https://novelfire.net/book/shadow-slave/", 3)
                .url,
            "https://novelfire.net/book/shadow-slave/chapters?page=3"
        );
    }

    #[test]
    fn parses_chapter_page() -> Result<(), SourceError> {
        let doc = Html::parse_document(&chapter_page(1..=3, true));
        let page = NovelFire.parse_chapter_list(&doc, 1)?;
        assert!(page.has_next);
        assert_eq!(page.chapters.len(), 3);
        assert_eq!(page.chapters[0].url, "/book/shadow-slave/chapter-1");
        assert_eq!(page.chapters[0].name, "Chapter 1");
        assert_eq!(page.chapters[0].date_upload, 1_704_164_645_000);

        let doc = Html::parse_document(&chapter_page(4..=5, false));
        let last = NovelFire.parse_chapter_list(&doc, 2)?;
        assert!(!last.has_next);
        Ok(())
    }

    #[test]
    fn content_strips_site_noise() {
        let doc = Html::parse_document(
            r#"<html><body><div id="content"><p>One.</p><div class="nf-ads">x</div>
<div id="nf-slot">y</div><div class="notification">z</div><p>Two.</p></div></body></html>"#,
        );
        let content = NovelFire.parse_chapter_content(&doc, "/book/a/chapter-1");
        assert_eq!(content.url, "/book/a/chapter-1");
        assert!(content.html.starts_with("<p>One.</p>"));
        assert!(content.html.ends_with("<p>Two.</p>"));
        assert!(!content.html.contains("nf-"));
        assert!(!content.html.contains("notification"));
    }
}
