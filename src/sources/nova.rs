//! NOVA adapter (novelasligeras.net, Spanish WooCommerce storefront).
//!
//! Chapter links live inside tab panels grouped under "Volumen" headings. Names are
//! rebuilt from the link text so the volume and part read in a stable order.

use super::{
    attr_any, has_match, search_document, select_all, select_first, work_entry, ListingKind,
    SiteProfile, Source,
};
use crate::engine::resolve::{element_text, selector, ListStrategy, Strategy};
use crate::engine::{
    normalize_content, parse_status_with, resolve, resolve_list, resolve_opt, ChapterOrder,
    ChapterPage, ContentRules, FilterList,
};
use crate::error::SourceError;
use crate::http::Request;
use crate::model::{Chapter, ChapterContent, ListingPage, Work, WorkEntry, WorkStatus};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html};

const PROFILE: SiteProfile = SiteProfile {
    id: "nova",
    name: "NOVA",
    base_url: "https://novelasligeras.net",
    lang: "es",
    hosts: &["novelasligeras.net"],
};

const ITEM: &str = "div.wf-cell";
const NEXT_PAGE: &str = "a.page-numbers.nav-next";
const CHAPTER_LINKS: &str = ".vc_row div.vc_column-inner > div.wpb_wrapper .wpb_tab a";

/// Pages of this one work keep their text in `#content` instead of the column wrapper.
const NAZARICK_MARKER: &str = "Nadie entra sin permiso en la Gran Tumba de Nazarick";

static CHAPTER_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(Parte \d+)[\s\-:.–]+(.+?):\s*(.+)").expect("chapter name pattern is valid")
});

const STATUS_WORDS: &[(&str, WorkStatus)] = &[
    ("en curso", WorkStatus::Ongoing),
    ("completado", WorkStatus::Completed),
];

const TITLE: &[Strategy] = &[Strategy::Text("h1"), Strategy::Meta("og:title")];
const AUTHOR: &[Strategy] = &[Strategy::Text(
    ".woocommerce-product-attributes-item--attribute_pa_escritor td",
)];
const ARTIST: &[Strategy] = &[Strategy::Text(
    ".woocommerce-product-attributes-item--attribute_pa_ilustrador td",
)];
const STATUS: &[Strategy] = &[Strategy::Text(
    ".woocommerce-product-attributes-item--attribute_pa_estado td",
)];
const SUMMARY: &[Strategy] = &[
    Strategy::JoinText {
        selector: ".woocommerce-product-details__short-description",
        separator: " ",
    },
    Strategy::Meta("og:description"),
];
const COVER: &[Strategy] = &[
    Strategy::AttrAny(".woocommerce-product-gallery img", &["data-src", "src"]),
    Strategy::Meta("og:image"),
];
const GENRE_LIST: &[ListStrategy] = &[ListStrategy::Each(".product_meta .posted_in a")];
const LABEL_LIST: &[ListStrategy] = &[ListStrategy::Each(
    ".woocommerce-product-gallery .berocket_better_labels b",
)];

const CONTENT: ContentRules = ContentRules {
    primary: &[".wpb_text_column.wpb_content_element > .wpb_wrapper"],
    secondary: &[],
    noise: &["h1", "center", "img.aligncenter.size-large"],
};

const NAZARICK_CONTENT: ContentRules = ContentRules {
    primary: &["#content"],
    ..CONTENT
};

fn listing_entry(item: ElementRef<'_>) -> Option<WorkEntry> {
    let link = select_first(item, "h4.entry-title a")?;
    let cover = select_first(item, "img").and_then(|img| attr_any(img, &["data-src", "src"]));
    work_entry(&PROFILE, link.value().attr("href"), element_text(link), cover)
}

fn listing_page(doc: &Html) -> ListingPage {
    let root = doc.root_element();
    ListingPage {
        entries: select_all(root, ITEM)
            .into_iter()
            .filter_map(listing_entry)
            .collect(),
        has_next_page: has_match(root, NEXT_PAGE),
    }
}

/// Nearest "Volumen ..." heading among the link's ancestors.
fn volume_of(link: ElementRef<'_>) -> Option<String> {
    let heading = selector(".dt-fancy-title").ok()?;
    link.ancestors()
        .filter_map(ElementRef::wrap)
        .find_map(|anc| {
            anc.select(&heading)
                .map(element_text)
                .find(|t| t.starts_with("Volumen"))
        })
}

/// `"Parte 1 - Capítulo 3: El comienzo"` -> `"Volumen 2 - Capítulo 3 - Parte 1: El comienzo"`.
fn chapter_name(text: &str, volume: Option<&str>) -> String {
    let body = match CHAPTER_NAME.captures(text) {
        Some(c) => format!("{} - {}: {}", &c[2], &c[1], &c[3]),
        None => text.to_string(),
    };
    match volume {
        Some(v) if !v.is_empty() => format!("{} - {}", v, body),
        _ => body,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Nova;

impl Source for Nova {
    fn profile(&self) -> &SiteProfile {
        &PROFILE
    }

    fn listing_request(&self, kind: ListingKind, page: u32) -> Request {
        let order = match kind {
            ListingKind::Popular => "popularity",
            ListingKind::Latest => "date",
        };
        PROFILE.get(&format!(
            "/index.php/page/{}/?post_type=product&orderby={}",
            page, order
        ))
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
        let url = format!("{}/index.php/page/{}/", PROFILE.base_url, page);
        Ok(PROFILE.with_headers(Request::get_with_query(
            &url,
            &[
                ("s", query.trim()),
                ("post_type", "product"),
                ("orderby", "relevance"),
            ],
        )?))
    }

    fn parse_search(&self, body: &str) -> ListingPage {
        search_document(body)
            .map(|(doc, _)| listing_page(&doc))
            .unwrap_or_default()
    }

    fn parse_details(&self, doc: &Html) -> Work {
        let root = doc.root_element();
        let labels: Vec<String> = resolve_list(root, LABEL_LIST)
            .into_iter()
            .take(2)
            .map(|l| format!("[{}]", l))
            .collect();
        let summary = resolve(root, SUMMARY, "");
        let description = format!("{}\n\n{}", labels.join(" "), summary)
            .trim()
            .to_string();
        Work {
            url: String::new(),
            title: resolve(root, TITLE, ""),
            author: resolve(root, AUTHOR, ""),
            artist: resolve_opt(root, ARTIST),
            genres: resolve_list(root, GENRE_LIST),
            status: resolve_opt(root, STATUS)
                .map(|s| parse_status_with(&s, STATUS_WORDS))
                .unwrap_or_default(),
            description,
            thumbnail_url: PROFILE.absolute(&resolve(root, COVER, "")),
        }
    }

    fn chapter_list_request(&self, work_url: &str, _page: u32) -> Request {
        PROFILE.get(work_url)
    }

    fn parse_chapter_list(&self, doc: &Html, _page: u32) -> Result<ChapterPage, SourceError> {
        let link_sel = selector(CHAPTER_LINKS)?;
        let chapters = doc
            .root_element()
            .select(&link_sel)
            .filter_map(|a| {
                let href = a.value().attr("href")?.trim();
                if href.is_empty() {
                    return None;
                }
                let volume = volume_of(a);
                Some(Chapter {
                    url: PROFILE.relative(href),
                    name: chapter_name(&element_text(a), volume.as_deref()),
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
        let rules = if doc.html().contains(NAZARICK_MARKER) {
            &NAZARICK_CONTENT
        } else {
            &CONTENT
        };
        ChapterContent {
            url: url.to_string(),
            html: normalize_content(doc, rules),
        }
    }
}
