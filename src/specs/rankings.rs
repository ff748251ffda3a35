// src/specs/rankings.rs
//! Ranking list pages, plus the paged HTTP listing built on them.
//!
//! The list page shows the first slice; each "load more" fetches the next
//! `Page=N` slice of the same list. [`PagedListing`] plays that as a
//! [`ListingSource`] so the converging driver can run it.

use std::sync::LazyLock;

use regex::Regex;
use scraper::Html;
use tracing::debug;

use super::{first_match, Strategy};
use crate::config::consts::{COMPOSITE_LIST_URL, LIST_PAGE_QUERY, RANKINGS_247_LIST_URL};
use crate::core::html::{attr, first_text, select_all, select_first, text_of};
use crate::core::net::{resolve_href, Fetcher};
use crate::error::{FetchError, ListingError};
use crate::listing::{ListingSource, RawListItem};
use crate::record::RankingSystem;

static TOTAL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d[\d,]{2,}").expect("total pattern"));

const ITEMS: [Strategy; 3] = [
    Strategy::new("list-item", "li.rankings-page__list-item"),
    Strategy::new("recruit", "li.recruit"),
    Strategy::new("container", ".rankings-page__container ul > li"),
];

const LINKS: [Strategy; 2] = [
    Strategy::new("name-link", "a.rankings-page__name-link"),
    Strategy::new("player-link", "a[href*='/player/'], a[href*='/Player/']"),
];

const TOTAL: [Strategy; 3] = [
    Strategy::new("header-count", ".rankings-page__header .count"),
    Strategy::new("results", ".results-count"),
    Strategy::new("header", ".rankings-page__header"),
];

const LOAD_MORE: &str = "a.load-more, button.load-more, a.rankings-page__showmore";

pub fn listing_url(system: RankingSystem, year: i32) -> String {
    let tmpl = match system {
        RankingSystem::Composite => COMPOSITE_LIST_URL,
        RankingSystem::Site247 => RANKINGS_247_LIST_URL,
    };
    tmpl.replace("{year}", &year.to_string())
}

/// Entries on one list page or slice, in page order.
pub fn read_list_items(url: &str, html: &str) -> Vec<RawListItem> {
    let doc = Html::parse_document(html);
    let root = doc.root_element();

    let Some((strategy, items)) = first_match(root, &ITEMS) else {
        // no list markup at all: take bare profile links
        return select_all(root, LINKS[1].css)
            .into_iter()
            .filter_map(|a| {
                let href = attr(a, "href")?;
                Some(RawListItem { rank_text: None, href: resolve_href(url, &href), name: text_of(a) })
            })
            .collect();
    };
    debug!(strategy, count = items.len(), "list items");

    items
        .into_iter()
        .filter_map(|li| {
            let a = LINKS.iter().find_map(|s| select_first(li, s.css))?;
            let href = attr(a, "href")?;
            Some(RawListItem {
                rank_text: first_text(li, ".rank-column .primary"),
                href: resolve_href(url, &href),
                name: text_of(a),
            })
        })
        .collect()
}

/// Total the header claims, e.g. "2,451 Players".
pub fn read_expected_total(html: &str) -> Option<usize> {
    let doc = Html::parse_document(html);
    let root = doc.root_element();
    TOTAL.iter().find_map(|s| {
        let text = first_text(root, s.css)?;
        let m = TOTAL_RE.find(&text)?;
        m.as_str().replace(',', "").parse().ok()
    })
}

pub fn has_load_more(html: &str) -> bool {
    let doc = Html::parse_document(html);
    let root = doc.root_element();
    if select_first(root, LOAD_MORE).is_some() {
        return true;
    }
    select_all(root, "a, button").into_iter().any(|el| text_of(el).contains("Load More"))
}

/// A ranking list read over plain HTTP, one `Page=N` slice per action.
pub struct PagedListing<F: Fetcher> {
    fetcher: F,
    base_url: String,
    slices: Vec<(String, String)>,
    next_page: usize,
    more: bool,
    loaded: usize,
    expected: Option<usize>,
}

impl<F: Fetcher> PagedListing<F> {
    pub fn open(mut fetcher: F, url: &str) -> Result<Self, ListingError> {
        let page = fetcher
            .fetch(url)
            .map_err(|source| ListingError::Load { url: s!(url), source })?;
        let loaded = read_list_items(&page.url, &page.body).len();
        if loaded == 0 {
            return Err(ListingError::Empty(s!(url)));
        }
        let more = has_load_more(&page.body);
        let expected = read_expected_total(&page.body);
        Ok(Self {
            fetcher,
            base_url: s!(url),
            more,
            loaded,
            expected,
            next_page: 2,
            slices: vec![(page.url, page.body)],
        })
    }

    pub fn for_year(fetcher: F, system: RankingSystem, year: i32) -> Result<Self, ListingError> {
        Self::open(fetcher, &listing_url(system, year))
    }

    fn slice_url(&self) -> String {
        let sep = if self.base_url.contains('?') { '&' } else { '?' };
        format!("{}{sep}{LIST_PAGE_QUERY}{}", self.base_url, self.next_page)
    }
}

impl<F: Fetcher> ListingSource for PagedListing<F> {
    fn has_more(&mut self) -> Result<bool, FetchError> {
        Ok(self.more)
    }

    fn request_more(&mut self) -> Result<bool, FetchError> {
        let url = self.slice_url();
        let page = self.fetcher.fetch(&url)?;
        let found = read_list_items(&page.url, &page.body).len();
        if found == 0 {
            self.more = false;
            return Ok(false);
        }
        self.loaded += found;
        self.next_page += 1;
        self.slices.push((page.url, page.body));
        Ok(true)
    }

    fn item_count(&mut self) -> Result<usize, FetchError> {
        Ok(self.loaded)
    }

    fn expected_total(&mut self) -> Option<usize> {
        self.expected
    }

    fn items(&mut self) -> Result<Vec<RawListItem>, FetchError> {
        Ok(self
            .slices
            .iter()
            .flat_map(|(url, body)| read_list_items(url, body))
            .collect())
    }
}
