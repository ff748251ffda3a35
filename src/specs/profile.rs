// src/specs/profile.rs
//! Profile and timeline-history pages.
//!
//! Profile layout (any subset may be missing):
//! ```text
//! h1.name                          display name
//! ul.metrics-list / .details li    "Pos QB", "Height 6-3", "Home Town Dallas, TX", ...
//! section.rankings                 one per ranking view
//!   .rankings-header h3            "247Sports Composite", "247Sports", "247Sports JUCO"
//!   span.icon-starsolid.yellow     one per star
//!   .rank-block                    rating
//!   ul.ranks-list li               <b>label</b> <a href=...?Position=QB><strong>#2</strong></a>
//! .timeline li                     abbreviated timeline
//! a[href*=TimelineEvents]          full history
//! ```

use scraper::{ElementRef, Html};

use super::{all_matches, first_match, Strategy};
use crate::core::html::{attr, first_text, select_all, select_first, text_of};
use crate::core::net::resolve_href;

const NAME: [Strategy; 2] = [
    Strategy::new("name", ".name"),
    Strategy::new("h1-name", "h1.name"),
];

const VITALS: [Strategy; 3] = [
    Strategy::new("metrics", ".metrics-list li"),
    Strategy::new("details", ".details li"),
    Strategy::new("vitals", "ul.vitals li"),
];

const SECTIONS: [Strategy; 3] = [
    Strategy::new("rankings", "section.rankings"),
    Strategy::new("rankings-section", "section.rankings-section"),
    Strategy::new("ranking-div", "div.ranking-section"),
];

const HEADING: [Strategy; 3] = [
    Strategy::new("header-h3", ".rankings-header h3"),
    Strategy::new("title", "h3.title"),
    Strategy::new("any-h3", "h3"),
];

const STARS: [Strategy; 2] = [
    Strategy::new("span-star", "span.icon-starsolid.yellow"),
    Strategy::new("i-star", "i.icon-starsolid.yellow"),
];

const RATING: [Strategy; 3] = [
    Strategy::new("rank-block", ".rank-block"),
    Strategy::new("score", ".score"),
    Strategy::new("rating", ".rating"),
];

const TIMELINE: [Strategy; 4] = [
    Strategy::new("timeline-item", ".timeline-item"),
    Strategy::new("timeline-li", ".timeline li"),
    Strategy::new("timeline-ul", "ul.timeline > li"),
    Strategy::new("vertical", ".vertical-timeline-element-content"),
];

const COMMIT_BANNER: [Strategy; 2] = [
    Strategy::new("commit-banner", ".commit-banner"),
    Strategy::new("commitment", ".commitment"),
];

const HISTORY_ITEMS: [Strategy; 1] = [Strategy::new("event-index", "ul.timeline-event-index_lst li")];

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Link {
    pub text: String,
    /// Absolute.
    pub href: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RankLine {
    pub href: String,
    pub label: Option<String>,
    pub rank_text: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RankingSection {
    pub heading: String,
    pub stars: usize,
    pub rating_text: Option<String>,
    pub ranks: Vec<RankLine>,
}

/// Everything the reconciler needs from one profile page.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProfileView {
    pub url: String,
    pub name: Option<String>,
    pub vitals: Vec<String>,
    pub sections: Vec<RankingSection>,
    pub timeline: Vec<String>,
    pub links: Vec<Link>,
    pub history_href: Option<String>,
    pub banner_texts: Vec<String>,
    /// Raw page markers used for post-secondary detection.
    pub mentions_juco: bool,
    pub mentions_high_school_group: bool,
}

impl ProfileView {
    pub fn link_with_text(&self, needles: &[&str]) -> Option<&Link> {
        self.links.iter().find(|l| needles.iter().any(|n| l.text.contains(n)))
    }
}

pub fn read_profile(url: &str, html: &str) -> ProfileView {
    let doc = Html::parse_document(html);
    let root = doc.root_element();

    let name = first_match(root, &NAME)
        .and_then(|(_, els)| els.into_iter().map(text_of).find(|t| !t.is_empty()));

    let vitals = all_matches(root, &VITALS).into_iter().map(text_of).filter(|t| !t.is_empty()).collect();

    let sections = first_match(root, &SECTIONS)
        .map(|(_, els)| els.into_iter().map(|s| read_section(url, s)).collect())
        .unwrap_or_default();

    let timeline = all_matches(root, &TIMELINE).into_iter().map(text_of).filter(|t| !t.is_empty()).collect();

    let links: Vec<Link> = select_all(root, "a[href]")
        .into_iter()
        .filter_map(|a| {
            let href = attr(a, "href")?;
            Some(Link { text: text_of(a), href: resolve_href(url, &href) })
        })
        .collect();

    let history_href = links.iter().find(|l| l.href.contains("TimelineEvents")).map(|l| l.href.clone());

    let banner_texts = first_match(root, &COMMIT_BANNER)
        .map(|(_, banners)| {
            banners
                .into_iter()
                .flat_map(|b| select_all(b, "span, a"))
                .map(text_of)
                .filter(|t| !t.is_empty())
                .collect()
        })
        .unwrap_or_default();

    ProfileView {
        url: s!(url),
        name,
        vitals,
        sections,
        timeline,
        history_href,
        banner_texts,
        mentions_juco: html.contains("247SportsJUCO"),
        mentions_high_school_group: html.contains("InstitutionGroup=HighSchool"),
        links,
    }
}

fn read_section(base: &str, section: ElementRef<'_>) -> RankingSection {
    let heading = HEADING
        .iter()
        .find_map(|s| first_text(section, s.css))
        .unwrap_or_default();

    let stars = first_match(section, &STARS).map(|(_, els)| els.len()).unwrap_or(0);

    let rating_text = RATING.iter().find_map(|s| first_text(section, s.css));

    let ranks = select_all(section, "ul.ranks-list li")
        .into_iter()
        .filter_map(|li| {
            let a = select_first(li, "a[href]")?;
            Some(RankLine {
                href: resolve_href(base, &attr(a, "href")?),
                label: first_text(li, "b"),
                rank_text: first_text(li, "strong"),
            })
        })
        .collect();

    RankingSection { heading, stars, rating_text, ranks }
}

/// One page of the full timeline history.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HistoryPage {
    pub items: Vec<String>,
    pub next_href: Option<String>,
}

pub fn read_history(url: &str, html: &str) -> HistoryPage {
    let doc = Html::parse_document(html);
    let root = doc.root_element();
    let items = first_match(root, &HISTORY_ITEMS)
        .map(|(_, els)| els.into_iter().map(text_of).filter(|t| !t.is_empty()).collect())
        .unwrap_or_default();
    let next_href = select_first(root, "li.next_itm a[href]")
        .and_then(|a| attr(a, "href"))
        .map(|h| resolve_href(url, &h));
    HistoryPage { items, next_href }
}
