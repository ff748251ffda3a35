// src/profile/mod.rs
//! Turns one entity locator into one complete record.
//!
//! 1. Fetch the entity page.
//! 2. Navigate: a college page links to the recruiting profile; a junior-college
//!    recruiting profile links to the high-school one. Each hop is recorded.
//! 3. Extract identity fields, both ranking views, and the timeline (the
//!    abbreviated list always, the full history when a deep dive is allowed).
//!
//! Nothing here fails the batch: fetch trouble becomes a `Failed` or `Degraded`
//! status on an otherwise well-formed record.

pub mod timeline;

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::consts::{MAX_STARS, NA};
use crate::config::options::CrawlConfig;
use crate::core::net::Fetcher;
use crate::core::sanitize::{clean_text, first_number, format_date, normalize_height, parse_rank};
use crate::identity::EntityLocator;
use crate::record::{Field, FieldRecord, RankingSystem};
use crate::specs::profile::{read_history, read_profile, ProfileView, RankingSection};
use timeline::{parse_events, DecisionMerge, EventKind, Offer};

static VITAL_RES: LazyLock<Vec<(Field, Regex)>> = LazyLock::new(|| {
    [
        (Field::Position, r"^(?:Position|Pos)\b[:\s]*(.*)$"),
        (Field::Height, r"^Height\b[:\s]*(.*)$"),
        (Field::Weight, r"^Weight\b[:\s]*(.*)$"),
        (Field::HighSchool, r"^High School\b[:\s]*(.*)$"),
        (Field::CityState, r"^(?:Home Town|Hometown|City)\b[:\s]*(.*)$"),
    ]
    .into_iter()
    .map(|(f, p)| (f, Regex::new(p).expect("vital pattern")))
    .collect()
});

const RECRUITING_LINK_TEXT: [&str; 2] = ["View recruiting profile", "Recruiting Profile"];
const HIGH_SCHOOL_LINK_TEXT: [&str; 2] = ["(HS)", "(HS -"];

/// Inputs the reconciler needs besides the locator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcileConfig {
    pub year: i32,
    pub history_pages: usize,
    pub source_label: String,
}

impl ReconcileConfig {
    pub fn from_crawl(cfg: &CrawlConfig, source_label: &str) -> Self {
        Self { year: cfg.year, history_pages: cfg.history_pages, source_label: s!(source_label) }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Fallback {
    RecruitingProfile,
    HighSchoolProfile,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ProfileStatus {
    /// Name and at least one national rank.
    Full,
    /// Page read, but something is missing or a follow-up fetch failed.
    Degraded,
    /// The entity page itself could not be fetched.
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProfileReport {
    pub status: ProfileStatus,
    pub fallbacks: Vec<Fallback>,
    /// Post-secondary page with no high-school profile to move to.
    pub uncorrected_category: bool,
    pub found_ranking: bool,
    pub history_pages: usize,
    pub decision: Option<EventKind>,
    pub errors: Vec<String>,
}

impl ProfileReport {
    pub fn failed(error: &str) -> Self {
        Self { status: ProfileStatus::Failed, errors: vec![s!(error)], ..Self::new() }
    }

    fn new() -> Self {
        Self {
            status: ProfileStatus::Degraded,
            fallbacks: Vec::new(),
            uncorrected_category: false,
            found_ranking: false,
            history_pages: 0,
            decision: None,
            errors: Vec::new(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Reconciled {
    pub record: FieldRecord,
    pub report: ProfileReport,
}

pub fn reconcile<F: Fetcher + ?Sized>(
    fetcher: &mut F,
    locator: &EntityLocator,
    deep_dive: bool,
    cfg: &ReconcileConfig,
) -> Reconciled {
    let mut record = FieldRecord::for_entity(locator, cfg.year, &cfg.source_label);
    let mut report = ProfileReport::new();

    let page = match fetcher.fetch(locator.as_str()) {
        Ok(p) => p,
        Err(e) => {
            warn!(%locator, error = %e, "entity page unavailable");
            report.errors.push(format!("fetch: {e}"));
            report.status = ProfileStatus::Failed;
            return Reconciled { record, report };
        }
    };
    let mut view = read_profile(&page.url, &page.body);

    if let Some(link) = view.link_with_text(&RECRUITING_LINK_TEXT).map(|l| l.href.clone()) {
        match fetcher.fetch(&link) {
            Ok(p) => {
                debug!(%locator, "moved to recruiting profile");
                view = read_profile(&p.url, &p.body);
                report.fallbacks.push(Fallback::RecruitingProfile);
            }
            Err(e) => report.errors.push(format!("recruiting profile: {e}")),
        }
    }

    if is_post_secondary(&view) {
        match view.link_with_text(&HIGH_SCHOOL_LINK_TEXT).map(|l| l.href.clone()) {
            Some(link) => match fetcher.fetch(&link) {
                Ok(p) => {
                    debug!(%locator, "moved to high-school profile");
                    view = read_profile(&p.url, &p.body);
                    report.fallbacks.push(Fallback::HighSchoolProfile);
                }
                Err(e) => {
                    report.errors.push(format!("high-school profile: {e}"));
                    report.uncorrected_category = true;
                }
            },
            None => report.uncorrected_category = true,
        }
    }

    extract_identity(&view, cfg.year, &mut record);
    report.found_ranking = extract_rankings(&view, &mut record);
    extract_timeline(fetcher, &view, deep_dive, cfg, &mut record, &mut report);

    report.status = if report.errors.is_empty() && report.found_ranking && record.is_known(Field::Name) {
        ProfileStatus::Full
    } else {
        ProfileStatus::Degraded
    };
    Reconciled { record, report }
}

/// Junior-college URL, or a JUCO-only ranking page.
pub fn is_post_secondary(view: &ProfileView) -> bool {
    let url = view.url.to_lowercase();
    if url.contains("junior-college") || url.contains("/college-") {
        return true;
    }
    let juco_heading = view.sections.iter().any(|s| s.heading.to_uppercase().contains("JUCO"));
    (view.mentions_juco || juco_heading) && !view.mentions_high_school_group
}

fn extract_identity(view: &ProfileView, year: i32, record: &mut FieldRecord) {
    if let Some(name) = &view.name {
        record.set(Field::Name, clean_text(name));
    }
    for text in &view.vitals {
        let Some((field, value)) = vital(text) else { continue };
        let value = match field {
            Field::Height => normalize_height(&value),
            _ => clean_text(&value),
        };
        record.set_if_unknown(field, value);
    }
    record.set(Field::Class, year.to_string());
}

fn vital(text: &str) -> Option<(Field, String)> {
    VITAL_RES
        .iter()
        .find_map(|(field, re)| re.captures(text).map(|c| (*field, s!(c[1].trim()))))
}

pub fn classify_heading(heading: &str) -> Option<RankingSystem> {
    let h = heading.to_uppercase();
    if h.contains("JUCO") {
        None
    } else if h.contains("COMPOSITE") {
        Some(RankingSystem::Composite)
    } else if h.contains("247SPORTS") {
        Some(RankingSystem::Site247)
    } else {
        None
    }
}

/// True when a national rank was found in any view.
fn extract_rankings(view: &ProfileView, record: &mut FieldRecord) -> bool {
    for section in &view.sections {
        match classify_heading(&section.heading) {
            Some(system) => read_ranking(section, system, record),
            None => debug!(heading = %section.heading, "ranking section skipped"),
        }
    }
    RankingSystem::ALL.iter().any(|s| record.is_known(s.national_rank()))
}

fn read_ranking(section: &RankingSection, system: RankingSystem, record: &mut FieldRecord) {
    if section.stars > 0 {
        record.set_if_unknown(system.stars(), section.stars.min(MAX_STARS).to_string());
    }
    if let Some(rating) = section.rating_text.as_deref().and_then(first_number) {
        record.set_if_unknown(system.rating(), rating);
    }
    for line in &section.ranks {
        let rank = line.rank_text.as_deref().and_then(parse_rank).map(|r| r.to_string());
        if line.href.contains("Position=") {
            if let Some(label) = &line.label {
                record.set_if_unknown(system.position(), clean_text(label));
            }
            if let Some(rank) = rank {
                record.set_if_unknown(system.position_rank(), rank);
            }
        } else if line.href.contains("State=") || line.href.contains("state=") {
            continue;
        } else if line.href.contains("InstitutionGroup=HighSchool") {
            if let Some(rank) = rank {
                record.set_if_unknown(system.national_rank(), rank);
            }
        }
    }
}

fn extract_timeline<F: Fetcher + ?Sized>(
    fetcher: &mut F,
    view: &ProfileView,
    deep_dive: bool,
    cfg: &ReconcileConfig,
    record: &mut FieldRecord,
    report: &mut ProfileReport,
) {
    let mut merge = DecisionMerge::new(cfg.year);

    for text in &view.timeline {
        for ev in parse_events(text) {
            if ev.kind == EventKind::Draft {
                if let Some(date) = ev.date {
                    record.set_if_unknown(Field::DraftDate, format_date(date));
                }
                if let Some(team) = &ev.team {
                    record.set_if_unknown(Field::DraftTeam, team.as_str());
                }
                continue;
            }
            merge.offer(&ev);
        }
    }

    if deep_dive && !merge.is_settled() {
        if let Some(href) = &view.history_href {
            scan_history(fetcher, href, cfg.history_pages, &mut merge, report);
        }
    }

    let decision = merge.finish();
    report.decision = decision.kind;
    if let Some(date) = decision.date {
        record.set(Field::SignedDate, format_date(date));
    }
    if let Some(team) = decision.team {
        record.set(Field::SignedTeam, team);
    }

    if !record.is_known(Field::SignedTeam) {
        let banner = view.banner_texts.iter().find(|t| {
            let l = t.to_lowercase();
            !(l.contains("committed") || l.contains("commitment") || l.contains("signed")) && t.as_str() != NA
        });
        if let Some(team) = banner {
            record.set(Field::SignedTeam, team.as_str());
        }
    }
}

/// Walk the paginated history until a decisive event or the page limit.
fn scan_history<F: Fetcher + ?Sized>(
    fetcher: &mut F,
    first: &str,
    max_pages: usize,
    merge: &mut DecisionMerge,
    report: &mut ProfileReport,
) {
    let mut next = Some(s!(first));
    while let Some(url) = next.take() {
        if report.history_pages >= max_pages {
            break;
        }
        let page = match fetcher.fetch(&url) {
            Ok(p) => p,
            Err(e) => {
                report.errors.push(format!("history page {}: {e}", report.history_pages + 1));
                break;
            }
        };
        report.history_pages += 1;
        let history = read_history(&page.url, &page.body);
        for text in &history.items {
            for ev in parse_events(text) {
                if merge.offer(&ev) == Offer::Decisive {
                    return;
                }
            }
        }
        next = history.next_href;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::net::ReplayFetcher;
    use crate::identity::normalize;
    use pretty_assertions::assert_eq;

    const ENTITY: &str = "https://247sports.com/player/jalen-example-12345/";
    const HISTORY_1: &str = "https://247sports.com/Player/Jalen-Example-12345/TimelineEvents/";
    const HISTORY_2: &str = "https://247sports.com/Player/Jalen-Example-12345/TimelineEvents/?page=2";
    const HS: &str = "https://247sports.com/Player/Jalen-Example-12345/high-school-55555/";

    fn cfg() -> ReconcileConfig {
        ReconcileConfig { year: 2020, history_pages: 10, source_label: s!("test") }
    }

    fn site() -> ReplayFetcher {
        ReplayFetcher::new()
            .with_page(ENTITY, include_str!("../../tests/fixtures/profile.html"))
            .with_page(HISTORY_1, include_str!("../../tests/fixtures/history_1.html"))
            .with_page(HISTORY_2, include_str!("../../tests/fixtures/history_2.html"))
    }

    #[test]
    fn full_profile_with_deep_dive() {
        let mut f = site();
        let out = reconcile(&mut f, &normalize(ENTITY), true, &cfg());
        let r = &out.record;
        assert_eq!(out.report.status, ProfileStatus::Full);
        assert_eq!(r.get(Field::Id), "12345");
        assert_eq!(r.name(), "Jalen Example");
        assert_eq!(r.get(Field::Position), "QB");
        assert_eq!(r.get(Field::Height), "'6-3");
        assert_eq!(r.get(Field::Weight), "215");
        assert_eq!(r.get(Field::HighSchool), "Central Prep");
        assert_eq!(r.get(Field::CityState), "Dallas, TX");
        assert_eq!(r.get(Field::Class), "2020");
        assert_eq!(r.get(Field::CompositeStars), "4");
        assert_eq!(r.get(Field::CompositeRating), "0.9812");
        assert_eq!(r.get(Field::CompositeNationalRank), "12");
        assert_eq!(r.get(Field::CompositePosition), "QB");
        assert_eq!(r.get(Field::CompositePositionRank), "2");
        assert_eq!(r.get(Field::Rating247), "96");
        assert_eq!(r.get(Field::NationalRank247), "15");
        assert_eq!(r.get(Field::PositionRank247), "3");
        assert_eq!(r.get(Field::DraftDate), "04/25/2024");
        assert_eq!(r.get(Field::DraftTeam), "Dallas Cowboys");
        // the commitment on history page 1 outranks the signing
        assert_eq!(r.get(Field::SignedDate), "06/05/2019");
        assert_eq!(r.get(Field::SignedTeam), "Alabama Crimson Tide");
        assert_eq!(out.report.decision, Some(EventKind::Commitment));
        assert_eq!(out.report.history_pages, 1);
        assert!(!f.was_requested(HISTORY_2));
    }

    #[test]
    fn without_deep_dive_the_signing_stands() {
        let mut f = site();
        let out = reconcile(&mut f, &normalize(ENTITY), false, &cfg());
        assert_eq!(out.record.get(Field::SignedDate), "02/05/2020");
        assert_eq!(out.record.get(Field::SignedTeam), "Alabama");
        assert_eq!(out.report.history_pages, 0);
        assert!(!f.was_requested(HISTORY_1));
    }

    #[test]
    fn page_limit_bounds_the_history_walk() {
        let quiet_page = include_str!("../../tests/fixtures/history_1.html")
            .replace("Commitment:", "Update:")
            .replace("commits to", "talks to");
        let site = || {
            ReplayFetcher::new()
                .with_page(ENTITY, include_str!("../../tests/fixtures/profile.html"))
                .with_page(HISTORY_1, &quiet_page)
                .with_page(HISTORY_2, include_str!("../../tests/fixtures/history_2.html"))
        };
        // 2019 class: the Feb 2020 signing is past the cutoff
        let one_page = ReconcileConfig { year: 2019, history_pages: 1, ..cfg() };
        let mut f = site();
        let out = reconcile(&mut f, &normalize(ENTITY), true, &one_page);
        assert_eq!(out.report.history_pages, 1);
        assert!(!f.was_requested(HISTORY_2));
        assert_eq!(out.record.get(Field::SignedDate), NA);

        let two_pages = ReconcileConfig { history_pages: 2, ..one_page };
        let mut f = site();
        let out = reconcile(&mut f, &normalize(ENTITY), true, &two_pages);
        assert_eq!(out.report.history_pages, 2);
        assert_eq!(out.record.get(Field::SignedDate), "01/02/2019");
        assert_eq!(out.record.get(Field::SignedTeam), "Texas Longhorns");
    }

    #[test]
    fn unreachable_entity_is_failed_but_well_formed() {
        let mut f = ReplayFetcher::new();
        let out = reconcile(&mut f, &normalize(ENTITY), true, &cfg());
        assert_eq!(out.report.status, ProfileStatus::Failed);
        assert_eq!(out.record.get(Field::Id), "12345");
        assert_eq!(out.record.get(Field::ProfileUrl), ENTITY);
        assert_eq!(out.record.name(), NA);
    }

    #[test]
    fn college_page_moves_to_recruiting_profile() {
        let mut f = ReplayFetcher::new()
            .with_page(ENTITY, include_str!("../../tests/fixtures/profile_college.html"))
            .with_page(HS, include_str!("../../tests/fixtures/profile.html"));
        let out = reconcile(&mut f, &normalize(ENTITY), false, &cfg());
        assert_eq!(out.report.fallbacks, vec![Fallback::RecruitingProfile]);
        assert_eq!(out.record.get(Field::CompositeNationalRank), "12");
        assert_eq!(out.report.status, ProfileStatus::Full);
    }

    #[test]
    fn juco_profile_moves_to_high_school() {
        let mut f = ReplayFetcher::new()
            .with_page(ENTITY, include_str!("../../tests/fixtures/profile_juco.html"))
            .with_page(HS, include_str!("../../tests/fixtures/profile.html"));
        let out = reconcile(&mut f, &normalize(ENTITY), false, &cfg());
        assert_eq!(out.report.fallbacks, vec![Fallback::HighSchoolProfile]);
        assert!(!out.report.uncorrected_category);
        assert_eq!(out.record.get(Field::NationalRank247), "15");
    }

    #[test]
    fn juco_without_high_school_link_is_flagged() {
        let juco = include_str!("../../tests/fixtures/profile_juco.html").replace("(HS)", "(prep)");
        let mut f = ReplayFetcher::new().with_page(ENTITY, &juco);
        let out = reconcile(&mut f, &normalize(ENTITY), false, &cfg());
        assert!(out.report.uncorrected_category);
        assert!(!out.report.found_ranking);
        assert_eq!(out.report.status, ProfileStatus::Degraded);
        assert_eq!(out.record.get(Field::NationalRank247), NA);
    }

    #[test]
    fn headings_map_to_views() {
        assert_eq!(classify_heading("247Sports Composite®"), Some(RankingSystem::Composite));
        assert_eq!(classify_heading("247Sports"), Some(RankingSystem::Site247));
        assert_eq!(classify_heading("247Sports JUCO"), None);
        assert_eq!(classify_heading("Rivals"), None);
    }

    #[test]
    fn vitals_by_label() {
        assert_eq!(vital("Position QB"), Some((Field::Position, s!("QB"))));
        assert_eq!(vital("Pos: WR"), Some((Field::Position, s!("WR"))));
        assert_eq!(vital("Hometown Miami, FL"), Some((Field::CityState, s!("Miami, FL"))));
        assert_eq!(vital("Class 2020"), None);
    }
}
