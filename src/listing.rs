// src/listing.rs
//! Converging crawl of an incrementally loaded ranking list.
//!
//! A [`ListingSource`] shows some entries and, while more exist, a way to ask
//! for the next slice. The driver keeps asking until the affordance has been
//! gone for several consecutive observations, a failure or action ceiling is
//! hit, or (repair mode) enough entries are loaded to cover the deepest rank
//! of interest. A last re-check catches the affordance reappearing late.

use std::{
    collections::HashSet,
    thread,
    time::Duration,
};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::consts::PROGRESS_EVERY;
use crate::config::options::ListingLimits;
use crate::core::sanitize::{normalize_ws, parse_rank};
use crate::error::FetchError;
use crate::identity::{normalize, EntityLocator};

/// One entry as the page shows it, before normalization.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawListItem {
    pub rank_text: Option<String>,
    pub href: String,
    pub name: String,
}

/// A live, growing listing (browser session, paged HTTP, simulation).
pub trait ListingSource {
    /// Whether a "load more" affordance is currently visible.
    fn has_more(&mut self) -> Result<bool, FetchError>;

    /// Ask for the next slice. `Ok(false)` means nothing new arrived.
    fn request_more(&mut self) -> Result<bool, FetchError>;

    fn item_count(&mut self) -> Result<usize, FetchError>;

    /// Total the page claims to have, if it says.
    fn expected_total(&mut self) -> Option<usize> {
        None
    }

    fn items(&mut self) -> Result<Vec<RawListItem>, FetchError>;

    /// Let the source settle between observations.
    fn settle(&mut self, pause: Duration) {
        if !pause.is_zero() {
            thread::sleep(pause);
        }
    }
}

impl<S: ListingSource + ?Sized> ListingSource for Box<S> {
    fn has_more(&mut self) -> Result<bool, FetchError> { (**self).has_more() }
    fn request_more(&mut self) -> Result<bool, FetchError> { (**self).request_more() }
    fn item_count(&mut self) -> Result<usize, FetchError> { (**self).item_count() }
    fn expected_total(&mut self) -> Option<usize> { (**self).expected_total() }
    fn items(&mut self) -> Result<Vec<RawListItem>, FetchError> { (**self).items() }
    fn settle(&mut self, pause: Duration) { (**self).settle(pause) }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RankEntry {
    pub rank: u32,
    pub locator: EntityLocator,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RankConflict {
    pub rank: u32,
    pub locators: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Termination {
    /// Affordance absent for the configured number of checks.
    Exhausted,
    /// Enough entries loaded to cover the requested depth.
    CeilingReached,
    /// Consecutive failures hit the ceiling; entries may be missing.
    FailureCeiling,
    /// Action budget spent; entries may be missing.
    ActionCeiling,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Coverage {
    /// At least 95% of the advertised total.
    Full,
    /// 80% to 95%.
    Degraded,
    /// Below 80%.
    Severe,
    /// No usable total advertised.
    Unknown,
}

impl Coverage {
    pub fn classify(found: usize, expected: Option<usize>) -> Self {
        match expected {
            Some(total) if total > 0 => {
                let pct = found as f64 * 100.0 / total as f64;
                if pct >= 95.0 { Coverage::Full }
                else if pct >= 80.0 { Coverage::Degraded }
                else { Coverage::Severe }
            }
            _ => Coverage::Unknown,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ListingOutcome {
    /// Rank-ordered, one entry per locator.
    pub entries: Vec<RankEntry>,
    pub conflicts: Vec<RankConflict>,
    pub termination: Termination,
    pub actions: usize,
    pub cleanup_actions: usize,
    pub expected_total: Option<usize>,
    pub coverage: Coverage,
    pub duplicates_dropped: usize,
    pub unresolved: usize,
    /// The final read of the entries failed; `entries` is empty.
    pub extraction_failed: bool,
}

impl ListingOutcome {
    /// Ceilings that end the crawl before the list is known to be complete,
    /// or a final read that came back with nothing.
    pub fn is_partial(&self) -> bool {
        self.extraction_failed
            || matches!(self.termination, Termination::FailureCeiling | Termination::ActionCeiling)
    }
}

enum Step {
    Progressed,
    Idle,
}

fn step<S: ListingSource + ?Sized>(source: &mut S) -> Result<Step, FetchError> {
    if !source.has_more()? {
        return Ok(Step::Idle);
    }
    if source.request_more()? { Ok(Step::Progressed) } else { Ok(Step::Idle) }
}

/// Drive `source` until it converges or a ceiling ends the crawl.
pub fn crawl_listing<S: ListingSource + ?Sized>(source: &mut S, limits: &ListingLimits) -> ListingOutcome {
    let expected_total = source.expected_total();
    if let Some(total) = expected_total {
        info!(total, "listing advertises total");
    }

    let mut actions = 0usize;
    let mut idle = 0u32;
    let mut failures = 0u32;

    let termination = loop {
        if actions >= limits.max_actions {
            warn!(actions, "action ceiling reached; listing may be incomplete");
            break Termination::ActionCeiling;
        }
        match step(source) {
            Ok(Step::Progressed) => {
                actions += 1;
                idle = 0;
                failures = 0;
                source.settle(limits.action_pause());
                if actions % PROGRESS_EVERY == 0 {
                    let loaded = source.item_count().unwrap_or(0);
                    info!(actions, loaded, "listing progress");
                }
                if ceiling_passed(source, limits, actions) {
                    break Termination::CeilingReached;
                }
            }
            Ok(Step::Idle) => {
                idle += 1;
                debug!(idle, "no load-more affordance");
                if idle >= limits.idle_checks {
                    break Termination::Exhausted;
                }
                source.settle(limits.idle_pause());
            }
            Err(e) => {
                failures += 1;
                warn!(failures, error = %e, "load-more failed");
                if failures >= limits.failure_ceiling {
                    warn!("failure ceiling reached; listing may be incomplete");
                    break Termination::FailureCeiling;
                }
                source.settle(limits.failure_pause());
            }
        }
    };

    let cleanup_actions = if termination == Termination::Exhausted {
        recheck(source, limits)
    } else {
        0
    };

    let (raw, extraction_failed) = match source.items() {
        Ok(items) => (items, false),
        Err(e) => {
            warn!(error = %e, "could not read listing entries; listing is partial");
            (Vec::new(), true)
        }
    };
    let assembled = assemble(raw);
    let coverage = Coverage::classify(assembled.entries.len(), expected_total);
    log_coverage(assembled.entries.len(), expected_total, coverage);

    ListingOutcome {
        entries: assembled.entries,
        conflicts: assembled.conflicts,
        termination,
        actions,
        cleanup_actions,
        expected_total,
        coverage,
        duplicates_dropped: assembled.duplicates,
        unresolved: assembled.unresolved,
        extraction_failed,
    }
}

fn ceiling_passed<S: ListingSource + ?Sized>(source: &mut S, limits: &ListingLimits, actions: usize) -> bool {
    let Some(ceiling) = limits.rank_ceiling else { return false };
    if limits.ceiling_check_every == 0 || actions % limits.ceiling_check_every != 0 {
        return false;
    }
    match source.item_count() {
        Ok(loaded) if loaded > ceiling + limits.ceiling_margin => {
            info!(loaded, ceiling, "loaded past requested depth");
            true
        }
        Ok(_) => false,
        Err(e) => {
            debug!(error = %e, "count check failed");
            false
        }
    }
}

/// One more look after convergence; drain a late affordance with bounded actions.
fn recheck<S: ListingSource + ?Sized>(source: &mut S, limits: &ListingLimits) -> usize {
    source.settle(limits.recheck_pause());
    if !matches!(source.has_more(), Ok(true)) {
        return 0;
    }
    warn!("load-more reappeared after convergence; continuing");
    let mut performed = 0;
    for _ in 0..limits.cleanup_attempts {
        match source.has_more() {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                debug!(error = %e, "cleanup check failed");
                continue;
            }
        }
        match source.request_more() {
            Ok(true) => performed += 1,
            Ok(false) => break,
            Err(e) => debug!(error = %e, "cleanup action failed"),
        }
        source.settle(limits.action_pause());
    }
    info!(performed, "cleanup finished");
    performed
}

struct Assembled {
    entries: Vec<RankEntry>,
    conflicts: Vec<RankConflict>,
    duplicates: usize,
    unresolved: usize,
}

/// Normalize, dedup by locator (first wins), rank-order, and report ties.
fn assemble(raw: Vec<RawListItem>) -> Assembled {
    let mut seen = HashSet::new();
    let mut entries = Vec::with_capacity(raw.len());
    let mut duplicates = 0;
    let mut unresolved = 0;

    for item in raw {
        let locator = normalize(&item.href);
        if !seen.insert(locator.clone()) {
            duplicates += 1;
            continue;
        }
        if !locator.is_resolved() {
            unresolved += 1;
            warn!(href = %item.href, "listing entry does not link to a profile");
        }
        // unranked entries take their ordinal position
        let ordinal = entries.len() as u32 + 1;
        let rank = item.rank_text.as_deref().and_then(parse_rank).unwrap_or(ordinal);
        entries.push(RankEntry { rank, locator, name: normalize_ws(&item.name) });
    }
    entries.sort_by_key(|e| e.rank);

    let mut conflicts: Vec<RankConflict> = Vec::new();
    for pair in entries.windows(2) {
        if pair[0].rank != pair[1].rank {
            continue;
        }
        match conflicts.last_mut() {
            Some(c) if c.rank == pair[1].rank => c.locators.push(s!(pair[1].locator.as_str())),
            _ => conflicts.push(RankConflict {
                rank: pair[0].rank,
                locators: vec![s!(pair[0].locator.as_str()), s!(pair[1].locator.as_str())],
            }),
        }
    }
    for c in &conflicts {
        warn!(rank = c.rank, count = c.locators.len(), "several entries share one rank");
    }

    Assembled { entries, conflicts, duplicates, unresolved }
}

fn log_coverage(found: usize, expected: Option<usize>, coverage: Coverage) {
    match (coverage, expected) {
        (Coverage::Full, Some(total)) => info!(found, total, "listing coverage good"),
        (Coverage::Degraded, Some(total)) => warn!(found, total, "listing coverage degraded"),
        (Coverage::Severe, Some(total)) => warn!(found, total, "listing coverage severely short"),
        _ => info!(found, "listing loaded; no total to compare against"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn item(rank: Option<&str>, slug: &str) -> RawListItem {
        RawListItem {
            rank_text: rank.map(String::from),
            href: format!("https://247sports.com/player/{slug}/"),
            name: s!(slug),
        }
    }

    /// Slices of `step` entries until `total`; fails on listed action numbers.
    struct Sim {
        total: usize,
        loaded: usize,
        step: usize,
        requests: usize,
        fail_on: Vec<usize>,
        blind: u32,
        unreadable: bool,
    }

    impl Sim {
        fn new(total: usize, first: usize, step: usize) -> Self {
            Self { total, loaded: first.min(total), step, requests: 0, fail_on: vec![], blind: 0, unreadable: false }
        }
    }

    impl ListingSource for Sim {
        fn has_more(&mut self) -> Result<bool, FetchError> {
            if self.blind > 0 {
                self.blind -= 1;
                return Ok(false);
            }
            Ok(self.loaded < self.total)
        }
        fn request_more(&mut self) -> Result<bool, FetchError> {
            self.requests += 1;
            if self.fail_on.contains(&self.requests) {
                return Err(FetchError::Transport(s!("timeout")));
            }
            let before = self.loaded;
            self.loaded = (self.loaded + self.step).min(self.total);
            Ok(self.loaded > before)
        }
        fn item_count(&mut self) -> Result<usize, FetchError> {
            Ok(self.loaded)
        }
        fn expected_total(&mut self) -> Option<usize> {
            Some(self.total)
        }
        fn items(&mut self) -> Result<Vec<RawListItem>, FetchError> {
            if self.unreadable {
                return Err(FetchError::Transport(s!("detached")));
            }
            Ok((1..=self.loaded).map(|i| item(Some(&i.to_string()), &format!("p-{i}"))).collect())
        }
    }

    #[test]
    fn converges_on_every_entry() {
        let mut sim = Sim::new(230, 50, 50);
        let out = crawl_listing(&mut sim, &ListingLimits::immediate());
        assert_eq!(out.termination, Termination::Exhausted);
        assert_eq!(out.entries.len(), 230);
        assert_eq!(out.actions, 4);
        assert_eq!(out.coverage, Coverage::Full);
        assert!(out.entries.windows(2).all(|w| w[0].rank < w[1].rank));
    }

    #[test]
    fn unreadable_final_view_is_partial_not_empty() {
        let mut sim = Sim::new(120, 50, 50);
        sim.unreadable = true;
        let out = crawl_listing(&mut sim, &ListingLimits::immediate());
        assert_eq!(out.termination, Termination::Exhausted);
        assert!(out.entries.is_empty());
        assert!(out.extraction_failed);
        assert!(out.is_partial());
        assert_eq!(out.coverage, Coverage::Severe);
    }

    #[test]
    fn transient_failures_do_not_stop_the_crawl() {
        let mut sim = Sim::new(200, 50, 50);
        sim.fail_on = vec![1, 2, 4];
        let out = crawl_listing(&mut sim, &ListingLimits::immediate());
        assert_eq!(out.termination, Termination::Exhausted);
        assert_eq!(out.entries.len(), 200);
    }

    #[test]
    fn failure_ceiling_marks_partial() {
        let mut sim = Sim::new(500, 50, 50);
        sim.fail_on = (2..=40).collect();
        let limits = ListingLimits { failure_ceiling: 3, ..ListingLimits::immediate() };
        let out = crawl_listing(&mut sim, &limits);
        assert_eq!(out.termination, Termination::FailureCeiling);
        assert!(out.is_partial());
        assert_eq!(out.entries.len(), 100);
        assert_eq!(out.coverage, Coverage::Severe);
    }

    #[test]
    fn ceiling_stops_once_depth_is_covered() {
        let mut sim = Sim::new(5000, 50, 50);
        let limits = ListingLimits::immediate().up_to(120);
        let out = crawl_listing(&mut sim, &limits);
        assert_eq!(out.termination, Termination::CeilingReached);
        assert!(out.entries.len() > 170);
        assert!(out.entries.len() < 5000);
    }

    #[test]
    fn action_ceiling_is_a_hard_bound() {
        let mut sim = Sim::new(5000, 10, 10);
        let limits = ListingLimits { max_actions: 5, ..ListingLimits::immediate() };
        let out = crawl_listing(&mut sim, &limits);
        assert_eq!(out.termination, Termination::ActionCeiling);
        assert_eq!(out.actions, 5);
        assert_eq!(out.entries.len(), 60);
    }

    #[test]
    fn late_affordance_is_drained_by_cleanup() {
        let mut sim = Sim::new(180, 50, 50);
        // the page hides its button for exactly the idle-check window
        sim.blind = 3;
        let out = crawl_listing(&mut sim, &ListingLimits::immediate());
        assert_eq!(out.termination, Termination::Exhausted);
        assert_eq!(out.actions, 0);
        assert_eq!(out.cleanup_actions, 3);
        assert_eq!(out.entries.len(), 180);
    }

    #[test]
    fn assemble_dedups_ranks_and_reports_ties() {
        let raw = vec![
            item(Some("2"), "b-2"),
            item(Some("#1"), "a-1"),
            item(Some("1"), "c-3"),
            item(Some("9"), "a-1"),
            item(None, "d-4"),
            RawListItem { rank_text: Some(s!("5")), href: s!("/college/x/"), name: s!("odd") },
        ];
        let out = assemble(raw);
        let ranks: Vec<u32> = out.entries.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 1, 2, 4, 5]);
        assert_eq!(out.duplicates, 1);
        assert_eq!(out.unresolved, 1);
        assert_eq!(out.conflicts.len(), 1);
        assert_eq!(out.conflicts[0].rank, 1);
        assert_eq!(out.conflicts[0].locators.len(), 2);
    }

    #[test]
    fn coverage_bands() {
        assert_eq!(Coverage::classify(95, Some(100)), Coverage::Full);
        assert_eq!(Coverage::classify(80, Some(100)), Coverage::Degraded);
        assert_eq!(Coverage::classify(79, Some(100)), Coverage::Severe);
        assert_eq!(Coverage::classify(10, None), Coverage::Unknown);
        assert_eq!(Coverage::classify(10, Some(0)), Coverage::Unknown);
    }
}
