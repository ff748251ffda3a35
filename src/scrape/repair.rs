// src/scrape/repair.rs
//! Differential repair: only the entities holding requested ranks are
//! re-fetched, one at a time and slowly.

use std::collections::BTreeSet;

use tracing::{info, warn};

use crate::batch::{run_batch, Batch, BatchPlan, WorkItem};
use crate::config::{consts::SOURCE_REPAIR, CrawlConfig, ListingLimits};
use crate::core::net::Fetcher;
use crate::diagnostics::{write_json, ListingSummary, RunSummary};
use crate::error::{ListingError, ScrapeError};
use crate::gaps::{max_rank, resolve_gaps, GapSpec, Snapshots, YearGaps};
use crate::listing::{crawl_listing, ListingSource};
use crate::profile::ReconcileConfig;
use crate::progress::Progress;
use crate::record::RankingSystem;
use crate::sink::Sink;

/// Loads each view's snapshot at most once.
struct SnapshotLoader<'o, O> {
    open: &'o mut O,
    year: i32,
    limits: ListingLimits,
    tried: BTreeSet<RankingSystem>,
    snapshots: Snapshots,
    listings: Vec<ListingSummary>,
}

impl<'o, O> SnapshotLoader<'o, O>
where
    O: FnMut(RankingSystem, i32) -> Result<Box<dyn ListingSource>, ListingError>,
{
    fn new(open: &'o mut O, year: i32, limits: ListingLimits) -> Self {
        Self { open, year, limits, tried: BTreeSet::new(), snapshots: Snapshots::new(), listings: Vec::new() }
    }

    fn load(&mut self, variant: RankingSystem) {
        if !self.tried.insert(variant) {
            return;
        }
        info!(%variant, year = self.year, depth = ?self.limits.rank_ceiling, "loading listing");
        match (self.open)(variant, self.year) {
            Ok(mut source) => {
                let outcome = crawl_listing(&mut *source, &self.limits);
                self.listings.push(ListingSummary::new(variant, &outcome));
                self.snapshots.insert(variant, outcome.entries);
            }
            // its ranks fall through to the alternate view or become hard misses
            Err(e) => warn!(%variant, error = %e, "listing unavailable"),
        }
    }

    fn tried(&self, variant: RankingSystem) -> bool {
        self.tried.contains(&variant)
    }
}

/// Repair one year. Alternate views are only loaded when the primary
/// views leave ranks unplaced.
pub fn repair_year<O, F, K>(
    open: &mut O,
    sessions: &mut [F],
    sink: &mut K,
    year: i32,
    gaps: &YearGaps,
    cfg: &CrawlConfig,
    progress: Option<&mut dyn Progress>,
) -> Result<RunSummary, ScrapeError>
where
    O: FnMut(RankingSystem, i32) -> Result<Box<dyn ListingSource>, ListingError>,
    F: Fetcher,
    K: Sink + ?Sized,
{
    let cfg = CrawlConfig { year, ..cfg.for_repair() };
    let limits = cfg.listing.up_to(max_rank(gaps) as usize);

    let mut loader = SnapshotLoader::new(open, year, limits);
    for &variant in gaps.keys() {
        loader.load(variant);
    }
    let mut resolution = resolve_gaps(&loader.snapshots, gaps);

    let alternates: BTreeSet<RankingSystem> = resolution
        .hard_misses
        .iter()
        .map(|m| m.variant.alternate())
        .filter(|&v| !loader.tried(v))
        .collect();
    if !alternates.is_empty() {
        for variant in alternates {
            loader.load(variant);
        }
        resolution = resolve_gaps(&loader.snapshots, gaps);
    }

    let mut summary = RunSummary::new(year);
    summary.listings = loader.listings;
    summary.hard_misses = resolution.hard_misses;

    let items: Vec<WorkItem> = resolution
        .targets
        .into_iter()
        .map(|t| WorkItem { locator: t.locator, name: t.name, reasons: t.reasons })
        .collect();
    info!(year, targets = items.len(), hard_misses = summary.hard_misses.len(), "re-fetching");

    let rcfg = ReconcileConfig::from_crawl(&cfg, SOURCE_REPAIR);
    let batch = Batch::new(sessions, &items, BatchPlan::from(&cfg), &rcfg)?;
    let report = run_batch(batch, sink, progress)?;

    summary.records_written = report.records_written;
    summary.tally(report.outcomes);
    write_json(&cfg.diagnostics_path("repair"), &summary)?;
    summary.log();
    Ok(summary)
}

/// Repair every year in `spec`, oldest first. An invalid spec ends the run
/// before anything is fetched.
pub fn repair_crawl<O, F, K>(
    spec: &GapSpec,
    open: &mut O,
    sessions: &mut [F],
    sink: &mut K,
    cfg: &CrawlConfig,
    mut progress: Option<&mut dyn Progress>,
) -> Result<RunSummary, ScrapeError>
where
    O: FnMut(RankingSystem, i32) -> Result<Box<dyn ListingSource>, ListingError>,
    F: Fetcher,
    K: Sink + ?Sized,
{
    spec.validate()?;
    info!(years = spec.years().count(), ranks = spec.total(), "repair plan accepted");

    let mut total = RunSummary::new(spec.years().next().unwrap_or(cfg.year));
    for year in spec.years() {
        let Some(gaps) = spec.for_year(year) else { continue };
        if let Some(p) = progress.as_deref_mut() {
            p.log(&format!("Repairing {year}…"));
        }
        let reborrowed = progress.as_mut().map(|p| &mut **p as &mut dyn Progress);
        let summary = repair_year(open, sessions, sink, year, gaps, cfg, reborrowed)?;
        total.merge(summary);
    }
    Ok(total)
}
