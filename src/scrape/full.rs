// src/scrape/full.rs
use tracing::{info, warn};

use crate::batch::{run_batch, Batch, BatchPlan, WorkItem};
use crate::config::{consts::SOURCE_FULL, CrawlConfig};
use crate::core::net::Fetcher;
use crate::diagnostics::{write_json, ListingSummary, RunSummary};
use crate::error::ScrapeError;
use crate::listing::{crawl_listing, ListingSource};
use crate::profile::ReconcileConfig;
use crate::progress::Progress;
use crate::record::RankingSystem;
use crate::sink::Sink;

/// Converge the composite list for `cfg.year`, then reconcile every entry
/// in list order.
pub fn full_crawl<S, F, K>(
    source: &mut S,
    sessions: &mut [F],
    sink: &mut K,
    cfg: &CrawlConfig,
    mut progress: Option<&mut dyn Progress>,
) -> Result<RunSummary, ScrapeError>
where
    S: ListingSource + ?Sized,
    F: Fetcher,
    K: Sink + ?Sized,
{
    if let Some(p) = progress.as_deref_mut() {
        p.log(&format!("Loading the {} class list…", cfg.year));
    }
    let listing = crawl_listing(source, &cfg.listing);
    let mut summary = RunSummary::new(cfg.year);
    summary.listings.push(ListingSummary::new(RankingSystem::Composite, &listing));
    if listing.is_partial() {
        warn!(termination = ?listing.termination, "continuing with a partial list");
    }

    let items: Vec<WorkItem> = listing
        .entries
        .into_iter()
        .map(|e| WorkItem { locator: e.locator, name: e.name, reasons: Vec::new() })
        .collect();
    info!(entities = items.len(), start_from = cfg.start_from, "list ready");

    let rcfg = ReconcileConfig::from_crawl(cfg, SOURCE_FULL);
    let batch = Batch::new(sessions, &items, BatchPlan::from(cfg), &rcfg)?;
    let report = run_batch(batch, sink, progress)?;

    summary.records_written = report.records_written;
    summary.tally(report.outcomes);
    write_json(&cfg.diagnostics_path("crawl"), &summary)?;
    summary.log();
    Ok(summary)
}
