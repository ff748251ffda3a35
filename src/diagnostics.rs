// src/diagnostics.rs
//! Per-entity outcomes and run summaries, written as JSON next to the dataset.

use std::{fs, path::Path};

use serde::Serialize;
use tracing::{info, warn};

use crate::batch::WorkItem;
use crate::error::DiagnosticsError;
use crate::gaps::{HardMiss, RankReason};
use crate::listing::{Coverage, ListingOutcome, RankConflict, Termination};
use crate::profile::{Fallback, ProfileReport, ProfileStatus};
use crate::record::{Field, FieldRecord, RankingSystem};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EntityOutcome {
    pub position: usize,
    pub locator: String,
    pub resolved: bool,
    pub name: String,
    /// Ranks this entity was fetched for (repair runs).
    pub requested: Vec<RankReason>,
    /// Per requested rank: whether the record now carries it.
    pub confirmed: Vec<bool>,
    pub got_247_rank: Option<String>,
    pub got_composite_rank: Option<String>,
    pub found_ranking: bool,
    pub deep_dive: bool,
    pub fallbacks: Vec<Fallback>,
    pub uncorrected_category: bool,
    pub status: ProfileStatus,
    pub errors: Vec<String>,
}

impl EntityOutcome {
    pub fn new(position: usize, item: &WorkItem, record: &FieldRecord, report: &ProfileReport, deep_dive: bool) -> Self {
        let rank_of = |s: RankingSystem| {
            record.is_known(s.national_rank()).then(|| s!(record.get(s.national_rank())))
        };
        let confirmed = item
            .reasons
            .iter()
            .map(|r| record.get(r.variant.national_rank()) == r.rank.to_string())
            .collect();
        let name = if record.is_known(Field::Name) || item.name.is_empty() {
            s!(record.name())
        } else {
            item.name.clone()
        };
        Self {
            position,
            locator: s!(item.locator.as_str()),
            resolved: item.locator.is_resolved(),
            name,
            requested: item.reasons.clone(),
            confirmed,
            got_247_rank: rank_of(RankingSystem::Site247),
            got_composite_rank: rank_of(RankingSystem::Composite),
            found_ranking: report.found_ranking,
            deep_dive,
            fallbacks: report.fallbacks.clone(),
            uncorrected_category: report.uncorrected_category,
            status: report.status,
            errors: report.errors.clone(),
        }
    }

    /// Repair target whose record does not carry every requested rank.
    pub fn unconfirmed(&self) -> bool {
        self.confirmed.iter().any(|c| !c)
    }
}

/// Listing facts worth keeping with the run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ListingSummary {
    pub variant: RankingSystem,
    pub entries: usize,
    pub expected_total: Option<usize>,
    pub coverage: Coverage,
    pub termination: Termination,
    pub partial: bool,
    pub conflicts: Vec<RankConflict>,
}

impl ListingSummary {
    pub fn new(variant: RankingSystem, outcome: &ListingOutcome) -> Self {
        Self {
            variant,
            entries: outcome.entries.len(),
            expected_total: outcome.expected_total,
            coverage: outcome.coverage,
            termination: outcome.termination,
            partial: outcome.is_partial(),
            conflicts: outcome.conflicts.clone(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub year: i32,
    pub processed: usize,
    pub full: usize,
    pub degraded: usize,
    pub failed: usize,
    pub unconfirmed: usize,
    pub records_written: usize,
    pub listings: Vec<ListingSummary>,
    pub hard_misses: Vec<HardMiss>,
    pub outcomes: Vec<EntityOutcome>,
}

impl RunSummary {
    pub fn new(year: i32) -> Self {
        Self { year, ..Self::default() }
    }

    pub fn tally(&mut self, outcomes: Vec<EntityOutcome>) {
        for o in outcomes {
            self.processed += 1;
            match o.status {
                ProfileStatus::Full => self.full += 1,
                ProfileStatus::Degraded => self.degraded += 1,
                ProfileStatus::Failed => self.failed += 1,
            }
            if o.unconfirmed() {
                self.unconfirmed += 1;
            }
            self.outcomes.push(o);
        }
    }

    pub fn listing_partial(&self) -> bool {
        self.listings.iter().any(|l| l.partial)
    }

    /// Folds another year's summary into this one.
    pub fn merge(&mut self, other: RunSummary) {
        self.processed += other.processed;
        self.full += other.full;
        self.degraded += other.degraded;
        self.failed += other.failed;
        self.unconfirmed += other.unconfirmed;
        self.records_written += other.records_written;
        self.listings.extend(other.listings);
        self.hard_misses.extend(other.hard_misses);
        self.outcomes.extend(other.outcomes);
    }

    pub fn log(&self) {
        info!(
            year = self.year,
            processed = self.processed,
            full = self.full,
            degraded = self.degraded,
            failed = self.failed,
            written = self.records_written,
            "run finished"
        );
        if self.listing_partial() {
            warn!("a listing ended on a ceiling; entries may be missing");
        }
        if self.unconfirmed > 0 {
            warn!(count = self.unconfirmed, "re-fetched entities without the requested rank");
        }
        if !self.hard_misses.is_empty() {
            let ranks: Vec<String> = self.hard_misses.iter().map(|m| format!("{}#{}", m.variant, m.rank)).collect();
            warn!(count = ranks.len(), ranks = %ranks.join(", "), "ranks not found in any listing");
        }
    }
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), DiagnosticsError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    info!(path = %path.display(), "diagnostics written");
    Ok(())
}
