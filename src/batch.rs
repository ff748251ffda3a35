// src/batch.rs
//! Windowed concurrent reconciliation.
//!
//! Work items are taken in order, `width` at a time. Each slot of a window
//! runs on its own thread with its own fetch session; a window is complete
//! only when every slot has reported. One entity's trouble never touches its
//! neighbours: a failed or panicked slot still yields a well-formed record.

use std::{collections::VecDeque, thread, time::Duration};

use tracing::{error, info};

use crate::config::options::CrawlConfig;
use crate::core::net::Fetcher;
use crate::diagnostics::EntityOutcome;
use crate::error::{BatchError, SinkError};
use crate::gaps::RankReason;
use crate::identity::EntityLocator;
use crate::profile::{reconcile, ProfileReport, ProfileStatus, ReconcileConfig};
use crate::progress::Progress;
use crate::record::FieldRecord;
use crate::sink::Sink;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkItem {
    pub locator: EntityLocator,
    pub name: String,
    /// Empty on a full crawl; the requested ranks on a repair.
    pub reasons: Vec<RankReason>,
}

impl WorkItem {
    pub fn new(locator: EntityLocator) -> Self {
        Self { locator, name: s!(), reasons: Vec::new() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchPlan {
    /// Items before this index are skipped.
    pub offset: usize,
    pub width: usize,
    /// Deep dive for absolute 1-based positions up to this.
    pub deep_dive_limit: usize,
    pub flush_threshold: usize,
    pub request_delay: Duration,
}

impl From<&CrawlConfig> for BatchPlan {
    fn from(cfg: &CrawlConfig) -> Self {
        Self {
            offset: cfg.start_from,
            width: cfg.workers,
            deep_dive_limit: cfg.deep_dive_limit,
            flush_threshold: cfg.flush_threshold,
            request_delay: cfg.request_delay(),
        }
    }
}

/// One reconciled entity with its place in the run.
#[derive(Clone, Debug)]
pub struct Processed {
    /// Absolute, 1-based.
    pub position: usize,
    pub record: FieldRecord,
    pub outcome: EntityOutcome,
}

/// Lazily processes `items[offset..]`, one window per refill.
pub struct Batch<'a, F: Fetcher> {
    sessions: &'a mut [F],
    items: &'a [WorkItem],
    cfg: &'a ReconcileConfig,
    plan: BatchPlan,
    next: usize,
    ready: VecDeque<Processed>,
}

impl<'a, F: Fetcher> Batch<'a, F> {
    pub fn new(
        sessions: &'a mut [F],
        items: &'a [WorkItem],
        plan: BatchPlan,
        cfg: &'a ReconcileConfig,
    ) -> Result<Self, BatchError> {
        if sessions.is_empty() || plan.width == 0 {
            return Err(BatchError::NoSessions);
        }
        let next = plan.offset.min(items.len());
        Ok(Self { sessions, items, cfg, plan, next, ready: VecDeque::new() })
    }

    pub fn remaining(&self) -> usize {
        self.items.len() - self.next + self.ready.len()
    }

    /// Run the next window to completion.
    pub fn next_window(&mut self) -> Option<Vec<Processed>> {
        if !self.ready.is_empty() {
            return Some(self.ready.drain(..).collect());
        }
        if self.next >= self.items.len() {
            return None;
        }
        let width = self.plan.width.min(self.sessions.len());
        let start = self.next;
        let end = (start + width).min(self.items.len());
        let window = &self.items[start..end];
        let plan = &self.plan;
        let cfg = self.cfg;

        let done = thread::scope(|scope| {
            let handles: Vec<_> = self
                .sessions
                .iter_mut()
                .zip(window.iter().enumerate())
                .map(|(session, (i, item))| {
                    let position = start + i + 1;
                    let handle = scope.spawn(move || process(session, item, position, plan, cfg));
                    (position, item, handle)
                })
                .collect();

            handles
                .into_iter()
                .map(|(position, item, handle)| match handle.join() {
                    Ok(p) => p,
                    Err(_) => {
                        error!(position, locator = %item.locator, "worker panicked");
                        panicked(item, position, plan, cfg)
                    }
                })
                .collect::<Vec<_>>()
        });

        self.next = end;
        Some(done)
    }
}

impl<F: Fetcher> Iterator for Batch<'_, F> {
    type Item = Processed;

    fn next(&mut self) -> Option<Processed> {
        if self.ready.is_empty() {
            let window = self.next_window()?;
            self.ready.extend(window);
        }
        self.ready.pop_front()
    }
}

fn process<F: Fetcher>(
    session: &mut F,
    item: &WorkItem,
    position: usize,
    plan: &BatchPlan,
    cfg: &ReconcileConfig,
) -> Processed {
    let deep_dive = position <= plan.deep_dive_limit;
    let out = reconcile(session, &item.locator, deep_dive, cfg);
    if !plan.request_delay.is_zero() {
        thread::sleep(plan.request_delay); // be polite
    }
    let outcome = EntityOutcome::new(position, item, &out.record, &out.report, deep_dive);
    Processed { position, record: out.record, outcome }
}

fn panicked(item: &WorkItem, position: usize, plan: &BatchPlan, cfg: &ReconcileConfig) -> Processed {
    let record = FieldRecord::for_entity(&item.locator, cfg.year, &cfg.source_label);
    let report = ProfileReport::failed("worker panicked");
    let outcome = EntityOutcome::new(position, item, &record, &report, position <= plan.deep_dive_limit);
    Processed { position, record, outcome }
}

/// What one batch run produced.
#[derive(Clone, Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<EntityOutcome>,
    pub records_written: usize,
    pub flushes: usize,
}

/// Drive `batch` to the end, flushing completed windows to `sink` once
/// `flush_threshold` records are buffered, and the remainder at the end.
pub fn run_batch<F: Fetcher, K: Sink + ?Sized>(
    mut batch: Batch<'_, F>,
    sink: &mut K,
    mut progress: Option<&mut dyn Progress>,
) -> Result<BatchReport, SinkError> {
    let threshold = batch.plan.flush_threshold.max(1);
    let total = batch.remaining();
    if let Some(p) = progress.as_deref_mut() {
        p.begin(total);
    }

    let mut report = BatchReport::default();
    let mut buffer: Vec<FieldRecord> = Vec::with_capacity(threshold);

    while let Some(window) = batch.next_window() {
        for done in window {
            if let Some(p) = progress.as_deref_mut() {
                let label = done.record.to_string();
                if done.outcome.status == ProfileStatus::Failed {
                    p.item_failed(done.position, &label);
                } else {
                    p.item_done(done.position, &label);
                }
            }
            report.outcomes.push(done.outcome);
            buffer.push(done.record);
        }
        if buffer.len() >= threshold {
            flush(sink, &mut buffer, &mut report)?;
        }
    }
    if !buffer.is_empty() {
        flush(sink, &mut buffer, &mut report)?;
    }

    if let Some(p) = progress.as_deref_mut() {
        p.finish();
    }
    Ok(report)
}

fn flush<K: Sink + ?Sized>(sink: &mut K, buffer: &mut Vec<FieldRecord>, report: &mut BatchReport) -> Result<(), SinkError> {
    sink.append(buffer)?;
    report.records_written += buffer.len();
    report.flushes += 1;
    info!(written = report.records_written, "records saved");
    buffer.clear();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::net::ReplayFetcher;
    use crate::identity::normalize;
    use crate::record::Field;
    use crate::sink::MemorySink;

    fn items(n: usize) -> Vec<WorkItem> {
        (1..=n)
            .map(|i| WorkItem::new(normalize(&format!("https://247sports.com/player/p-{i}/"))))
            .collect()
    }

    fn plan(width: usize, deep: usize, flush: usize) -> BatchPlan {
        BatchPlan { offset: 0, width, deep_dive_limit: deep, flush_threshold: flush, request_delay: Duration::ZERO }
    }

    fn cfg() -> ReconcileConfig {
        ReconcileConfig { year: 2020, history_pages: 1, source_label: s!("test") }
    }

    #[test]
    fn every_item_yields_one_record_in_order() {
        let work = items(7);
        let mut sessions = vec![ReplayFetcher::new(), ReplayFetcher::new(), ReplayFetcher::new()];
        let cfg = cfg();
        let batch = Batch::new(&mut sessions, &work, plan(3, 0, 100), &cfg).unwrap();
        let done: Vec<Processed> = batch.collect();
        assert_eq!(done.len(), 7);
        let positions: Vec<usize> = done.iter().map(|p| p.position).collect();
        assert_eq!(positions, (1..=7).collect::<Vec<_>>());
        assert!(done.iter().all(|p| p.outcome.status == ProfileStatus::Failed));
        assert_eq!(done[4].record.get(Field::ProfileUrl), "https://247sports.com/player/p-5/");
    }

    #[test]
    fn offset_skips_and_keeps_absolute_positions() {
        let work = items(5);
        let mut sessions = vec![ReplayFetcher::new()];
        let cfg = cfg();
        let p = BatchPlan { offset: 3, ..plan(1, 4, 100) };
        let done: Vec<Processed> = Batch::new(&mut sessions, &work, p, &cfg).unwrap().collect();
        assert_eq!(done.iter().map(|d| d.position).collect::<Vec<_>>(), vec![4, 5]);
        assert!(done[0].outcome.deep_dive);
        assert!(!done[1].outcome.deep_dive);
    }

    #[test]
    fn flushes_on_threshold_and_at_the_end() {
        let work = items(10);
        let mut sessions = vec![ReplayFetcher::new(), ReplayFetcher::new()];
        let cfg = cfg();
        let batch = Batch::new(&mut sessions, &work, plan(2, 0, 4), &cfg).unwrap();
        let mut sink = MemorySink::default();
        let report = run_batch(batch, &mut sink, None).unwrap();
        assert_eq!(report.records_written, 10);
        // windows of 2: flush after 4, 8, then the last 2
        assert_eq!(sink.batches.iter().map(Vec::len).collect::<Vec<_>>(), vec![4, 4, 2]);
        assert_eq!(report.flushes, 3);
    }

    #[test]
    fn no_sessions_is_an_error() {
        let work = items(1);
        let mut sessions: Vec<ReplayFetcher> = Vec::new();
        let cfg = cfg();
        assert!(matches!(Batch::new(&mut sessions, &work, plan(4, 0, 1), &cfg), Err(BatchError::NoSessions)));
    }
}
