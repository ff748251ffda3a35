// src/scrape/mod.rs
//! Whole runs: a listing goes in, records land in the sink, and a
//! [`RunSummary`](crate::diagnostics::RunSummary) comes back.

mod full;
mod repair;

pub use full::full_crawl;
pub use repair::{repair_crawl, repair_year};
