// src/error.rs
use std::{io, path::PathBuf};

use thiserror::Error;

use crate::record::RankingSystem;

/// One page fetch went wrong. Always recoverable at the entity level.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("no page available for {0}")]
    NotFound(String),

    #[error("transport: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum ListingError {
    #[error("listing {url} could not be loaded: {source}")]
    Load {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("listing {0} shows no entries")]
    Empty(String),
}

#[derive(Debug, Error)]
pub enum GapSpecError {
    #[error("gap file: {0}")]
    Io(#[from] io::Error),

    #[error("gap table is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("rank 0 requested for {year} {variant}; ranks are 1-based")]
    ZeroRank { year: i32, variant: RankingSystem },

    #[error("gap table requests no ranks")]
    Empty,
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("append to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{0} has no header row")]
    NoHeader(PathBuf),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file: {0}")]
    Io(#[from] io::Error),

    #[error("config file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum DiagnosticsError {
    #[error("diagnostics file: {0}")]
    Io(#[from] io::Error),

    #[error("diagnostics encoding: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("batch needs at least one fetch session")]
    NoSessions,
}

/// Run-level failures. Per-entity trouble never surfaces here.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Listing(#[from] ListingError),

    #[error(transparent)]
    Gaps(#[from] GapSpecError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Batch(#[from] BatchError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Diagnostics(#[from] DiagnosticsError),
}
