// src/config/options.rs
use std::{fs, path::{Path, PathBuf}, time::Duration};

use serde::{Deserialize, Serialize};

use super::consts::*;
use crate::error::ConfigError;

/// Everything a crawl or repair run can be tuned with.
/// Missing keys in a config file fall back to the defaults below.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    pub year: i32,
    pub workers: usize,
    pub deep_dive_limit: usize,
    pub flush_threshold: usize,
    pub start_from: usize,
    pub request_delay_ms: u64,
    pub history_pages: usize,
    pub user_agent: String,
    pub out_dir: PathBuf,
    pub listing: ListingLimits,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            year: 2020,
            workers: WORKERS,
            deep_dive_limit: DEEP_DIVE_LIMIT,
            flush_threshold: FLUSH_THRESHOLD,
            start_from: 0,
            request_delay_ms: REQUEST_PAUSE_MS,
            history_pages: HISTORY_PAGES,
            user_agent: s!(USER_AGENT),
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
            listing: ListingLimits::default(),
        }
    }
}

impl CrawlConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Repair runs are sequential and slower on purpose.
    pub fn for_repair(&self) -> Self {
        Self {
            workers: 1,
            request_delay_ms: self.request_delay_ms.max(REPAIR_PAUSE_MS),
            listing: ListingLimits {
                failure_ceiling: REPAIR_FAILURE_CEILING,
                ..self.listing.clone()
            },
            ..self.clone()
        }
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn dataset_path(&self) -> PathBuf {
        self.out_dir.join(format!("{DATASET_PREFIX}{}.csv", self.year))
    }

    pub fn diagnostics_path(&self, tag: &str) -> PathBuf {
        self.out_dir.join(format!("{DIAGNOSTICS_PREFIX}{tag}_{}.json", self.year))
    }

    /// Repair output goes to its own file, stamped with `stamp`.
    pub fn patch_path(&self, stamp: &str) -> PathBuf {
        self.out_dir.join(format!("{PATCH_PREFIX}{stamp}.csv"))
    }
}

/// Bounds for the listing driver. Pauses are in milliseconds; tests set them to zero.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingLimits {
    pub max_actions: usize,
    pub idle_checks: u32,
    pub failure_ceiling: u32,
    pub cleanup_attempts: usize,
    /// Stop early once this many entries beyond `rank_ceiling + ceiling_margin` are loaded.
    pub rank_ceiling: Option<usize>,
    pub ceiling_margin: usize,
    pub ceiling_check_every: usize,
    pub action_pause_ms: u64,
    pub idle_pause_ms: u64,
    pub failure_pause_ms: u64,
    pub recheck_pause_ms: u64,
}

impl Default for ListingLimits {
    fn default() -> Self {
        Self {
            max_actions: MAX_ACTIONS,
            idle_checks: IDLE_CHECKS,
            failure_ceiling: FAILURE_CEILING,
            cleanup_attempts: CLEANUP_ATTEMPTS,
            rank_ceiling: None,
            ceiling_margin: CEILING_MARGIN,
            ceiling_check_every: CEILING_CHECK_EVERY,
            action_pause_ms: ACTION_PAUSE_MS,
            idle_pause_ms: IDLE_PAUSE_MS,
            failure_pause_ms: FAILURE_PAUSE_MS,
            recheck_pause_ms: RECHECK_PAUSE_MS,
        }
    }
}

impl ListingLimits {
    /// Zero pauses, default bounds.
    pub fn immediate() -> Self {
        Self {
            action_pause_ms: 0,
            idle_pause_ms: 0,
            failure_pause_ms: 0,
            recheck_pause_ms: 0,
            ..Self::default()
        }
    }

    /// Limits for loading only as deep as `max_rank`.
    pub fn up_to(&self, max_rank: usize) -> Self {
        Self {
            rank_ceiling: Some(max_rank),
            // one action loads roughly 50 entries
            max_actions: self.max_actions.min(max_rank / 50 + 5),
            ..self.clone()
        }
    }

    pub fn action_pause(&self) -> Duration { Duration::from_millis(self.action_pause_ms) }
    pub fn idle_pause(&self) -> Duration { Duration::from_millis(self.idle_pause_ms) }
    pub fn failure_pause(&self) -> Duration { Duration::from_millis(self.failure_pause_ms) }
    pub fn recheck_pause(&self) -> Duration { Duration::from_millis(self.recheck_pause_ms) }
}
