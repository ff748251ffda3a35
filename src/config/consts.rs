// src/config/consts.rs

// Site
pub const BASE_URL: &str = "https://247sports.com";
pub const ENTITY_SEGMENT: &str = "player";
pub const COMPOSITE_LIST_URL: &str = "https://247sports.com/season/{year}-football/compositerecruitrankings/";
pub const RANKINGS_247_LIST_URL: &str = "https://247sports.com/season/{year}-football/recruitrankings/";
pub const LIST_PAGE_QUERY: &str = "ViewPath=~/Views/SkyNet/PlayerSportRanking/_SimpleSetForSeason.ascx&Page=";
pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

// Records
pub const NA: &str = "NA";
pub const SOURCE_FULL: &str = "247Sports Composite";
pub const SOURCE_REPAIR: &str = "247Sports Composite (patch)";
pub const MAX_STARS: usize = 5;

// Local cache
pub const STORE_DIR: &str = ".store";
pub const LOG_FILE: &str = "debug.log";
pub const STORE_SEP: char = ',';

// Output
pub const DEFAULT_OUT_DIR: &str = "out";
pub const DATASET_PREFIX: &str = "recruiting_class_";
pub const DIAGNOSTICS_PREFIX: &str = "diagnostics_";
pub const PATCH_PREFIX: &str = "patch_missing_ranks_";

// Concurrency
pub const WORKERS: usize = 4;
pub const DEEP_DIVE_LIMIT: usize = 1000;
pub const FLUSH_THRESHOLD: usize = 100;
pub const REQUEST_PAUSE_MS: u64 = 0;
pub const REPAIR_PAUSE_MS: u64 = 1000; // be polite

// Timeline
pub const HISTORY_PAGES: usize = 10;
pub const CUTOFF_MONTH: u32 = 9;
pub const CUTOFF_DAY: u32 = 1;

// Listing driver
pub const MAX_ACTIONS: usize = 500;
pub const IDLE_CHECKS: u32 = 3;
pub const FAILURE_CEILING: u32 = 10;
/// Repair stops a listing after 5 straight failures, half of `FAILURE_CEILING`.
pub const REPAIR_FAILURE_CEILING: u32 = 5;
pub const CLEANUP_ATTEMPTS: usize = 50;
pub const CEILING_MARGIN: usize = 50;
pub const CEILING_CHECK_EVERY: usize = 5;
pub const PROGRESS_EVERY: usize = 25;
pub const ACTION_PAUSE_MS: u64 = 1500;
pub const IDLE_PAUSE_MS: u64 = 2000;
pub const FAILURE_PAUSE_MS: u64 = 3000;
pub const RECHECK_PAUSE_MS: u64 = 3000;

// Validation
pub const ACCURACY_SAMPLE: usize = 20;
pub const ACCURACY_PASS_PCT: f64 = 90.0;
