// src/cli.rs
use std::{collections::BTreeMap, path::{Path, PathBuf}};

use chrono::Local;
use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{bail, eyre, Result};
use rand::{rngs::StdRng, SeedableRng};
use tracing::info;

use crate::config::{consts::ACCURACY_SAMPLE, CrawlConfig};
use crate::core::net::HttpFetcher;
use crate::diagnostics::write_json;
use crate::error::ListingError;
use crate::gaps::{derive_gaps, GapSpec};
use crate::listing::ListingSource;
use crate::log;
use crate::progress::LogProgress;
use crate::record::{FieldRecord, RankingSystem};
use crate::scrape::{full_crawl, repair_crawl};
use crate::sink::CsvSink;
use crate::specs::rankings::{listing_url, PagedListing};
use crate::store::{dedup_records, latest_dataset, load_records};
use crate::validate::{accuracy, output_report};

#[derive(Parser, Debug)]
#[command(name = "recruit_scrape", version, about = "Recruiting-class crawler and rank-gap repair")]
pub struct Cli {
    /// JSON file with crawl settings; missing keys keep their defaults.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug output on the console.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Converge the class list, then fetch every profile on it.
    Crawl(CrawlArgs),
    /// Re-fetch only the entities holding missing ranks.
    Repair(RepairArgs),
    /// Completeness and quality report for a dataset.
    ValidateOutput(DatasetArgs),
    /// Re-fetch a random sample and compare with the stored rows.
    ValidateAccuracy(AccuracyArgs),
}

#[derive(Args, Debug)]
pub struct CrawlArgs {
    #[arg(long)]
    pub year: Option<i32>,
    /// Skip this many list entries (resume).
    #[arg(long)]
    pub start_from: Option<usize>,
    #[arg(long)]
    pub workers: Option<usize>,
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct RepairArgs {
    /// Gap table: {"2020": {"composite": [..], "247": [..]}}
    #[arg(long, conflicts_with = "csv")]
    pub gaps: Option<PathBuf>,
    /// Derive gaps from an existing dataset instead.
    #[arg(long, requires = "upto")]
    pub csv: Option<PathBuf>,
    /// With --csv: ranks 1..=N are expected in both views.
    #[arg(long)]
    pub upto: Option<u32>,
    /// With --csv: years to check (defaults to the configured year).
    #[arg(long = "year")]
    pub years: Vec<i32>,
    /// Also save the derived gap table here.
    #[arg(long)]
    pub write_gaps: Option<PathBuf>,
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DatasetArgs {
    /// Defaults to the newest dataset in the output directory.
    #[arg(long)]
    pub csv: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct AccuracyArgs {
    #[arg(long)]
    pub csv: Option<PathBuf>,
    #[arg(long, default_value_t = ACCURACY_SAMPLE)]
    pub sample: usize,
    /// Fixed seed for a repeatable sample.
    #[arg(long)]
    pub seed: Option<u64>,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    log::init(&log::default_path(), cli.verbose)?;

    let cfg = match &cli.config {
        Some(path) => CrawlConfig::load(path)?,
        None => CrawlConfig::default(),
    };

    match cli.command {
        Command::Crawl(args) => crawl(cfg, args),
        Command::Repair(args) => repair(cfg, args),
        Command::ValidateOutput(args) => validate_output(&cfg, args),
        Command::ValidateAccuracy(args) => validate_accuracy(&cfg, args),
    }
}

fn crawl(mut cfg: CrawlConfig, args: CrawlArgs) -> Result<()> {
    if let Some(y) = args.year { cfg.year = y; }
    if let Some(n) = args.start_from { cfg.start_from = n; }
    if let Some(n) = args.workers { cfg.workers = n; }
    if let Some(dir) = args.out { cfg.out_dir = dir; }

    let mut listing = PagedListing::for_year(HttpFetcher::new(&cfg.user_agent)?, RankingSystem::Composite, cfg.year)?;
    let mut sessions = HttpFetcher::sessions(&cfg.user_agent, cfg.workers)?;
    let mut sink = CsvSink::new(cfg.dataset_path());
    let mut progress = LogProgress::default();

    let summary = full_crawl(&mut listing, &mut sessions, &mut sink, &cfg, Some(&mut progress))?;
    info!(path = %sink.path().display(), written = summary.records_written, "dataset saved");
    Ok(())
}

/// Opens each ranking view over its own HTTP session.
fn http_listings(user_agent: &str) -> impl FnMut(RankingSystem, i32) -> Result<Box<dyn ListingSource>, ListingError> + '_ {
    move |variant, year| {
        let url = listing_url(variant, year);
        let fetcher = HttpFetcher::new(user_agent).map_err(|source| ListingError::Load { url: url.clone(), source })?;
        let listing: Box<dyn ListingSource> = Box::new(PagedListing::open(fetcher, &url)?);
        Ok(listing)
    }
}

fn gaps_from_dataset(path: &Path, upto: u32, years: &[i32]) -> Result<GapSpec> {
    let (records, dropped): (Vec<FieldRecord>, usize) = dedup_records(load_records(path)?);
    if dropped > 0 {
        info!(dropped, "duplicate rows ignored");
    }
    let expected = BTreeMap::from([(RankingSystem::Composite, upto), (RankingSystem::Site247, upto)]);
    let mut spec = GapSpec::new();
    for &year in years {
        for (variant, ranks) in derive_gaps(&records, year, &expected) {
            info!(year, %variant, missing = ranks.len(), "gaps found");
            spec.insert(year, variant, ranks);
        }
    }
    Ok(spec)
}

fn repair(mut cfg: CrawlConfig, args: RepairArgs) -> Result<()> {
    if let Some(dir) = args.out { cfg.out_dir = dir; }

    let spec = match (&args.gaps, &args.csv) {
        (Some(path), _) => GapSpec::load(path)?,
        (None, Some(path)) => {
            let years = if args.years.is_empty() { vec![cfg.year] } else { args.years.clone() };
            let upto = args.upto.ok_or_else(|| eyre!("--csv needs --upto"))?;
            let spec = gaps_from_dataset(path, upto, &years)?;
            if spec.total() == 0 {
                info!("no gaps; nothing to repair");
                return Ok(());
            }
            spec
        }
        (None, None) => bail!("pass --gaps FILE or --csv FILE --upto N"),
    };
    if let Some(path) = &args.write_gaps {
        std::fs::write(path, spec.to_json()?)?;
        info!(path = %path.display(), "gap table saved");
    }

    let mut open = http_listings(&cfg.user_agent);
    let mut sessions = HttpFetcher::sessions(&cfg.user_agent, 1)?;
    let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let mut sink = CsvSink::new(cfg.patch_path(&stamp));
    let mut progress = LogProgress::default();

    let summary = repair_crawl(&spec, &mut open, &mut sessions, &mut sink, &cfg, Some(&mut progress))?;
    info!(
        path = %sink.path().display(),
        written = summary.records_written,
        hard_misses = summary.hard_misses.len(),
        "patch saved"
    );
    Ok(())
}

fn dataset_path(cfg: &CrawlConfig, csv: Option<PathBuf>) -> Result<PathBuf> {
    match csv {
        Some(p) => Ok(p),
        None => latest_dataset(&cfg.out_dir)
            .ok_or_else(|| eyre!("no dataset found in {}", cfg.out_dir.display())),
    }
}

fn validate_output(cfg: &CrawlConfig, args: DatasetArgs) -> Result<()> {
    let path = dataset_path(cfg, args.csv)?;
    let records = load_records(&path)?;
    if records.is_empty() {
        bail!("{} has no rows", path.display());
    }
    let report = output_report(&records);
    report.log();
    Ok(())
}

fn validate_accuracy(cfg: &CrawlConfig, args: AccuracyArgs) -> Result<()> {
    let path = dataset_path(cfg, args.csv)?;
    let records = load_records(&path)?;
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let mut fetcher = HttpFetcher::new(&cfg.user_agent)?;

    let report = accuracy(&mut fetcher, &records, args.sample, cfg, &mut rng);
    for (field, n) in report.by_field() {
        info!("  {field:<20} {n} mismatch(es)");
    }
    write_json(&cfg.diagnostics_path("accuracy"), &report)?;
    if !report.passed() {
        bail!("accuracy {:.1}% is below the pass mark", report.accuracy_pct);
    }
    Ok(())
}
