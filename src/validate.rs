// src/validate.rs
//! Quality checks over a finished dataset: field completeness, and a
//! re-fetch of a random sample compared against what was stored.

use std::collections::{BTreeMap, HashMap};

use rand::{seq::IndexedRandom, Rng};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::consts::{ACCURACY_PASS_PCT, SOURCE_FULL};
use crate::config::options::CrawlConfig;
use crate::core::net::Fetcher;
use crate::identity::normalize;
use crate::profile::{reconcile, ReconcileConfig};
use crate::record::{Field, FieldRecord};

use Field::*;

pub const CATEGORIES: [(&str, &[Field]); 5] = [
    ("Core Info", &[Id, Name, Position, Height, Weight, HighSchool, CityState, Class]),
    ("247Sports Ratings", &[Stars247, Rating247, NationalRank247, Position247, PositionRank247]),
    (
        "Composite Ratings",
        &[CompositeStars, CompositeRating, CompositeNationalRank, CompositePosition, CompositePositionRank],
    ),
    ("Timeline", &[SignedDate, SignedTeam, DraftDate, DraftTeam]),
    ("Metadata", &[RecruitingYear, ProfileUrl, ScrapeDate, DataSource]),
];

const CRITICAL: [Field; 6] = [Id, Name, Position, Class, CompositeStars, CompositeRating];
const OPTIONAL: [Field; 2] = [CompositeNationalRank, DraftDate];

/// Fields compared on a re-fetch.
pub const CHECKED_FIELDS: [Field; 10] = [
    Name, Position, Height, Weight, Class, Stars247, Rating247, CompositeStars, CompositeRating, SignedTeam,
];

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FieldCompleteness {
    pub field: &'static str,
    pub filled: usize,
    pub pct: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OutputReport {
    pub total: usize,
    /// Category name with its fields, in display order.
    pub categories: Vec<(&'static str, Vec<FieldCompleteness>)>,
    pub critical_pct: f64,
    pub optional_pct: f64,
    /// 70% critical, 30% optional.
    pub quality_score: f64,
    /// Ids seen more than once, with their count.
    pub duplicate_ids: BTreeMap<String, usize>,
    pub by_year: BTreeMap<String, usize>,
    pub by_position: BTreeMap<String, usize>,
    pub by_composite_stars: BTreeMap<String, usize>,
}

impl OutputReport {
    pub fn completeness(&self, field: Field) -> Option<&FieldCompleteness> {
        self.categories
            .iter()
            .flat_map(|(_, fields)| fields)
            .find(|f| f.field == field.header())
    }

    pub fn log(&self) {
        info!(total = self.total, "dataset");
        for (category, fields) in &self.categories {
            info!("{category}:");
            for f in fields {
                info!("  {:<26} {:5.1}% ({}/{})", f.field, f.pct, f.filled, self.total);
            }
        }
        info!(
            critical = format!("{:.1}%", self.critical_pct),
            optional = format!("{:.1}%", self.optional_pct),
            score = format!("{:.1}%", self.quality_score),
            "quality"
        );
        if self.duplicate_ids.is_empty() {
            info!("no duplicate ids");
        } else {
            warn!(count = self.duplicate_ids.len(), "duplicate ids");
        }
        for (year, n) in &self.by_year {
            info!("  {year}: {n}");
        }
    }
}

fn pct(part: usize, whole: usize) -> f64 {
    if whole == 0 { 0.0 } else { part as f64 * 100.0 / whole as f64 }
}

fn count_by(records: &[FieldRecord], field: Field, known_only: bool) -> BTreeMap<String, usize> {
    let mut out = BTreeMap::new();
    for r in records.iter().filter(|r| !known_only || r.is_known(field)) {
        *out.entry(s!(r.get(field))).or_insert(0) += 1;
    }
    out
}

pub fn output_report(records: &[FieldRecord]) -> OutputReport {
    let total = records.len();
    let filled = |field: Field| records.iter().filter(|r| r.is_known(field)).count();
    let field_pct = |field: Field| pct(filled(field), total);

    let categories = CATEGORIES
        .iter()
        .map(|(name, fields)| {
            let stats = fields
                .iter()
                .map(|&f| FieldCompleteness { field: f.header(), filled: filled(f), pct: field_pct(f) })
                .collect();
            (*name, stats)
        })
        .collect();

    let critical_pct = CRITICAL.iter().map(|&f| field_pct(f)).sum::<f64>() / CRITICAL.len() as f64;
    let optional_pct = OPTIONAL.iter().map(|&f| field_pct(f)).sum::<f64>() / OPTIONAL.len() as f64;

    let mut duplicate_ids = count_by(records, Id, true);
    duplicate_ids.retain(|_, n| *n > 1);

    OutputReport {
        total,
        categories,
        critical_pct,
        optional_pct,
        quality_score: critical_pct * 0.7 + optional_pct * 0.3,
        duplicate_ids,
        by_year: count_by(records, RecruitingYear, false),
        by_position: count_by(records, Position, true),
        by_composite_stars: count_by(records, CompositeStars, true),
    }
}

/* ---------------- Accuracy ---------------- */

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    pub field: &'static str,
    pub stored: String,
    pub fresh: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SampleCheck {
    pub id: String,
    pub name: String,
    pub url: String,
    pub mismatches: Vec<Mismatch>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AccuracyReport {
    pub sampled: usize,
    pub perfect: usize,
    pub accuracy_pct: f64,
    pub checks: Vec<SampleCheck>,
}

impl AccuracyReport {
    pub fn passed(&self) -> bool {
        self.accuracy_pct >= ACCURACY_PASS_PCT
    }

    /// Mismatch count per field, most frequent first.
    pub fn by_field(&self) -> Vec<(&'static str, usize)> {
        let mut counts: HashMap<&'static str, usize> = HashMap::new();
        for m in self.checks.iter().flat_map(|c| &c.mismatches) {
            *counts.entry(m.field).or_insert(0) += 1;
        }
        let mut out: Vec<_> = counts.into_iter().collect();
        out.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        out
    }
}

fn same(a: &str, b: &str) -> bool {
    a.trim().to_uppercase() == b.trim().to_uppercase()
}

/// Compare one stored record with a fresh read of the same entity.
pub fn compare(stored: &FieldRecord, fresh: &FieldRecord) -> Vec<Mismatch> {
    CHECKED_FIELDS
        .iter()
        .filter(|&&f| !same(stored.get(f), fresh.get(f)))
        .map(|&f| Mismatch { field: f.header(), stored: s!(stored.get(f)), fresh: s!(fresh.get(f)) })
        .collect()
}

/// Re-reconcile up to `sample` random records and compare key fields.
pub fn accuracy<F: Fetcher + ?Sized, R: Rng + ?Sized>(
    fetcher: &mut F,
    records: &[FieldRecord],
    sample: usize,
    cfg: &CrawlConfig,
    rng: &mut R,
) -> AccuracyReport {
    let picked: Vec<&FieldRecord> = records.choose_multiple(rng, sample.min(records.len())).collect();
    info!(sampled = picked.len(), "re-fetching sample");

    let mut checks = Vec::with_capacity(picked.len());
    for (i, stored) in picked.iter().enumerate() {
        let locator = normalize(stored.get(ProfileUrl));
        let rcfg = ReconcileConfig {
            year: stored.year().unwrap_or(cfg.year),
            history_pages: cfg.history_pages,
            source_label: s!(SOURCE_FULL),
        };
        let fresh = reconcile(fetcher, &locator, true, &rcfg);
        let mismatches = compare(stored, &fresh.record);
        if mismatches.is_empty() {
            info!("[{}/{}] {stored} matches", i + 1, picked.len());
        } else {
            warn!("[{}/{}] {stored}: {} field(s) differ", i + 1, picked.len(), mismatches.len());
        }
        checks.push(SampleCheck {
            id: s!(stored.get(Id)),
            name: s!(stored.name()),
            url: s!(locator.as_str()),
            mismatches,
        });
    }

    let perfect = checks.iter().filter(|c| c.mismatches.is_empty()).count();
    let report = AccuracyReport {
        sampled: checks.len(),
        perfect,
        accuracy_pct: pct(perfect, checks.len()),
        checks,
    };
    info!(accuracy = format!("{:.1}%", report.accuracy_pct), passed = report.passed(), "accuracy check done");
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::net::ReplayFetcher;
    use pretty_assertions::assert_eq;
    use rand::{rngs::StdRng, SeedableRng};

    fn rec(id: &str, pos: &str, stars: &str) -> FieldRecord {
        let mut r = FieldRecord::new();
        r.set(Id, id);
        r.set(Name, format!("P{id}"));
        r.set(Position, pos);
        r.set(Class, "2020");
        r.set(CompositeStars, stars);
        r.set(CompositeRating, "0.9");
        r.set(RecruitingYear, "2020");
        r
    }

    #[test]
    fn weighted_score_and_groupings() {
        let mut records = vec![rec("1", "QB", "4"), rec("2", "WR", "3"), rec("2", "WR", "NA"), rec("NA", "NA", "3")];
        records[0].set(CompositeNationalRank, "12");
        records[0].set(DraftDate, "04/25/2024");
        let r = output_report(&records);

        assert_eq!(r.total, 4);
        assert_eq!(r.completeness(Id).unwrap().filled, 3);
        assert_eq!(r.completeness(CompositeNationalRank).unwrap().pct, 25.0);
        // critical: Id 75, Name 100, Position 75, Class 100, Stars 75, Rating 100
        assert!((r.critical_pct - 87.5).abs() < 1e-9);
        assert!((r.optional_pct - 25.0).abs() < 1e-9);
        assert!((r.quality_score - (87.5 * 0.7 + 25.0 * 0.3)).abs() < 1e-9);
        assert_eq!(r.duplicate_ids, BTreeMap::from([(s!("2"), 2)]));
        assert_eq!(r.by_year, BTreeMap::from([(s!("2020"), 4)]));
        assert_eq!(r.by_position.get("WR"), Some(&2));
        assert_eq!(r.by_position.get("NA"), None);
        assert_eq!(r.categories.len(), 5);
    }

    #[test]
    fn empty_dataset_scores_zero() {
        let r = output_report(&[]);
        assert_eq!(r.quality_score, 0.0);
    }

    #[test]
    fn comparison_ignores_case_and_padding() {
        let a = rec("1", "QB", "4");
        let mut b = rec("1", " qb ", "4");
        assert!(compare(&a, &b).is_empty());
        b.set(CompositeStars, "5");
        let diff = compare(&a, &b);
        assert_eq!(diff, vec![Mismatch { field: "Composite Stars", stored: s!("4"), fresh: s!("5") }]);
    }

    #[test]
    fn unreachable_pages_count_as_mismatches() {
        let mut records: Vec<FieldRecord> = (1..=5).map(|i| rec(&i.to_string(), "QB", "4")).collect();
        for (i, r) in records.iter_mut().enumerate() {
            r.set(ProfileUrl, format!("https://247sports.com/player/p-{}/", i + 1));
        }
        let mut fetcher = ReplayFetcher::new();
        let mut rng = StdRng::seed_from_u64(7);
        let report = accuracy(&mut fetcher, &records, 3, &CrawlConfig::default(), &mut rng);
        assert_eq!(report.sampled, 3);
        assert_eq!(report.perfect, 0);
        assert!(!report.passed());
        assert_eq!(fetcher.requested.len(), 3);
        assert_eq!(report.by_field()[0].1, 3);
    }
}
