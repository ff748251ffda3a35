// src/gaps.rs
//! Gap specifications and their resolution against listing snapshots.
//!
//! A [`GapSpec`] names, per year and ranking view, the ranks missing from a
//! dataset. [`resolve_gaps`] maps each rank to the entity holding it in a
//! snapshot of that view, falling back to the alternate view, and reports
//! the ranks neither view could place.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    fs,
    path::Path,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::sanitize::parse_rank;
use crate::error::GapSpecError;
use crate::identity::EntityLocator;
use crate::listing::RankEntry;
use crate::record::{FieldRecord, RankingSystem};

pub type YearGaps = BTreeMap<RankingSystem, BTreeSet<u32>>;

/// `{ "2020": { "composite": [5, 9], "247": [17] } }`
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GapSpec(BTreeMap<i32, YearGaps>);

impl GapSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(text: &str) -> Result<Self, GapSpecError> {
        let spec: GapSpec = serde_json::from_str(text)?;
        spec.validate()?;
        Ok(spec)
    }

    pub fn load(path: &Path) -> Result<Self, GapSpecError> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    pub fn to_json(&self) -> Result<String, GapSpecError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn insert(&mut self, year: i32, variant: RankingSystem, ranks: impl IntoIterator<Item = u32>) {
        self.0.entry(year).or_default().entry(variant).or_default().extend(ranks);
    }

    /// Ranks are 1-based and at least one must be requested.
    pub fn validate(&self) -> Result<(), GapSpecError> {
        for (&year, gaps) in &self.0 {
            for (&variant, ranks) in gaps {
                if ranks.contains(&0) {
                    return Err(GapSpecError::ZeroRank { year, variant });
                }
            }
        }
        if self.total() == 0 {
            return Err(GapSpecError::Empty);
        }
        Ok(())
    }

    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.0.keys().copied()
    }

    pub fn for_year(&self, year: i32) -> Option<&YearGaps> {
        self.0.get(&year)
    }

    pub fn total(&self) -> usize {
        self.0.values().flat_map(|g| g.values()).map(BTreeSet::len).sum()
    }

    pub fn max_rank(&self, year: i32) -> u32 {
        self.for_year(year).map(max_rank).unwrap_or(0)
    }
}

/// Deepest rank requested in any view for that year.
pub fn max_rank(gaps: &YearGaps) -> u32 {
    gaps.values().filter_map(|r| r.last().copied()).max().unwrap_or(0)
}

/// Why an entity is being re-fetched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct RankReason {
    pub variant: RankingSystem,
    pub rank: u32,
    /// The snapshot the rank was found in.
    pub resolved_in: RankingSystem,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefetchTarget {
    pub locator: EntityLocator,
    pub name: String,
    pub reasons: Vec<RankReason>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct HardMiss {
    pub variant: RankingSystem,
    pub rank: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GapResolution {
    /// Insertion-ordered; each locator appears once.
    pub targets: Vec<RefetchTarget>,
    pub hard_misses: Vec<HardMiss>,
}

impl GapResolution {
    fn add(&mut self, index: &mut HashMap<EntityLocator, usize>, entry: &RankEntry, reason: RankReason) {
        match index.get(&entry.locator) {
            Some(&i) => {
                let reasons = &mut self.targets[i].reasons;
                if !reasons.contains(&reason) {
                    reasons.push(reason);
                }
            }
            None => {
                index.insert(entry.locator.clone(), self.targets.len());
                self.targets.push(RefetchTarget {
                    locator: entry.locator.clone(),
                    name: entry.name.clone(),
                    reasons: vec![reason],
                });
            }
        }
    }
}

pub type Snapshots = BTreeMap<RankingSystem, Vec<RankEntry>>;

fn rank_index(entries: &[RankEntry]) -> HashMap<u32, &RankEntry> {
    let mut map = HashMap::with_capacity(entries.len());
    for e in entries {
        map.entry(e.rank).or_insert(e);
    }
    map
}

/// Map requested ranks to entities. A missing snapshot counts as empty.
pub fn resolve_gaps(snapshots: &Snapshots, gaps: &YearGaps) -> GapResolution {
    let indexes: HashMap<RankingSystem, HashMap<u32, &RankEntry>> =
        snapshots.iter().map(|(&v, entries)| (v, rank_index(entries))).collect();
    let lookup = |variant: RankingSystem, rank: u32| indexes.get(&variant).and_then(|m| m.get(&rank)).copied();

    let mut out = GapResolution::default();
    let mut seen = HashMap::new();
    let mut pending = Vec::new();

    for (&variant, ranks) in gaps {
        for &rank in ranks {
            match lookup(variant, rank) {
                Some(entry) => out.add(&mut seen, entry, RankReason { variant, rank, resolved_in: variant }),
                None => pending.push((variant, rank)),
            }
        }
    }

    for (variant, rank) in pending {
        let alt = variant.alternate();
        match lookup(alt, rank) {
            Some(entry) => {
                debug!(%variant, rank, "resolved from alternate view");
                out.add(&mut seen, entry, RankReason { variant, rank, resolved_in: alt });
            }
            None => out.hard_misses.push(HardMiss { variant, rank }),
        }
    }

    info!(
        requested = gaps.values().map(BTreeSet::len).sum::<usize>(),
        targets = out.targets.len(),
        hard_misses = out.hard_misses.len(),
        "gaps resolved"
    );
    out
}

/// Ranks `1..=expected` per view that no record of `year` carries.
pub fn derive_gaps(records: &[FieldRecord], year: i32, expected: &BTreeMap<RankingSystem, u32>) -> YearGaps {
    let mut out = YearGaps::new();
    for (&variant, &upto) in expected {
        let present: BTreeSet<u32> = records
            .iter()
            .filter(|r| r.year() == Some(year))
            .filter_map(|r| parse_rank(r.get(variant.national_rank())))
            .collect();
        let missing: BTreeSet<u32> = (1..=upto).filter(|r| !present.contains(r)).collect();
        if !missing.is_empty() {
            out.insert(variant, missing);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::normalize;
    use crate::record::Field;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use RankingSystem::*;

    fn entry(rank: u32, slug: &str) -> RankEntry {
        RankEntry {
            rank,
            locator: normalize(&format!("https://247sports.com/player/{slug}/")),
            name: s!(slug),
        }
    }

    fn gaps(pairs: &[(RankingSystem, &[u32])]) -> YearGaps {
        pairs.iter().map(|(v, r)| (*v, r.iter().copied().collect())).collect()
    }

    #[test]
    fn refetch_set_and_hard_miss() {
        let snaps = Snapshots::from([(Composite, vec![entry(5, "a-1"), entry(9, "b-2")])]);
        let res = resolve_gaps(&snaps, &gaps(&[(Composite, &[5, 9, 17])]));
        let names: Vec<&str> = res.targets.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["a-1", "b-2"]);
        assert_eq!(res.hard_misses, vec![HardMiss { variant: Composite, rank: 17 }]);
    }

    #[test]
    fn one_entity_many_reasons() {
        let snaps = Snapshots::from([
            (Composite, vec![entry(5, "a-1")]),
            (Site247, vec![entry(7, "a-1")]),
        ]);
        let res = resolve_gaps(&snaps, &gaps(&[(Composite, &[5]), (Site247, &[7])]));
        assert_eq!(res.targets.len(), 1);
        assert_eq!(res.targets[0].reasons.len(), 2);
        assert!(res.hard_misses.is_empty());
    }

    #[test]
    fn alternate_view_fills_primary_hole() {
        let snaps = Snapshots::from([
            (Composite, vec![entry(1, "a-1")]),
            (Site247, vec![entry(2, "b-2")]),
        ]);
        let res = resolve_gaps(&snaps, &gaps(&[(Composite, &[2])]));
        assert_eq!(res.targets.len(), 1);
        assert_eq!(
            res.targets[0].reasons,
            vec![RankReason { variant: Composite, rank: 2, resolved_in: Site247 }]
        );
    }

    #[test]
    fn missing_snapshot_counts_as_empty() {
        let res = resolve_gaps(&Snapshots::new(), &gaps(&[(Site247, &[3, 4])]));
        assert!(res.targets.is_empty());
        assert_eq!(res.hard_misses.len(), 2);
    }

    #[test]
    fn json_shape_and_validation() {
        let spec = GapSpec::from_json(r#"{ "2020": { "composite": [9, 5], "247": [17] } }"#).unwrap();
        let y = spec.for_year(2020).unwrap();
        assert_eq!(y[&Composite].iter().copied().collect::<Vec<_>>(), vec![5, 9]);
        assert_eq!(max_rank(y), 17);
        assert_eq!(spec.max_rank(2020), 17);
        assert_eq!(spec.max_rank(1999), 0);
        assert_eq!(spec.total(), 3);

        let back = GapSpec::from_json(&spec.to_json().unwrap()).unwrap();
        assert_eq!(back, spec);

        assert!(matches!(
            GapSpec::from_json(r#"{ "2020": { "247": [0, 3] } }"#),
            Err(GapSpecError::ZeroRank { year: 2020, variant: Site247 })
        ));
        assert!(matches!(GapSpec::from_json(r#"{ "2020": {} }"#), Err(GapSpecError::Empty)));
        assert!(matches!(GapSpec::from_json("[1,2]"), Err(GapSpecError::Json(_))));
    }

    #[test]
    fn derive_from_dataset() {
        let mut have = Vec::new();
        for (rank, year) in [(1, "2020"), (2, "2020"), (4, "2020"), (3, "2019")] {
            let mut r = FieldRecord::new();
            r.set(Field::RecruitingYear, year);
            r.set(Field::CompositeNationalRank, rank.to_string());
            have.push(r);
        }
        let expected = BTreeMap::from([(Composite, 5), (Site247, 2)]);
        let g = derive_gaps(&have, 2020, &expected);
        assert_eq!(g[&Composite].iter().copied().collect::<Vec<_>>(), vec![3, 5]);
        assert_eq!(g[&Site247].iter().copied().collect::<Vec<_>>(), vec![1, 2]);
    }

    fn arb_snapshot() -> impl Strategy<Value = Vec<RankEntry>> {
        prop::collection::btree_map(1u32..60, 0u32..20, 0..40)
            .prop_map(|m| m.into_iter().map(|(rank, who)| entry(rank, &format!("p-{who}"))).collect())
    }

    proptest! {
        #[test]
        fn resolution_is_sound_and_complete(
            comp in arb_snapshot(),
            site in arb_snapshot(),
            want_c in prop::collection::btree_set(1u32..60, 0..20),
            want_s in prop::collection::btree_set(1u32..60, 0..20),
        ) {
            let snaps = Snapshots::from([(Composite, comp.clone()), (Site247, site.clone())]);
            let req = YearGaps::from([(Composite, want_c.clone()), (Site247, want_s.clone())]);
            let res = resolve_gaps(&snaps, &req);

            let mut locs = BTreeSet::new();
            for t in &res.targets {
                prop_assert!(locs.insert(t.locator.clone()));
                for r in &t.reasons {
                    prop_assert!(req[&r.variant].contains(&r.rank));
                    let snap = if r.resolved_in == Composite { &comp } else { &site };
                    prop_assert!(snap.iter().any(|e| e.rank == r.rank && e.locator == t.locator));
                }
            }

            let placed = |snap: &[RankEntry], rank| snap.iter().any(|e| e.rank == rank);
            for (variant, wanted) in &req {
                for &rank in wanted {
                    let in_any = placed(&comp, rank) || placed(&site, rank);
                    let missed = res.hard_misses.contains(&HardMiss { variant: *variant, rank });
                    prop_assert_eq!(in_any, !missed);
                }
            }
        }
    }
}
