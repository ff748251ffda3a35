// src/record.rs
//! The flat per-entity record written to the dataset.
//!
//! Every record carries all [`Field`]s; unknown values hold the `NA` sentinel,
//! never an empty string. Column order is [`Field::ALL`].

use std::fmt;

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::config::consts::NA;
use crate::core::sanitize::is_known;
use crate::identity::EntityLocator;

/// Which ranking view a rank belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RankingSystem {
    #[serde(rename = "composite", alias = "Composite")]
    Composite,
    #[serde(rename = "247")]
    Site247,
}

impl RankingSystem {
    pub const ALL: [RankingSystem; 2] = [RankingSystem::Composite, RankingSystem::Site247];

    /// The other view, consulted when a rank is missing from this one.
    pub fn alternate(self) -> Self {
        match self {
            Self::Composite => Self::Site247,
            Self::Site247 => Self::Composite,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Composite => "composite",
            Self::Site247 => "247",
        }
    }

    pub fn stars(self) -> Field {
        match self { Self::Composite => Field::CompositeStars, Self::Site247 => Field::Stars247 }
    }
    pub fn rating(self) -> Field {
        match self { Self::Composite => Field::CompositeRating, Self::Site247 => Field::Rating247 }
    }
    pub fn national_rank(self) -> Field {
        match self { Self::Composite => Field::CompositeNationalRank, Self::Site247 => Field::NationalRank247 }
    }
    pub fn position(self) -> Field {
        match self { Self::Composite => Field::CompositePosition, Self::Site247 => Field::Position247 }
    }
    pub fn position_rank(self) -> Field {
        match self { Self::Composite => Field::CompositePositionRank, Self::Site247 => Field::PositionRank247 }
    }
}

impl fmt::Display for RankingSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Id,
    Name,
    Position,
    Height,
    Weight,
    HighSchool,
    CityState,
    Class,
    Stars247,
    Rating247,
    NationalRank247,
    Position247,
    PositionRank247,
    CompositeStars,
    CompositeRating,
    CompositeNationalRank,
    CompositePosition,
    CompositePositionRank,
    SignedDate,
    SignedTeam,
    DraftDate,
    DraftTeam,
    RecruitingYear,
    ProfileUrl,
    ScrapeDate,
    DataSource,
}

impl Field {
    pub const COUNT: usize = 26;

    pub const ALL: [Field; Field::COUNT] = [
        Field::Id, Field::Name, Field::Position, Field::Height, Field::Weight,
        Field::HighSchool, Field::CityState, Field::Class,
        Field::Stars247, Field::Rating247, Field::NationalRank247, Field::Position247, Field::PositionRank247,
        Field::CompositeStars, Field::CompositeRating, Field::CompositeNationalRank,
        Field::CompositePosition, Field::CompositePositionRank,
        Field::SignedDate, Field::SignedTeam, Field::DraftDate, Field::DraftTeam,
        Field::RecruitingYear, Field::ProfileUrl, Field::ScrapeDate, Field::DataSource,
    ];

    pub fn header(self) -> &'static str {
        match self {
            Field::Id => "247 ID",
            Field::Name => "Player Name",
            Field::Position => "Position",
            Field::Height => "Height",
            Field::Weight => "Weight",
            Field::HighSchool => "High School",
            Field::CityState => "City, ST",
            Field::Class => "Class",
            Field::Stars247 => "247 Stars",
            Field::Rating247 => "247 Rating",
            Field::NationalRank247 => "247 National Rank",
            Field::Position247 => "247 Position",
            Field::PositionRank247 => "247 Position Rank",
            Field::CompositeStars => "Composite Stars",
            Field::CompositeRating => "Composite Rating",
            Field::CompositeNationalRank => "Composite National Rank",
            Field::CompositePosition => "Composite Position",
            Field::CompositePositionRank => "Composite Position Rank",
            Field::SignedDate => "Signed Date",
            Field::SignedTeam => "Signed Team",
            Field::DraftDate => "Draft Date",
            Field::DraftTeam => "Draft Team",
            Field::RecruitingYear => "Recruiting Year",
            Field::ProfileUrl => "Profile URL",
            Field::ScrapeDate => "Scrape Date",
            Field::DataSource => "Data Source",
        }
    }

    pub fn from_header(h: &str) -> Option<Field> {
        let h = h.trim().trim_start_matches('\u{feff}');
        Field::ALL.into_iter().find(|f| f.header() == h)
    }

    fn index(self) -> usize {
        self as usize
    }
}

pub fn headers() -> Vec<String> {
    Field::ALL.iter().map(|f| s!(f.header())).collect()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldRecord {
    values: [String; Field::COUNT],
}

impl Default for FieldRecord {
    fn default() -> Self {
        Self { values: std::array::from_fn(|_| na!()) }
    }
}

impl FieldRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity columns filled in, everything else unknown.
    pub fn for_entity(locator: &EntityLocator, year: i32, source: &str) -> Self {
        let mut rec = Self::new();
        if let Some(id) = locator.entity_id() {
            rec.set(Field::Id, id);
        }
        rec.set(Field::ProfileUrl, locator.as_str());
        rec.set(Field::RecruitingYear, year.to_string());
        rec.set(Field::Class, year.to_string());
        rec.set(Field::DataSource, source);
        rec.set(Field::ScrapeDate, Local::now().format("%Y-%m-%d %H:%M:%S").to_string());
        rec
    }

    pub fn get(&self, field: Field) -> &str {
        &self.values[field.index()]
    }

    /// Empty values are stored as the sentinel.
    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();
        self.values[field.index()] = if value.trim().is_empty() { na!() } else { value };
    }

    /// Only fills a field that is still unknown.
    pub fn set_if_unknown(&mut self, field: Field, value: impl Into<String>) {
        if !self.is_known(field) {
            self.set(field, value);
        }
    }

    pub fn is_known(&self, field: Field) -> bool {
        is_known(self.get(field))
    }

    pub fn name(&self) -> &str {
        self.get(Field::Name)
    }

    pub fn year(&self) -> Option<i32> {
        self.get(Field::RecruitingYear).trim().parse().ok()
    }

    /// Dedup key: (id, year). Records without an id never collide.
    pub fn key(&self) -> Option<(String, String)> {
        if !self.is_known(Field::Id) {
            return None;
        }
        Some((s!(self.get(Field::Id)), s!(self.get(Field::RecruitingYear))))
    }

    pub fn to_row(&self) -> Vec<String> {
        self.values.to_vec()
    }

    /// Rebuild from a stored row; `columns[i]` names the field in cell `i`.
    pub fn from_row(columns: &[Option<Field>], row: &[String]) -> Self {
        let mut rec = Self::new();
        for (col, cell) in columns.iter().zip(row) {
            if let Some(field) = col {
                rec.set(*field, cell.as_str());
            }
        }
        rec
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        Field::ALL.into_iter().map(move |f| (f, self.get(f)))
    }
}

impl fmt::Display for FieldRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self.get(Field::Id);
        if id == NA {
            write!(f, "{} <{}>", self.name(), self.get(Field::ProfileUrl))
        } else {
            write!(f, "{} ({id})", self.name())
        }
    }
}
