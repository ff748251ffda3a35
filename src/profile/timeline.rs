// src/profile/timeline.rs
//! Timeline events and the priority merge that picks the recruiting decision.
//!
//! Only events dated strictly before September 1 of the recruiting year are
//! eligible. A commitment (100) outranks a signing (1); a candidate replaces
//! the current pick only with a strictly higher priority, so the first
//! eligible event of the top priority wins.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;

use crate::config::consts::{CUTOFF_DAY, CUTOFF_MONTH};
use crate::core::sanitize::{find_date, normalize_ws};

static COMMIT_TEAM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:commits to|to|with|at)\s+([A-Z][^,.]+)").expect("commit team pattern")
});
static DRAFTED_BY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i:selected|picked|drafted)\s+by\s+(?:the\s+)?([A-Z][A-Za-z0-9 .]+?)(?:\s+(?:in|with|at|as)\b|[,(]|$)")
        .expect("drafted-by pattern")
});
static TEAM_PICKS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Z][A-Za-z0-9 .]+?)\s+(?i:selects?|picks?)\b").expect("team-picks pattern")
});

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum EventKind {
    Commitment,
    Signing,
    Draft,
}

impl EventKind {
    pub fn priority(self) -> i32 {
        match self {
            EventKind::Commitment => 100,
            EventKind::Signing => 1,
            EventKind::Draft => 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimelineEvent {
    pub kind: EventKind,
    pub date: Option<NaiveDate>,
    pub team: Option<String>,
}

/// Events described by one timeline entry. An entry can carry a draft note
/// and a decision at once.
pub fn parse_events(text: &str) -> Vec<TimelineEvent> {
    let text = normalize_ws(text);
    let lower = text.to_lowercase();
    let date = find_date(&text);
    let mut out = Vec::with_capacity(1);

    if lower.contains("draft") {
        out.push(TimelineEvent { kind: EventKind::Draft, date, team: draft_team(&text) });
    }

    let kind = if lower.contains("commitment") || lower.contains("committed") || lower.contains("commits to") {
        Some(EventKind::Commitment)
    } else if lower.contains("signed") || lower.contains("signing") {
        Some(EventKind::Signing)
    } else {
        None
    };
    if let Some(kind) = kind {
        let team = COMMIT_TEAM_RE.captures(&text).map(|c| normalize_ws(&c[1]));
        out.push(TimelineEvent { kind, date, team });
    }
    out
}

fn draft_team(text: &str) -> Option<String> {
    let raw = DRAFTED_BY_RE
        .captures(text)
        .or_else(|| TEAM_PICKS_RE.captures(text))
        .map(|c| s!(&c[1]))?;
    // "2024 NFL Draft Dallas Cowboys select ..." keeps only the team
    let team = match raw.rfind("Draft") {
        Some(i) => raw[i + "Draft".len()..].trim_start_matches([':', ' ']),
        None => raw.as_str(),
    };
    let team = normalize_ws(team);
    if team.is_empty() { None } else { Some(team) }
}

/// Strictly before September 1 of `year`. Undated events are never eligible.
pub fn is_eligible(date: Option<NaiveDate>, year: i32) -> bool {
    match (date, NaiveDate::from_ymd_opt(year, CUTOFF_MONTH, CUTOFF_DAY)) {
        (Some(d), Some(cutoff)) => d < cutoff,
        _ => false,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Offer {
    Accepted,
    /// Accepted at the top priority; nothing later can replace it.
    Decisive,
    Ineligible,
    NotHigher,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Decision {
    pub date: Option<NaiveDate>,
    pub team: Option<String>,
    pub kind: Option<EventKind>,
}

/// Running pick across both timeline tiers.
#[derive(Clone, Debug)]
pub struct DecisionMerge {
    year: i32,
    priority: i32,
    current: Decision,
}

impl DecisionMerge {
    pub fn new(year: i32) -> Self {
        Self { year, priority: -1, current: Decision::default() }
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Nothing can beat what is held.
    pub fn is_settled(&self) -> bool {
        self.priority >= EventKind::Commitment.priority()
    }

    pub fn offer(&mut self, ev: &TimelineEvent) -> Offer {
        if ev.kind == EventKind::Draft || !is_eligible(ev.date, self.year) {
            return Offer::Ineligible;
        }
        let p = ev.kind.priority();
        if p <= self.priority {
            return Offer::NotHigher;
        }
        self.priority = p;
        self.current.date = ev.date;
        self.current.kind = Some(ev.kind);
        // a team-less event keeps the team already held
        if ev.team.is_some() {
            self.current.team = ev.team.clone();
        }
        if self.is_settled() { Offer::Decisive } else { Offer::Accepted }
    }

    pub fn finish(self) -> Decision {
        self.current
    }
}
