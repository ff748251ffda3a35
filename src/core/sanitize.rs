// src/core/sanitize.rs
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::config::consts::NA;

static RANK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#?\s*(\d+)").expect("rank pattern"));
static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("number pattern"));
static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Z][a-z]+\.?\s+\d{1,2},\s+\d{4}|\d{1,2}/\d{1,2}/\d{4})").expect("date pattern")
});

const DATE_FORMATS: [&str; 3] = ["%m/%d/%Y", "%b %d, %Y", "%B %d, %Y"];

pub fn normalize_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_space { out.push(' '); prev_space = true; }
        } else { out.push(ch); prev_space = false; }
    }
    out.trim().to_string()
}

/// Collapsed text, or the NA sentinel when nothing is left.
pub fn clean_text(s: &str) -> String {
    let out = normalize_ws(s);
    if out.is_empty() { s!(NA) } else { out }
}

pub fn is_known(cell: &str) -> bool {
    let t = cell.trim();
    !t.is_empty() && t != NA
}

/// Leading apostrophe keeps spreadsheets from reading `6-3` as a date.
pub fn normalize_height(s: &str) -> String {
    let h = normalize_ws(s);
    if h.is_empty() || h == NA { s!(NA) }
    else if h.starts_with('\'') { h }
    else { join!("'", &h) }
}

/// First integer in `#12`, `12th`, `No. 12`.
pub fn parse_rank(s: &str) -> Option<u32> {
    RANK_RE.captures(s)?.get(1)?.as_str().parse().ok()
}

/// First decimal number in the text, as written.
pub fn first_number(s: &str) -> Option<String> {
    NUMBER_RE.find(s).map(|m| m.as_str().to_string())
}

/// First date-looking span inside free text.
pub fn find_date(text: &str) -> Option<NaiveDate> {
    DATE_RE.find_iter(text).find_map(|m| parse_date(m.as_str()))
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = normalize_ws(s).replace('.', "").replace("Sept ", "Sep ");
    DATE_FORMATS.iter().find_map(|fmt| NaiveDate::parse_from_str(&s, fmt).ok())
}

pub fn format_date(d: NaiveDate) -> String {
    d.format("%m/%d/%Y").to_string()
}
