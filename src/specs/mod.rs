// src/specs/mod.rs
//! # Page-reading "specs"
//!
//! Each spec knows **where the ground truth lives** on one kind of page and how
//! to pull it out without caring what the caller does with it next.
//!
//! ## What lives here
//! - **Pure HTML reading** of the ranking list and the profile pages
//!   (`rankings`, `profile`), built on `scraper` selectors.
//! - **Strategy chains**: ordered selector lists tried until one yields
//!   something. Adding a layout variant means adding a [`Strategy`], not code.
//! - Small plain structs (`ProfileView`, `HistoryPage`, `RawListItem`) handed
//!   upward.
//!
//! ## What does **not** live here
//! - Fetching, navigation between pages, retries: `profile` and `listing`.
//! - Field classification and merging: `profile`.
//! - Persistence: `sink` / `store`.
//!
//! ## Testing notes
//! Every reader is tested offline against the captured pages in
//! `tests/fixtures/`.
//!
//! In short: **`specs` knows how to read the pages.**

use scraper::ElementRef;

use crate::core::html::select_all;

pub mod profile;
pub mod rankings;

/// A named way of finding something on a page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Strategy {
    pub name: &'static str,
    pub css: &'static str,
}

impl Strategy {
    pub const fn new(name: &'static str, css: &'static str) -> Self {
        Self { name, css }
    }
}

/// First strategy that matches anything, with its matches.
pub fn first_match<'a>(root: ElementRef<'a>, chain: &[Strategy]) -> Option<(&'static str, Vec<ElementRef<'a>>)> {
    chain.iter().find_map(|s| {
        let found = select_all(root, s.css);
        if found.is_empty() { None } else { Some((s.name, found)) }
    })
}

/// Matches of every strategy, in chain order, without repeats.
pub fn all_matches<'a>(root: ElementRef<'a>, chain: &[Strategy]) -> Vec<ElementRef<'a>> {
    let mut out: Vec<ElementRef<'a>> = Vec::new();
    for s in chain {
        for el in select_all(root, s.css) {
            if !out.iter().any(|seen| seen.id() == el.id()) {
                out.push(el);
            }
        }
    }
    out
}
