// src/core/html.rs
use scraper::{ElementRef, Selector};

use super::sanitize::normalize_ws;

/// Parsed CSS selector, or `None` for a malformed one (logged, never fatal).
pub fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(sel) => Some(sel),
        Err(e) => {
            tracing::debug!(css, error = %e, "unusable selector");
            None
        }
    }
}

pub fn select_all<'a>(root: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match selector(css) {
        Some(sel) => root.select(&sel).collect(),
        None => Vec::new(),
    }
}

pub fn select_first<'a>(root: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let sel = selector(css)?;
    root.select(&sel).next()
}

/// Visible text with whitespace collapsed; text nodes are joined with a space.
pub fn text_of(el: ElementRef<'_>) -> String {
    let pieces: Vec<&str> = el.text().map(str::trim).filter(|t| !t.is_empty()).collect();
    normalize_ws(&pieces.join(" "))
}

pub fn first_text(root: ElementRef<'_>, css: &str) -> Option<String> {
    select_first(root, css)
        .map(text_of)
        .filter(|t| !t.is_empty())
}

pub fn attr(el: ElementRef<'_>, name: &str) -> Option<String> {
    el.value().attr(name).map(|v| v.trim().to_string())
}

pub fn to_lower(s: &str) -> String {
    s.to_lowercase()
}
