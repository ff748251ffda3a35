// src/identity.rs
//! Canonical entity references.
//!
//! The same profile shows up under many spellings (`www.` or bare host, `http`
//! or `https`, with query strings, with trailing sub-pages such as
//! `/high-school-123/`). [`normalize`] collapses them all to
//! `https://<host>/player/<slug>/`, which is the identity used for
//! deduplication everywhere. Normalizing twice never changes the result.

use std::{fmt, sync::LazyLock};

use regex::Regex;
use url::Url;

use crate::config::consts::{BASE_URL, ENTITY_SEGMENT};

static ENTITY_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-(\d+)$").expect("id pattern"));

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityLocator {
    /// `https://<host>/player/<slug>/`
    Resolved(String),
    /// Best-effort cleanup of a reference that does not point at an entity page.
    Unresolved(String),
}

impl EntityLocator {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Resolved(s) | Self::Unresolved(s) => s,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    /// Trailing numeric id of the slug, e.g. `12345` in `jalen-example-12345`.
    pub fn entity_id(&self) -> Option<String> {
        let Self::Resolved(url) = self else { return None };
        let slug = url.trim_end_matches('/').rsplit('/').next()?;
        ENTITY_ID_RE.captures(slug).map(|c| s!(&c[1]))
    }
}

impl fmt::Display for EntityLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical locator for any raw reference. Never fails.
pub fn normalize(raw: &str) -> EntityLocator {
    let stripped = raw.trim().split(['?', '#']).next().unwrap_or("").trim();
    if stripped.is_empty() {
        return EntityLocator::Unresolved(s!());
    }

    let Some(candidate) = with_scheme(stripped) else {
        return EntityLocator::Unresolved(s!(stripped));
    };
    let Ok(url) = Url::parse(&candidate) else {
        return EntityLocator::Unresolved(s!(stripped));
    };
    if !matches!(url.scheme(), "http" | "https") {
        return EntityLocator::Unresolved(s!(stripped));
    }
    let Some(host) = url.host_str() else {
        return EntityLocator::Unresolved(s!(stripped));
    };
    let host = host.trim_start_matches("www.");
    if host.is_empty() {
        return EntityLocator::Unresolved(s!(stripped));
    }
    let port = url.port().filter(|p| *p != 443).map(|p| format!(":{p}")).unwrap_or_default();
    let prefix = format!("https://{host}{port}");

    let segments: Vec<&str> = url
        .path_segments()
        .map(|segs| segs.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();

    let entity = segments
        .iter()
        .position(|s| s.eq_ignore_ascii_case(ENTITY_SEGMENT))
        .and_then(|i| segments.get(i + 1));

    match entity {
        Some(slug) => EntityLocator::Resolved(format!("{prefix}/{ENTITY_SEGMENT}/{slug}/")),
        None if segments.is_empty() => EntityLocator::Unresolved(join!(&prefix, "/")),
        None => EntityLocator::Unresolved(format!("{prefix}/{}/", segments.join("/"))),
    }
}

/// Absolute URL text for `s`, or `None` when it does not look like a link at all.
fn with_scheme(s: &str) -> Option<String> {
    if s.contains("://") {
        return Some(s!(s));
    }
    if let Some(rest) = s.strip_prefix("//") {
        return Some(join!("https://", rest));
    }
    if s.starts_with('/') {
        return Some(join!(BASE_URL, s));
    }
    // bare host: "www.247sports.com/player/..."
    let first = s.split('/').next().unwrap_or("");
    let hostlike = first.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    if first.contains('.') && hostlike {
        return Some(join!("https://", s));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const CANON: &str = "https://247sports.com/player/jalen-example-12345/";

    #[test]
    fn spellings_collapse_to_one_locator() {
        for raw in [
            "https://247sports.com/player/jalen-example-12345/",
            "http://www.247sports.com/player/jalen-example-12345",
            "https://www.247sports.com/player/jalen-example-12345/?ref=list#top",
            "https://247sports.com/Player/jalen-example-12345/high-school-98765/",
            "//247sports.com/player/jalen-example-12345/TimelineEvents/",
            "/player/jalen-example-12345/",
            "  www.247sports.com/player/jalen-example-12345  ",
        ] {
            assert_eq!(normalize(raw), EntityLocator::Resolved(s!(CANON)), "{raw}");
        }
    }

    #[test]
    fn entity_id_from_slug() {
        assert_eq!(normalize(CANON).entity_id(), Some(s!("12345")));
        assert_eq!(normalize("https://247sports.com/player/no-id/").entity_id(), None);
    }

    #[test]
    fn non_entity_references_stay_unresolved() {
        let l = normalize("https://www.247sports.com/college/alabama/?x=1");
        assert_eq!(l, EntityLocator::Unresolved(s!("https://247sports.com/college/alabama/")));
        assert!(!l.is_resolved());
        assert_eq!(l.entity_id(), None);

        assert_eq!(normalize("not a link"), EntityLocator::Unresolved(s!("not a link")));
        assert_eq!(normalize("   "), EntityLocator::Unresolved(s!()));
        assert_eq!(normalize("mailto:x@y.z"), EntityLocator::Unresolved(s!("mailto:x@y.z")));
    }

    #[test]
    fn repeated_www_labels_collapse_in_one_pass() {
        let l = normalize("https://www.www.247sports.com/player/a-1/");
        assert_eq!(l, EntityLocator::Resolved(s!("https://247sports.com/player/a-1/")));
        assert_eq!(normalize(l.as_str()), l);
    }

    #[test]
    fn host_made_only_of_www_stays_unresolved() {
        let l = normalize("http://www./player/x-1/");
        assert_eq!(l, EntityLocator::Unresolved(s!("http://www./player/x-1/")));
        assert_eq!(normalize(l.as_str()), l);
        assert!(!normalize("www.www./player/x-1/").is_resolved());
    }

    #[test]
    fn normalizing_twice_is_a_no_op_for_odd_inputs() {
        for raw in ["", "?", "#a", "a.b", "x y.z", "https://", "ftp://h/p", "https://h:8080/player/", "/", "//"] {
            let once = normalize(raw);
            assert_eq!(normalize(once.as_str()), once, "{raw:?}");
        }
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(
            raw in r"(https?://)?(www\.){0,3}[a-z0-9-]{0,8}(\.[a-z0-9-]{1,8}){0,2}(:[0-9]{1,5})?(/(P|p)layer)?(/[a-zA-Z0-9._-]{0,8}){0,3}/?(\?[a-z=&]{0,8})?(#[a-z]{0,4})?"
        ) {
            let once = normalize(&raw);
            prop_assert_eq!(normalize(once.as_str()), once);
        }

        #[test]
        fn canonical_host_spellings_resolve(
            raw in r"(https?://)?(www\.){0,3}247sports\.com/(P|p)layer/[a-z]{1,8}-[0-9]{1,6}(/[a-z-]{1,10}-[0-9]{1,5})?/?(\?[a-z=&]{0,8})?(#[a-z]{0,4})?"
        ) {
            let once = normalize(&raw);
            prop_assert!(once.is_resolved());
            prop_assert!(once.as_str().starts_with("https://247sports.com/player/"));
            prop_assert_eq!(normalize(once.as_str()), once);
        }

        #[test]
        fn normalize_is_idempotent_on_paths(raw in r"/?[a-zA-Z0-9._-]{0,6}(/[a-zA-Z0-9._-]{0,6}){0,3}/?") {
            let once = normalize(&raw);
            prop_assert_eq!(normalize(once.as_str()), once);
        }
    }
}
