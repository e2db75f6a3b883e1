//! Candidate URI extraction from record bodies.
//!
//! Two interchangeable strategies implement [`UriExtractionStrategy`]:
//!
//! - [`MarkupAnchorStrategy`] parses the body as HTML and yields the `href`
//!   of every `<a>` element in document order. Anchors without an `href`
//!   attribute are skipped; present values, including the empty string,
//!   are yielded verbatim.
//! - [`PatternStrategy`] scans plain text with an RFC 3987 IRI grammar and
//!   yields every match that passes a filter predicate. Rejected matches are
//!   logged at debug level and dropped.
//!
//! Neither strategy deduplicates, and neither fails: empty or unparsable
//! input simply yields nothing.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use scraper::{Html, Selector};
use serde::Deserialize;

use crate::models::BodyFormat;

/// A pluggable way of finding candidate URIs in a record body.
pub trait UriExtractionStrategy: Send + Sync {
    /// Short identifier used in logs and configuration.
    fn name(&self) -> &'static str;

    /// Which body representation this strategy reads.
    fn body_format(&self) -> BodyFormat;

    /// Yield candidate URIs in source order.
    ///
    /// Calling this again with the same input restarts the sequence.
    fn extract<'a>(&'a self, text: &'a str) -> Box<dyn Iterator<Item = String> + 'a>;
}

/// Strategy selector as written in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    #[default]
    Markup,
    Pattern,
}

impl ExtractionMode {
    /// Build the strategy for this mode with its default settings.
    pub fn strategy(&self) -> Box<dyn UriExtractionStrategy> {
        match self {
            ExtractionMode::Markup => Box::new(MarkupAnchorStrategy),
            ExtractionMode::Pattern => Box::new(PatternStrategy::default()),
        }
    }
}

impl fmt::Display for ExtractionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionMode::Markup => write!(f, "markup"),
            ExtractionMode::Pattern => write!(f, "pattern"),
        }
    }
}

impl FromStr for ExtractionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "markup" => Ok(ExtractionMode::Markup),
            "pattern" => Ok(ExtractionMode::Pattern),
            other => Err(format!(
                "unknown extraction mode '{}'. Must be markup or pattern.",
                other
            )),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Markup-anchor strategy
// ═══════════════════════════════════════════════════════════════════════

/// Yields anchor `href` values from an HTML fragment.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkupAnchorStrategy;

impl UriExtractionStrategy for MarkupAnchorStrategy {
    fn name(&self) -> &'static str {
        "markup"
    }

    fn body_format(&self) -> BodyFormat {
        BodyFormat::Html
    }

    fn extract<'a>(&'a self, text: &'a str) -> Box<dyn Iterator<Item = String> + 'a> {
        Box::new(anchor_hrefs(text).into_iter())
    }
}

/// Collect `href` values of `<a>` elements in document order.
///
/// The parsed DOM isn't kept around, so the hrefs are gathered eagerly and
/// the returned vector is what callers iterate.
pub fn anchor_hrefs(html: &str) -> Vec<String> {
    if html.trim().is_empty() {
        return Vec::new();
    }

    let Ok(selector) = Selector::parse("a") else {
        return Vec::new();
    };

    let fragment = Html::parse_fragment(html);
    fragment
        .select(&selector)
        .filter_map(|anchor| anchor.value().attr("href"))
        .map(str::to_owned)
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════
// Pattern strategy
// ═══════════════════════════════════════════════════════════════════════

/// Predicate deciding whether a grammar match is kept.
pub type UriFilter = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// Scans raw text for IRI-shaped substrings.
pub struct PatternStrategy {
    filter: UriFilter,
}

impl PatternStrategy {
    pub fn new(filter: UriFilter) -> Self {
        Self { filter }
    }
}

impl Default for PatternStrategy {
    fn default() -> Self {
        Self::new(Box::new(starts_with_http))
    }
}

impl fmt::Debug for PatternStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternStrategy").finish_non_exhaustive()
    }
}

impl UriExtractionStrategy for PatternStrategy {
    fn name(&self) -> &'static str {
        "pattern"
    }

    fn body_format(&self) -> BodyFormat {
        BodyFormat::Text
    }

    fn extract<'a>(&'a self, text: &'a str) -> Box<dyn Iterator<Item = String> + 'a> {
        Box::new(
            iri_pattern()
                .find_iter(text)
                .map(|m| m.as_str())
                .filter(move |candidate| {
                    let keep = (self.filter)(candidate);
                    if !keep {
                        tracing::debug!("NOT a URI: {:?}", candidate);
                    }
                    keep
                })
                .map(str::to_owned),
        )
    }
}

/// Default filter: the first four characters spell `http`, any case.
pub fn starts_with_http(candidate: &str) -> bool {
    candidate
        .get(..4)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("http"))
}

/// Compiled RFC 3987 IRI pattern (absolute IRIs with a non-empty hier-part).
///
/// ```text
/// IRI       = scheme ":" ihier-part [ "?" iquery ] [ "#" ifragment ]
/// ihier     = "//" [ iuserinfo "@" ] ihost [ ":" port ] ipath-abempty
///           / ipath-rootless / ipath-absolute
/// ```
pub fn iri_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let unreserved = r"A-Za-z0-9\-._~\x{A0}-\x{D7FF}\x{F900}-\x{FDCF}\x{FDF0}-\x{FFEF}\x{10000}-\x{EFFFD}";
        let sub_delims = r"!$&'()*+,;=";
        let pct = r"%[0-9A-Fa-f]{2}";

        let pchar = format!(r"(?:[{unreserved}{sub_delims}:@]|{pct})");
        let userinfo = format!(r"(?:(?:[{unreserved}{sub_delims}:]|{pct})*@)?");
        let host = format!(r"(?:\[[0-9A-Fa-f:.]+\]|(?:[{unreserved}{sub_delims}]|{pct})*)");
        let segments = format!(r"(?:/{pchar}*)*");
        let hier = format!(
            r"(?://{userinfo}{host}(?::[0-9]*)?{segments}|{pchar}+{segments}|/(?:{pchar}+{segments})?)"
        );
        let query = format!(r"(?:\?(?:{pchar}|[/?])*)?");
        let fragment = format!(r"(?:#(?:{pchar}|[/?])*)?");

        Regex::new(&format!(
            r"[A-Za-z][A-Za-z0-9+.\-]*:{hier}{query}{fragment}"
        ))
        .expect("IRI pattern must compile")
    })
}
