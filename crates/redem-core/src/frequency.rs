//! Site-level frequency views over indexed URIs.
//!
//! Each URI is reduced to its `(host, path, query)` key, dropping scheme and
//! fragment, so `http://a/x` and `https://a/x#top` count as the same site
//! location.

use indexmap::IndexMap;
use serde::Serialize;
use url::Url;

/// `(host, path, query)` for one URI.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SiteKey {
    pub host: String,
    pub path: String,
    pub query: String,
}

impl std::fmt::Display for SiteKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.host, self.path)?;
        if !self.query.is_empty() {
            write!(f, "?{}", self.query)?;
        }
        Ok(())
    }
}

/// Parse a URI into its site key.
///
/// Strings that aren't absolute URLs get an empty host; everything before
/// the first `?` is the path and the rest (minus any fragment) the query.
pub fn site_key(uri: &str) -> SiteKey {
    if let Ok(url) = Url::parse(uri) {
        return SiteKey {
            host: url.host_str().unwrap_or_default().to_string(),
            path: url.path().to_string(),
            query: url.query().unwrap_or_default().to_string(),
        };
    }

    let without_fragment = uri.split('#').next().unwrap_or_default();
    let (path, query) = without_fragment
        .split_once('?')
        .unwrap_or((without_fragment, ""));
    SiteKey {
        host: String::new(),
        path: path.to_string(),
        query: query.to_string(),
    }
}

/// Two rankings of the same site counts.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SiteFrequencies {
    /// Descending by count; ties keep first-seen order.
    pub by_freq: Vec<(SiteKey, usize)>,
    /// Ascending by `(host, path, query)`.
    pub by_site: Vec<(SiteKey, usize)>,
}

impl SiteFrequencies {
    pub fn is_empty(&self) -> bool {
        self.by_freq.is_empty()
    }
}

/// Count each URI once.
pub fn site_frequencies<'a, I>(uris: I) -> SiteFrequencies
where
    I: IntoIterator<Item = &'a str>,
{
    site_frequencies_weighted(uris.into_iter().map(|uri| (uri, 1)))
}

/// Count URIs with explicit weights, e.g. the `uris` pairs of an archive.
pub fn site_frequencies_weighted<'a, I>(pairs: I) -> SiteFrequencies
where
    I: IntoIterator<Item = (&'a str, usize)>,
{
    let mut counts: IndexMap<SiteKey, usize> = IndexMap::new();
    for (uri, weight) in pairs {
        *counts.entry(site_key(uri)).or_insert(0) += weight;
    }

    let mut by_freq: Vec<(SiteKey, usize)> = counts.into_iter().collect();
    let mut by_site = by_freq.clone();

    by_freq.sort_by(|a, b| b.1.cmp(&a.1));
    by_site.sort_by(|a, b| a.0.cmp(&b.0));

    SiteFrequencies { by_freq, by_site }
}
