//! URI canonicalization.
//!
//! Maps equivalent spellings of a link to one canonical string so that
//! reference counting groups them together. The rewrite is driven by two
//! read-only tables loaded once at startup ([`HostTables`]) plus a handful
//! of built-in host families:
//!
//! - host aliases (`youtu.be` → `www.youtube.com`), applied until a fixed
//!   point is reached;
//! - `rtfd.org` and `*.rtfd.org` → `readthedocs.org` equivalents;
//! - legacy `<user>.github.com` pages → `<user>.github.io`;
//! - `http` → `https` for hosts known to serve TLS.
//!
//! Site-relative platform paths (`/r/...`, `/u/...`) are resolved against the
//! platform host. Anything that doesn't parse as a URL is returned unchanged.

use std::collections::{HashMap, HashSet};

use indexmap::IndexSet;
use url::{ParseError, Url};

/// Subdomains of `github.com` that are services, not user pages.
const GITHUB_RESERVED: &[&str] = &[
    "www",
    "api",
    "gist",
    "raw",
    "help",
    "status",
    "developer",
    "enterprise",
    "guides",
    "codeload",
    "uploads",
    "pages",
    "education",
    "docs",
    "objects",
    "support",
    "training",
    "lab",
    "classroom",
    "services",
    "community",
];

/// Host alias and TLS-host tables.
#[derive(Debug, Clone, Default)]
pub struct HostTables {
    pub aliases: HashMap<String, String>,
    pub https_hosts: HashSet<String>,
}

impl HostTables {
    pub fn new(aliases: HashMap<String, String>, https_hosts: HashSet<String>) -> Self {
        Self {
            aliases: aliases
                .into_iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v.to_ascii_lowercase()))
                .collect(),
            https_hosts: https_hosts
                .into_iter()
                .map(|h| h.to_ascii_lowercase())
                .collect(),
        }
    }

    /// Build tables from the text of an alias file and an https-host file.
    pub fn from_text(aliases: &str, https_hosts: &str) -> Self {
        Self {
            aliases: parse_aliases(aliases),
            https_hosts: parse_https_hosts(https_hosts),
        }
    }
}

/// Parse `from to` pairs, one per line. Blank lines and `#` comments are
/// ignored, as are lines without exactly two fields.
pub fn parse_aliases(text: &str) -> HashMap<String, String> {
    let mut aliases = HashMap::new();
    for line in significant_lines(text) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields.as_slice() {
            [from, to] => {
                aliases.insert(from.to_ascii_lowercase(), to.to_ascii_lowercase());
            }
            _ => tracing::warn!("Ignoring malformed host alias line: {:?}", line),
        }
    }
    aliases
}

/// Parse one host per line. Blank lines and `#` comments are ignored.
pub fn parse_https_hosts(text: &str) -> HashSet<String> {
    significant_lines(text)
        .filter_map(|line| line.split_whitespace().next())
        .map(|host| host.to_ascii_lowercase())
        .collect()
}

fn significant_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|line| !line.is_empty())
}

/// Rewrites URIs into their canonical spelling.
#[derive(Debug, Clone)]
pub struct Canonicalizer {
    tables: HostTables,
    platform_base: Option<Url>,
    relative_prefixes: Vec<String>,
}

impl Canonicalizer {
    pub fn new(tables: HostTables, platform_host: &str, relative_prefixes: Vec<String>) -> Self {
        let platform_base = Url::parse(&format!("http://{}", platform_host)).ok();
        if platform_base.is_none() {
            tracing::warn!(
                "Platform host {:?} is not a valid host; relative links stay unresolved",
                platform_host
            );
        }
        Self {
            tables,
            platform_base,
            relative_prefixes,
        }
    }

    /// Canonicalizer with the given tables and reddit defaults.
    pub fn with_tables(tables: HostTables) -> Self {
        Self::new(
            tables,
            "www.reddit.com",
            vec!["/r/".into(), "/u/".into(), "/user/".into()],
        )
    }

    pub fn tables(&self) -> &HostTables {
        &self.tables
    }

    /// Return the canonical form of `raw`.
    ///
    /// Total and idempotent: `canonicalize(canonicalize(x)) == canonicalize(x)`.
    pub fn canonicalize(&self, raw: &str) -> String {
        let mut url = match Url::parse(raw) {
            Ok(url) => url,
            Err(ParseError::RelativeUrlWithoutBase) => match self.resolve_relative(raw) {
                Some(url) => url,
                None => return raw.to_string(),
            },
            Err(_) => return raw.to_string(),
        };

        if url.cannot_be_a_base() {
            return url.to_string();
        }

        if let Some(host) = url.host_str().map(str::to_owned) {
            let host = self.rewrite_host(&host);
            let _ = url.set_host(Some(&host));
        }

        if url.scheme() == "http" {
            if let Some(host) = url.host_str() {
                if self.serves_https(host) {
                    let _ = url.set_scheme("https");
                }
            }
        }

        url.to_string()
    }

    fn resolve_relative(&self, raw: &str) -> Option<Url> {
        let base = self.platform_base.as_ref()?;
        let lowered = raw.to_ascii_lowercase();
        if !self
            .relative_prefixes
            .iter()
            .any(|prefix| lowered.starts_with(&prefix.to_ascii_lowercase()))
        {
            return None;
        }
        base.join(raw).ok()
    }

    /// Apply aliases and family rewrites until nothing changes.
    ///
    /// A chain that runs into a cycle settles on the cycle's smallest host,
    /// so every member of the cycle maps to the same result.
    fn rewrite_host(&self, host: &str) -> String {
        let mut visited = IndexSet::new();
        let mut current = host.to_ascii_lowercase();
        loop {
            let next = match self.tables.aliases.get(&current) {
                Some(alias) => alias.clone(),
                None => rewrite_host_family(&current),
            };
            if next == current {
                return current;
            }
            visited.insert(current);
            if let Some(cycle_start) = visited.get_index_of(&next) {
                tracing::debug!("Host alias cycle reached from {:?}", host);
                return visited
                    .iter()
                    .skip(cycle_start)
                    .min()
                    .cloned()
                    .unwrap_or(next);
            }
            current = next;
        }
    }

    fn serves_https(&self, host: &str) -> bool {
        self.tables.https_hosts.contains(host)
            || host.ends_with(".readthedocs.org")
            || host.ends_with(".readthedocs.io")
    }
}

fn rewrite_host_family(host: &str) -> String {
    if host == "rtfd.org" {
        return "readthedocs.org".to_string();
    }
    if let Some(project) = host.strip_suffix(".rtfd.org") {
        return format!("{}.readthedocs.org", project);
    }
    if let Some(user) = host.strip_suffix(".github.com") {
        if !user.is_empty() && !user.contains('.') && !GITHUB_RESERVED.contains(&user) {
            return format!("{}.github.io", user);
        }
    }
    host.to_string()
}
