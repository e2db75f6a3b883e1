//! TOML configuration.
//!
//! Every section is optional; a missing config file at the default path
//! falls back to [`Config::default`]. An explicitly named file that can't
//! be read is an error.
//!
//! ```toml
//! [archive]
//! path = "data.json"
//!
//! [fetch]
//! base_url = "https://www.reddit.com"
//! user_agent = "redem/0.1.0"
//! page_size = 100
//! timeout_secs = 30
//!
//! [cache]
//! enabled = true
//! dir = ".redem-cache"
//! expire_secs = 3600
//!
//! [canonical]
//! host_aliases = "config/host_aliases.txt"
//! https_hosts = "config/https_hosts.txt"
//! platform_host = "www.reddit.com"
//! relative_prefixes = ["/r/", "/u/", "/user/"]
//!
//! [extract]
//! mode = "markup"
//! workers = 4
//!
//! [report]
//! media_url = "static/"
//! title = "redem_summary"
//! ```

use anyhow::{Context, Result};
use redem_core::ExtractionMode;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub canonical: CanonicalConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ArchiveConfig {
    #[serde(default = "default_archive_path")]
    pub path: PathBuf,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            path: default_archive_path(),
        }
    }
}

fn default_archive_path() -> PathBuf {
    PathBuf::from("data.json")
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            page_size: default_page_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://www.reddit.com".to_string()
}
fn default_user_agent() -> String {
    format!("redem/{}", env!("CARGO_PKG_VERSION"))
}
fn default_page_size() -> usize {
    100
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_expire_secs")]
    pub expire_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: default_cache_dir(),
            expire_secs: default_expire_secs(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_cache_dir() -> PathBuf {
    PathBuf::from(".redem-cache")
}
fn default_expire_secs() -> u64 {
    3600
}

#[derive(Debug, Deserialize, Clone)]
pub struct CanonicalConfig {
    #[serde(default = "default_host_aliases")]
    pub host_aliases: PathBuf,
    #[serde(default = "default_https_hosts")]
    pub https_hosts: PathBuf,
    #[serde(default = "default_platform_host")]
    pub platform_host: String,
    #[serde(default = "default_relative_prefixes")]
    pub relative_prefixes: Vec<String>,
}

impl Default for CanonicalConfig {
    fn default() -> Self {
        Self {
            host_aliases: default_host_aliases(),
            https_hosts: default_https_hosts(),
            platform_host: default_platform_host(),
            relative_prefixes: default_relative_prefixes(),
        }
    }
}

fn default_host_aliases() -> PathBuf {
    PathBuf::from("config/host_aliases.txt")
}
fn default_https_hosts() -> PathBuf {
    PathBuf::from("config/https_hosts.txt")
}
fn default_platform_host() -> String {
    "www.reddit.com".to_string()
}
fn default_relative_prefixes() -> Vec<String> {
    vec!["/r/".to_string(), "/u/".to_string(), "/user/".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractConfig {
    #[serde(default)]
    pub mode: ExtractionMode,
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            mode: ExtractionMode::default(),
            workers: default_workers(),
        }
    }
}

fn default_workers() -> usize {
    4
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReportConfig {
    #[serde(default = "default_media_url")]
    pub media_url: String,
    #[serde(default = "default_title")]
    pub title: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            media_url: default_media_url(),
            title: default_title(),
        }
    }
}

fn default_media_url() -> String {
    "static/".to_string()
}
fn default_title() -> String {
    "redem_summary".to_string()
}

/// Load and validate a config file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Load `path` if it exists; otherwise use defaults when `required` is false.
pub fn load_or_default(path: &Path, required: bool) -> Result<Config> {
    if !required && !path.exists() {
        tracing::debug!("No config at {}; using defaults", path.display());
        return Ok(Config::default());
    }
    load_config(path)
}

fn validate(config: &Config) -> Result<()> {
    if !(1..=100).contains(&config.fetch.page_size) {
        anyhow::bail!("fetch.page_size must be in [1, 100]");
    }

    if config.fetch.timeout_secs == 0 {
        anyhow::bail!("fetch.timeout_secs must be > 0");
    }

    if config.extract.workers < 1 {
        anyhow::bail!("extract.workers must be >= 1");
    }

    if config.canonical.platform_host.trim().is_empty() {
        anyhow::bail!("canonical.platform_host must not be empty");
    }

    let base_url = &config.fetch.base_url;
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        anyhow::bail!(
            "fetch.base_url must be an http(s) URL, got '{}'",
            config.fetch.base_url
        );
    }

    Ok(())
}
