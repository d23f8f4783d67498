//! Session configuration and the domain allow-list

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use http::HeaderValue;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Landing page of the video platform. Also sent as the `referer` of rewritten requests.
pub const DEFAULT_ROOT_URL: &str = "https://www.bilibili.com/";

/// User agent sent with rewritten requests, identifying a desktop Chrome build.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

const DEFAULT_DOMAINS: [&str; 3] = ["bilibili.com", "bilivideo.cn", "bilivideo.com"];

const DEFAULT_NAVIGATION_TIMEOUT_SECS: u64 = 10;

/// Upper bound accepted for `navigationTimeoutSecs`
pub const MAX_NAVIGATION_TIMEOUT_SECS: u64 = 3600;

/// Errors raised while loading a [`SessionConfig`]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid JSON for this schema
    #[error(transparent)]
    Serde(#[from] serde_json::Error),

    /// The root URL is not an absolute http(s) URL
    #[error("Invalid root URL '{0}'")]
    InvalidUrl(String),

    /// The allow-list has no usable patterns
    #[error("At least one allowed domain is required")]
    NoAllowedDomains,

    /// A value injected as a request header contains characters headers cannot carry
    #[error("{0} cannot be sent as an HTTP header value")]
    InvalidHeaderValue(&'static str),

    /// The navigation timeout is zero or above [`MAX_NAVIGATION_TIMEOUT_SECS`]
    #[error(
        "Navigation timeout must be between 1 and {max} seconds, got {0}",
        max = MAX_NAVIGATION_TIMEOUT_SECS
    )]
    InvalidTimeout(u64),
}

/// Configuration for acquisition and request rewriting
///
/// Every field has a default targeting the video platform, so an empty JSON object is a valid
/// configuration.
///
/// ```
/// # use nbm_session::SessionConfig;
/// let config: SessionConfig = serde_json::from_str(r#"{ "navigationTimeoutSecs": 5 }"#).unwrap();
/// assert_eq!(config.root_url, "https://www.bilibili.com/");
/// assert!(config.allowed_domains.matches("upos-sz-mirrorcos.bilivideo.com"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct SessionConfig {
    /// Page the browser visits to obtain cookies; also used as the injected referer
    pub root_url: String,
    /// Hosts whose requests are rewritten
    pub allowed_domains: DomainAllowList,
    /// Injected user agent
    pub user_agent: String,
    /// Upper bound on waiting for the landing page to settle
    pub navigation_timeout_secs: u64,
    /// Explicit browser executable. When unset the engine is auto-detected.
    pub browser_path: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            root_url: DEFAULT_ROOT_URL.to_owned(),
            allowed_domains: DomainAllowList::default(),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            navigation_timeout_secs: DEFAULT_NAVIGATION_TIMEOUT_SECS,
            browser_path: None,
        }
    }
}

impl SessionConfig {
    /// Reads and validates a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every value that is later sent over the wire or used as a bound
    ///
    /// The root URL must be absolute http(s), the root URL and user agent must be valid header
    /// values, the allow-list must not be empty and the navigation timeout must be in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url =
            Url::parse(&self.root_url).map_err(|_| ConfigError::InvalidUrl(self.root_url.clone()))?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(ConfigError::InvalidUrl(self.root_url.clone()));
        }

        // The URL parser strips tabs and newlines, so the raw string is checked separately.
        if HeaderValue::from_str(&self.root_url).is_err() {
            return Err(ConfigError::InvalidHeaderValue("rootUrl"));
        }
        if HeaderValue::from_str(&self.user_agent).is_err() {
            return Err(ConfigError::InvalidHeaderValue("userAgent"));
        }

        if self.allowed_domains.is_empty() {
            return Err(ConfigError::NoAllowedDomains);
        }

        if !(1..=MAX_NAVIGATION_TIMEOUT_SECS).contains(&self.navigation_timeout_secs) {
            return Err(ConfigError::InvalidTimeout(self.navigation_timeout_secs));
        }

        Ok(())
    }

    /// Navigation timeout as a [`Duration`]
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }
}

/// Host-name suffixes identifying the platform's web and media hosts
///
/// A host matches a pattern when it equals the pattern or ends with `.` followed by the pattern,
/// so `video.example.com` matches `example.com` while `notexample.com` does not. Patterns are
/// compared case-insensitively and a leading `.` is ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct DomainAllowList {
    patterns: Vec<String>,
}

impl DomainAllowList {
    /// Creates an allow-list from host suffix patterns
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|pattern| {
                let pattern = pattern.as_ref().trim();
                pattern
                    .strip_prefix('.')
                    .unwrap_or(pattern)
                    .to_ascii_lowercase()
            })
            .filter(|pattern| !pattern.is_empty())
            .collect();

        Self { patterns }
    }

    /// Returns true when `host` belongs to one of the configured domains
    pub fn matches(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_ascii_lowercase();

        self.patterns.iter().any(|pattern| {
            host.strip_suffix(pattern.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.ends_with('.'))
        })
    }

    /// The normalized patterns
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Returns true when no pattern is configured
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl Default for DomainAllowList {
    fn default() -> Self {
        Self::new(DEFAULT_DOMAINS)
    }
}

impl From<Vec<String>> for DomainAllowList {
    fn from(patterns: Vec<String>) -> Self {
        Self::new(patterns)
    }
}

impl From<DomainAllowList> for Vec<String> {
    fn from(list: DomainAllowList) -> Self {
        list.patterns
    }
}
