//! Configuration
//!
//! `PageConfig` is the page-level surface (the data attributes a page
//! embeds); `ChatConfig` adds the host settings read from the environment.

use reqwest::Url;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 700;
pub const DEFAULT_SESSION_TTL_SECONDS: u64 = 7200;
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5000/";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Page-level settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageConfig {
    pub max_message_length: usize,
    /// Informational only; sessions expire at the server-issued time
    pub session_ttl_seconds: u64,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            max_message_length: DEFAULT_MAX_MESSAGE_LENGTH,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
        }
    }
}

impl PageConfig {
    /// Parse page data attributes (`max-message-length`, `session-ttl`).
    ///
    /// Missing, unparsable or zero values keep their defaults.
    pub fn from_dataset<'a>(attributes: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut config = Self::default();
        for (key, value) in attributes {
            let key = key.trim_start_matches("data-");
            match key {
                "max-message-length" => {
                    if let Some(n) = parse_positive(value) {
                        config.max_message_length = n;
                    }
                }
                "session-ttl" => {
                    if let Some(n) = parse_positive(value) {
                        config.session_ttl_seconds = n;
                    }
                }
                _ => {}
            }
        }
        config
    }
}

fn parse_positive<T>(value: &str) -> Option<T>
where
    T: std::str::FromStr + Default + PartialEq,
{
    value
        .trim()
        .parse::<T>()
        .ok()
        .filter(|n| *n != T::default())
}

/// Host settings for the terminal client
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub page: PageConfig,
    pub api_url: Url,
    pub page_url: Url,
    pub state_dir: PathBuf,
    pub request_timeout: Duration,
}

impl ChatConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let page = PageConfig::from_dataset(
            [
                ("max-message-length", lookup("VALEZAP_MAX_MESSAGE_LENGTH")),
                ("session-ttl", lookup("VALEZAP_SESSION_TTL")),
            ]
            .iter()
            .filter_map(|(key, value)| value.as_deref().map(|v| (*key, v))),
        );

        let api_url = lookup("VALEZAP_API_URL")
            .and_then(|raw| parse_base_url(&raw))
            .unwrap_or_else(default_api_url);

        let page_url = lookup("VALEZAP_PAGE_URL")
            .and_then(|raw| Url::parse(&raw).ok())
            .unwrap_or_else(|| api_url.clone());

        let state_dir = lookup("VALEZAP_STATE_DIR").map_or_else(
            || {
                let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(home).join(".valezap")
            },
            PathBuf::from,
        );

        let request_timeout = Duration::from_secs(
            lookup("VALEZAP_REQUEST_TIMEOUT")
                .and_then(|raw| parse_positive(&raw))
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        );

        Self {
            page,
            api_url,
            page_url,
            state_dir,
            request_timeout,
        }
    }
}

/// Endpoints are joined onto the base, so it must end with a slash
fn parse_base_url(raw: &str) -> Option<Url> {
    let mut url = Url::parse(raw).ok()?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Some(url)
}

fn default_api_url() -> Url {
    Url::parse(DEFAULT_API_URL).expect("default API URL is valid")
}
