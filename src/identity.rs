//! Player identity resolution
//!
//! The player identifier travels in the page URL's `player` query parameter
//! so reloads land on the same conversation. Identifiers are international
//! phone numbers: digits only, 8 to 15 of them, no leading zero.

use crate::error::IdentityError;
use rand::rngs::OsRng;
use rand::RngCore;
use regex::Regex;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use std::time::{SystemTime, UNIX_EPOCH};

/// Query parameter carrying the player identifier
pub const PLAYER_QUERY_PARAM: &str = "player";

/// Identifier returned when neither random source yields a valid candidate
pub const SENTINEL_PLAYER: &str = "5511999999999";

const COUNTRY_CODE: &str = "55";
const MAX_DIGITS: usize = 15;

static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[1-9]\d{7,14}$").expect("phone pattern is valid"));

/// Validated player identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlayerId(String);

impl PlayerId {
    /// Normalise and validate a raw identifier.
    ///
    /// Surrounding whitespace and every non-digit character are dropped
    /// before validation, so `+55 (12) 99197-4241` becomes `5512991974241`.
    pub fn parse(raw: &str) -> Result<Self, IdentityError> {
        let digits: String = raw.trim().chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() {
            return Err(IdentityError::Empty);
        }
        if PHONE_PATTERN.is_match(&digits) {
            Ok(Self(digits))
        } else {
            Err(IdentityError::InvalidFormat(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for PlayerId {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PlayerId> for String {
    fn from(value: PlayerId) -> Self {
        value.0
    }
}

/// Read the player identifier from the page URL.
///
/// Missing or invalid values yield `None`; this never fails.
pub fn resolve(page: &Url) -> Option<PlayerId> {
    page.query_pairs()
        .find(|(key, _)| key == PLAYER_QUERY_PARAM)
        .and_then(|(_, value)| PlayerId::parse(&value).ok())
}

/// Generate a fresh identifier from the OS random source, falling back to
/// the wall clock when the OS source is unavailable.
pub fn generate() -> PlayerId {
    let mut bytes = [0u8; 8];
    let strong = OsRng.try_fill_bytes(&mut bytes).ok().map(|()| {
        [
            u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        ]
    });
    if strong.is_none() {
        tracing::warn!("OS random source unavailable, generating player id from clock");
    }
    let now_millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    generate_from(strong, now_millis)
}

/// Deterministic core of [`generate`]: every path returns an identifier that
/// passes [`PlayerId::parse`].
pub fn generate_from(strong: Option<[u32; 2]>, now_millis: u128) -> PlayerId {
    if let Some([local, suffix]) = strong {
        let candidate = format!(
            "{COUNTRY_CODE}{:010}{:02}",
            u64::from(local) % 10_000_000_000,
            suffix % 100
        );
        if let Ok(id) = PlayerId::parse(&truncate_digits(&candidate)) {
            return id;
        }
    }

    let clock = now_millis.to_string();
    let tail: String = clock.chars().skip(clock.len().saturating_sub(10)).collect();
    let fallback = truncate_digits(&format!("{COUNTRY_CODE}{tail}"));
    PlayerId::parse(&fallback).unwrap_or_else(|_| PlayerId(SENTINEL_PLAYER.to_string()))
}

fn truncate_digits(candidate: &str) -> String {
    candidate.chars().take(MAX_DIGITS).collect()
}

/// Write the identifier into the page URL in place.
///
/// The first `player` parameter keeps its position and takes the new
/// value; later duplicates are dropped. Without one, it is appended.
pub fn persist(player: &PlayerId, page: &mut Url) {
    let mut replaced = false;
    let pairs: Vec<(String, String)> = page
        .query_pairs()
        .filter_map(|(key, value)| {
            if key != PLAYER_QUERY_PARAM {
                return Some((key.into_owned(), value.into_owned()));
            }
            if replaced {
                return None;
            }
            replaced = true;
            Some((key.into_owned(), player.as_str().to_string()))
        })
        .collect();

    let mut query = page.query_pairs_mut();
    query.clear();
    for (key, value) in &pairs {
        query.append_pair(key, value);
    }
    if !replaced {
        query.append_pair(PLAYER_QUERY_PARAM, player.as_str());
    }
}
