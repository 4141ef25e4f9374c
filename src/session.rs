//! Session cache
//!
//! One storage slot holds the session of whichever player used the page
//! last. A cached token is trusted only for the same player and only until
//! its server-issued expiry; anything else evicts the slot.

mod storage;

pub use storage::{FileSlotStorage, MemorySlotStorage, SlotStorage};

use crate::error::SessionError;
use crate::identity::PlayerId;
use crate::message::parse_timestamp;
use crate::runtime::ChatBackend;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed name of the session storage slot
pub const SESSION_SLOT_KEY: &str = "valezap-session";

/// Credential pairing a player to a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub player: PlayerId,
    pub session_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Slot contents as read back, before validation
#[derive(Debug, Deserialize)]
struct CachedSession {
    #[serde(default)]
    player: Option<String>,
    #[serde(default)]
    session_token: Option<String>,
    #[serde(default)]
    expires_at: Option<String>,
}

/// Why a cached session was not trusted
#[derive(Debug, Error)]
enum CacheReject {
    #[error("slot is empty")]
    Empty,
    #[error("slot unreadable: {0}")]
    Unreadable(String),
    #[error("cached session belongs to another player")]
    PlayerMismatch,
    #[error("cached session has no token")]
    MissingToken,
    #[error("cached session has no valid expiry")]
    InvalidExpiry,
    #[error("cached session expired at {0}")]
    Expired(DateTime<Utc>),
}

/// Owner of the session storage slot
pub struct SessionStore<S> {
    storage: S,
}

impl<S: SlotStorage> SessionStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    #[allow(dead_code)] // Inspected by tests
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Cached session for `player`, if it is still trustworthy
    pub fn load(&self, player: &PlayerId) -> Option<Session> {
        self.load_at(player, Utc::now())
    }

    pub fn load_at(&self, player: &PlayerId, now: DateTime<Utc>) -> Option<Session> {
        match self.read_cached(player, now) {
            Ok(session) => Some(session),
            Err(CacheReject::Empty) => None,
            Err(reason) => {
                tracing::info!(player = %player, reason = %reason, "Evicting cached session");
                self.evict();
                None
            }
        }
    }

    fn read_cached(&self, player: &PlayerId, now: DateTime<Utc>) -> Result<Session, CacheReject> {
        let raw = self
            .storage
            .get(SESSION_SLOT_KEY)
            .map_err(|e| CacheReject::Unreadable(e.to_string()))?
            .ok_or(CacheReject::Empty)?;
        let cached: CachedSession =
            serde_json::from_str(&raw).map_err(|e| CacheReject::Unreadable(e.to_string()))?;

        let cached_player = cached
            .player
            .as_deref()
            .and_then(|p| PlayerId::parse(p).ok())
            .ok_or(CacheReject::PlayerMismatch)?;
        if &cached_player != player {
            return Err(CacheReject::PlayerMismatch);
        }

        let session_token = cached
            .session_token
            .filter(|t| !t.is_empty())
            .ok_or(CacheReject::MissingToken)?;
        let expires_at = cached
            .expires_at
            .as_deref()
            .and_then(parse_timestamp)
            .ok_or(CacheReject::InvalidExpiry)?;

        let session = Session {
            player: cached_player,
            session_token,
            expires_at,
        };
        if session.is_fresh_at(now) {
            Ok(session)
        } else {
            Err(CacheReject::Expired(expires_at))
        }
    }

    /// Write `session` into the slot, replacing whatever was cached
    pub fn save(&self, session: &Session) {
        let stored = serde_json::to_string(session)
            .map_err(|e| e.to_string())
            .and_then(|json| {
                self.storage
                    .set(SESSION_SLOT_KEY, &json)
                    .map_err(|e| e.to_string())
            });
        if let Err(e) = stored {
            tracing::warn!(error = %e, "Failed to cache session");
        }
    }

    pub fn evict(&self) {
        if let Err(e) = self.storage.remove(SESSION_SLOT_KEY) {
            tracing::warn!(error = %e, "Failed to evict cached session");
        }
    }

    /// Cached session for `player`, or a freshly issued one
    pub async fn ensure<B>(&self, backend: &B, player: &PlayerId) -> Result<Session, SessionError>
    where
        B: ChatBackend + ?Sized,
    {
        if let Some(session) = self.load(player) {
            tracing::debug!(player = %player, "Reusing cached session");
            return Ok(session);
        }

        let grant = backend.create_session(player).await?;

        // The backend normalises the identifier; keep ours if its echo is unusable.
        let issued_player = grant
            .player
            .as_deref()
            .and_then(|p| PlayerId::parse(p).ok())
            .unwrap_or_else(|| player.clone());
        let session_token = grant
            .session_token
            .filter(|t| !t.is_empty())
            .ok_or(SessionError::MissingToken)?;
        let raw_expiry = grant.expires_at.unwrap_or_default();
        let expires_at =
            parse_timestamp(&raw_expiry).ok_or(SessionError::MalformedExpiry(raw_expiry))?;

        let session = Session {
            player: issued_player,
            session_token,
            expires_at,
        };
        tracing::info!(
            player = %session.player,
            expires_at = %session.expires_at,
            "Session issued"
        );
        self.save(&session);
        Ok(session)
    }
}
