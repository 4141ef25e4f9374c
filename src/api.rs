//! HTTP collaborator for the chat backend
//!
//! Endpoints consumed: `POST /api/session`, `GET /api/messages`,
//! `POST /api/messages`.

mod client;
mod error;
pub mod types;

pub use client::HttpChatBackend;
pub use error::{ApiError, ApiErrorKind};
pub use types::*;
