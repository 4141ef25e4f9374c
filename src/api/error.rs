//! HTTP collaborator error types

use thiserror::Error;

/// Backend error with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Network, message)
    }

    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Status(status), message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Decode, message)
    }

    /// Status code of a non-2xx response, if that is what failed
    #[allow(dead_code)] // API completeness
    pub fn http_status(&self) -> Option<u16> {
        match self.kind {
            ApiErrorKind::Status(code) => Some(code),
            _ => None,
        }
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// Connection failures and timeouts
    Network,
    /// Server answered with a non-2xx status
    Status(u16),
    /// Response body was not the expected JSON shape
    Decode,
}

impl ApiErrorKind {
    /// Timeouts may hide a request the server did process
    pub fn may_have_been_applied(&self) -> bool {
        matches!(self, Self::Network)
    }
}
