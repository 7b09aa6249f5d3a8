//! Typed errors for the ingestion side of the pipeline.
//!
//! Only the failures a caller needs to tell apart get their own variant:
//! bad input ([`IngestError::Validation`]), bad credentials
//! ([`IngestError::Authentication`]), and everything that might succeed on
//! a second attempt ([`IngestError::Transient`]). Orchestration code above
//! this layer uses `anyhow`.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Debug, Error)]
pub enum IngestError {
    /// Rejected before any network call was made.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Transient error: {0}")]
    Transient(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl IngestError {
    /// Whether the failure is scoped to a single request and may be
    /// isolated to the item that triggered it.
    ///
    /// 403 and 404 count as item-scoped: a quarantined, removed, or deleted
    /// post must not sink the whole fetch. A rejected token surfaces as
    /// [`IngestError::Authentication`] instead and is never transient.
    pub fn is_transient(&self) -> bool {
        match self {
            IngestError::Transient(_) | IngestError::Parse(_) => true,
            IngestError::Api { status, .. } => matches!(*status, 403 | 404 | 429) || *status >= 500,
            IngestError::Validation(_) | IngestError::Authentication(_) => false,
        }
    }
}

impl From<reqwest::Error> for IngestError {
    fn from(err: reqwest::Error) -> Self {
        IngestError::Transient(err.to_string())
    }
}

impl From<serde_json::Error> for IngestError {
    fn from(err: serde_json::Error) -> Self {
        IngestError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_transient_failures() {
        assert!(IngestError::Transient("reset".into()).is_transient());
        assert!(IngestError::Api {
            status: 503,
            message: String::new()
        }
        .is_transient());
        assert!(IngestError::Api {
            status: 403,
            message: String::new()
        }
        .is_transient());
        assert!(!IngestError::Api {
            status: 400,
            message: String::new()
        }
        .is_transient());
        assert!(!IngestError::Validation("bad".into()).is_transient());
        assert!(!IngestError::Authentication("nope".into()).is_transient());
    }
}
