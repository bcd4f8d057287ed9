//! Crate-wide error type.
//!
//! Error kinds mirror the taxonomy laid out for the engine: structural
//! failures (store I/O, a misbehaving reviewer, a malformed rule file) are
//! returned to the caller; recoverable-locally conditions (one bad corpus
//! line, one token with no inference expansion) are logged and skipped in
//! place rather than surfaced as an `Err`.

use thiserror::Error;

/// Standard result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, KorelError>;

#[derive(Debug, Error)]
pub enum KorelError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("duplicate: {0}")]
    Duplicate(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl KorelError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        KorelError::NotFound(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        KorelError::InvalidInput(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        KorelError::InvalidConfig(msg.into())
    }
}
