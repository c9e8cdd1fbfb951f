//! Error taxonomy.
//!
//! Validation errors are recovered locally by the state machine, persistence
//! errors are logged and never block a transition, configuration errors are
//! fatal at startup.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("persistence failed: {0}")]
    Persistence(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("record encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("remote store error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// True for load/save failures, which callers treat as non-fatal.
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            Error::Persistence(_) | Error::Sqlite(_) | Error::Encoding(_) | Error::Http(_)
        )
    }
}

/// Bad user input. Shown to the user; never changes state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("please enter a valid bankroll (got {0})")]
    InvalidBankroll(f64),

    #[error("please enter a valid payout between 1 and 100 (got {0})")]
    InvalidPayout(f64),

    #[error("unknown risk profile '{0}'")]
    UnknownProfile(String),

    #[error("bankroll {0} is too small to risk a single cent")]
    PlanTooSmall(f64),

    #[error("next session unlocks in {remaining}")]
    Locked { remaining: String },
}
