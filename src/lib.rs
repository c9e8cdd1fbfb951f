//! BankBoss: daily trading discipline.
//!
//! Sizes each entry from the bankroll and a risk profile, stops the session
//! at a stop-win or stop-loss, then locks the account for 24 hours and
//! records the closing bankroll.

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod lockout;
pub mod logging;
pub mod plan;
pub mod profile;
pub mod quotes;
pub mod runtime;
pub mod store;
pub mod trade;

pub use error::{Error, Result, ValidationError};
