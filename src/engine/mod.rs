//! Session state machine with deterministic replay semantics.
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │  User input  │────►│    Events    │────►│   Reducer    │
//! │ timer, auth  │     │  (ordered)   │     │  (pure fn)   │
//! └──────────────┘     └──────────────┘     └──────────────┘
//!                                                  │
//!                                                  ▼
//!                      ┌──────────────┐     ┌──────────────┐
//!                      │   Effects    │◄────│    State     │
//!                      │ (save/timer) │     │  (digested)  │
//!                      └──────────────┘     └──────────────┘
//! ```

pub mod events;
pub mod reducer;
pub mod state;

pub use events::{Effect, Event, Timestamp};
pub use reducer::{reduce, EngineConfig, ReducerOutput};
pub use state::{ActiveSession, GrowthView, Screen, SessionState};
