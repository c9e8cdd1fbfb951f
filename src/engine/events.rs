//! Inputs to and outputs from the session reducer.

use crate::logging::{Domain, Level};
use crate::profile::RiskProfile;
use crate::store::{RecordPatch, UserRecord};
use crate::trade::Outcome;

/// Epoch milliseconds.
pub type Timestamp = i64;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// External auth signalled a user. `record` is `None` for a new account.
    SignedIn {
        user_id: String,
        email: String,
        record: Option<UserRecord>,
        now: Timestamp,
    },
    SignedOut,
    SelectProfile(RiskProfile),
    /// Planning -> profile selection.
    Back,
    StartSession {
        bankroll: f64,
        payout_percent: f64,
        now: Timestamp,
    },
    Trade(Outcome),
    /// User acknowledged the outcome screen.
    EndSession { now: Timestamp },
    /// The end-of-session write finished, successfully or not.
    PersistSettled { error: Option<String> },
    Unlock { now: Timestamp },
    ViewGrowth,
    /// Growth view -> profile selection.
    BackToStart,
    SetWithdrawalGoal(String),
}

impl Event {
    pub fn timestamp(&self) -> Option<Timestamp> {
        match self {
            Event::SignedIn { now, .. }
            | Event::StartSession { now, .. }
            | Event::EndSession { now }
            | Event::Unlock { now } => Some(*now),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Event::SignedIn { .. } => "signed_in",
            Event::SignedOut => "signed_out",
            Event::SelectProfile(_) => "select_profile",
            Event::Back => "back",
            Event::StartSession { .. } => "start_session",
            Event::Trade(Outcome::Win) => "trade_win",
            Event::Trade(Outcome::Loss) => "trade_loss",
            Event::EndSession { .. } => "end_session",
            Event::PersistSettled { .. } => "persist_settled",
            Event::Unlock { .. } => "unlock",
            Event::ViewGrowth => "view_growth",
            Event::BackToStart => "back_to_start",
            Event::SetWithdrawalGoal(_) => "set_withdrawal_goal",
        }
    }
}

/// Side effects requested by the reducer, executed by the runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// First sign-in: write the default record.
    CreateRecord { record: UserRecord },
    /// End-of-session write. Answered with [`Event::PersistSettled`].
    PersistSession { patch: RecordPatch },
    PersistGoal { goal: f64 },
    ArmTimer { until: Timestamp },
    CancelTimer,
    Log { level: Level, domain: Domain, msg: String },
}
