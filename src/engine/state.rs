//! Session state with a deterministic digest for replay validation.

use serde::Serialize;

use super::events::Timestamp;
use crate::history::{progress_percent, projected_target_bankroll, recent_history, HistoryEntry, CHART_POINTS};
use crate::lockout;
use crate::plan::DailyPlan;
use crate::profile::RiskProfile;
use crate::store::RecordPatch;
use crate::trade::{SessionProgress, StopKind};

/// Plan and running totals for the session in progress.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveSession {
    pub profile: RiskProfile,
    pub plan: DailyPlan,
    pub payout_percent: f64,
    pub starting_bankroll: f64,
    pub progress: SessionProgress,
    pub wins: u32,
    pub losses: u32,
}

impl ActiveSession {
    /// Payout as a fraction of the entry value.
    pub fn payout_rate(&self) -> f64 {
        self.payout_percent / 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "screen", rename_all = "snake_case")]
pub enum Screen {
    SignedOut,
    ProfileSelection,
    Planning { profile: RiskProfile },
    Active(ActiveSession),
    Outcome { result: StopKind, session: ActiveSession },
    Lockout { until: Timestamp },
    Growth,
}

impl Screen {
    pub fn name(&self) -> &'static str {
        match self {
            Screen::SignedOut => "signed_out",
            Screen::ProfileSelection => "profile_selection",
            Screen::Planning { .. } => "planning",
            Screen::Active(_) => "active",
            Screen::Outcome { .. } => "outcome",
            Screen::Lockout { .. } => "lockout",
            Screen::Growth => "growth",
        }
    }
}

/// Everything the machine knows about the signed-in account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    pub screen: Screen,
    pub user_id: Option<String>,
    #[serde(skip)]
    pub email: String,
    /// Last selected profile; drives the growth projection.
    pub profile: RiskProfile,
    /// Last known bankroll, carried into the next plan.
    pub current_bankroll: f64,
    pub history: Vec<HistoryEntry>,
    pub lockout_until: Option<Timestamp>,
    pub withdrawal_goal: f64,
    /// Message to surface to the user (validation or save failure).
    pub last_error: Option<String>,
    /// Logical time: latest timestamp seen on any event.
    pub now: Timestamp,
    pub seq: u64,
}

/// Figures for the growth view.
#[derive(Debug, Clone, PartialEq)]
pub struct GrowthView {
    pub current_bankroll: f64,
    pub withdrawal_goal: f64,
    pub target_bankroll: f64,
    pub progress_pct: f64,
    pub recent: Vec<HistoryEntry>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            screen: Screen::SignedOut,
            user_id: None,
            email: String::new(),
            profile: RiskProfile::default(),
            current_bankroll: 0.0,
            history: Vec::new(),
            lockout_until: None,
            withdrawal_goal: 0.0,
            last_error: None,
            now: 0,
            seq: 0,
        }
    }

    pub fn is_locked(&self) -> bool {
        lockout::is_locked(self.lockout_until, self.now)
    }

    pub fn remaining_ms(&self) -> i64 {
        self.lockout_until
            .map(|until| lockout::remaining_ms(until, self.now))
            .unwrap_or(0)
    }

    /// Screen to show when (re)entering the app, derived only from the
    /// persisted lockout and history.
    pub fn resume_screen(&self) -> Screen {
        match self.lockout_until {
            Some(until) if self.is_locked() => {
                if self.history.is_empty() {
                    Screen::Lockout { until }
                } else {
                    Screen::Growth
                }
            }
            _ => Screen::ProfileSelection,
        }
    }

    pub fn active_session(&self) -> Option<&ActiveSession> {
        match &self.screen {
            Screen::Active(session) | Screen::Outcome { session, .. } => Some(session),
            _ => None,
        }
    }

    pub fn growth_view(&self) -> GrowthView {
        let target = projected_target_bankroll(self.withdrawal_goal, self.profile.safe_withdrawal_fraction());
        GrowthView {
            current_bankroll: self.current_bankroll,
            withdrawal_goal: self.withdrawal_goal,
            target_bankroll: target,
            progress_pct: progress_percent(self.current_bankroll, target),
            recent: recent_history(&self.history, CHART_POINTS).to_vec(),
        }
    }

    /// Merge patch written when a session ends.
    pub fn session_patch(&self) -> RecordPatch {
        RecordPatch {
            email: Some(self.email.clone()),
            bankroll: Some(self.current_bankroll),
            history: Some(self.history.clone()),
            lockout_until: Some(self.lockout_until),
            withdrawal_goal: Some(self.withdrawal_goal),
        }
    }

    /// SHA-256 over the serialized state.
    pub fn digest(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        crate::logging::digest(&bytes)
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
