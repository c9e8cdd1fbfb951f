//! Pure reducer: (SessionState, Event) -> (SessionState, Vec<Effect>)
//!
//! Every screen change happens here. Persistence, timers and log output are
//! requested as effects and carried out by the runtime, so a recorded event
//! stream replays to the same digests.
//!
//! ```text
//! SignedOut -> ProfileSelection -> Planning -> Active -> Outcome -> Lockout -> Growth
//!                    ^                 |                                |          |
//!                    +------ Back -----+        Unlock (expired) -------+          |
//!                    +------------------------ BackToStart -------------------------+
//! ```

use super::events::*;
use super::state::*;
use crate::error::ValidationError;
use crate::history::{append_history, last_bankroll, parse_withdrawal_goal, HistoryEntry};
use crate::lockout::{self, format_countdown};
use crate::logging::{Domain, Level};
use crate::plan::{compute_plan, StopWinPolicy};
use crate::store::UserRecord;
use crate::trade::{apply_trade, Outcome, StopKind};

#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub stop_win_policy: StopWinPolicy,
}

/// Result of processing an event
#[derive(Debug)]
pub struct ReducerOutput {
    pub effects: Vec<Effect>,
    /// `false` when the event was not valid for the current screen.
    pub applied: bool,
    pub state_digest: String,
}

pub fn reduce(state: &mut SessionState, event: Event, cfg: &EngineConfig) -> ReducerOutput {
    let mut effects = Vec::new();

    if let Some(ts) = event.timestamp() {
        state.now = state.now.max(ts);
    }
    state.seq += 1;

    let applied = match event {
        Event::SignedIn {
            user_id,
            email,
            record,
            ..
        } => {
            sign_in(state, user_id, email, record, &mut effects);
            true
        }
        Event::SignedOut => {
            let (now, seq) = (state.now, state.seq);
            *state = SessionState::new();
            state.now = now;
            state.seq = seq;
            effects.push(Effect::CancelTimer);
            true
        }
        other => handle_screen_event(state, other, cfg, &mut effects),
    };

    ReducerOutput {
        effects,
        applied,
        state_digest: state.digest(),
    }
}

fn sign_in(
    state: &mut SessionState,
    user_id: String,
    email: String,
    record: Option<UserRecord>,
    effects: &mut Vec<Effect>,
) {
    let record = match record {
        Some(record) => record,
        None => {
            let fresh = UserRecord::new_for(&email);
            effects.push(Effect::CreateRecord {
                record: fresh.clone(),
            });
            fresh
        }
    };

    state.user_id = Some(user_id);
    state.email = if record.email.is_empty() { email } else { record.email.clone() };
    state.current_bankroll = last_bankroll(&record.history, record.bankroll);
    state.history = record.history;
    state.lockout_until = record.lockout_until;
    state.withdrawal_goal = record.withdrawal_goal;
    state.last_error = None;
    state.screen = state.resume_screen();

    match state.lockout_until {
        Some(until) if state.is_locked() => effects.push(Effect::ArmTimer { until }),
        _ => effects.push(Effect::CancelTimer),
    }
}

/// Screen-dependent events. Returns whether the event applied.
fn handle_screen_event(
    state: &mut SessionState,
    event: Event,
    cfg: &EngineConfig,
    effects: &mut Vec<Effect>,
) -> bool {
    let screen = std::mem::replace(&mut state.screen, Screen::SignedOut);

    let (next, applied) = match (screen, event) {
        // Nothing but sign-in is accepted while signed out.
        (Screen::SignedOut, _) => (Screen::SignedOut, false),

        (Screen::ProfileSelection, Event::SelectProfile(profile)) => {
            state.profile = profile;
            state.last_error = None;
            (Screen::Planning { profile }, true)
        }

        (Screen::Planning { .. }, Event::Back) => {
            state.last_error = None;
            (Screen::ProfileSelection, true)
        }

        (Screen::Planning { profile }, Event::StartSession {
            bankroll,
            payout_percent,
            ..
        }) => (start_session(state, profile, bankroll, payout_percent, cfg, effects), true),

        (Screen::Active(session), Event::Trade(outcome)) => (trade(state, session, outcome, effects), true),

        (Screen::Outcome { session, .. }, Event::EndSession { now }) => {
            (end_session(state, &session, now, effects), true)
        }

        (Screen::Lockout { .. }, Event::PersistSettled { error }) => {
            if let Some(err) = error {
                state.last_error = Some(format!("could not save your session: {}", err));
                effects.push(Effect::Log {
                    level: Level::Error,
                    domain: Domain::Store,
                    msg: format!("session save failed: {}", err),
                });
            }
            (Screen::Growth, true)
        }

        (screen @ Screen::Lockout { .. }, Event::Unlock { now })
        | (screen @ Screen::Growth, Event::Unlock { now }) => match state.lockout_until {
            Some(until) if now >= until => {
                effects.push(Effect::Log {
                    level: Level::Info,
                    domain: Domain::Lockout,
                    msg: format!("lockout expired until={} now={}", until, now),
                });
                let next = if matches!(screen, Screen::Lockout { .. }) {
                    Screen::ProfileSelection
                } else {
                    screen
                };
                (next, true)
            }
            _ => (screen, false),
        },

        (Screen::ProfileSelection, Event::ViewGrowth) | (Screen::Planning { .. }, Event::ViewGrowth) => {
            (Screen::Growth, true)
        }

        (Screen::Growth, Event::BackToStart) => {
            state.last_error = None;
            (Screen::ProfileSelection, true)
        }

        (screen, Event::SetWithdrawalGoal(text)) => {
            let goal = parse_withdrawal_goal(&text);
            state.withdrawal_goal = goal;
            effects.push(Effect::PersistGoal { goal });
            (screen, true)
        }

        (screen, _) => (screen, false),
    };

    state.screen = next;
    applied
}

fn start_session(
    state: &mut SessionState,
    profile: crate::profile::RiskProfile,
    bankroll: f64,
    payout_percent: f64,
    cfg: &EngineConfig,
    effects: &mut Vec<Effect>,
) -> Screen {
    let stay = Screen::Planning { profile };

    if state.is_locked() {
        let err = ValidationError::Locked {
            remaining: format_countdown(state.remaining_ms()),
        };
        reject(state, err, effects);
        return stay;
    }

    let plan = match compute_plan(bankroll, profile, payout_percent, cfg.stop_win_policy) {
        Ok(plan) => plan,
        Err(err) => {
            reject(state, err, effects);
            return stay;
        }
    };

    effects.push(Effect::Log {
        level: Level::Info,
        domain: Domain::Plan,
        msg: format!(
            "plan profile={} bankroll={:.2} payout={}% entry={:.2} stop_win={:.2} stop_loss={:.2} policy={}",
            profile.as_str(),
            bankroll,
            payout_percent,
            plan.entry_value,
            plan.stop_win,
            plan.stop_loss,
            cfg.stop_win_policy.as_str()
        ),
    });

    state.current_bankroll = bankroll;
    state.last_error = None;
    Screen::Active(ActiveSession {
        profile,
        plan,
        payout_percent,
        starting_bankroll: bankroll,
        progress: crate::trade::SessionProgress::new(bankroll),
        wins: 0,
        losses: 0,
    })
}

fn reject(state: &mut SessionState, err: ValidationError, effects: &mut Vec<Effect>) {
    effects.push(Effect::Log {
        level: Level::Warn,
        domain: Domain::Plan,
        msg: format!("rejected: {}", err),
    });
    state.last_error = Some(err.to_string());
}

fn trade(state: &mut SessionState, mut session: ActiveSession, outcome: Outcome, effects: &mut Vec<Effect>) -> Screen {
    let res = apply_trade(session.progress, &session.plan, session.payout_rate(), outcome);
    session.progress = res.progress;
    match outcome {
        Outcome::Win => session.wins += 1,
        Outcome::Loss => session.losses += 1,
    }
    state.current_bankroll = res.progress.current_bankroll;

    effects.push(Effect::Log {
        level: Level::Info,
        domain: Domain::Trade,
        msg: format!(
            "{} delta={:.2} pl={:.2} bankroll={:.2}",
            outcome.as_str(),
            res.delta,
            res.progress.daily_profit_loss,
            res.progress.current_bankroll
        ),
    });

    match res.result {
        Some(result) => {
            effects.push(Effect::Log {
                level: Level::Info,
                domain: Domain::Trade,
                msg: format!(
                    "{} reached after {} trades",
                    match result {
                        StopKind::WinStop => "stop-win",
                        StopKind::LossStop => "stop-loss",
                    },
                    session.wins + session.losses
                ),
            });
            Screen::Outcome { result, session }
        }
        None => Screen::Active(session),
    }
}

fn end_session(state: &mut SessionState, session: &ActiveSession, now: Timestamp, effects: &mut Vec<Effect>) -> Screen {
    let until = lockout::arm(now);
    state.current_bankroll = session.progress.current_bankroll;
    state.lockout_until = Some(until);
    state.history = append_history(&state.history, HistoryEntry::at(now, state.current_bankroll));

    effects.push(Effect::PersistSession {
        patch: state.session_patch(),
    });
    effects.push(Effect::ArmTimer { until });
    Screen::Lockout { until }
}
