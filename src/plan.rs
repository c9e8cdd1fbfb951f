//! Daily plan calculator.
//!
//! Turns (bankroll, risk profile, payout) into the entry value and the two
//! cumulative thresholds that end a session. Also hosts the helpers behind the
//! suggested-plan panel and the withdrawal simulator, which reuse the same
//! profile arithmetic.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, ValidationError};
use crate::profile::RiskProfile;

/// Number of losing entries that make up the stop-loss.
pub const LOSSES_TO_STOP: f64 = 2.0;

/// How the stop-win threshold is derived. One policy is applied per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopWinPolicy {
    /// `bankroll * safe_withdrawal_fraction`
    #[default]
    SafeGoal,
    /// `entry_value * payout_rate`: a single winning entry ends the day.
    SingleWin,
}

impl StopWinPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopWinPolicy::SafeGoal => "safe_goal",
            StopWinPolicy::SingleWin => "single_win",
        }
    }
}

impl FromStr for StopWinPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "safe_goal" => Ok(StopWinPolicy::SafeGoal),
            "single_win" => Ok(StopWinPolicy::SingleWin),
            other => Err(Error::Configuration(format!("unknown stop-win policy '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyPlan {
    pub entry_value: f64,
    pub stop_win: f64,
    /// Positive magnitude; compared against the size of the cumulative loss.
    pub stop_loss: f64,
}

/// Round to cents, half away from zero.
///
/// Decimal half-cents such as 0.145 are stored slightly below the half in
/// binary, so the scaled value is first snapped to six decimals to drop that
/// representation error before the half-cent decision.
pub fn round_cents(value: f64) -> f64 {
    let scaled = value * 100.0;
    let snapped = if scaled.abs() < SNAP_LIMIT {
        (scaled * 1e6).round() / 1e6
    } else {
        scaled
    };
    snapped.round() / 100.0
}

/// Above this many cents the snap would exceed f64 integer precision.
const SNAP_LIMIT: f64 = 1e9;

/// Validate a bankroll entered by the user.
pub fn validate_bankroll(bankroll: f64) -> Result<f64, ValidationError> {
    if bankroll.is_finite() && bankroll > 0.0 {
        Ok(bankroll)
    } else {
        Err(ValidationError::InvalidBankroll(bankroll))
    }
}

/// Validate a payout percentage in (0, 100].
pub fn validate_payout(payout_percent: f64) -> Result<f64, ValidationError> {
    if payout_percent.is_finite() && payout_percent > 0.0 && payout_percent <= 100.0 {
        Ok(payout_percent)
    } else {
        Err(ValidationError::InvalidPayout(payout_percent))
    }
}

pub fn compute_plan(
    bankroll: f64,
    profile: RiskProfile,
    payout_percent: f64,
    policy: StopWinPolicy,
) -> Result<DailyPlan, ValidationError> {
    let bankroll = validate_bankroll(bankroll)?;
    let payout_rate = validate_payout(payout_percent)? / 100.0;

    let entry_value = round_cents(bankroll * profile.risk_fraction());
    let stop_win = match policy {
        StopWinPolicy::SafeGoal => round_cents(bankroll * profile.safe_withdrawal_fraction()),
        // Same arithmetic as a winning trade's delta, so one win always reaches it.
        StopWinPolicy::SingleWin => round_cents(entry_value * payout_rate),
    };
    // Doubling a cent amount stays on the cent grid, so this is exact.
    let stop_loss = entry_value * LOSSES_TO_STOP;

    if entry_value <= 0.0 || stop_win <= 0.0 || stop_loss <= 0.0 {
        return Err(ValidationError::PlanTooSmall(bankroll));
    }

    Ok(DailyPlan {
        entry_value,
        stop_win,
        stop_loss,
    })
}

/// Safe daily goal shown before a session starts. Zero for invalid input.
pub fn safe_daily_goal(bankroll: f64, profile: RiskProfile) -> f64 {
    match validate_bankroll(bankroll) {
        Ok(b) => round_cents(b * profile.safe_withdrawal_fraction()),
        Err(_) => 0.0,
    }
}

/// Wins needed to reach the safe daily goal at the profile's entry size.
pub fn suggested_trades(bankroll: f64, profile: RiskProfile, payout_percent: f64) -> u32 {
    let (Ok(bankroll), Ok(payout)) = (validate_bankroll(bankroll), validate_payout(payout_percent))
    else {
        return 0;
    };
    let goal = bankroll * profile.safe_withdrawal_fraction();
    let profit_per_trade = bankroll * profile.risk_fraction() * payout / 100.0;
    trades_to_reach(goal, profit_per_trade)
}

fn trades_to_reach(goal: f64, profit_per_trade: f64) -> u32 {
    if profit_per_trade <= 0.0 || goal <= 0.0 {
        return 0;
    }
    // Tolerate float noise on exact multiples (e.g. 2.0000000000000004).
    (goal / profit_per_trade - 1e-9).ceil().max(1.0) as u32
}

/// One row of the withdrawal simulator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimulationRow {
    pub profile: RiskProfile,
    pub required_bankroll: f64,
    pub trades: u32,
}

/// Bankroll and daily effort needed to withdraw `goal` per day under each
/// profile. Invalid inputs yield zeroed rows.
pub fn simulate_withdrawal(goal: f64, payout_percent: f64) -> [SimulationRow; 3] {
    let valid = goal.is_finite() && goal > 0.0 && validate_payout(payout_percent).is_ok();
    RiskProfile::ALL.map(|profile| {
        if !valid {
            return SimulationRow {
                profile,
                required_bankroll: 0.0,
                trades: 0,
            };
        }
        let required = goal / profile.safe_withdrawal_fraction();
        let profit_per_trade = required * profile.risk_fraction() * payout_percent / 100.0;
        SimulationRow {
            profile,
            required_bankroll: round_cents(required),
            trades: trades_to_reach(goal, profit_per_trade),
        }
    })
}
