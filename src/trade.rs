//! Trade resolver: applies one win/loss to the running session totals and
//! decides whether a stop threshold has been crossed.

use serde::{Deserialize, Serialize};

use crate::plan::{round_cents, DailyPlan};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Loss,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Win => "win",
            Outcome::Loss => "loss",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopKind {
    WinStop,
    LossStop,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionProgress {
    pub current_bankroll: f64,
    /// Signed cumulative result of the session.
    pub daily_profit_loss: f64,
}

impl SessionProgress {
    pub fn new(bankroll: f64) -> Self {
        Self {
            current_bankroll: bankroll,
            daily_profit_loss: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeResolution {
    pub progress: SessionProgress,
    pub delta: f64,
    pub result: Option<StopKind>,
}

/// Signed change in profit/loss for one entry.
pub fn trade_delta(plan: &DailyPlan, payout_rate: f64, outcome: Outcome) -> f64 {
    match outcome {
        Outcome::Win => round_cents(plan.entry_value * payout_rate),
        Outcome::Loss => -plan.entry_value,
    }
}

/// Check the stop thresholds. Win is checked first; both are inclusive.
pub fn stop_reached(plan: &DailyPlan, profit_loss: f64) -> Option<StopKind> {
    if profit_loss >= plan.stop_win {
        Some(StopKind::WinStop)
    } else if profit_loss <= -plan.stop_loss {
        Some(StopKind::LossStop)
    } else {
        None
    }
}

/// `payout_rate` is a fraction (0.87 for an 87% payout).
pub fn apply_trade(
    progress: SessionProgress,
    plan: &DailyPlan,
    payout_rate: f64,
    outcome: Outcome,
) -> TradeResolution {
    let delta = trade_delta(plan, payout_rate, outcome);
    // P/L stays on the cent grid so threshold equality is exact; the bankroll
    // keeps whatever precision the session started with.
    let progress = SessionProgress {
        current_bankroll: progress.current_bankroll + delta,
        daily_profit_loss: round_cents(progress.daily_profit_loss + delta),
    };
    TradeResolution {
        progress,
        delta,
        result: stop_reached(plan, progress.daily_profit_loss),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{compute_plan, StopWinPolicy};
    use crate::profile::RiskProfile;

    fn moderate_plan() -> DailyPlan {
        compute_plan(1000.0, RiskProfile::Moderate, 87.0, StopWinPolicy::SafeGoal).unwrap()
    }

    #[test]
    fn test_two_wins_hit_stop_win() {
        let plan = moderate_plan();
        let start = SessionProgress::new(1000.0);

        let first = apply_trade(start, &plan, 0.87, Outcome::Win);
        assert_eq!(first.delta, 43.5);
        assert_eq!(first.progress.daily_profit_loss, 43.5);
        assert_eq!(first.progress.current_bankroll, 1043.5);
        assert_eq!(first.result, None);

        let second = apply_trade(first.progress, &plan, 0.87, Outcome::Win);
        assert_eq!(second.progress.daily_profit_loss, 87.0);
        assert_eq!(second.result, Some(StopKind::WinStop));
    }

    #[test]
    fn test_two_losses_hit_stop_loss_exactly() {
        let plan = moderate_plan();
        let first = apply_trade(SessionProgress::new(1000.0), &plan, 0.87, Outcome::Loss);
        assert_eq!(first.progress.daily_profit_loss, -50.0);
        assert_eq!(first.result, None);

        let second = apply_trade(first.progress, &plan, 0.87, Outcome::Loss);
        assert_eq!(second.progress.daily_profit_loss, -100.0);
        assert_eq!(second.progress.current_bankroll, 900.0);
        assert_eq!(second.result, Some(StopKind::LossStop));
    }

    #[test]
    fn test_thresholds_inclusive_and_open_between() {
        let plan = DailyPlan {
            entry_value: 10.0,
            stop_win: 25.0,
            stop_loss: 20.0,
        };
        assert_eq!(stop_reached(&plan, 25.0), Some(StopKind::WinStop));
        assert_eq!(stop_reached(&plan, -20.0), Some(StopKind::LossStop));
        assert_eq!(stop_reached(&plan, 24.99), None);
        assert_eq!(stop_reached(&plan, -19.99), None);
        assert_eq!(stop_reached(&plan, 0.0), None);
    }

    #[test]
    fn test_single_win_policy_stops_on_first_win() {
        let mut misses = Vec::new();
        for cents in 100_000..120_000i64 {
            let bankroll = cents as f64 / 100.0;
            for profile in RiskProfile::ALL {
                for payout in [80.0, 87.0, 92.0] {
                    let plan = compute_plan(bankroll, profile, payout, StopWinPolicy::SingleWin).unwrap();
                    let res = apply_trade(SessionProgress::new(bankroll), &plan, payout / 100.0, Outcome::Win);
                    if res.result != Some(StopKind::WinStop) && misses.len() < 5 {
                        misses.push((bankroll, profile, payout, plan, res.delta));
                    }
                }
            }
        }
        assert!(misses.is_empty(), "sessions left open after one win: {:?}", misses);
    }

    #[test]
    fn test_bankroll_is_previous_plus_delta() {
        let plan = compute_plan(1234.567, RiskProfile::Aggressive, 87.0, StopWinPolicy::SafeGoal).unwrap();
        let start = SessionProgress::new(1234.567);

        let first = apply_trade(start, &plan, 0.87, Outcome::Loss);
        assert_eq!(first.progress.current_bankroll, 1234.567 + first.delta);
        let second = apply_trade(first.progress, &plan, 0.87, Outcome::Win);
        assert_eq!(second.progress.current_bankroll, 1234.567 + first.delta + second.delta);
        assert_eq!(
            second.progress.daily_profit_loss,
            round_cents(first.delta + second.delta)
        );
    }

    #[test]
    fn test_profit_loss_is_sum_of_rounded_deltas() {
        let plan = DailyPlan {
            entry_value: 33.33,
            stop_win: 10_000.0,
            stop_loss: 10_000.0,
        };
        let payout = 0.83;
        let outcomes = [
            Outcome::Win,
            Outcome::Loss,
            Outcome::Win,
            Outcome::Win,
            Outcome::Loss,
            Outcome::Loss,
            Outcome::Win,
        ];

        let mut progress = SessionProgress::new(500.0);
        let mut expected = 0.0;
        for outcome in outcomes {
            let delta = trade_delta(&plan, payout, outcome);
            assert_eq!(delta, round_cents(delta));
            expected += delta;
            progress = apply_trade(progress, &plan, payout, outcome).progress;
        }
        assert!((progress.daily_profit_loss - expected).abs() < 1e-9);
        assert!((progress.current_bankroll - (500.0 + expected)).abs() < 1e-9);
    }
}
