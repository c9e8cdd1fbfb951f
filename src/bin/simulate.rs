//! Withdrawal simulator: what bankroll does a daily goal need, per profile?
//!
//! Usage: simulate <daily_goal> [payout_pct]

use anyhow::{bail, Context, Result};

use bankboss::history::parse_withdrawal_goal;
use bankboss::plan::{simulate_withdrawal, validate_payout};

const DEFAULT_PAYOUT_PCT: f64 = 87.0;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let Some(goal_arg) = args.get(1) else {
        bail!("usage: simulate <daily_goal> [payout_pct]");
    };

    let goal = parse_withdrawal_goal(goal_arg);
    if goal <= 0.0 {
        bail!("daily goal must be a positive amount, got '{}'", goal_arg);
    }
    let payout = match args.get(2) {
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .with_context(|| format!("invalid payout '{}'", raw))?,
        None => DEFAULT_PAYOUT_PCT,
    };
    validate_payout(payout)?;

    println!("Daily goal {:.2} at {}% payout", goal, payout);
    println!("{:<26} {:>18} {:>8}", "profile", "required bankroll", "trades");
    for row in simulate_withdrawal(goal, payout) {
        println!(
            "{:<26} {:>18.2} {:>8}",
            row.profile.to_string(),
            row.required_bankroll,
            row.trades
        );
    }
    Ok(())
}
