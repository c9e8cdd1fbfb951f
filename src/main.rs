use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use bankboss::clock::SystemClock;
use bankboss::config::Config;
use bankboss::engine::{Event, Screen};
use bankboss::logging::{self, obj, v_num, v_str, Domain, Level};
use bankboss::plan::{safe_daily_goal, suggested_trades};
use bankboss::profile::RiskProfile;
use bankboss::quotes::random_quote;
use bankboss::runtime::Controller;
use bankboss::store::open_store;
use bankboss::trade::{Outcome, StopKind};

const HELP: &str = "commands: profile <conservative|moderate|aggressive>, start [bankroll] [payout], \
win, loss, end, goal <amount>, growth, back, status, help, quit";

enum Flow {
    Continue,
    Quit,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env()?;
    let store = open_store(&cfg)?;
    logging::log(
        Level::Info,
        Domain::System,
        "startup",
        obj(&[
            ("store", v_str(store.name())),
            ("policy", v_str(cfg.stop_win_policy.as_str())),
            ("payout_pct", v_num(cfg.default_payout_pct)),
            ("user_id", v_str(&cfg.user_id)),
        ]),
    );

    let mut ctl = Controller::new(store, Arc::new(SystemClock), &cfg);
    ctl.sign_in(&cfg.user_id, &cfg.user_email).await;
    print_error(&ctl, None);
    render(&ctl, &cfg);
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if let Flow::Quit = handle(&mut ctl, &cfg, line.trim()).await {
                    break;
                }
            }
            now = ctl.lockout_expired() => {
                ctl.dispatch(Event::Unlock { now }).await;
                println!("The lockout is over. You can start a new session.");
                render(&ctl, &cfg);
            }
        }
    }

    ctl.dispatch(Event::SignedOut).await;
    logging::log(Level::Info, Domain::System, "shutdown", obj(&[]));
    Ok(())
}

async fn handle(ctl: &mut Controller, cfg: &Config, line: &str) -> Flow {
    let mut parts = line.split_whitespace();
    let Some(cmd) = parts.next() else {
        return Flow::Continue;
    };
    let args: Vec<&str> = parts.collect();
    let before = ctl.state().last_error.clone();

    let event = match cmd {
        "quit" | "exit" => return Flow::Quit,
        "help" => {
            println!("{}", HELP);
            return Flow::Continue;
        }
        "status" => {
            render(ctl, cfg);
            return Flow::Continue;
        }
        "profile" => match args.first().map(|s| s.parse::<RiskProfile>()) {
            Some(Ok(profile)) => Event::SelectProfile(profile),
            Some(Err(err)) => {
                println!("! {}", err);
                return Flow::Continue;
            }
            None => {
                println!("! usage: profile <conservative|moderate|aggressive>");
                return Flow::Continue;
            }
        },
        "start" => {
            let bankroll = match args.first() {
                Some(raw) => parse_amount(raw),
                None => ctl.state().current_bankroll,
            };
            let payout_percent = args.get(1).map(|raw| parse_amount(raw)).unwrap_or(cfg.default_payout_pct);
            Event::StartSession {
                bankroll,
                payout_percent,
                now: ctl.now(),
            }
        }
        "win" => Event::Trade(Outcome::Win),
        "loss" => Event::Trade(Outcome::Loss),
        "end" => Event::EndSession { now: ctl.now() },
        "goal" => Event::SetWithdrawalGoal(args.join(" ")),
        "growth" => Event::ViewGrowth,
        "back" => match ctl.screen() {
            Screen::Growth => Event::BackToStart,
            _ => Event::Back,
        },
        other => {
            println!("! unknown command '{}'. {}", other, HELP);
            return Flow::Continue;
        }
    };

    let starting = matches!(event, Event::StartSession { .. });
    if !ctl.dispatch(event).await {
        println!("! '{}' is not available on the {} screen", cmd, ctl.screen().name());
        return Flow::Continue;
    }
    print_error(ctl, before.as_deref());
    if starting && matches!(ctl.screen(), Screen::Active(_)) {
        println!("\n  \"{}\"\n", random_quote());
    }
    render(ctl, cfg);
    Flow::Continue
}

/// Unparseable amounts become NaN and are rejected by the plan calculator.
fn parse_amount(raw: &str) -> f64 {
    raw.trim().replace(',', ".").parse().unwrap_or(f64::NAN)
}

fn print_error(ctl: &Controller, before: Option<&str>) {
    if let Some(err) = ctl.state().last_error.as_deref() {
        if Some(err) != before {
            println!("! {}", err);
        }
    }
}

fn render(ctl: &Controller, cfg: &Config) {
    let state = ctl.state();
    match &state.screen {
        Screen::SignedOut => println!("Signed out."),
        Screen::ProfileSelection => {
            println!("Choose a risk profile:");
            for profile in RiskProfile::ALL {
                println!("  {:<13} {}", profile.as_str(), profile);
            }
            if let Some(countdown) = ctl.countdown() {
                println!("Next session unlocks in {}", countdown);
            }
        }
        Screen::Planning { profile } => {
            let bankroll = state.current_bankroll;
            println!("Profile: {}", profile);
            if bankroll > 0.0 {
                println!(
                    "Last bankroll {:.2}: safe daily goal {:.2}, about {} winning trades at {}%",
                    bankroll,
                    safe_daily_goal(bankroll, *profile),
                    suggested_trades(bankroll, *profile, cfg.default_payout_pct),
                    cfg.default_payout_pct
                );
            }
            println!("start <bankroll> [payout] to begin, back to change profile");
        }
        Screen::Active(session) => {
            println!(
                "Entry {:.2} | stop-win {:.2} | stop-loss {:.2}",
                session.plan.entry_value, session.plan.stop_win, session.plan.stop_loss
            );
            println!(
                "Bankroll {:.2} | P/L {:+.2} | {}W {}L",
                session.progress.current_bankroll,
                session.progress.daily_profit_loss,
                session.wins,
                session.losses
            );
        }
        Screen::Outcome { result, session } => {
            match result {
                StopKind::WinStop => println!(
                    "Stop-win reached: {:+.2}. Well done, the day is over.",
                    session.progress.daily_profit_loss
                ),
                StopKind::LossStop => println!(
                    "Stop-loss reached: {:+.2}. Protect your capital, the day is over.",
                    session.progress.daily_profit_loss
                ),
            }
            println!("Bankroll {:.2}. Type 'end' to close the day.", session.progress.current_bankroll);
        }
        Screen::Lockout { .. } => {
            println!("Session closed.");
            if let Some(countdown) = ctl.countdown() {
                println!("Next session unlocks in {}", countdown);
            }
        }
        Screen::Growth => {
            let view = state.growth_view();
            println!("Bankroll {:.2}", view.current_bankroll);
            if view.withdrawal_goal > 0.0 {
                println!(
                    "Daily withdrawal goal {:.2} needs {:.2} ({}): {:.1}% there",
                    view.withdrawal_goal,
                    view.target_bankroll,
                    state.profile.as_str(),
                    view.progress_pct
                );
            } else {
                println!("Set a daily withdrawal goal with: goal <amount>");
            }
            for entry in &view.recent {
                let day = entry
                    .day()
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| entry.date.clone());
                println!("  {}  {:>12.2}", day, entry.bankroll);
            }
            if let Some(countdown) = ctl.countdown() {
                println!("Next session unlocks in {}", countdown);
            }
        }
    }
}
