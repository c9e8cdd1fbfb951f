//! Effect runtime: feeds events through the reducer and carries out the
//! effects it asks for (store writes, lockout timer, log output).

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;
use crate::config::Config;
use crate::engine::{reduce, Effect, EngineConfig, Event, Screen, SessionState};
use crate::lockout::{self, LockoutTimer};
use crate::logging::{self, obj, v_str, Domain, Level};
use crate::store::{RecordPatch, UserRecord, UserStore};

pub struct Controller {
    store: Box<dyn UserStore>,
    clock: Arc<dyn Clock>,
    engine: EngineConfig,
    tick: Duration,
    state: SessionState,
    queue: VecDeque<Event>,
    timer: Option<LockoutTimer>,
}

impl Controller {
    pub fn new(store: Box<dyn UserStore>, clock: Arc<dyn Clock>, cfg: &Config) -> Self {
        Self {
            store,
            clock,
            engine: EngineConfig {
                stop_win_policy: cfg.stop_win_policy,
            },
            tick: cfg.tick(),
            state: SessionState::new(),
            queue: VecDeque::new(),
            timer: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn screen(&self) -> &Screen {
        &self.state.screen
    }

    pub fn store(&self) -> &dyn UserStore {
        self.store.as_ref()
    }

    pub fn now(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Live `HH:MM:SS` countdown while a lockout is running on the clock.
    pub fn countdown(&self) -> Option<String> {
        let until = self.state.lockout_until?;
        if !lockout::is_locked(Some(until), self.now()) {
            return None;
        }
        Some(match &self.timer {
            Some(timer) if timer.until() == until => timer.countdown(),
            _ => lockout::format_countdown(lockout::remaining_ms(until, self.now())),
        })
    }

    pub fn has_timer(&self) -> bool {
        self.timer.as_ref().map(|t| !t.is_finished()).unwrap_or(false)
    }

    /// Load (or create) the user's record and enter the app.
    pub async fn sign_in(&mut self, user_id: &str, email: &str) -> bool {
        let record = match self.store.load(user_id).await {
            Ok(record) => {
                logging::log_persist("load", user_id, true, None);
                record
            }
            Err(err) if err.is_persistence() => {
                // Start from defaults without writing them back over the
                // stored record.
                logging::log_persist("load", user_id, false, Some(&err.to_string()));
                Some(UserRecord::new_for(email))
            }
            Err(err) => {
                logging::log_persist("load", user_id, false, Some(&err.to_string()));
                self.state.last_error = Some(err.to_string());
                return false;
            }
        };
        let now = self.now();
        self.dispatch(Event::SignedIn {
            user_id: user_id.to_string(),
            email: email.to_string(),
            record,
            now,
        })
        .await
    }

    /// Run `event` and every follow-up event its effects produce. Returns
    /// whether `event` itself was accepted on the current screen.
    pub async fn dispatch(&mut self, event: Event) -> bool {
        self.queue.push_back(event);
        let mut first = None;

        while let Some(event) = self.queue.pop_front() {
            let from = self.state.screen.name();
            let trigger = event.name();
            let out = reduce(&mut self.state, event, &self.engine);
            logging::log_audit(self.state.seq, &out.state_digest);

            let to = self.state.screen.name();
            if !out.applied {
                logging::log_ignored(from, trigger);
            } else if from != to {
                logging::log_transition(from, to, trigger);
            }
            first.get_or_insert(out.applied);
            self.execute(out.effects).await;
        }

        first.unwrap_or(false)
    }

    /// Resolves with the unlock time when the armed lockout expires.
    /// Pending forever when no timer is armed.
    pub async fn lockout_expired(&mut self) -> i64 {
        match self.timer.as_mut() {
            Some(timer) => timer.unlocked().await,
            None => std::future::pending().await,
        }
    }

    async fn execute(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::CreateRecord { record } => {
                    if let Err(err) = self.save("create", &RecordPatch::full(&record)).await {
                        self.state.last_error = Some(format!("could not create your account record: {}", err));
                    }
                }

                Effect::PersistSession { patch } => {
                    let error = self.save("save_session", &patch).await.err();
                    self.queue.push_back(Event::PersistSettled { error });
                }

                Effect::PersistGoal { goal } => {
                    let patch = RecordPatch {
                        withdrawal_goal: Some(goal),
                        ..Default::default()
                    };
                    if let Err(err) = self.save("save_goal", &patch).await {
                        self.state.last_error = Some(format!("could not save your goal: {}", err));
                    }
                }

                Effect::ArmTimer { until } => {
                    // Replacing the handle drops (and aborts) any previous timer.
                    self.timer = Some(LockoutTimer::start(until, self.clock.clone(), self.tick));
                    logging::log_lockout("armed", until, self.now());
                }

                Effect::CancelTimer => {
                    if let Some(timer) = self.timer.take() {
                        timer.cancel();
                        logging::log_lockout("cancelled", timer.until(), self.now());
                    }
                }

                Effect::Log { level, domain, msg } => {
                    logging::log(
                        level,
                        domain,
                        "engine",
                        obj(&[("msg", v_str(&msg)), ("screen", v_str(self.state.screen.name()))]),
                    );
                }
            }
        }
    }

    async fn save(&self, op: &str, patch: &RecordPatch) -> Result<(), String> {
        let Some(user_id) = self.state.user_id.as_deref() else {
            logging::log(
                Level::Warn,
                Domain::Store,
                op,
                obj(&[("msg", v_str("no signed-in user"))]),
            );
            return Err("not signed in".to_string());
        };
        match self.store.save(user_id, patch).await {
            Ok(()) => {
                logging::log_persist(op, user_id, true, None);
                Ok(())
            }
            Err(err) => {
                let msg = err.to_string();
                logging::log_persist(op, user_id, false, Some(&msg));
                Err(msg)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::profile::RiskProfile;
    use crate::store::MemoryUserStore;
    use crate::trade::Outcome;

    const T0: i64 = 1_760_000_000_000;

    fn controller(store: MemoryUserStore, clock: &ManualClock) -> Controller {
        let cfg = Config {
            tick_ms: 5,
            ..Config::default()
        };
        Controller::new(Box::new(store), Arc::new(clock.clone()), &cfg)
    }

    #[tokio::test]
    async fn test_first_sign_in_creates_record() {
        let clock = ManualClock::new(T0);
        let mut ctl = controller(MemoryUserStore::new(), &clock);
        assert!(ctl.sign_in("u1", "u1@example.com").await);
        assert_eq!(ctl.screen(), &Screen::ProfileSelection);

        let stored = ctl.store().load("u1").await.unwrap().unwrap();
        assert_eq!(stored.email, "u1@example.com");
        assert!(stored.history.is_empty());
        assert_eq!(stored.lockout_until, None);
    }

    #[tokio::test]
    async fn test_session_end_persists_then_shows_growth() {
        let clock = ManualClock::new(T0);
        let mut ctl = controller(MemoryUserStore::new(), &clock);
        ctl.sign_in("u1", "u1@example.com").await;
        ctl.dispatch(Event::SelectProfile(RiskProfile::Moderate)).await;
        ctl.dispatch(Event::StartSession {
            bankroll: 1000.0,
            payout_percent: 87.0,
            now: T0,
        })
        .await;
        ctl.dispatch(Event::Trade(Outcome::Loss)).await;
        ctl.dispatch(Event::Trade(Outcome::Loss)).await;
        ctl.dispatch(Event::EndSession { now: clock.now_ms() }).await;

        assert_eq!(ctl.screen(), &Screen::Growth);
        assert!(ctl.has_timer());
        assert_eq!(ctl.countdown().as_deref(), Some("24:00:00"));

        let stored = ctl.store().load("u1").await.unwrap().unwrap();
        assert_eq!(stored.lockout_until, Some(T0 + lockout::LOCKOUT_MS));
        assert_eq!(stored.history.len(), 1);
        assert_eq!(stored.bankroll, 900.0);
    }

    #[tokio::test]
    async fn test_sign_out_cancels_timer() {
        let clock = ManualClock::new(T0);
        let record = UserRecord {
            lockout_until: Some(T0 + 60_000),
            ..Default::default()
        };
        let mut ctl = controller(MemoryUserStore::with_record("u1", record), &clock);
        ctl.sign_in("u1", "").await;
        assert_eq!(ctl.screen(), &Screen::Lockout { until: T0 + 60_000 });
        assert!(ctl.has_timer());

        ctl.dispatch(Event::SignedOut).await;
        assert!(!ctl.has_timer());
        assert_eq!(ctl.screen(), &Screen::SignedOut);
    }
}
