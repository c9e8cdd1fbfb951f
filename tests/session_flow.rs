//! End-to-end session flows through the controller: plan, trade to a stop,
//! lock for 24 hours, resume, and unlock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use bankboss::clock::{Clock, ManualClock};
use bankboss::config::Config;
use bankboss::engine::{Event, Screen};
use bankboss::error::{Error, Result};
use bankboss::history::HistoryEntry;
use bankboss::lockout::LOCKOUT_MS;
use bankboss::profile::RiskProfile;
use bankboss::runtime::Controller;
use bankboss::store::{MemoryUserStore, RecordPatch, UserRecord, UserStore};
use bankboss::trade::{Outcome, StopKind};

const T0: i64 = 1_760_000_000_000;

fn test_config() -> Config {
    Config {
        tick_ms: 5,
        ..Config::default()
    }
}

/// Memory store whose writes (and optionally reads) can be made to fail.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryUserStore,
    fail_save: AtomicBool,
    fail_load: AtomicBool,
}

#[async_trait]
impl UserStore for FlakyStore {
    async fn load(&self, user_id: &str) -> Result<Option<UserRecord>> {
        if self.fail_load.load(Ordering::SeqCst) {
            return Err(Error::Persistence("backend unreachable".to_string()));
        }
        self.inner.load(user_id).await
    }

    async fn save(&self, user_id: &str, patch: &RecordPatch) -> Result<()> {
        if self.fail_save.load(Ordering::SeqCst) {
            return Err(Error::Persistence("write rejected".to_string()));
        }
        self.inner.save(user_id, patch).await
    }

    fn name(&self) -> &'static str {
        "flaky"
    }
}

async fn play_to_stop(ctl: &mut Controller, profile: RiskProfile, bankroll: f64, outcomes: &[Outcome]) {
    assert!(ctl.dispatch(Event::SelectProfile(profile)).await);
    let now = ctl.now();
    assert!(
        ctl.dispatch(Event::StartSession {
            bankroll,
            payout_percent: 87.0,
            now,
        })
        .await
    );
    for outcome in outcomes {
        assert!(ctl.dispatch(Event::Trade(*outcome)).await);
    }
}

#[tokio::test]
async fn test_winning_day_locks_and_records_history() {
    let clock = ManualClock::new(T0);
    let mut ctl = Controller::new(Box::new(MemoryUserStore::new()), Arc::new(clock.clone()), &test_config());
    ctl.sign_in("trader", "trader@example.com").await;

    play_to_stop(&mut ctl, RiskProfile::Moderate, 1000.0, &[Outcome::Win]).await;
    assert!(matches!(ctl.screen(), Screen::Active(_)));
    ctl.dispatch(Event::Trade(Outcome::Win)).await;

    match ctl.screen() {
        Screen::Outcome { result, session } => {
            assert_eq!(*result, StopKind::WinStop);
            assert_eq!(session.progress.daily_profit_loss, 87.0);
            assert_eq!(session.progress.current_bankroll, 1087.0);
        }
        other => panic!("expected outcome screen, got {:?}", other),
    }

    clock.advance(1_000);
    ctl.dispatch(Event::EndSession { now: clock.now_ms() }).await;
    assert_eq!(ctl.screen(), &Screen::Growth);

    let stored = ctl.store().load("trader").await.unwrap().unwrap();
    assert_eq!(stored.lockout_until, Some(T0 + 1_000 + LOCKOUT_MS));
    assert_eq!(stored.history.len(), 1);
    assert_eq!(stored.history[0].bankroll, 1087.0);
    assert_eq!(stored.email, "trader@example.com");
}

#[tokio::test]
async fn test_relaunch_during_lockout_resumes_on_growth() {
    let clock = ManualClock::new(T0);
    let record = UserRecord {
        email: "t@example.com".to_string(),
        bankroll: 900.0,
        history: vec![HistoryEntry::at(T0 - 60_000, 900.0)],
        lockout_until: Some(T0 + 3_600_000),
        withdrawal_goal: 45.0,
    };
    let mut ctl = Controller::new(
        Box::new(MemoryUserStore::with_record("t", record)),
        Arc::new(clock.clone()),
        &test_config(),
    );
    ctl.sign_in("t", "t@example.com").await;

    assert_eq!(ctl.screen(), &Screen::Growth);
    assert_eq!(ctl.countdown().as_deref(), Some("01:00:00"));
    let view = ctl.state().growth_view();
    assert_eq!(view.target_bankroll, 900.0);
    assert_eq!(view.progress_pct, 100.0);

    // navigating back is allowed, starting is not
    assert!(ctl.dispatch(Event::BackToStart).await);
    ctl.dispatch(Event::SelectProfile(RiskProfile::Conservative)).await;
    ctl.dispatch(Event::StartSession {
        bankroll: 900.0,
        payout_percent: 87.0,
        now: clock.now_ms(),
    })
    .await;
    assert!(matches!(ctl.screen(), Screen::Planning { .. }));
    assert!(ctl
        .state()
        .last_error
        .as_deref()
        .unwrap_or_default()
        .starts_with("next session unlocks in"));
}

#[tokio::test]
async fn test_timer_unlock_returns_to_profile_selection() {
    let clock = ManualClock::new(T0);
    let record = UserRecord {
        lockout_until: Some(T0 + 2_000),
        ..Default::default()
    };
    let mut ctl = Controller::new(
        Box::new(MemoryUserStore::with_record("u", record)),
        Arc::new(clock.clone()),
        &test_config(),
    );
    ctl.sign_in("u", "").await;
    assert_eq!(ctl.screen(), &Screen::Lockout { until: T0 + 2_000 });

    clock.advance(2_000);
    let now = tokio::time::timeout(Duration::from_secs(2), ctl.lockout_expired())
        .await
        .expect("timer should fire");
    assert!(ctl.dispatch(Event::Unlock { now }).await);
    assert_eq!(ctl.screen(), &Screen::ProfileSelection);
    assert_eq!(ctl.countdown(), None);
}

#[tokio::test]
async fn test_failed_session_save_is_surfaced_but_proceeds() {
    let clock = ManualClock::new(T0);
    let store = FlakyStore::default();
    store.fail_save.store(true, Ordering::SeqCst);
    let mut ctl = Controller::new(Box::new(store), Arc::new(clock.clone()), &test_config());
    ctl.sign_in("u", "u@example.com").await;

    play_to_stop(&mut ctl, RiskProfile::Aggressive, 500.0, &[Outcome::Loss, Outcome::Loss]).await;
    assert!(matches!(
        ctl.screen(),
        Screen::Outcome {
            result: StopKind::LossStop,
            ..
        }
    ));

    ctl.dispatch(Event::EndSession { now: clock.now_ms() }).await;
    assert_eq!(ctl.screen(), &Screen::Growth);
    assert!(ctl.state().last_error.as_deref().unwrap_or_default().contains("write rejected"));
    // local state still carries the lockout
    assert_eq!(ctl.state().lockout_until, Some(T0 + LOCKOUT_MS));
    assert_eq!(ctl.state().current_bankroll, 400.0);
}

#[tokio::test]
async fn test_load_failure_does_not_overwrite_record() {
    let clock = ManualClock::new(T0);
    let store = FlakyStore::default();
    store
        .inner
        .save(
            "u",
            &RecordPatch::full(&UserRecord {
                email: "u@example.com".to_string(),
                bankroll: 777.0,
                ..Default::default()
            }),
        )
        .await
        .unwrap();
    store.fail_load.store(true, Ordering::SeqCst);

    let store = Arc::new(store);
    let mut ctl = Controller::new(Box::new(SharedStore(store.clone())), Arc::new(clock), &test_config());
    ctl.sign_in("u", "u@example.com").await;
    assert_eq!(ctl.screen(), &Screen::ProfileSelection);
    assert_eq!(store.inner.snapshot("u").map(|r| r.bankroll), Some(777.0));
}

#[tokio::test]
async fn test_goal_is_persisted() {
    let clock = ManualClock::new(T0);
    let mut ctl = Controller::new(Box::new(MemoryUserStore::new()), Arc::new(clock), &test_config());
    ctl.sign_in("u", "u@example.com").await;
    ctl.dispatch(Event::ViewGrowth).await;
    ctl.dispatch(Event::SetWithdrawalGoal("200".to_string())).await;

    let stored = ctl.store().load("u").await.unwrap().unwrap();
    assert_eq!(stored.withdrawal_goal, 200.0);
    assert_eq!(ctl.state().growth_view().target_bankroll, 4000.0);
}

/// Lets a test keep a handle on the store it hands to the controller.
struct SharedStore(Arc<FlakyStore>);

#[async_trait]
impl UserStore for SharedStore {
    async fn load(&self, user_id: &str) -> Result<Option<UserRecord>> {
        self.0.load(user_id).await
    }

    async fn save(&self, user_id: &str, patch: &RecordPatch) -> Result<()> {
        self.0.save(user_id, patch).await
    }

    fn name(&self) -> &'static str {
        self.0.name()
    }
}
