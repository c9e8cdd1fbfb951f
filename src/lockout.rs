//! 24-hour cool-down between sessions.
//!
//! The lock itself is just a timestamp compared against the clock. The
//! [`LockoutTimer`] turns it into a live `HH:MM:SS` countdown and a one-shot
//! unlock signal.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::clock::Clock;

pub const LOCKOUT_MS: i64 = 24 * 60 * 60 * 1000;

/// Lockout deadline for a session ending at `now_ms`.
pub fn arm(now_ms: i64) -> i64 {
    now_ms + LOCKOUT_MS
}

pub fn is_locked(lockout_until: Option<i64>, now_ms: i64) -> bool {
    matches!(lockout_until, Some(until) if now_ms < until)
}

pub fn remaining_ms(until: i64, now_ms: i64) -> i64 {
    (until - now_ms).max(0)
}

/// Seconds are rounded up, so `00:00:00` only shows once the lock expired.
pub fn format_countdown(remaining_ms: i64) -> String {
    if remaining_ms <= 0 {
        return "00:00:00".to_string();
    }
    let secs = (remaining_ms + 999) / 1000;
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Countdown task for one armed lockout. Dropping the handle stops the task.
#[derive(Debug)]
pub struct LockoutTimer {
    until: i64,
    countdown: watch::Receiver<String>,
    unlock: Option<oneshot::Receiver<i64>>,
    task: JoinHandle<()>,
}

impl LockoutTimer {
    /// Must be called inside a tokio runtime.
    pub fn start(until: i64, clock: Arc<dyn Clock>, period: Duration) -> Self {
        let (countdown_tx, countdown) =
            watch::channel(format_countdown(remaining_ms(until, clock.now_ms())));
        let (unlock_tx, unlock) = oneshot::channel();

        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let now = clock.now_ms();
                let remaining = remaining_ms(until, now);
                countdown_tx.send_replace(format_countdown(remaining));
                if remaining == 0 {
                    let _ = unlock_tx.send(now);
                    break;
                }
            }
        });

        Self {
            until,
            countdown,
            unlock: Some(unlock),
            task,
        }
    }

    pub fn until(&self) -> i64 {
        self.until
    }

    pub fn countdown(&self) -> String {
        self.countdown.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.countdown.clone()
    }

    /// Resolves once with the unlock time. Pending forever afterwards, or if
    /// the timer was cancelled, so it is safe inside `tokio::select!`.
    pub async fn unlocked(&mut self) -> i64 {
        if let Some(rx) = self.unlock.as_mut() {
            let fired = rx.await;
            self.unlock = None;
            if let Ok(now) = fired {
                return now;
            }
        }
        std::future::pending().await
    }

    pub fn cancel(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for LockoutTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
