use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::plan::{validate_payout, StopWinPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Memory,
    Sqlite,
    Remote,
}

impl StoreKind {
    fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(StoreKind::Memory),
            "sqlite" => Ok(StoreKind::Sqlite),
            "remote" => Ok(StoreKind::Remote),
            other => Err(Error::Configuration(format!("unknown STORE '{}'", other))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreKind,
    pub sqlite_path: String,
    pub remote_url: Option<String>,
    pub remote_api_key: Option<String>,
    pub user_id: String,
    pub user_email: String,
    pub stop_win_policy: StopWinPolicy,
    pub default_payout_pct: f64,
    pub tick_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreKind::Sqlite,
            sqlite_path: "./bankboss.sqlite".to_string(),
            remote_url: None,
            remote_api_key: None,
            user_id: "local".to_string(),
            user_email: String::new(),
            stop_win_policy: StopWinPolicy::SafeGoal,
            default_payout_pct: 87.0,
            tick_ms: 1000,
        }
    }
}

impl Config {
    /// Read configuration from the environment. Misconfiguration is fatal.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let cfg = Self {
            store: get("STORE").map(|v| StoreKind::parse(&v)).transpose()?.unwrap_or(defaults.store),
            sqlite_path: get("SQLITE_PATH").unwrap_or(defaults.sqlite_path),
            remote_url: get("REMOTE_URL").filter(|v| !v.trim().is_empty()),
            remote_api_key: get("REMOTE_API_KEY").filter(|v| !v.trim().is_empty()),
            user_id: get("USER_ID").unwrap_or(defaults.user_id),
            user_email: get("USER_EMAIL").unwrap_or(defaults.user_email),
            stop_win_policy: get("STOP_WIN_POLICY")
                .map(|v| v.parse::<StopWinPolicy>())
                .transpose()?
                .unwrap_or(defaults.stop_win_policy),
            default_payout_pct: parse_number(get("DEFAULT_PAYOUT_PCT"), "DEFAULT_PAYOUT_PCT")?
                .unwrap_or(defaults.default_payout_pct),
            tick_ms: parse_number(get("TICK_MS"), "TICK_MS")?.unwrap_or(defaults.tick_ms),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.store == StoreKind::Remote && (self.remote_url.is_none() || self.remote_api_key.is_none()) {
            return Err(Error::Configuration(
                "STORE=remote requires REMOTE_URL and REMOTE_API_KEY".to_string(),
            ));
        }
        if self.user_id.trim().is_empty() {
            return Err(Error::Configuration("USER_ID must not be empty".to_string()));
        }
        if validate_payout(self.default_payout_pct).is_err() {
            return Err(Error::Configuration(format!(
                "DEFAULT_PAYOUT_PCT must be in (0, 100], got {}",
                self.default_payout_pct
            )));
        }
        if self.tick_ms == 0 {
            return Err(Error::Configuration("TICK_MS must be positive".to_string()));
        }
        Ok(())
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

fn parse_number<T: FromStr>(raw: Option<String>, key: &str) -> Result<Option<T>> {
    raw.map(|v| {
        v.trim()
            .parse::<T>()
            .map_err(|_| Error::Configuration(format!("{} must be a number, got '{}'", key, v)))
    })
    .transpose()
}
