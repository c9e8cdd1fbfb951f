//! Per-user persistence behind a narrow load/save contract.
//!
//! The state machine never talks to a backend directly; the runtime holds a
//! `Box<dyn UserStore>` chosen from configuration.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{Config, StoreKind};
use crate::error::{Error, Result};
use crate::history::HistoryEntry;

pub mod remote;
pub mod sqlite;

pub use remote::RemoteUserStore;
pub use sqlite::SqliteUserStore;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserRecord {
    pub email: String,
    /// Legacy last-known bankroll, used when history is empty.
    pub bankroll: f64,
    pub history: Vec<HistoryEntry>,
    /// Epoch millis.
    pub lockout_until: Option<i64>,
    pub withdrawal_goal: f64,
}

impl UserRecord {
    /// Record written on first sign-in.
    pub fn new_for(email: &str) -> Self {
        Self {
            email: email.to_string(),
            ..Default::default()
        }
    }
}

/// Partial record; only `Some` fields are written (merge semantics).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bankroll: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<HistoryEntry>>,
    /// `Some(None)` clears the lockout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lockout_until: Option<Option<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub withdrawal_goal: Option<f64>,
}

impl RecordPatch {
    pub fn full(record: &UserRecord) -> Self {
        Self {
            email: Some(record.email.clone()),
            bankroll: Some(record.bankroll),
            history: Some(record.history.clone()),
            lockout_until: Some(record.lockout_until),
            withdrawal_goal: Some(record.withdrawal_goal),
        }
    }

    pub fn apply(&self, record: &mut UserRecord) {
        if let Some(email) = &self.email {
            record.email = email.clone();
        }
        if let Some(bankroll) = self.bankroll {
            record.bankroll = bankroll;
        }
        if let Some(history) = &self.history {
            record.history = history.clone();
        }
        if let Some(lockout_until) = self.lockout_until {
            record.lockout_until = lockout_until;
        }
        if let Some(goal) = self.withdrawal_goal {
            record.withdrawal_goal = goal;
        }
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// `Ok(None)` when the user has no record yet.
    async fn load(&self, user_id: &str) -> Result<Option<UserRecord>>;
    async fn save(&self, user_id: &str, patch: &RecordPatch) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Build the backend selected by `STORE`.
pub fn open_store(cfg: &Config) -> Result<Box<dyn UserStore>> {
    match cfg.store {
        StoreKind::Memory => Ok(Box::new(MemoryUserStore::new())),
        StoreKind::Sqlite => Ok(Box::new(SqliteUserStore::open(&cfg.sqlite_path)?)),
        StoreKind::Remote => {
            let (Some(url), Some(key)) = (&cfg.remote_url, &cfg.remote_api_key) else {
                return Err(Error::Configuration(
                    "remote store requires REMOTE_URL and REMOTE_API_KEY".to_string(),
                ));
            };
            Ok(Box::new(RemoteUserStore::new(url, key)?))
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryUserStore {
    records: Mutex<HashMap<String, UserRecord>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(user_id: &str, record: UserRecord) -> Self {
        let store = Self::new();
        if let Ok(mut records) = store.records.lock() {
            records.insert(user_id.to_string(), record);
        }
        store
    }

    pub fn snapshot(&self, user_id: &str) -> Option<UserRecord> {
        self.records.lock().ok()?.get(user_id).cloned()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn load(&self, user_id: &str) -> Result<Option<UserRecord>> {
        let records = self
            .records
            .lock()
            .map_err(|_| Error::Persistence("memory store poisoned".to_string()))?;
        Ok(records.get(user_id).cloned())
    }

    async fn save(&self, user_id: &str, patch: &RecordPatch) -> Result<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| Error::Persistence("memory store poisoned".to_string()))?;
        patch.apply(records.entry(user_id.to_string()).or_default());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
