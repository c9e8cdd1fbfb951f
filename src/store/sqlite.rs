use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use super::{RecordPatch, UserRecord, UserStore};
use crate::error::{Error, Result};

/// Single-file store: one row per user, history kept as a JSON array.
pub struct SqliteUserStore {
    conn: Mutex<Connection>,
}

impl SqliteUserStore {
    pub fn open(path: &str) -> Result<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let store = Self { conn: Mutex::new(conn) };
        store.init()?;
        Ok(store)
    }

    fn init(&self) -> Result<()> {
        self.conn()?.execute_batch(
            "BEGIN;
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL DEFAULT '',
                bankroll REAL NOT NULL DEFAULT 0,
                history TEXT NOT NULL DEFAULT '[]',
                lockout_until INTEGER,
                withdrawal_goal REAL NOT NULL DEFAULT 0
            );
            COMMIT;",
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Persistence("sqlite connection poisoned".to_string()))
    }

    fn read(conn: &Connection, user_id: &str) -> Result<Option<UserRecord>> {
        let row = conn
            .query_row(
                "SELECT email, bankroll, history, lockout_until, withdrawal_goal
                 FROM users WHERE id = ?1",
                params![user_id],
                |r| {
                    Ok((
                        r.get::<_, String>(0)?,
                        r.get::<_, f64>(1)?,
                        r.get::<_, String>(2)?,
                        r.get::<_, Option<i64>>(3)?,
                        r.get::<_, f64>(4)?,
                    ))
                },
            )
            .optional()?;

        match row {
            None => Ok(None),
            Some((email, bankroll, history, lockout_until, withdrawal_goal)) => Ok(Some(UserRecord {
                email,
                bankroll,
                history: serde_json::from_str(&history)?,
                lockout_until,
                withdrawal_goal,
            })),
        }
    }
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn load(&self, user_id: &str) -> Result<Option<UserRecord>> {
        let conn = self.conn()?;
        Self::read(&conn, user_id)
    }

    async fn save(&self, user_id: &str, patch: &RecordPatch) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut record = Self::read(&tx, user_id)?.unwrap_or_default();
        patch.apply(&mut record);
        tx.execute(
            "INSERT INTO users (id, email, bankroll, history, lockout_until, withdrawal_goal)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                email = excluded.email,
                bankroll = excluded.bankroll,
                history = excluded.history,
                lockout_until = excluded.lockout_until,
                withdrawal_goal = excluded.withdrawal_goal",
            params![
                user_id,
                record.email,
                record.bankroll,
                serde_json::to_string(&record.history)?,
                record.lockout_until,
                record.withdrawal_goal
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}
