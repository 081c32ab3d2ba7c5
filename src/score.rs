//! Win/loss counters persisted across rounds
//!
//! The record lives in a small SQLite key/value table under a fixed key, as
//! the JSON object `{"gamesPlayed": n, "gamesWon": n}`.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Key under which the record is stored
pub const SCORES_KEY: &str = "twentyQuestions_scores";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
";

#[derive(Error, Debug)]
pub enum ScoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Invalid score record: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Score store lock poisoned")]
    Poisoned,
}

pub type ScoreResult<T> = Result<T, ScoreError>;

/// Games played and won by the player
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRecord {
    pub games_played: u32,
    pub games_won: u32,
}

impl ScoreRecord {
    /// Count one finished round
    pub fn record(&mut self, won: bool) {
        self.games_played += 1;
        if won {
            self.games_won += 1;
        }
    }

    /// Rounded win rate in percent, 0 before any game
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // Bounded to 0..=100
    pub fn win_percentage(&self) -> u32 {
        if self.games_played == 0 {
            return 0;
        }
        (f64::from(self.games_won) * 100.0 / f64::from(self.games_played)).round() as u32
    }
}

/// Storage for the score record
#[async_trait]
pub trait ScoreStore: Send + Sync {
    /// Load the record; an absent key yields the default
    async fn load(&self) -> ScoreResult<ScoreRecord>;

    /// Replace the stored record
    async fn save(&self, record: &ScoreRecord) -> ScoreResult<()>;
}

#[async_trait]
impl<T: ScoreStore + ?Sized> ScoreStore for Arc<T> {
    async fn load(&self) -> ScoreResult<ScoreRecord> {
        (**self).load().await
    }

    async fn save(&self, record: &ScoreRecord) -> ScoreResult<()> {
        (**self).save(record).await
    }
}

/// SQLite-backed score store
#[derive(Clone)]
pub struct SqliteScoreStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteScoreStore {
    /// Open or create the database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> ScoreResult<Self> {
        Self::init(Connection::open(path)?)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> ScoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> ScoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn read(&self) -> ScoreResult<ScoreRecord> {
        let conn = self.conn.lock().map_err(|_| ScoreError::Poisoned)?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                params![SCORES_KEY],
                |row| row.get(0),
            )
            .optional()?;
        match raw {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(ScoreRecord::default()),
        }
    }

    fn write(&self, record: &ScoreRecord) -> ScoreResult<()> {
        let json = serde_json::to_string(record)?;
        let conn = self.conn.lock().map_err(|_| ScoreError::Poisoned)?;
        conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![SCORES_KEY, json],
        )?;
        Ok(())
    }
}

#[async_trait]
impl ScoreStore for SqliteScoreStore {
    async fn load(&self) -> ScoreResult<ScoreRecord> {
        self.read()
    }

    async fn save(&self, record: &ScoreRecord) -> ScoreResult<()> {
        self.write(record)
    }
}

/// In-memory score store
#[cfg(test)]
#[derive(Default)]
pub struct MemoryScoreStore {
    record: Mutex<Option<ScoreRecord>>,
}

#[cfg(test)]
#[async_trait]
impl ScoreStore for MemoryScoreStore {
    async fn load(&self) -> ScoreResult<ScoreRecord> {
        let record = self.record.lock().map_err(|_| ScoreError::Poisoned)?;
        Ok((*record).unwrap_or_default())
    }

    async fn save(&self, record: &ScoreRecord) -> ScoreResult<()> {
        *self.record.lock().map_err(|_| ScoreError::Poisoned)? = Some(*record);
        Ok(())
    }
}
