use deuce_core::config::MatchFormat;
use deuce_core::history::{History, HistoryEntry};
use deuce_core::score::ScoreState;
use deuce_core::types::{MatchId, MatchStatus, PlayerId, Players};
use deuce_core::{HistoryChange, Match, MatchLog};
use sqlx::postgres::PgPool;
use sqlx::types::Json;
use sqlx::Row;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt row for match {0}: {1}")]
    Corrupt(MatchId, String),

    #[error("Match {0} not found")]
    NotFound(MatchId),

    #[error("Match {0} already exists")]
    Duplicate(MatchId),

    #[error("Version conflict: expected {expected}, found {actual}")]
    Conflict { expected: u64, actual: u64 },

    #[error("Store unavailable")]
    Unavailable,
}

/// One accepted command, ready to be persisted.
#[derive(Debug, Clone)]
pub struct Commit {
    pub record: Match,
    /// Version the row must still have for the write to land.
    pub expected_version: u64,
    pub change: HistoryChange,
}

#[derive(Clone)]
pub enum Store {
    Postgres(PgStore),
    Memory(MemoryStore),
}

impl Store {
    pub fn postgres(db: PgPool) -> Self {
        Self::Postgres(PgStore { db })
    }

    pub fn memory() -> Self {
        Self::Memory(MemoryStore::default())
    }

    pub async fn create(&self, log: &MatchLog) -> Result<(), StoreError> {
        match self {
            Self::Postgres(s) => s.create(log).await,
            Self::Memory(s) => s.create(log).await,
        }
    }

    pub async fn load(&self, id: &MatchId) -> Result<MatchLog, StoreError> {
        match self {
            Self::Postgres(s) => s.load(id).await,
            Self::Memory(s) => s.load(id).await,
        }
    }

    /// Compare-and-set on `version`; history is changed in the same write.
    pub async fn save(&self, commit: &Commit) -> Result<(), StoreError> {
        match self {
            Self::Postgres(s) => s.save(commit).await,
            Self::Memory(s) => s.save(commit).await,
        }
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    matches: Arc<Mutex<HashMap<MatchId, MatchLog>>>,
    failures: Arc<AtomicUsize>,
}

impl MemoryStore {
    /// Makes the next `n` saves fail with [`StoreError::Unavailable`].
    #[cfg(test)]
    pub fn fail_next_saves(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }

    async fn create(&self, log: &MatchLog) -> Result<(), StoreError> {
        let mut matches = self.matches.lock().await;
        if matches.contains_key(&log.record.id) {
            return Err(StoreError::Duplicate(log.record.id.clone()));
        }
        matches.insert(log.record.id.clone(), log.clone());
        Ok(())
    }

    async fn load(&self, id: &MatchId) -> Result<MatchLog, StoreError> {
        self.matches
            .lock()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    async fn save(&self, commit: &Commit) -> Result<(), StoreError> {
        let injected = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if injected.is_ok() {
            return Err(StoreError::Unavailable);
        }

        let mut matches = self.matches.lock().await;
        let id = &commit.record.id;
        let stored = matches
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        if stored.record.version != commit.expected_version {
            return Err(StoreError::Conflict {
                expected: commit.expected_version,
                actual: stored.record.version,
            });
        }

        let mut entries = stored.history.entries().to_vec();
        match &commit.change {
            HistoryChange::Append(entry) => entries.push(entry.clone()),
            HistoryChange::Pop => {
                entries.pop();
            }
        }
        stored.history = History::from_entries(entries);
        stored.record = commit.record.clone();
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgStore {
    pub db: PgPool,
}

impl PgStore {
    async fn create(&self, log: &MatchLog) -> Result<(), StoreError> {
        let r = &log.record;
        let res = sqlx::query(
            "INSERT INTO matches (id, player1_id, player2_id, format, status, winner_id, score, version)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(r.id.as_str())
        .bind(r.players.player1.as_str())
        .bind(r.players.player2.as_str())
        .bind(Json(&r.format))
        .bind(r.status.to_string())
        .bind(r.winner_id.as_ref().map(PlayerId::as_str))
        .bind(Json(&r.score))
        .bind(r.version as i64)
        .execute(&self.db)
        .await?;

        if res.rows_affected() == 0 {
            return Err(StoreError::Duplicate(r.id.clone()));
        }
        Ok(())
    }

    async fn load(&self, id: &MatchId) -> Result<MatchLog, StoreError> {
        let row = sqlx::query(
            "SELECT player1_id, player2_id, format, status, winner_id, score, version
             FROM matches WHERE id = $1",
        )
        .bind(id.as_str())
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        let status_str: String = row.try_get("status")?;
        let status = MatchStatus::from_str(&status_str)
            .map_err(|_| StoreError::Corrupt(id.clone(), format!("status '{}'", status_str)))?;
        let format: Json<MatchFormat> = row.try_get("format")?;
        let score: Json<ScoreState> = row.try_get("score")?;
        let version: i64 = row.try_get("version")?;
        let winner_id: Option<String> = row.try_get("winner_id")?;

        let record = Match {
            id: id.clone(),
            players: Players::new(
                row.try_get::<String, _>("player1_id")?,
                row.try_get::<String, _>("player2_id")?,
            ),
            format: format.0,
            status,
            winner_id: winner_id.map(PlayerId::from),
            score: score.0,
            version: version as u64,
        };

        let rows = sqlx::query("SELECT entry FROM score_history WHERE match_id = $1 ORDER BY seq")
            .bind(id.as_str())
            .fetch_all(&self.db)
            .await?;
        let entries = rows
            .iter()
            .map(|r| r.try_get::<Json<HistoryEntry>, _>("entry").map(|j| j.0))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(MatchLog {
            record,
            history: History::from_entries(entries),
        })
    }

    async fn save(&self, commit: &Commit) -> Result<(), StoreError> {
        let r = &commit.record;
        let mut tx = self.db.begin().await?;

        let updated = sqlx::query(
            "UPDATE matches
             SET status = $1, winner_id = $2, score = $3, version = $4, updated_at = NOW()
             WHERE id = $5 AND version = $6",
        )
        .bind(r.status.to_string())
        .bind(r.winner_id.as_ref().map(PlayerId::as_str))
        .bind(Json(&r.score))
        .bind(r.version as i64)
        .bind(r.id.as_str())
        .bind(commit.expected_version as i64)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            let current: Option<i64> =
                sqlx::query_scalar("SELECT version FROM matches WHERE id = $1")
                    .bind(r.id.as_str())
                    .fetch_optional(&mut *tx)
                    .await?;
            return Err(match current {
                Some(actual) => StoreError::Conflict {
                    expected: commit.expected_version,
                    actual: actual as u64,
                },
                None => StoreError::NotFound(r.id.clone()),
            });
        }

        match &commit.change {
            HistoryChange::Append(entry) => {
                sqlx::query(
                    "INSERT INTO score_history (match_id, seq, entry, recorded_at)
                     SELECT $1, COALESCE(MAX(seq) + 1, 0), $2, $3
                     FROM score_history WHERE match_id = $1",
                )
                .bind(r.id.as_str())
                .bind(Json(entry))
                .bind(entry.timestamp)
                .execute(&mut *tx)
                .await?;
            }
            HistoryChange::Pop => {
                sqlx::query(
                    "DELETE FROM score_history
                     WHERE match_id = $1
                       AND seq = (SELECT MAX(seq) FROM score_history WHERE match_id = $1)",
                )
                .bind(r.id.as_str())
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use deuce_core::{apply, Command, MatchSetup};

    fn pending() -> MatchLog {
        let record = MatchSetup::builder()
            .id("m1")
            .players(Players::new("a", "b"))
            .build()
            .create()
            .unwrap();
        MatchLog::new(record)
    }

    fn commit_for(log: &MatchLog, command: &Command) -> (MatchLog, Commit) {
        let t = apply(log, command, Utc::now()).unwrap();
        let commit = Commit {
            record: t.log.record.clone(),
            expected_version: log.record.version,
            change: t.change.clone(),
        };
        (t.log, commit)
    }

    #[tokio::test]
    async fn memory_store_round_trips_commits() {
        let store = Store::memory();
        let log = pending();
        store.create(&log).await.unwrap();
        assert!(matches!(
            store.create(&log).await,
            Err(StoreError::Duplicate(_))
        ));

        let (log, c) = commit_for(&log, &Command::Start);
        store.save(&c).await.unwrap();
        let point = Command::AwardPoint {
            winning_player_id: "a".into(),
            point_type: Default::default(),
        };
        let (log, c) = commit_for(&log, &point);
        store.save(&c).await.unwrap();
        let (log, c) = commit_for(&log, &Command::Undo);
        store.save(&c).await.unwrap();

        let loaded = store.load(&"m1".into()).await.unwrap();
        assert_eq!(loaded, log);
        assert_eq!(loaded.history.len(), 1);
    }

    #[tokio::test]
    async fn memory_store_rejects_stale_versions() {
        let store = Store::memory();
        let log = pending();
        store.create(&log).await.unwrap();
        let (_, c) = commit_for(&log, &Command::Start);
        store.save(&c).await.unwrap();

        let err = store.save(&c).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Conflict {
                expected: 0,
                actual: 1
            }
        ));
    }

    #[tokio::test]
    async fn injected_failures_leave_the_row_alone() {
        let memory = MemoryStore::default();
        memory.fail_next_saves(1);
        let store = Store::Memory(memory);
        let log = pending();
        store.create(&log).await.unwrap();

        let (_, c) = commit_for(&log, &Command::Start);
        assert!(matches!(store.save(&c).await, Err(StoreError::Unavailable)));
        assert_eq!(store.load(&"m1".into()).await.unwrap(), log);
        store.save(&c).await.unwrap();
    }

    #[tokio::test]
    async fn unknown_match_is_not_found() {
        let store = Store::memory();
        assert!(matches!(
            store.load(&"nope".into()).await,
            Err(StoreError::NotFound(_))
        ));
    }
}
