//! SQLite-backed progress store.
//!
//! Curriculum payloads and session snapshots are stored as JSON text, so the
//! schema stays stable while the item shapes evolve. All queries are bound at
//! runtime; the schema is created idempotently at connect time.

use async_trait::async_trait;
use growtalk_core::TutorError;
use growtalk_core::content::ExerciseItem;
use growtalk_core::session::{Mode, Outcome, SessionSnapshot};
use growtalk_core::store::ProgressStore;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use std::path::Path;
use tracing::info;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS curriculum (
        mode TEXT NOT NULL,
        position INTEGER NOT NULL,
        payload TEXT NOT NULL,
        PRIMARY KEY (mode, position)
    )",
    "CREATE TABLE IF NOT EXISTS sessions (
        student_id TEXT PRIMARY KEY,
        snapshot TEXT NOT NULL,
        updated_at TEXT NOT NULL DEFAULT (datetime('now'))
    )",
    "CREATE TABLE IF NOT EXISTS outcomes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        student_id TEXT NOT NULL,
        item_id TEXT NOT NULL,
        correct INTEGER NOT NULL,
        partial_score REAL,
        attempts_used INTEGER NOT NULL,
        hints_used INTEGER NOT NULL,
        completed_at TEXT NOT NULL
    )",
];

fn persist(error: impl std::fmt::Display) -> TutorError {
    TutorError::PersistenceFailure(error.to_string())
}

/// A wrapper around the SQLite pool providing the [`ProgressStore`] interface.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connects to `database_url` and ensures the schema exists.
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect(database_url)
            .await?;
        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        Ok(Self { pool })
    }

    /// Replaces the whole curriculum with `items`, preserving their order
    /// per mode. Returns the number of rows written.
    pub async fn seed_curriculum(&self, items: &[ExerciseItem]) -> anyhow::Result<usize> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM curriculum").execute(&mut *tx).await?;

        let mut positions: std::collections::HashMap<Mode, i64> = Default::default();
        for item in items {
            let position = positions.entry(item.mode()).or_insert(0);
            let payload = serde_json::to_string(item)?;
            sqlx::query("INSERT INTO curriculum (mode, position, payload) VALUES (?1, ?2, ?3)")
                .bind(item.mode().as_str())
                .bind(*position)
                .bind(payload)
                .execute(&mut *tx)
                .await?;
            *position += 1;
        }
        tx.commit().await?;
        Ok(items.len())
    }

    /// Seeds the curriculum from a JSON file containing an array of items.
    pub async fn seed_from_file(&self, path: &Path) -> anyhow::Result<usize> {
        let raw = tokio::fs::read_to_string(path).await?;
        let items: Vec<ExerciseItem> = serde_json::from_str(&raw)?;
        let count = self.seed_curriculum(&items).await?;
        info!(count, path = %path.display(), "curriculum seeded");
        Ok(count)
    }

    /// The recorded outcomes for a student, in append order.
    pub async fn outcomes_for(&self, student_id: &str) -> anyhow::Result<Vec<Outcome>> {
        let rows = sqlx::query(
            "SELECT item_id, correct, partial_score, attempts_used, hints_used, completed_at
             FROM outcomes WHERE student_id = ?1 ORDER BY id ASC",
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        let mut outcomes = Vec::with_capacity(rows.len());
        for row in rows {
            let completed_at: String = row.try_get("completed_at")?;
            outcomes.push(Outcome {
                item_id: row.try_get("item_id")?,
                correct: row.try_get::<i64, _>("correct")? != 0,
                partial_score: row.try_get("partial_score")?,
                attempts_used: row.try_get::<i64, _>("attempts_used")? as u32,
                hints_used: row.try_get::<i64, _>("hints_used")? as u32,
                completed_at: completed_at.parse()?,
            });
        }
        Ok(outcomes)
    }
}

#[async_trait]
impl ProgressStore for SqliteStore {
    async fn read_curriculum(
        &self,
        mode: Mode,
        cursor: usize,
    ) -> Result<Option<ExerciseItem>, TutorError> {
        let row = sqlx::query("SELECT payload FROM curriculum WHERE mode = ?1 AND position = ?2")
            .bind(mode.as_str())
            .bind(cursor as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(persist)?;
        match row {
            Some(row) => {
                let payload: String = row.try_get("payload").map_err(persist)?;
                let item = serde_json::from_str(&payload).map_err(persist)?;
                Ok(Some(item))
            }
            None => Ok(None),
        }
    }

    async fn read_session_state(
        &self,
        student_id: &str,
    ) -> Result<Option<SessionSnapshot>, TutorError> {
        let row = sqlx::query("SELECT snapshot FROM sessions WHERE student_id = ?1")
            .bind(student_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(persist)?;
        match row {
            Some(row) => {
                let snapshot: String = row.try_get("snapshot").map_err(persist)?;
                Ok(Some(serde_json::from_str(&snapshot).map_err(persist)?))
            }
            None => Ok(None),
        }
    }

    async fn write_session_state(
        &self,
        student_id: &str,
        snapshot: &SessionSnapshot,
    ) -> Result<(), TutorError> {
        let payload = serde_json::to_string(snapshot).map_err(persist)?;
        sqlx::query(
            "INSERT INTO sessions (student_id, snapshot, updated_at)
             VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(student_id) DO UPDATE
             SET snapshot = excluded.snapshot, updated_at = excluded.updated_at",
        )
        .bind(student_id)
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(persist)?;
        Ok(())
    }

    async fn append_outcome(
        &self,
        student_id: &str,
        outcome: &Outcome,
    ) -> Result<(), TutorError> {
        sqlx::query(
            "INSERT INTO outcomes
             (student_id, item_id, correct, partial_score, attempts_used, hints_used, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(student_id)
        .bind(&outcome.item_id)
        .bind(outcome.correct as i64)
        .bind(outcome.partial_score)
        .bind(outcome.attempts_used as i64)
        .bind(outcome.hints_used as i64)
        .bind(outcome.completed_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(persist)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use growtalk_core::content::VocabCard;
    use growtalk_core::session::{ClosedPhase, Cursors};

    async fn memory_store() -> SqliteStore {
        SqliteStore::connect("sqlite::memory:").await.unwrap()
    }

    fn vocab(id: &str) -> ExerciseItem {
        ExerciseItem::Vocab(VocabCard {
            id: id.to_string(),
            word: "adapt".to_string(),
            part_of_speech: "verb".to_string(),
            meaning: "to change to fit".to_string(),
            example: "Animals adapt.".to_string(),
            tip: None,
            root: None,
            memory_story: None,
        })
    }

    #[tokio::test]
    async fn curriculum_round_trips_in_order() {
        let store = memory_store().await;
        store
            .seed_curriculum(&[vocab("v1"), vocab("v2")])
            .await
            .unwrap();

        let first = store.read_curriculum(Mode::Vocab, 0).await.unwrap().unwrap();
        let second = store.read_curriculum(Mode::Vocab, 1).await.unwrap().unwrap();
        assert_eq!(first.id(), "v1");
        assert_eq!(second.id(), "v2");
        assert!(store.read_curriculum(Mode::Vocab, 2).await.unwrap().is_none());
        assert!(
            store
                .read_curriculum(Mode::ReadingClosed, 0)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn session_snapshot_upserts() {
        let store = memory_store().await;
        let mut snapshot = SessionSnapshot {
            mode: Mode::Vocab,
            item_id: Some("v1".to_string()),
            phase: ClosedPhase::Answering,
            attempt_count: 1,
            hint_level: 1,
            cursors: Cursors::default(),
        };
        store.write_session_state("s1", &snapshot).await.unwrap();

        snapshot.attempt_count = 2;
        store.write_session_state("s1", &snapshot).await.unwrap();

        let read = store.read_session_state("s1").await.unwrap().unwrap();
        assert_eq!(read, snapshot);
        assert!(store.read_session_state("s2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn outcomes_append_in_order() {
        let store = memory_store().await;
        for (item_id, correct) in [("a", true), ("b", false), ("a", true)] {
            store
                .append_outcome(
                    "s1",
                    &Outcome {
                        item_id: item_id.to_string(),
                        correct,
                        partial_score: None,
                        attempts_used: 1,
                        hints_used: 0,
                        completed_at: Utc::now(),
                    },
                )
                .await
                .unwrap();
        }

        let ids: Vec<_> = store
            .outcomes_for("s1")
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.item_id)
            .collect();
        assert_eq!(ids, vec!["a", "b", "a"]);
    }
}
