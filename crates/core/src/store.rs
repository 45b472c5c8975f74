//! The progress store boundary.
//!
//! Durable tabular storage for curriculum content, per-student session
//! snapshots, and historical outcomes. The service crate provides a SQLite
//! implementation; [`MemoryStore`] backs tests and offline runs.

use crate::content::ExerciseItem;
use crate::error::TutorError;
use crate::session::{Mode, Outcome, SessionSnapshot};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Durable storage consumed by the session controller.
///
/// Implementations must support safe concurrent appends; outcome appends are
/// at-least-once, so a duplicate row is acceptable while reordering is not.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Reads the curriculum item at `cursor` for `mode`, `None` past the end.
    async fn read_curriculum(
        &self,
        mode: Mode,
        cursor: usize,
    ) -> Result<Option<ExerciseItem>, TutorError>;

    /// Reads the durable session snapshot for a student, if any.
    async fn read_session_state(
        &self,
        student_id: &str,
    ) -> Result<Option<SessionSnapshot>, TutorError>;

    /// Upserts the durable session snapshot for a student.
    async fn write_session_state(
        &self,
        student_id: &str,
        snapshot: &SessionSnapshot,
    ) -> Result<(), TutorError>;

    /// Appends one outcome to the student's history, preserving order.
    async fn append_outcome(&self, student_id: &str, outcome: &Outcome)
    -> Result<(), TutorError>;
}

#[derive(Default)]
struct MemoryInner {
    curriculum: HashMap<Mode, Vec<ExerciseItem>>,
    sessions: HashMap<String, SessionSnapshot>,
    outcomes: HashMap<String, Vec<Outcome>>,
}

/// In-memory [`ProgressStore`].
///
/// Write failures can be injected to exercise the recorder's
/// persistence-failure path.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the curriculum sequence for `mode`.
    pub fn seed(&self, mode: Mode, items: Vec<ExerciseItem>) {
        self.inner.lock().unwrap().curriculum.insert(mode, items);
    }

    /// Makes every subsequent write fail with a persistence error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// The recorded outcomes for a student, in append order.
    pub fn outcomes_for(&self, student_id: &str) -> Vec<Outcome> {
        self.inner
            .lock()
            .unwrap()
            .outcomes
            .get(student_id)
            .cloned()
            .unwrap_or_default()
    }

    /// The stored snapshot for a student, if any.
    pub fn snapshot_for(&self, student_id: &str) -> Option<SessionSnapshot> {
        self.inner.lock().unwrap().sessions.get(student_id).cloned()
    }

    fn check_writable(&self) -> Result<(), TutorError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(TutorError::PersistenceFailure(
                "memory store writes disabled".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn read_curriculum(
        &self,
        mode: Mode,
        cursor: usize,
    ) -> Result<Option<ExerciseItem>, TutorError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .curriculum
            .get(&mode)
            .and_then(|items| items.get(cursor))
            .cloned())
    }

    async fn read_session_state(
        &self,
        student_id: &str,
    ) -> Result<Option<SessionSnapshot>, TutorError> {
        Ok(self.inner.lock().unwrap().sessions.get(student_id).cloned())
    }

    async fn write_session_state(
        &self,
        student_id: &str,
        snapshot: &SessionSnapshot,
    ) -> Result<(), TutorError> {
        self.check_writable()?;
        self.inner
            .lock()
            .unwrap()
            .sessions
            .insert(student_id.to_string(), snapshot.clone());
        Ok(())
    }

    async fn append_outcome(
        &self,
        student_id: &str,
        outcome: &Outcome,
    ) -> Result<(), TutorError> {
        self.check_writable()?;
        self.inner
            .lock()
            .unwrap()
            .outcomes
            .entry(student_id.to_string())
            .or_default()
            .push(outcome.clone());
        Ok(())
    }
}
