//! Durable persistence of session progress.
//!
//! Writes run inline on the message-handling path, under the student's
//! session lock, so a later snapshot or outcome can never land before an
//! earlier one. A persistence failure is logged and never alters the
//! conversational reply; the next sync rewrites the full snapshot
//! (at-least-once semantics).

use crate::session::{Outcome, SessionSnapshot};
use crate::store::ProgressStore;
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub struct ProgressRecorder {
    store: Arc<dyn ProgressStore>,
}

impl ProgressRecorder {
    pub fn new(store: Arc<dyn ProgressStore>) -> Self {
        Self { store }
    }

    /// Appends a completed-item outcome to durable history.
    pub async fn record(&self, student_id: &str, outcome: &Outcome) {
        if let Err(error) = self.store.append_outcome(student_id, outcome).await {
            warn!(%student_id, item_id = %outcome.item_id, %error, "failed to record outcome");
        }
    }

    /// Upserts the durable subset of a session.
    pub async fn sync(&self, student_id: &str, snapshot: &SessionSnapshot) {
        if let Err(error) = self.store.write_session_state(student_id, snapshot).await {
            warn!(%student_id, %error, "failed to sync session state");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Mode;
    use crate::store::MemoryStore;
    use chrono::Utc;

    fn outcome(item_id: &str) -> Outcome {
        Outcome {
            item_id: item_id.to_string(),
            correct: true,
            partial_score: None,
            attempts_used: 1,
            hints_used: 0,
            completed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn record_appends_to_the_store() {
        let store = Arc::new(MemoryStore::new());
        let recorder = ProgressRecorder::new(store.clone());
        recorder.record("s1", &outcome("a")).await;
        recorder.record("s1", &outcome("b")).await;
        let ids: Vec<_> = store
            .outcomes_for("s1")
            .into_iter()
            .map(|o| o.item_id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn persistence_failure_is_swallowed() {
        let store = Arc::new(MemoryStore::new());
        store.fail_writes(true);
        let recorder = ProgressRecorder::new(store.clone());
        recorder.record("s1", &outcome("a")).await;
        recorder
            .sync(
                "s1",
                &SessionSnapshot {
                    mode: Mode::Idle,
                    item_id: None,
                    phase: Default::default(),
                    attempt_count: 0,
                    hint_level: 0,
                    cursors: Default::default(),
                },
            )
            .await;
        // Nothing persisted, nothing panicked.
        assert!(store.outcomes_for("s1").is_empty());
        assert!(store.snapshot_for("s1").is_none());
    }
}
