//! Per-student session state.
//!
//! A [`StudentSession`] is owned exclusively by the session engine for the
//! lifetime of a conversation. The durable subset of its fields is captured
//! in a [`SessionSnapshot`], which the engine syncs to the progress store
//! after every handled message so a session can be reconstructed after a
//! process restart.

use crate::content::ExerciseItem;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The active exercise mode of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Idle,
    Vocab,
    ReadingClosed,
    ReadingOpen,
}

impl Mode {
    /// Stable string form, used as a storage key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Idle => "idle",
            Mode::Vocab => "vocab",
            Mode::ReadingClosed => "reading_closed",
            Mode::ReadingOpen => "reading_open",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sub-phase of a closed reading item.
///
/// After a correct answer the student is asked to explain their reasoning
/// before the item completes; the session stays in `ReadingClosed` the whole
/// time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosedPhase {
    #[default]
    Answering,
    Reflection,
}

/// The exercise currently in front of the student.
#[derive(Debug, Clone)]
pub struct ActiveItem {
    pub item: ExerciseItem,
    pub phase: ClosedPhase,
}

impl ActiveItem {
    pub fn new(item: ExerciseItem) -> Self {
        Self {
            item,
            phase: ClosedPhase::Answering,
        }
    }
}

/// Per-mode curriculum cursors.
///
/// Each cursor is the position of the item currently (or next) served for
/// that mode. Cursors only move forward within one pass through the
/// curriculum, so no item repeats until the sequence is exhausted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursors {
    pub vocab: usize,
    pub reading_closed: usize,
    pub reading_open: usize,
}

impl Cursors {
    pub fn get(&self, mode: Mode) -> usize {
        match mode {
            Mode::Idle => 0,
            Mode::Vocab => self.vocab,
            Mode::ReadingClosed => self.reading_closed,
            Mode::ReadingOpen => self.reading_open,
        }
    }

    pub fn set(&mut self, mode: Mode, value: usize) {
        match mode {
            Mode::Idle => {}
            Mode::Vocab => self.vocab = value,
            Mode::ReadingClosed => self.reading_closed = value,
            Mode::ReadingOpen => self.reading_open = value,
        }
    }

    pub fn advance(&mut self, mode: Mode) {
        self.set(mode, self.get(mode) + 1);
    }
}

/// Immutable record of how a student resolved one exercise item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub item_id: String,
    pub correct: bool,
    /// Judge confidence for open questions, when available.
    pub partial_score: Option<f32>,
    pub attempts_used: u32,
    pub hints_used: u32,
    pub completed_at: DateTime<Utc>,
}

/// The durable subset of a [`StudentSession`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub mode: Mode,
    pub item_id: Option<String>,
    pub phase: ClosedPhase,
    pub attempt_count: u32,
    pub hint_level: u32,
    pub cursors: Cursors,
}

/// One student's dialogue state.
///
/// Invariants, upheld by the mutating methods below:
/// - `mode == Idle` exactly when `current_item` is `None`;
/// - `attempt_count` and `hint_level` reset to 0 on every item change;
/// - `hint_level` never decreases while one item is active;
/// - `history` is append-only.
#[derive(Debug)]
pub struct StudentSession {
    pub student_id: String,
    pub mode: Mode,
    pub current_item: Option<ActiveItem>,
    pub attempt_count: u32,
    pub hint_level: u32,
    pub history: Vec<Outcome>,
    pub cursors: Cursors,
}

impl StudentSession {
    /// A fresh idle session, created lazily on first contact.
    pub fn new(student_id: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            mode: Mode::Idle,
            current_item: None,
            attempt_count: 0,
            hint_level: 0,
            history: Vec::new(),
            cursors: Cursors::default(),
        }
    }

    /// Rebuilds a session from its durable snapshot.
    ///
    /// `item` is the re-fetched current item for the snapshot's cursor; when
    /// it is absent (curriculum changed underneath us, or the snapshot was
    /// idle) the session degrades to `Idle` with the cursors preserved.
    pub fn from_snapshot(
        student_id: impl Into<String>,
        snapshot: SessionSnapshot,
        item: Option<ExerciseItem>,
    ) -> Self {
        let mut session = Self::new(student_id);
        session.cursors = snapshot.cursors;
        if snapshot.mode != Mode::Idle {
            if let Some(item) = item {
                session.mode = snapshot.mode;
                session.current_item = Some(ActiveItem {
                    item,
                    phase: snapshot.phase,
                });
                session.attempt_count = snapshot.attempt_count;
                session.hint_level = snapshot.hint_level;
            }
        }
        session
    }

    /// Starts a new item, entering the awaiting state for `mode`.
    pub fn start_item(&mut self, mode: Mode, item: ExerciseItem) {
        debug_assert_ne!(mode, Mode::Idle);
        self.mode = mode;
        self.current_item = Some(ActiveItem::new(item));
        self.attempt_count = 0;
        self.hint_level = 0;
    }

    /// Discards the current item and returns to `Idle`, clearing counters.
    pub fn clear_to_idle(&mut self) {
        self.mode = Mode::Idle;
        self.current_item = None;
        self.attempt_count = 0;
        self.hint_level = 0;
    }

    /// Appends a completed-item outcome. History is append-only.
    pub fn complete(&mut self, outcome: Outcome) {
        self.history.push(outcome);
    }

    /// Raises the hint level toward `max`, never lowering it.
    pub fn escalate_hint(&mut self, max: u32) {
        self.hint_level = (self.hint_level + 1).min(max).max(self.hint_level);
    }

    /// The durable subset of this session.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            mode: self.mode,
            item_id: self
                .current_item
                .as_ref()
                .map(|active| active.item.id().to_string()),
            phase: self
                .current_item
                .as_ref()
                .map(|active| active.phase)
                .unwrap_or_default(),
            attempt_count: self.attempt_count,
            hint_level: self.hint_level,
            cursors: self.cursors,
        }
    }

    /// Checks the `Idle` ⇔ no-current-item invariant.
    pub fn is_consistent(&self) -> bool {
        (self.mode == Mode::Idle) == self.current_item.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ExerciseItem, VocabCard};

    fn card(id: &str) -> ExerciseItem {
        ExerciseItem::Vocab(VocabCard {
            id: id.to_string(),
            word: "adapt".to_string(),
            part_of_speech: "verb".to_string(),
            meaning: "to change to suit a new situation".to_string(),
            example: "Animals adapt to their environment.".to_string(),
            tip: Some("Think of AD-just".to_string()),
            root: None,
            memory_story: None,
        })
    }

    #[test]
    fn new_session_is_idle_and_consistent() {
        let session = StudentSession::new("85212345678");
        assert_eq!(session.mode, Mode::Idle);
        assert!(session.current_item.is_none());
        assert!(session.is_consistent());
    }

    #[test]
    fn start_item_resets_counters() {
        let mut session = StudentSession::new("s1");
        session.start_item(Mode::Vocab, card("v1"));
        session.attempt_count = 2;
        session.escalate_hint(3);
        session.escalate_hint(3);

        session.start_item(Mode::Vocab, card("v2"));
        assert_eq!(session.attempt_count, 0);
        assert_eq!(session.hint_level, 0);
        assert!(session.is_consistent());
    }

    #[test]
    fn escalate_hint_is_monotone_and_clamped() {
        let mut session = StudentSession::new("s1");
        session.start_item(Mode::Vocab, card("v1"));
        let mut last = session.hint_level;
        for _ in 0..10 {
            session.escalate_hint(3);
            assert!(session.hint_level >= last);
            last = session.hint_level;
        }
        assert_eq!(session.hint_level, 3);
    }

    #[test]
    fn snapshot_round_trips_through_serde() {
        let mut session = StudentSession::new("s1");
        session.start_item(Mode::ReadingClosed, card("q1"));
        session.attempt_count = 1;
        session.escalate_hint(3);
        session.cursors.advance(Mode::Vocab);

        let snapshot = session.snapshot();
        let json = serde_json::to_string(&snapshot).unwrap();
        let restored: SessionSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(snapshot, restored);
    }

    #[test]
    fn from_snapshot_degrades_to_idle_without_an_item() {
        let mut session = StudentSession::new("s1");
        session.start_item(Mode::Vocab, card("v1"));
        session.cursors.set(Mode::Vocab, 4);
        let snapshot = session.snapshot();

        let restored = StudentSession::from_snapshot("s1", snapshot, None);
        assert_eq!(restored.mode, Mode::Idle);
        assert!(restored.is_consistent());
        // Cursors survive the degrade so progress is not lost.
        assert_eq!(restored.cursors.get(Mode::Vocab), 4);
    }

    #[test]
    fn from_snapshot_restores_an_active_item() {
        let mut session = StudentSession::new("s1");
        session.start_item(Mode::Vocab, card("v1"));
        session.attempt_count = 2;
        session.escalate_hint(3);
        let snapshot = session.snapshot();

        let restored = StudentSession::from_snapshot("s1", snapshot, Some(card("v1")));
        assert_eq!(restored.mode, Mode::Vocab);
        assert_eq!(restored.attempt_count, 2);
        assert_eq!(restored.hint_level, 1);
        assert!(restored.is_consistent());
    }
}
