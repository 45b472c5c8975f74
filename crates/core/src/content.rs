//! Exercise content and the curriculum-backed generator.
//!
//! An [`ExerciseItem`] is one unit of content (a vocabulary card, a
//! closed-form reading question, or an open-ended reading question) together
//! with everything needed to grade it and to build its hint ladder. Items are
//! immutable once fetched for a session.

use crate::error::TutorError;
use crate::session::{Cursors, Mode};
use crate::store::ProgressStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A vocabulary word with its study material.
///
/// The optional fields are authored content that feeds the hint ladder; a
/// sparse card still produces a complete ladder via generic fallbacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabCard {
    pub id: String,
    pub word: String,
    pub part_of_speech: String,
    /// The expected meaning, used as the match key.
    pub meaning: String,
    pub example: String,
    pub tip: Option<String>,
    pub root: Option<String>,
    pub memory_story: Option<String>,
}

/// A closed-form reading comprehension question with an exact-match key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedQuestion {
    pub id: String,
    pub passage: String,
    pub question: String,
    pub answer: String,
    /// Authored pointer at the relevant part of the passage, used by the
    /// second hint rung.
    pub focus_hint: Option<String>,
    pub explanation: Option<String>,
}

/// An open-ended reading question judged against a rubric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenQuestion {
    pub id: String,
    pub question: String,
    /// The learning objective the student should touch on.
    pub objective: String,
    pub model_answer: String,
}

/// One unit of exercise content with its grading criteria.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExerciseItem {
    Vocab(VocabCard),
    Closed(ClosedQuestion),
    Open(OpenQuestion),
}

impl ExerciseItem {
    pub fn id(&self) -> &str {
        match self {
            ExerciseItem::Vocab(card) => &card.id,
            ExerciseItem::Closed(question) => &question.id,
            ExerciseItem::Open(question) => &question.id,
        }
    }

    /// The session mode this item belongs to.
    pub fn mode(&self) -> Mode {
        match self {
            ExerciseItem::Vocab(_) => Mode::Vocab,
            ExerciseItem::Closed(_) => Mode::ReadingClosed,
            ExerciseItem::Open(_) => Mode::ReadingOpen,
        }
    }
}

/// Result of asking the generator for the next item.
///
/// Exhaustion is an explicit signal, not an error: the state machine uses it
/// to exit to `Idle` with a completion message.
#[derive(Debug, Clone)]
pub enum Fetched {
    Item(ExerciseItem),
    Exhausted,
}

/// Serves curriculum content in its fixed authored order.
///
/// The per-student, per-mode cursor lives in the session, so repeated calls
/// never repeat an item the student has already completed. When the sequence
/// runs out the cursor wraps to the start, so the next explicit exercise
/// start cycles through the curriculum again.
pub struct ExerciseGenerator {
    store: Arc<dyn ProgressStore>,
}

impl ExerciseGenerator {
    pub fn new(store: Arc<dyn ProgressStore>) -> Self {
        Self { store }
    }

    /// Fetches the item at the current cursor for `mode`.
    ///
    /// On exhaustion the cursor is reset to 0 and [`Fetched::Exhausted`] is
    /// returned.
    pub async fn next_item(
        &self,
        cursors: &mut Cursors,
        mode: Mode,
    ) -> Result<Fetched, TutorError> {
        let cursor = cursors.get(mode);
        match self.store.read_curriculum(mode, cursor).await? {
            Some(item) => Ok(Fetched::Item(item)),
            None => {
                cursors.set(mode, 0);
                Ok(Fetched::Exhausted)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn vocab(id: &str, word: &str) -> ExerciseItem {
        ExerciseItem::Vocab(VocabCard {
            id: id.to_string(),
            word: word.to_string(),
            part_of_speech: "noun".to_string(),
            meaning: word.to_string(),
            example: format!("An example with {word}."),
            tip: None,
            root: None,
            memory_story: None,
        })
    }

    #[tokio::test]
    async fn serves_items_in_curriculum_order() {
        let store = Arc::new(MemoryStore::new());
        store.seed(Mode::Vocab, vec![vocab("v1", "one"), vocab("v2", "two")]);
        let generator = ExerciseGenerator::new(store);
        let mut cursors = Cursors::default();

        for expected in ["v1", "v2"] {
            match generator.next_item(&mut cursors, Mode::Vocab).await.unwrap() {
                Fetched::Item(item) => assert_eq!(item.id(), expected),
                Fetched::Exhausted => panic!("curriculum should not be exhausted"),
            }
            cursors.advance(Mode::Vocab);
        }
    }

    #[tokio::test]
    async fn exhaustion_signals_and_wraps_cursor() {
        let store = Arc::new(MemoryStore::new());
        store.seed(Mode::Vocab, vec![vocab("v1", "one")]);
        let generator = ExerciseGenerator::new(store);
        let mut cursors = Cursors::default();
        cursors.set(Mode::Vocab, 1);

        assert!(matches!(
            generator.next_item(&mut cursors, Mode::Vocab).await.unwrap(),
            Fetched::Exhausted
        ));
        // The wrap means the next explicit start serves the sequence again.
        assert_eq!(cursors.get(Mode::Vocab), 0);
        assert!(matches!(
            generator.next_item(&mut cursors, Mode::Vocab).await.unwrap(),
            Fetched::Item(item) if item.id() == "v1"
        ));
    }

    #[tokio::test]
    async fn empty_curriculum_is_immediately_exhausted() {
        let store = Arc::new(MemoryStore::new());
        let generator = ExerciseGenerator::new(store);
        let mut cursors = Cursors::default();
        assert!(matches!(
            generator
                .next_item(&mut cursors, Mode::ReadingOpen)
                .await
                .unwrap(),
            Fetched::Exhausted
        ));
    }

    #[test]
    fn item_json_round_trip_keeps_kind_tag() {
        let item = vocab("v1", "adapt");
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains("\"kind\":\"vocab\""));
        let back: ExerciseItem = serde_json::from_str(&json).unwrap();
        assert_eq!(back, item);
    }
}
