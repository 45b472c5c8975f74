//! Hint escalation policy.
//!
//! A pure function of `(item, hint_level)`. Each item kind carries a fixed
//! hint ladder; levels past the end clamp to the last rung, and
//! `is_final_reveal` is true exactly on that last rung. Ladder length and
//! per-mode `max_attempts` are configured independently; whichever bound is
//! hit first ends the item.

use crate::content::{ClosedQuestion, ExerciseItem, OpenQuestion, VocabCard};

/// One rung of an item's hint ladder.
#[derive(Debug, Clone, PartialEq)]
pub struct Hint {
    pub text: String,
    pub is_final_reveal: bool,
}

/// The index of the last rung of `item`'s ladder (the full reveal).
pub fn last_rung(item: &ExerciseItem) -> u32 {
    match item {
        ExerciseItem::Vocab(_) | ExerciseItem::Closed(_) => 3,
        ExerciseItem::Open(_) => 2,
    }
}

/// The hint for `item` at `hint_level`, clamped to the ladder's last rung.
///
/// Level 0 is the gentle nudge that accompanies the opening question; each
/// wrong attempt escalates one rung.
pub fn next_hint(item: &ExerciseItem, hint_level: u32) -> Hint {
    let level = hint_level.min(last_rung(item));
    let text = match item {
        ExerciseItem::Vocab(card) => vocab_hint(card, level),
        ExerciseItem::Closed(question) => closed_hint(question, level),
        ExerciseItem::Open(question) => open_hint(question, level),
    };
    Hint {
        text,
        is_final_reveal: level == last_rung(item),
    }
}

fn vocab_hint(card: &VocabCard, level: u32) -> String {
    match level {
        0 => format!(
            "No pressure — just say what you think \"{}\" might mean, in your own words.",
            card.word
        ),
        1 => match &card.tip {
            Some(tip) => format!("Not quite. Here's a tip: {tip} Have another guess!"),
            None => format!(
                "Not quite. Think about situations where you might hear \"{}\" — have another guess!",
                card.word
            ),
        },
        2 => {
            let mut text = format!(
                "Let's look at it in a sentence: \"{}\" What does \"{}\" seem to mean there?",
                card.example, card.word
            );
            if let Some(root) = &card.root {
                text.push_str(&format!(" (Word root: {root})"));
            }
            text
        }
        _ => {
            let mut text = format!(
                "Here's the answer: \"{}\" ({}) means {}.",
                card.word, card.part_of_speech, card.meaning
            );
            if let Some(story) = &card.memory_story {
                text.push_str(&format!(" A way to remember it: {story}"));
            }
            text.push_str(" Let's try the next one!");
            text
        }
    }
}

fn closed_hint(question: &ClosedQuestion, level: u32) -> String {
    match level {
        0 => "Take your time with the passage, then answer in your own words.".to_string(),
        1 => format!(
            "Not quite — read the passage once more and look for the part that matches the \
             question. Try again: {}",
            question.question
        ),
        2 => {
            let focus = question.focus_hint.clone().unwrap_or_else(|| {
                "pick out the key words of the question and find the sentence that mentions them"
                    .to_string()
            });
            format!("Here's a stronger hint: {focus}. One more try: {}", question.question)
        }
        _ => {
            let mut text = format!("The answer is: {}.", question.answer);
            match &question.explanation {
                Some(explanation) => text.push_str(&format!(" {explanation}")),
                None => text.push_str(
                    " Compare that with your answer and notice which part of the passage it \
                     comes from.",
                ),
            }
            text.push_str(" Don't worry — the next one is a fresh start.");
            text
        }
    }
}

fn open_hint(question: &OpenQuestion, level: u32) -> String {
    match level {
        0 => "There's no single right answer here — share what you think and why.".to_string(),
        1 => format!(
            "Interesting start. Try coming at it from this angle: {}. What would you add?",
            question.objective
        ),
        _ => format!(
            "Here's one strong way to answer it: {} Have a look at how that connects to the \
             question, and we'll move on.",
            question.model_answer
        ),
    }
}
