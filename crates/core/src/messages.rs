//! Student-facing message templates.
//!
//! Everything the engine says that is not judge-generated comes from here,
//! so the dialogue stays deterministic and testable.

use crate::content::{ClosedQuestion, ExerciseItem, OpenQuestion, VocabCard};
use crate::hints;
use crate::session::Mode;

pub fn greeting() -> String {
    "Hi! 👋 Ready for today's English practice? Send 'vocab' for vocabulary, 'reading' for \
     reading questions, or 'warm up' for an open discussion question. Send 'help' any time."
        .to_string()
}

pub fn help() -> String {
    "Here's how this works: 'vocab' starts vocabulary practice, 'reading' starts reading \
     questions, 'warm up' starts open questions, and 'start' takes you back to the beginning. \
     Anything else you send while an exercise is running counts as your answer."
        .to_string()
}

/// The opening message for a freshly served item. Includes the level-0 rung
/// of its hint ladder as the gentle nudge.
pub fn opening(item: &ExerciseItem) -> String {
    let nudge = hints::next_hint(item, 0).text;
    match item {
        ExerciseItem::Vocab(card) => format!(
            "📖 Today's word is \"{}\" ({}). What do you think it means? {nudge}",
            card.word, card.part_of_speech
        ),
        ExerciseItem::Closed(question) => format!(
            "📘 Read this passage:\n\n{}\n\n❓ {}\n{nudge}",
            question.passage, question.question
        ),
        ExerciseItem::Open(question) => {
            format!("💭 {}\n{nudge}", question.question)
        }
    }
}

/// Praise for a correct vocabulary guess, reinforcing the card's material.
pub fn vocab_correct(card: &VocabCard) -> String {
    let mut text = format!(
        "🎉 That's it! \"{}\" means {}. For example: \"{}\"",
        card.word, card.meaning, card.example
    );
    if let Some(story) = &card.memory_story {
        text.push_str(&format!(" A way to remember it: {story}"));
    }
    text
}

/// Praise for a correct closed answer, leading into the reflection ask.
pub fn ask_reflection(question: &ClosedQuestion) -> String {
    format!(
        "✅ Correct! Now tell me — why is \"{}\" the right answer? What in the passage pointed \
         you there?",
        question.answer
    )
}

/// Praise for a judged-satisfactory open answer, carrying the judge's
/// rationale when one was produced.
pub fn open_correct(question: &OpenQuestion, rationale: Option<&str>) -> String {
    let comment = rationale.unwrap_or("You engaged with the question thoughtfully.");
    format!(
        "🌟 Great answer! {comment} The idea to hold on to: {}.",
        question.objective
    )
}

/// Shown when an open answer missed the mark but attempts remain.
pub fn open_try_again(rationale: Option<&str>) -> String {
    match rationale {
        Some(comment) => format!("Thanks for sharing. {comment} Have another go!"),
        None => "Thanks for sharing — you're not quite there yet. Have another go!".to_string(),
    }
}

pub fn reflection_fallback() -> String {
    "Thanks for explaining your thinking — that's exactly the habit that makes reading easier. \
     Let's keep going!"
        .to_string()
}

pub fn generic_open_rationale() -> String {
    "I couldn't quite follow how your answer connects to the passage — let's look at the key \
     idea together."
        .to_string()
}

/// Asks the student to resend after a judge timeout or failure. No attempt
/// is consumed.
pub fn judge_unavailable() -> String {
    "Hmm, I couldn't check that answer just now 😅 — please send it one more time.".to_string()
}

pub fn transient_trouble() -> String {
    "Something went wrong on my side — give me a moment and try again.".to_string()
}

/// Celebrates finishing every item of a mode's curriculum.
pub fn curriculum_complete(mode: Mode) -> String {
    match mode {
        Mode::Vocab => {
            "🎉 You've finished all of today's vocabulary — great work! Send 'reading' or \
             'warm up' to keep going."
                .to_string()
        }
        Mode::ReadingClosed => {
            "🎉 That's every reading question for today — well done! Send 'warm up' for an \
             open question, or 'vocab' to review words."
                .to_string()
        }
        Mode::ReadingOpen => {
            "🎉 You've worked through all of today's discussion questions. Lovely thinking — \
             see you next time!"
                .to_string()
        }
        Mode::Idle => "🎉 All done for now!".to_string(),
    }
}
