//! Grades student replies against an item's criteria.
//!
//! Vocabulary and closed reading answers are matched locally with a
//! normalized fuzzy comparison. Open reading answers are delegated to the
//! prompt/response generator, whose output is parsed as an untrusted string
//! with an explicit fallback path: one stricter retry on an ambiguous
//! verdict, then fail closed.

use crate::content::{ClosedQuestion, ExerciseItem, OpenQuestion};
use crate::error::TutorError;
use crate::judge::CompletionClient;
use crate::messages;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

const JUDGE_SYSTEM_PROMPT: &str = "You are an English reading tutor grading a secondary-school \
student's answer to an open-ended comprehension question. Judge meaning, not wording. Be \
encouraging but honest. Reply with a single JSON object and nothing else.";

const STRICT_RETRY_SUFFIX: &str = "\n\nYour previous reply could not be parsed. Respond with \
exactly one JSON object of the form {\"is_correct\": true|false, \"confidence\": 0.0-1.0, \
\"rationale\": \"...\"} and no other text.";

/// A graded outcome for one student reply.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub is_correct: bool,
    pub confidence: Option<f32>,
    pub rationale: Option<String>,
}

/// Tunables for grading.
#[derive(Debug, Clone)]
pub struct EvaluatorConfig {
    /// Upper bound on one judge call; the conversation must never hang.
    pub judge_timeout: Duration,
    /// Maximum Levenshtein distance still counted as a match.
    pub edit_tolerance: usize,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            judge_timeout: Duration::from_secs(20),
            edit_tolerance: 2,
        }
    }
}

pub struct ResponseEvaluator {
    judge: Arc<dyn CompletionClient>,
    config: EvaluatorConfig,
}

impl ResponseEvaluator {
    pub fn new(judge: Arc<dyn CompletionClient>, config: EvaluatorConfig) -> Self {
        Self { judge, config }
    }

    /// Grades `reply` against `item`.
    ///
    /// Only open questions can fail, and only with
    /// [`TutorError::GeneratorTimeout`]; every other path produces a verdict.
    pub async fn evaluate(
        &self,
        item: &ExerciseItem,
        reply: &str,
    ) -> Result<Verdict, TutorError> {
        match item {
            ExerciseItem::Vocab(card) => Ok(self.match_key(&card.meaning, reply)),
            ExerciseItem::Closed(question) => Ok(self.match_key(&question.answer, reply)),
            ExerciseItem::Open(question) => self.judge_open(question, reply).await,
        }
    }

    /// Normalized exact/containment/fuzzy match against an expected key.
    fn match_key(&self, key: &str, reply: &str) -> Verdict {
        let key_norm = normalize(key);
        let reply_norm = normalize(reply);
        if key_norm.is_empty() || reply_norm.is_empty() {
            return incorrect_match();
        }
        if reply_norm == key_norm {
            return correct_match(1.0);
        }
        // Accepts the key embedded in a sentence ("I think it means ...").
        if key_norm.chars().count() >= 3 && reply_norm.contains(&key_norm) {
            return correct_match(0.9);
        }
        let distance = levenshtein(&reply_norm, &key_norm);
        if distance <= self.config.edit_tolerance
            && key_norm.chars().count() > self.config.edit_tolerance
        {
            return correct_match(0.8);
        }
        incorrect_match()
    }

    async fn judge_open(
        &self,
        question: &OpenQuestion,
        reply: &str,
    ) -> Result<Verdict, TutorError> {
        let prompt = open_judge_prompt(question, reply);
        match self.try_judge(&prompt).await {
            Ok(verdict) => Ok(verdict),
            Err(TutorError::EvaluationAmbiguous) => {
                warn!(item_id = %question.id, "ambiguous judge verdict, retrying stricter");
                let strict = format!("{prompt}{STRICT_RETRY_SUFFIX}");
                match self.try_judge(&strict).await {
                    Ok(verdict) => Ok(verdict),
                    Err(TutorError::EvaluationAmbiguous) => {
                        warn!(item_id = %question.id, "judge verdict still ambiguous, failing closed");
                        Ok(Verdict {
                            is_correct: false,
                            confidence: None,
                            rationale: Some(messages::generic_open_rationale()),
                        })
                    }
                    Err(other) => Err(other),
                }
            }
            Err(other) => Err(other),
        }
    }

    /// One bounded judge call. Timeouts and transport failures share a path
    /// because the caller treats them identically: ask the student to resend.
    async fn try_judge(&self, prompt: &str) -> Result<Verdict, TutorError> {
        let call = self.judge.complete(JUDGE_SYSTEM_PROMPT, prompt);
        match tokio::time::timeout(self.config.judge_timeout, call).await {
            Err(_) => Err(TutorError::GeneratorTimeout(format!(
                "no verdict within {:?}",
                self.config.judge_timeout
            ))),
            Ok(Err(error)) => Err(TutorError::GeneratorTimeout(error.to_string())),
            Ok(Ok(text)) => parse_verdict(&text).ok_or(TutorError::EvaluationAmbiguous),
        }
    }

    /// Acknowledges a closed-reading reflection ("why did you answer that?").
    ///
    /// Judge-generated commentary when available; any failure falls back to a
    /// fixed template so the exchange always moves forward.
    pub async fn respond_to_reflection(
        &self,
        question: &ClosedQuestion,
        reflection: &str,
    ) -> String {
        let prompt = reflection_prompt(question, reflection);
        let call = self.judge.complete(JUDGE_SYSTEM_PROMPT, &prompt);
        match tokio::time::timeout(self.config.judge_timeout, call).await {
            Ok(Ok(text)) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(Ok(_)) | Ok(Err(_)) | Err(_) => messages::reflection_fallback(),
        }
    }
}

fn correct_match(confidence: f32) -> Verdict {
    Verdict {
        is_correct: true,
        confidence: Some(confidence),
        rationale: None,
    }
}

fn incorrect_match() -> Verdict {
    Verdict {
        is_correct: false,
        confidence: None,
        rationale: None,
    }
}

fn open_judge_prompt(question: &OpenQuestion, reply: &str) -> String {
    format!(
        "Question: {question}\n\
         Learning objective: {objective}\n\
         Model answer: {model_answer}\n\
         Student's answer: {reply}\n\n\
         Does the student's answer engage with the question and touch the learning objective? \
         A short or imperfect answer that shows real understanding counts as correct. \
         Reply with JSON: {{\"is_correct\": true|false, \"confidence\": 0.0-1.0, \
         \"rationale\": \"one or two sentences addressed to the student\"}}",
        question = question.question,
        objective = question.objective,
        model_answer = question.model_answer,
    )
}

fn reflection_prompt(question: &ClosedQuestion, reflection: &str) -> String {
    format!(
        "The student answered this question correctly and was asked why they chose their \
         answer.\n\
         Question: {question}\n\
         Correct answer: {answer}\n\
         Passage: {passage}\n\
         Student's reasoning: {reflection}\n\n\
         In two or three sentences: acknowledge their willingness to explain, comment on the \
         reasoning, and gently fill in anything they missed. Plain text, addressed to the \
         student.",
        question = question.question,
        answer = question.answer,
        passage = question.passage,
    )
}

/// Lowercases, strips punctuation, and collapses whitespace.
fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = true;
    for ch in text.to_lowercase().chars() {
        if ch.is_alphanumeric() {
            out.push(ch);
            last_was_space = false;
        } else if ch.is_whitespace() || ch.is_ascii_punctuation() {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Classic two-row Levenshtein distance over chars.
fn levenshtein(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let (m, n) = (a_chars.len(), b_chars.len());
    if m == 0 {
        return n;
    }
    if n == 0 {
        return m;
    }

    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr = vec![0; n + 1];
    for i in 1..=m {
        curr[0] = i;
        for j in 1..=n {
            let cost = if a_chars[i - 1] == b_chars[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[n]
}

#[derive(Deserialize)]
struct RawVerdict {
    is_correct: bool,
    confidence: Option<f32>,
    rationale: Option<String>,
}

impl From<RawVerdict> for Verdict {
    fn from(raw: RawVerdict) -> Self {
        Verdict {
            is_correct: raw.is_correct,
            confidence: raw.confidence,
            rationale: raw.rationale.filter(|r| !r.trim().is_empty()),
        }
    }
}

/// Parses a judge reply into a verdict, tolerating prose around the JSON
/// object and, as a last resort, scanning for the bare `is_correct` field.
fn parse_verdict(text: &str) -> Option<Verdict> {
    let trimmed = text.trim();
    if let Ok(raw) = serde_json::from_str::<RawVerdict>(trimmed) {
        return Some(raw.into());
    }
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            if let Ok(raw) = serde_json::from_str::<RawVerdict>(&trimmed[start..=end]) {
                return Some(raw.into());
            }
        }
    }
    let lowered = trimmed.to_lowercase();
    if lowered.contains("\"is_correct\": true") || lowered.contains("\"is_correct\":true") {
        return Some(Verdict {
            is_correct: true,
            confidence: None,
            rationale: None,
        });
    }
    if lowered.contains("\"is_correct\": false") || lowered.contains("\"is_correct\":false") {
        return Some(Verdict {
            is_correct: false,
            confidence: None,
            rationale: None,
        });
    }
    None
}
