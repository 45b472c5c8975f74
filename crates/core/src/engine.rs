//! The session state machine.
//!
//! One engine serves every student. Each inbound `(student_id, text)` pair is
//! dispatched under that student's session lock, so replies from one student
//! are handled strictly in order while different students proceed in
//! parallel. The engine never fails outward: every internal error becomes a
//! student-visible fallback reply.

use crate::content::{ClosedQuestion, ExerciseGenerator, ExerciseItem, Fetched};
use crate::error::TutorError;
use crate::evaluator::{EvaluatorConfig, ResponseEvaluator, Verdict};
use crate::hints;
use crate::judge::CompletionClient;
use crate::messages;
use crate::recorder::ProgressRecorder;
use crate::session::{ClosedPhase, Mode, Outcome, SessionSnapshot, StudentSession};
use crate::store::ProgressStore;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};

/// Fixed per-mode dialogue constants.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub vocab_max_attempts: u32,
    pub closed_max_attempts: u32,
    pub open_max_attempts: u32,
    pub evaluator: EvaluatorConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            vocab_max_attempts: 3,
            closed_max_attempts: 3,
            open_max_attempts: 2,
            evaluator: EvaluatorConfig::default(),
        }
    }
}

impl EngineConfig {
    fn max_attempts(&self, mode: Mode) -> u32 {
        match mode {
            Mode::Vocab => self.vocab_max_attempts,
            Mode::ReadingClosed => self.closed_max_attempts,
            Mode::ReadingOpen => self.open_max_attempts,
            Mode::Idle => 0,
        }
    }
}

/// Recognized student commands. Matched against the whole normalized
/// message so exercise answers are never swallowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Start,
    Help,
    Vocab,
    Reading,
    WarmUp,
}

fn parse_command(text: &str) -> Option<Command> {
    match text.trim().to_lowercase().as_str() {
        "start" => Some(Command::Start),
        "help" => Some(Command::Help),
        "vocab" => Some(Command::Vocab),
        "reading" => Some(Command::Reading),
        "warm up" | "warmup" | "warm-up" => Some(Command::WarmUp),
        _ => None,
    }
}

/// The per-student dialogue controller.
pub struct SessionEngine {
    store: Arc<dyn ProgressStore>,
    evaluator: ResponseEvaluator,
    generator: ExerciseGenerator,
    recorder: ProgressRecorder,
    config: EngineConfig,
    sessions: Mutex<HashMap<String, Arc<Mutex<StudentSession>>>>,
}

impl SessionEngine {
    pub fn new(
        store: Arc<dyn ProgressStore>,
        judge: Arc<dyn CompletionClient>,
        config: EngineConfig,
    ) -> Self {
        Self {
            evaluator: ResponseEvaluator::new(judge, config.evaluator.clone()),
            generator: ExerciseGenerator::new(store.clone()),
            recorder: ProgressRecorder::new(store.clone()),
            store,
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Handles one inbound message and returns the ordered replies.
    ///
    /// Never fails. Calls for the same student are serialized on the
    /// session lock; the durable snapshot is synced before the lock is
    /// released, so successive syncs can never overwrite each other out of
    /// order.
    #[instrument(name = "handle_message", skip(self, raw_text), fields(student = %student_id))]
    pub async fn handle_message(&self, student_id: &str, raw_text: &str) -> Vec<String> {
        let cell = self.session_cell(student_id).await;
        let mut session = cell.lock().await;
        let replies = self.dispatch(&mut session, raw_text).await;
        debug_assert!(session.is_consistent());
        self.recorder.sync(student_id, &session.snapshot()).await;
        replies
    }

    /// The current in-memory state of a student's session, if one exists.
    pub async fn session_snapshot(&self, student_id: &str) -> Option<SessionSnapshot> {
        let sessions = self.sessions.lock().await;
        match sessions.get(student_id) {
            Some(cell) => Some(cell.lock().await.snapshot()),
            None => None,
        }
    }

    /// The registry lock is released while the store is consulted, so one
    /// student's slow restore never stalls another student's dispatch. If
    /// two first messages race, the loser's restored session is dropped in
    /// favor of the one already registered.
    async fn session_cell(&self, student_id: &str) -> Arc<Mutex<StudentSession>> {
        {
            let sessions = self.sessions.lock().await;
            if let Some(cell) = sessions.get(student_id) {
                return cell.clone();
            }
        }
        let session = self.restore_or_new(student_id).await;
        let mut sessions = self.sessions.lock().await;
        sessions
            .entry(student_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(session)))
            .clone()
    }

    /// Reconstructs a session from its durable snapshot, degrading to a
    /// fresh idle session when the store or curriculum cannot back it up.
    async fn restore_or_new(&self, student_id: &str) -> StudentSession {
        match self.store.read_session_state(student_id).await {
            Ok(Some(snapshot)) => {
                let item = if snapshot.mode != Mode::Idle {
                    let cursor = snapshot.cursors.get(snapshot.mode);
                    match self.store.read_curriculum(snapshot.mode, cursor).await {
                        Ok(Some(item)) if Some(item.id()) == snapshot.item_id.as_deref() => {
                            Some(item)
                        }
                        Ok(_) => {
                            warn!(%student_id, "stored item no longer matches curriculum");
                            None
                        }
                        Err(error) => {
                            warn!(%student_id, %error, "failed to re-fetch active item");
                            None
                        }
                    }
                } else {
                    None
                };
                info!(%student_id, mode = %snapshot.mode, "restored session from store");
                StudentSession::from_snapshot(student_id, snapshot, item)
            }
            Ok(None) => StudentSession::new(student_id),
            Err(error) => {
                warn!(%student_id, %error, "failed to read session state, starting fresh");
                StudentSession::new(student_id)
            }
        }
    }

    async fn dispatch(&self, session: &mut StudentSession, raw_text: &str) -> Vec<String> {
        match parse_command(raw_text) {
            Some(Command::Start) => {
                // Explicit override, allowed from every state. The active
                // item is discarded without an outcome.
                session.clear_to_idle();
                vec![messages::greeting()]
            }
            Some(Command::Help) => vec![messages::help()],
            Some(Command::Vocab) => self.begin(session, Mode::Vocab).await,
            Some(Command::Reading) => self.begin(session, Mode::ReadingClosed).await,
            Some(Command::WarmUp) => self.begin(session, Mode::ReadingOpen).await,
            None => match session.mode {
                Mode::Idle => vec![messages::greeting()],
                _ => self.grade_attempt(session, raw_text).await,
            },
        }
    }

    /// Starts (or switches to) an exercise mode.
    async fn begin(&self, session: &mut StudentSession, mode: Mode) -> Vec<String> {
        session.clear_to_idle();
        match self.generator.next_item(&mut session.cursors, mode).await {
            Ok(Fetched::Item(item)) => {
                info!(item_id = %item.id(), %mode, "serving first item");
                let opening = messages::opening(&item);
                session.start_item(mode, item);
                vec![opening]
            }
            Ok(Fetched::Exhausted) => vec![messages::curriculum_complete(mode)],
            Err(error) => {
                error!(%error, %mode, "failed to fetch first item");
                vec![messages::transient_trouble()]
            }
        }
    }

    /// Grades a free-text reply against the active item.
    async fn grade_attempt(&self, session: &mut StudentSession, reply: &str) -> Vec<String> {
        let active = match &session.current_item {
            Some(active) => active.clone(),
            None => {
                // Cannot happen while the Idle ⇔ no-item invariant holds.
                session.clear_to_idle();
                return vec![messages::greeting()];
            }
        };

        if active.phase == ClosedPhase::Reflection {
            if let ExerciseItem::Closed(question) = active.item {
                return self.finish_reflection(session, question, reply).await;
            }
        }

        match self.evaluator.evaluate(&active.item, reply).await {
            Err(TutorError::GeneratorTimeout(reason)) => {
                // The evaluation attempt failed, not the student's: no
                // attempt is consumed and the state is untouched.
                warn!(item_id = %active.item.id(), %reason, "judge unavailable");
                vec![messages::judge_unavailable()]
            }
            Err(error) => {
                error!(item_id = %active.item.id(), %error, "unexpected evaluation error");
                vec![messages::judge_unavailable()]
            }
            Ok(verdict) if verdict.is_correct => {
                self.on_correct(session, &active.item, verdict).await
            }
            Ok(verdict) => self.on_incorrect(session, &active.item, verdict).await,
        }
    }

    async fn on_correct(
        &self,
        session: &mut StudentSession,
        item: &ExerciseItem,
        verdict: Verdict,
    ) -> Vec<String> {
        match item {
            ExerciseItem::Closed(question) => {
                // The item completes only after the reflection exchange.
                if let Some(active) = session.current_item.as_mut() {
                    active.phase = ClosedPhase::Reflection;
                }
                vec![messages::ask_reflection(question)]
            }
            ExerciseItem::Vocab(card) => {
                let mut replies = vec![messages::vocab_correct(card)];
                self.finish_item(session, item, true, None, &mut replies).await;
                replies
            }
            ExerciseItem::Open(question) => {
                let mut replies =
                    vec![messages::open_correct(question, verdict.rationale.as_deref())];
                self.finish_item(session, item, true, verdict.confidence, &mut replies)
                    .await;
                replies
            }
        }
    }

    async fn on_incorrect(
        &self,
        session: &mut StudentSession,
        item: &ExerciseItem,
        verdict: Verdict,
    ) -> Vec<String> {
        session.attempt_count += 1;
        let final_rung = hints::last_rung(item);
        session.escalate_hint(final_rung);

        // Ladder length and max_attempts are independent bounds; whichever
        // is reached first terminates the item.
        if session.attempt_count >= self.config.max_attempts(item.mode()) {
            session.hint_level = final_rung;
        }
        let hint = hints::next_hint(item, session.hint_level);

        if hint.is_final_reveal {
            let mut replies = vec![hint.text];
            self.finish_item(session, item, false, None, &mut replies).await;
            replies
        } else {
            let mut replies = Vec::new();
            if let ExerciseItem::Open(_) = item {
                replies.push(messages::open_try_again(verdict.rationale.as_deref()));
            }
            replies.push(hint.text);
            replies
        }
    }

    /// Wraps up a closed-reading reflection, then completes the item.
    async fn finish_reflection(
        &self,
        session: &mut StudentSession,
        question: ClosedQuestion,
        reflection: &str,
    ) -> Vec<String> {
        let response = self.evaluator.respond_to_reflection(&question, reflection).await;
        let mut replies = vec![response];
        let item = ExerciseItem::Closed(question);
        self.finish_item(session, &item, true, None, &mut replies).await;
        replies
    }

    /// Records the outcome for the active item and serves the next one, or
    /// returns to `Idle` when the curriculum is exhausted.
    async fn finish_item(
        &self,
        session: &mut StudentSession,
        item: &ExerciseItem,
        correct: bool,
        partial_score: Option<f32>,
        replies: &mut Vec<String>,
    ) {
        let outcome = Outcome {
            item_id: item.id().to_string(),
            correct,
            partial_score,
            // A correct reply is an attempt that never incremented the
            // wrong-answer counter.
            attempts_used: if correct {
                session.attempt_count + 1
            } else {
                session.attempt_count
            },
            hints_used: session.hint_level,
            completed_at: Utc::now(),
        };
        info!(
            item_id = %outcome.item_id,
            correct = outcome.correct,
            attempts = outcome.attempts_used,
            "item complete"
        );
        session.complete(outcome.clone());
        self.recorder.record(&session.student_id, &outcome).await;

        let mode = item.mode();
        session.cursors.advance(mode);
        match self.generator.next_item(&mut session.cursors, mode).await {
            Ok(Fetched::Item(next)) => {
                replies.push(messages::opening(&next));
                session.start_item(mode, next);
            }
            Ok(Fetched::Exhausted) => {
                session.clear_to_idle();
                replies.push(messages::curriculum_complete(mode));
            }
            Err(error) => {
                error!(%error, %mode, "failed to fetch next item");
                session.clear_to_idle();
                replies.push(messages::transient_trouble());
            }
        }
    }
}
