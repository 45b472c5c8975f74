use thiserror::Error;

/// Errors scoped to a single message exchange.
///
/// None of these are fatal to the process. The session engine maps every
/// variant to a student-visible fallback reply, so a conversation can never
/// stall on an internal failure.
#[derive(Debug, Error)]
pub enum TutorError {
    /// The judge's verdict could not be parsed, even after the stricter
    /// retry prompt. The evaluator degrades this to an incorrect verdict.
    #[error("judge verdict could not be parsed")]
    EvaluationAmbiguous,

    /// The judge call timed out or its transport failed. The current
    /// evaluation is abandoned without consuming a student attempt and the
    /// student is asked to resend their answer.
    #[error("judge unavailable: {0}")]
    GeneratorTimeout(String),

    /// Durable storage rejected a read or write. Logged and never surfaced
    /// to the student.
    #[error("persistence failure: {0}")]
    PersistenceFailure(String),
}
