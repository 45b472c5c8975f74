//! GrowTalk core: the per-student dialogue state machine behind a
//! conversational English tutor.
//!
//! The [`engine::SessionEngine`] is the public entry point: it turns each
//! inbound `(student_id, text)` pair into an ordered list of outgoing
//! messages, grading replies, escalating hints, and recording progress along
//! the way. Everything outside the dialogue itself sits behind a trait: the
//! prompt/response generator ([`judge::CompletionClient`]), durable storage
//! ([`store::ProgressStore`]), and outbound delivery
//! ([`channel::MessageChannel`]).

pub mod channel;
pub mod content;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod hints;
pub mod judge;
pub mod messages;
pub mod recorder;
pub mod session;
pub mod store;

pub use engine::{EngineConfig, SessionEngine};
pub use error::TutorError;
pub use session::{Mode, Outcome, SessionSnapshot, StudentSession};
