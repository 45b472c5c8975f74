//! Service shell for the GrowTalk tutor: configuration, SQLite persistence,
//! and the OpenAI-compatible judge client wired into `growtalk-core`.

pub mod config;
pub mod openai;
pub mod store;
