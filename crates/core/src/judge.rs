//! The prompt/response generator boundary.
//!
//! Defines the contract for any service that can complete a prompt. The
//! evaluator treats whatever comes back as an untrusted string; timeouts are
//! enforced by the caller, not the implementation.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// A generic client for single-turn prompt completion.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Completes `user_prompt` under `system_prompt`, returning the raw
    /// free-text response.
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

/// One scripted response for [`ScriptedJudge`].
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Return this text.
    Text(String),
    /// Fail with a transport-style error.
    Failure(String),
    /// Never answer; lets tests drive the caller's timeout.
    Hang,
}

/// A deterministic [`CompletionClient`] for tests.
///
/// Replies are consumed in order; an exhausted script fails like a transport
/// error so a test that under-scripts its judge fails loudly.
#[derive(Default)]
pub struct ScriptedJudge {
    replies: Mutex<VecDeque<ScriptedReply>>,
}

impl ScriptedJudge {
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
        }
    }

    pub fn push(&self, reply: ScriptedReply) {
        self.replies.lock().unwrap().push_back(reply);
    }
}

#[async_trait]
impl CompletionClient for ScriptedJudge {
    async fn complete(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String> {
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(ScriptedReply::Text(text)) => Ok(text),
            Some(ScriptedReply::Failure(message)) => Err(anyhow!(message)),
            Some(ScriptedReply::Hang) => {
                tokio::time::sleep(Duration::from_secs(86_400)).await;
                Err(anyhow!("scripted judge woke from hang"))
            }
            None => Err(anyhow!("scripted judge has no replies left")),
        }
    }
}

/// A judge that accepts every answer. Useful for offline runs where no
/// OpenAI-compatible endpoint is configured.
pub struct LenientJudge;

#[async_trait]
impl CompletionClient for LenientJudge {
    async fn complete(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String> {
        Ok(r#"{"is_correct": true, "rationale": "Good thinking — you touched on the key idea."}"#
            .to_string())
    }
}
