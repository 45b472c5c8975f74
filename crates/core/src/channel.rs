//! The outbound messaging boundary.
//!
//! Inbound delivery is decoded to `(student_id, text)` pairs before it
//! reaches the engine; this trait covers the other direction.

use anyhow::Result;
use async_trait::async_trait;

/// Delivers text messages to a student.
#[async_trait]
pub trait MessageChannel: Send + Sync {
    async fn send(&self, student_id: &str, text: &str) -> Result<()>;

    /// Sends a batch of replies in order, stopping at the first failure.
    async fn send_all(&self, student_id: &str, texts: &[String]) -> Result<()> {
        for text in texts {
            self.send(student_id, text).await?;
        }
        Ok(())
    }
}
