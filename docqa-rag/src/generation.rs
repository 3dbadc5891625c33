//! Language-generation capability used for answer synthesis.

use async_trait::async_trait;

use crate::error::Result;

/// A model that completes a system prompt plus a user message.
///
/// Failures are reported as
/// [`RagError::GenerationFailure`](crate::RagError::GenerationFailure).
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// A short name identifying the model, used in logs and errors.
    fn name(&self) -> &str;

    /// Return the model's completion for the given prompt pair.
    async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String>;
}
