//! Grounded answer synthesis.
//!
//! The prompt is the instruction text, the retrieved chunks in rank order
//! joined by blank lines, and the question. The model is always called, even
//! when nothing was retrieved: the prompt then says no context was found and
//! the instructions tell the model to answer that it does not know.

use std::sync::Arc;

use tracing::{debug, error};

use crate::document::Answer;
use crate::error::{RagError, Result};
use crate::generation::LanguageModel;
use crate::retrieval::RetrievalService;

/// Instruction text placed at the start of every prompt.
pub const DEFAULT_INSTRUCTIONS: &str = "You are an assistant for question-answering tasks. \
Use the following pieces of retrieved context to answer the question. \
If you don't know the answer, say that you don't know. \
Use three sentences maximum and keep the answer concise.";

/// Context section used when retrieval returned no chunks.
pub const NO_CONTEXT_MESSAGE: &str = "No relevant context was found.";

/// Assemble a grounding prompt with [`DEFAULT_INSTRUCTIONS`].
///
/// # Example
///
/// ```
/// use docqa_rag::synthesis::{DEFAULT_INSTRUCTIONS, build_prompt};
///
/// let prompt = build_prompt("Who?", &["first", "second"]);
/// assert!(prompt.starts_with(DEFAULT_INSTRUCTIONS));
/// assert!(prompt.ends_with("Context:\nfirst\n\nsecond\n\nQuestion:\nWho?"));
/// ```
pub fn build_prompt<S: AsRef<str>>(question: &str, chunks: &[S]) -> String {
    build_prompt_with(DEFAULT_INSTRUCTIONS, question, chunks)
}

/// Assemble a grounding prompt with custom instruction text.
pub fn build_prompt_with<S: AsRef<str>>(
    instructions: &str,
    question: &str,
    chunks: &[S],
) -> String {
    let context = if chunks.is_empty() {
        NO_CONTEXT_MESSAGE.to_string()
    } else {
        chunks.iter().map(|c| c.as_ref()).collect::<Vec<&str>>().join("\n\n")
    };
    format!("{instructions}\n\nContext:\n{context}\n\nQuestion:\n{question}")
}

/// Builds grounding prompts and delegates completion to a [`LanguageModel`].
///
/// The prompt is sent as the system prompt and the bare question as the user
/// message. The completion is returned unmodified.
pub struct AnswerSynthesizer {
    model: Arc<dyn LanguageModel>,
    instructions: String,
}

impl AnswerSynthesizer {
    /// Create a synthesizer using [`DEFAULT_INSTRUCTIONS`].
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model, instructions: DEFAULT_INSTRUCTIONS.to_string() }
    }

    /// Replace the instruction text.
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    /// The prompt that [`synthesize`](Self::synthesize) would send.
    pub fn prompt<S: AsRef<str>>(&self, question: &str, context_chunks: &[S]) -> String {
        build_prompt_with(&self.instructions, question, context_chunks)
    }

    /// Generate an answer grounded in `context_chunks` (in retrieval-rank order).
    ///
    /// # Errors
    ///
    /// Returns [`RagError::GenerationFailure`] if the model fails. Errors of
    /// any other kind returned by the model are converted to that variant.
    pub async fn synthesize<S: AsRef<str> + Sync>(
        &self,
        question: &str,
        context_chunks: &[S],
    ) -> Result<Answer> {
        let prompt = self.prompt(question, context_chunks);
        debug!(
            model = self.model.name(),
            context_chunks = context_chunks.len(),
            prompt_len = prompt.len(),
            "synthesizing answer"
        );

        let text = self.model.complete(&prompt, question).await.map_err(|e| {
            error!(model = self.model.name(), error = %e, "generation failed");
            match e {
                failure @ RagError::GenerationFailure { .. } => failure,
                other => RagError::generation(self.model.name(), other.to_string()),
            }
        })?;

        Ok(Answer { text })
    }

    /// Retrieve context for `question` and synthesize an answer from it.
    pub async fn answer(&self, question: &str, retrieval: &RetrievalService) -> Result<Answer> {
        let context = retrieval.retrieve(question).await?;
        self.synthesize(question, &context.chunks).await
    }
}
