//! Deterministic in-process capabilities for tests, demos, and offline runs.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::embedding::EmbeddingClient;
use crate::error::{RagError, Result};
use crate::generation::LanguageModel;
use crate::synthesis::NO_CONTEXT_MESSAGE;

/// Bag-of-words embeddings hashed into a fixed number of dimensions.
///
/// Every lowercase alphanumeric word adds weight to one dimension chosen by
/// its hash, and the vector is L2-normalized. Texts that share words land
/// close together under cosine distance, and the same text always produces
/// the same vector.
#[derive(Debug, Clone)]
pub struct HashEmbeddingClient {
    dimensions: usize,
}

impl HashEmbeddingClient {
    /// Create a client producing vectors of `dimensions` components (at least 1).
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions: dimensions.max(1) }
    }

    /// Length of the produced vectors.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn bucket(&self, token: &str) -> usize {
        // FNV-1a
        let hash = token.bytes().fold(0xcbf2_9ce4_8422_2325u64, |acc, b| {
            (acc ^ b as u64).wrapping_mul(0x0100_0000_01b3)
        });
        (hash % self.dimensions as u64) as usize
    }
}

impl Default for HashEmbeddingClient {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl EmbeddingClient for HashEmbeddingClient {
    fn name(&self) -> &str {
        "hash"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embedding = vec![0.0f32; self.dimensions];
        let mut tokens = 0;
        for token in text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            embedding[self.bucket(&token.to_lowercase())] += 1.0;
            tokens += 1;
        }
        if tokens == 0 {
            embedding[self.bucket(text)] = 1.0;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        embedding.iter_mut().for_each(|x| *x /= norm);
        Ok(embedding)
    }
}

#[derive(Debug, Clone)]
enum Behavior {
    Extractive,
    Fixed(String),
    Fail(String),
}

/// A scripted [`LanguageModel`] that records every call.
///
/// The extractive mode answers with the first context passage of the prompt
/// built by [`AnswerSynthesizer`](crate::AnswerSynthesizer), or with
/// "I don't know." when the prompt reports that no context was found.
#[derive(Debug)]
pub struct MockLanguageModel {
    behavior: Behavior,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockLanguageModel {
    /// Answer with the first retrieved passage, or "I don't know." without context.
    pub fn extractive() -> Self {
        Self::with_behavior(Behavior::Extractive)
    }

    /// Always answer with `text`.
    pub fn fixed(text: impl Into<String>) -> Self {
        Self::with_behavior(Behavior::Fixed(text.into()))
    }

    /// Always fail with a [`RagError::GenerationFailure`].
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_behavior(Behavior::Fail(message.into()))
    }

    fn with_behavior(behavior: Behavior) -> Self {
        Self { behavior, calls: Mutex::new(Vec::new()) }
    }

    /// Every `(system_prompt, user_message)` pair received so far.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

fn first_passage(system_prompt: &str) -> Option<&str> {
    let (_, rest) = system_prompt.split_once("\n\nContext:\n")?;
    let (context, _) = rest.rsplit_once("\n\nQuestion:\n")?;
    if context == NO_CONTEXT_MESSAGE {
        return None;
    }
    context.split("\n\n").map(str::trim).find(|p| !p.is_empty())
}

#[async_trait]
impl LanguageModel for MockLanguageModel {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((system_prompt.to_string(), user_message.to_string()));

        match &self.behavior {
            Behavior::Extractive => Ok(first_passage(system_prompt)
                .map(str::to_string)
                .unwrap_or_else(|| "I don't know.".to_string())),
            Behavior::Fixed(text) => Ok(text.clone()),
            Behavior::Fail(message) => Err(RagError::generation("mock", message.clone())),
        }
    }
}
