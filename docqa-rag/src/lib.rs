//! # docqa-rag
//!
//! Ingestion and retrieval core for grounded document question answering.
//!
//! ## Overview
//!
//! - [`FixedSizeChunker`] / [`split_text`] - deterministic overlapping windows
//! - [`IngestionPipeline`] - chunk → embed → upsert, idempotent by chunk id
//! - [`RetrievalService`] - question → top-k chunk texts
//! - [`AnswerSynthesizer`] - grounding prompt → language model → [`Answer`]
//!
//! The embedding function, the vector index, and the language model are
//! capabilities injected as trait objects ([`EmbeddingClient`],
//! [`VectorIndex`], [`LanguageModel`]). Provided backends:
//!
//! - [`InMemoryVectorIndex`] and [`FileVectorIndex`]
//! - [`HashEmbeddingClient`] and [`MockLanguageModel`] for tests and offline use
//! - `openai::{OpenAIEmbeddingClient, OpenAIChatModel}` with the `openai` feature
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docqa_rag::*;
//!
//! let config = RagConfig::builder().chunk_size(1000).chunk_overlap(20).n_results(2).build()?;
//! let embedder: Arc<dyn EmbeddingClient> = Arc::new(HashEmbeddingClient::default());
//! let index: Arc<dyn VectorIndex> = Arc::new(InMemoryVectorIndex::new());
//!
//! let pipeline = IngestionPipeline::builder()
//!     .config(config.clone())
//!     .embedding_client(embedder.clone())
//!     .index(index.clone())
//!     .build()?;
//! pipeline.ingest(&DirectorySource::new("./news_articles").load()?).await?;
//!
//! let retrieval = RetrievalService::from_config(embedder, index, &config)?;
//! let synthesizer = AnswerSynthesizer::new(Arc::new(MockLanguageModel::extractive()));
//! let answer = synthesizer.answer("tell me about databricks", &retrieval).await?;
//! ```

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod events;
pub mod file;
pub mod generation;
pub mod index;
pub mod inmemory;
pub mod mock;
#[cfg(feature = "openai")]
pub mod openai;
pub mod pipeline;
pub mod retrieval;
pub mod source;
pub mod synthesis;

pub use chunking::{FixedSizeChunker, split_text};
pub use config::{RagConfig, RagConfigBuilder, RetryPolicy};
pub use document::{
    Answer, Chunk, Document, IndexedVector, IngestionReport, RetrievalResult, ScoredVector,
};
pub use embedding::EmbeddingClient;
pub use error::{RagError, Result};
pub use events::{ChannelObserver, IngestionEvent, IngestionObserver, NoopObserver};
pub use file::FileVectorIndex;
pub use generation::LanguageModel;
pub use index::VectorIndex;
pub use inmemory::InMemoryVectorIndex;
pub use mock::{HashEmbeddingClient, MockLanguageModel};
#[cfg(feature = "openai")]
pub use openai::{OpenAIChatModel, OpenAIEmbeddingClient};
pub use pipeline::{IngestionPipeline, IngestionPipelineBuilder};
pub use retrieval::RetrievalService;
pub use source::{DirectorySource, DocumentSource};
pub use synthesis::AnswerSynthesizer;
