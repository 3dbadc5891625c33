//! Progress events emitted during ingestion.
//!
//! The pipeline never prints. Callers that want progress output inject an
//! [`IngestionObserver`]: a closure, a [`ChannelObserver`] feeding an event
//! stream, or the default [`NoopObserver`].

use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;

use crate::document::IngestionReport;

/// A progress event from an ingestion run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum IngestionEvent {
    /// The run started with this many documents.
    DocumentsLoaded {
        /// Number of input documents.
        count: usize,
    },
    /// A document was split into chunks.
    DocumentChunked {
        /// The document id.
        document_id: String,
        /// Number of chunks produced.
        chunks: usize,
    },
    /// A chunk's embedding was obtained.
    ChunkEmbedded {
        /// The chunk id.
        chunk_id: String,
    },
    /// An embedding request failed and will be retried after `delay`.
    EmbeddingRetry {
        /// The chunk id.
        chunk_id: String,
        /// The attempt that failed (1-based).
        attempt: u32,
        /// Backoff before the next attempt.
        delay: Duration,
    },
    /// All chunks of a document were upserted.
    DocumentIndexed {
        /// The document id.
        document_id: String,
        /// Number of chunks upserted.
        chunks: usize,
    },
    /// The run finished successfully.
    Completed(IngestionReport),
}

/// Receives [`IngestionEvent`]s as an ingestion run progresses.
///
/// Observers are called inline and should return quickly.
pub trait IngestionObserver: Send + Sync {
    /// Handle one event.
    fn on_event(&self, event: &IngestionEvent);
}

impl<F> IngestionObserver for F
where
    F: Fn(&IngestionEvent) + Send + Sync,
{
    fn on_event(&self, event: &IngestionEvent) {
        self(event)
    }
}

/// An observer that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl IngestionObserver for NoopObserver {
    fn on_event(&self, _event: &IngestionEvent) {}
}

/// Forwards events into an unbounded channel.
///
/// Events sent after the receiver is dropped are discarded.
///
/// # Example
///
/// ```rust,ignore
/// let (observer, mut events) = ChannelObserver::new();
/// let pipeline = IngestionPipeline::builder().observer(Arc::new(observer)) /* ... */;
/// while let Some(event) = events.recv().await { /* ... */ }
/// ```
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    sender: mpsc::UnboundedSender<IngestionEvent>,
}

impl ChannelObserver {
    /// Create an observer and the receiving end of its event stream.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<IngestionEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl IngestionObserver for ChannelObserver {
    fn on_event(&self, event: &IngestionEvent) {
        let _ = self.sender.send(event.clone());
    }
}
