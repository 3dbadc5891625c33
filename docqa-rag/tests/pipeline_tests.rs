//! End-to-end tests for ingestion, retrieval, and synthesis.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use docqa_rag::synthesis::NO_CONTEXT_MESSAGE;
use docqa_rag::{
    AnswerSynthesizer, Document, EmbeddingClient, HashEmbeddingClient, InMemoryVectorIndex,
    IndexedVector, IngestionEvent, IngestionPipeline, IngestionReport, MockLanguageModel,
    RagConfig, RagError, RetrievalService, RetryPolicy, ScoredVector, VectorIndex,
};

/// Fails any text containing `FAIL`, and the first `fail_first` calls overall.
struct FlakyEmbedder {
    inner: HashEmbeddingClient,
    fail_first: usize,
    calls: AtomicUsize,
}

impl FlakyEmbedder {
    fn new(fail_first: usize) -> Self {
        Self { inner: HashEmbeddingClient::new(16), fail_first, calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl EmbeddingClient for FlakyEmbedder {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn embed(&self, text: &str) -> docqa_rag::Result<Vec<f32>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.fail_first || text.contains("FAIL") {
            return Err(RagError::EmbeddingUnavailable {
                provider: "flaky".into(),
                message: "rate limited".into(),
            });
        }
        self.inner.embed(text).await
    }
}

/// Sleeps longer for earlier chunks so completions arrive out of order.
struct SlowFirstEmbedder {
    inner: HashEmbeddingClient,
}

#[async_trait]
impl EmbeddingClient for SlowFirstEmbedder {
    fn name(&self) -> &str {
        "slow-first"
    }

    async fn embed(&self, text: &str) -> docqa_rag::Result<Vec<f32>> {
        let position = text.chars().next().and_then(|c| c.to_digit(10)).unwrap_or(0) as u64;
        tokio::time::sleep(Duration::from_millis(100 - position * 10)).await;
        self.inner.embed(text).await
    }
}

/// Returns the same fixed vector for every text.
struct ConstantEmbedder(Vec<f32>);

#[async_trait]
impl EmbeddingClient for ConstantEmbedder {
    fn name(&self) -> &str {
        "constant"
    }

    async fn embed(&self, _text: &str) -> docqa_rag::Result<Vec<f32>> {
        Ok(self.0.clone())
    }
}

/// Embeds documents normally but fails on any text mentioning `outage`.
struct QuestionFailingEmbedder {
    inner: HashEmbeddingClient,
}

#[async_trait]
impl EmbeddingClient for QuestionFailingEmbedder {
    fn name(&self) -> &str {
        "question-failing"
    }

    async fn embed(&self, text: &str) -> docqa_rag::Result<Vec<f32>> {
        if text.contains("outage") {
            return Err(RagError::EmbeddingUnavailable {
                provider: "question-failing".into(),
                message: "connection reset".into(),
            });
        }
        self.inner.embed(text).await
    }
}

/// An index whose writes always fail.
#[derive(Default)]
struct ReadOnlyIndex {
    inner: InMemoryVectorIndex,
}

/// An index that accepts writes but cannot be searched.
#[derive(Default)]
struct UnsearchableIndex {
    inner: InMemoryVectorIndex,
}

#[async_trait]
impl VectorIndex for UnsearchableIndex {
    async fn upsert(&self, vectors: &[IndexedVector]) -> docqa_rag::Result<()> {
        self.inner.upsert(vectors).await
    }

    async fn query(
        &self,
        _embeddings: &[Vec<f32>],
        _n_results: usize,
    ) -> docqa_rag::Result<Vec<Vec<ScoredVector>>> {
        Err(RagError::IndexUnavailable {
            backend: "unsearchable".into(),
            message: "offline".into(),
        })
    }

    async fn count(&self) -> docqa_rag::Result<usize> {
        self.inner.count().await
    }

    async fn get(&self, id: &str) -> docqa_rag::Result<Option<IndexedVector>> {
        self.inner.get(id).await
    }
}

#[async_trait]
impl VectorIndex for ReadOnlyIndex {
    async fn upsert(&self, _vectors: &[IndexedVector]) -> docqa_rag::Result<()> {
        Err(RagError::IndexUnavailable { backend: "read-only".into(), message: "disk full".into() })
    }

    async fn query(
        &self,
        embeddings: &[Vec<f32>],
        n_results: usize,
    ) -> docqa_rag::Result<Vec<Vec<ScoredVector>>> {
        self.inner.query(embeddings, n_results).await
    }

    async fn count(&self) -> docqa_rag::Result<usize> {
        self.inner.count().await
    }

    async fn get(&self, id: &str) -> docqa_rag::Result<Option<IndexedVector>> {
        self.inner.get(id).await
    }
}

fn small_config() -> RagConfig {
    RagConfig::builder().chunk_size(10).chunk_overlap(0).build().unwrap()
}

fn pipeline(
    config: RagConfig,
    embedder: Arc<dyn EmbeddingClient>,
    index: Arc<dyn VectorIndex>,
) -> IngestionPipeline {
    IngestionPipeline::builder()
        .config(config)
        .embedding_client(embedder)
        .index(index)
        .build()
        .unwrap()
}

#[tokio::test]
async fn ingests_scenario_document_with_expected_ids() {
    let index = Arc::new(InMemoryVectorIndex::new());
    let config = RagConfig::builder().chunk_size(10).chunk_overlap(2).build().unwrap();
    let pipeline = pipeline(config, Arc::new(HashEmbeddingClient::new(16)), index.clone());

    let report = pipeline.ingest(&[Document::new("a.txt", "0123456789ABCDEFGHIJ")]).await.unwrap();

    assert_eq!(report, IngestionReport { documents_loaded: 1, chunks_indexed: 3 });
    assert_eq!(index.get("a.txt_chunk1").await.unwrap().unwrap().text, "0123456789");
    assert_eq!(index.get("a.txt_chunk2").await.unwrap().unwrap().text, "89ABCDEFGH");
    assert_eq!(index.get("a.txt_chunk3").await.unwrap().unwrap().text, "GHIJ");
}

#[tokio::test]
async fn reingesting_unchanged_corpus_does_not_duplicate() {
    let index = Arc::new(InMemoryVectorIndex::new());
    let pipeline = pipeline(small_config(), Arc::new(HashEmbeddingClient::new(16)), index.clone());
    let documents = vec![
        Document::new("a.txt", "the quick brown fox jumps over the lazy dog"),
        Document::new("b.txt", "pack my box with five dozen liquor jugs"),
    ];

    let first = pipeline.ingest(&documents).await.unwrap();
    let count = index.count().await.unwrap();
    let before = index.get("a.txt_chunk2").await.unwrap();

    let second = pipeline.ingest(&documents).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(index.count().await.unwrap(), count);
    assert_eq!(count, first.chunks_indexed);
    assert_eq!(index.get("a.txt_chunk2").await.unwrap(), before);
}

#[tokio::test]
async fn embedding_failure_aborts_and_names_chunks() {
    let index = Arc::new(InMemoryVectorIndex::new());
    let pipeline = pipeline(small_config(), Arc::new(FlakyEmbedder::new(0)), index.clone());
    let documents = vec![
        Document::new("a.txt", "aaaaaaaaaa"),
        Document::new("b.txt", "bbbbbbbbbbFAILbbbbbb"),
        Document::new("c.txt", "cccc"),
    ];

    let err = pipeline.ingest(&documents).await.unwrap_err();

    match err {
        RagError::IngestionAborted { failed_chunk_ids, unindexed_chunk_ids, source } => {
            assert_eq!(failed_chunk_ids, ["b.txt_chunk2"]);
            assert_eq!(unindexed_chunk_ids, ["b.txt_chunk1", "b.txt_chunk2", "c.txt_chunk1"]);
            assert!(matches!(*source, RagError::EmbeddingUnavailable { .. }));
        }
        other => panic!("expected IngestionAborted, got {other:?}"),
    }

    // The document indexed before the failure stays; nothing of b.txt is written.
    assert_eq!(index.count().await.unwrap(), 1);
    assert!(index.get("a.txt_chunk1").await.unwrap().is_some());
    assert!(index.get("b.txt_chunk1").await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn retry_recovers_from_transient_failures() {
    let index = Arc::new(InMemoryVectorIndex::new());
    let config = RagConfig::builder()
        .chunk_size(10)
        .chunk_overlap(0)
        .retry(RetryPolicy::exponential(3, Duration::from_millis(50)))
        .build()
        .unwrap();
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let pipeline = IngestionPipeline::builder()
        .config(config)
        .embedding_client(Arc::new(FlakyEmbedder::new(2)))
        .index(index.clone())
        .observer(Arc::new(move |event: &IngestionEvent| sink.lock().unwrap().push(event.clone())))
        .build()
        .unwrap();

    let report = pipeline.ingest(&[Document::new("a.txt", "0123456789")]).await.unwrap();

    assert_eq!(report.chunks_indexed, 1);
    let events = events.lock().unwrap();
    let retries: Vec<(u32, Duration)> = events
        .iter()
        .filter_map(|e| match e {
            IngestionEvent::EmbeddingRetry { attempt, delay, .. } => Some((*attempt, *delay)),
            _ => None,
        })
        .collect();
    assert_eq!(retries, [(1, Duration::from_millis(50)), (2, Duration::from_millis(100))]);
    assert_eq!(events.first(), Some(&IngestionEvent::DocumentsLoaded { count: 1 }));
    assert_eq!(events.last(), Some(&IngestionEvent::Completed(report)));
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_abort() {
    let index = Arc::new(InMemoryVectorIndex::new());
    let config = RagConfig::builder()
        .chunk_size(10)
        .chunk_overlap(0)
        .retry(RetryPolicy::exponential(2, Duration::from_millis(10)))
        .build()
        .unwrap();
    let pipeline = pipeline(config, Arc::new(FlakyEmbedder::new(5)), index.clone());

    let err = pipeline.ingest(&[Document::new("a.txt", "0123456789")]).await.unwrap_err();

    assert!(matches!(err, RagError::IngestionAborted { .. }));
    assert_eq!(index.count().await.unwrap(), 0);
}

#[tokio::test]
async fn degenerate_embeddings_are_never_indexed() {
    for embedding in [vec![], vec![0.0; 4], vec![f32::NAN, 1.0, 0.0, 0.0], vec![f32::INFINITY; 4]] {
        let index = Arc::new(InMemoryVectorIndex::new());
        let pipeline =
            pipeline(small_config(), Arc::new(ConstantEmbedder(embedding.clone())), index.clone());

        let err = pipeline.ingest(&[Document::new("a.txt", "abc")]).await.unwrap_err();

        match err {
            RagError::IngestionAborted { failed_chunk_ids, source, .. } => {
                assert_eq!(failed_chunk_ids, ["a.txt_chunk1"]);
                assert!(matches!(*source, RagError::EmbeddingUnavailable { .. }), "{embedding:?}");
            }
            other => panic!("expected IngestionAborted for {embedding:?}, got {other:?}"),
        }
        assert_eq!(index.count().await.unwrap(), 0);
    }
}

#[tokio::test]
async fn upsert_failure_is_surfaced() {
    let pipeline = pipeline(
        small_config(),
        Arc::new(HashEmbeddingClient::new(16)),
        Arc::new(ReadOnlyIndex::default()),
    );

    let err = pipeline.ingest(&[Document::new("a.txt", "0123456789abc")]).await.unwrap_err();

    match err {
        RagError::IngestionAborted { failed_chunk_ids, source, .. } => {
            assert_eq!(failed_chunk_ids, ["a.txt_chunk1", "a.txt_chunk2"]);
            assert!(matches!(*source, RagError::IndexUnavailable { .. }));
        }
        other => panic!("expected IngestionAborted, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn concurrent_embedding_keeps_chunk_order() {
    let index = Arc::new(InMemoryVectorIndex::new());
    let config = RagConfig::builder()
        .chunk_size(5)
        .chunk_overlap(0)
        .embed_concurrency(4)
        .build()
        .unwrap();
    let pipeline = pipeline(
        config,
        Arc::new(SlowFirstEmbedder { inner: HashEmbeddingClient::new(16) }),
        index.clone(),
    );

    // Chunks "0 aaa", "1 bbb", ... each start with their position digit.
    let text = "0 aaa1 bbb2 ccc3 ddd4 eee5 fff";
    pipeline.ingest(&[Document::new("a.txt", text)]).await.unwrap();

    let reference = HashEmbeddingClient::new(16);
    for ordinal in 1..=6 {
        let stored = index.get(&format!("a.txt_chunk{ordinal}")).await.unwrap().unwrap();
        assert_eq!(stored.embedding, reference.embed(&stored.text).await.unwrap());
        assert!(stored.text.starts_with(&(ordinal - 1).to_string()));
    }
}

#[tokio::test]
async fn empty_documents_count_as_loaded_but_add_no_chunks() {
    let index = Arc::new(InMemoryVectorIndex::new());
    let pipeline = pipeline(small_config(), Arc::new(HashEmbeddingClient::new(16)), index.clone());

    let report = pipeline
        .ingest(&[Document::new("empty.txt", ""), Document::new("a.txt", "abc")])
        .await
        .unwrap();

    assert_eq!(report, IngestionReport { documents_loaded: 2, chunks_indexed: 1 });
    assert_eq!(index.count().await.unwrap(), 1);
}

#[tokio::test]
async fn duplicate_document_ids_are_rejected_before_embedding() {
    let embedder = Arc::new(FlakyEmbedder::new(0));
    let pipeline =
        pipeline(small_config(), embedder.clone(), Arc::new(InMemoryVectorIndex::new()));

    let err = pipeline
        .ingest(&[Document::new("a.txt", "one"), Document::new("a.txt", "two")])
        .await
        .unwrap_err();

    assert!(matches!(err, RagError::InvalidConfig(_)));
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn retrieval_is_capped_and_ranks_relevant_chunks_first() {
    let embedder: Arc<dyn EmbeddingClient> = Arc::new(HashEmbeddingClient::default());
    let index: Arc<dyn VectorIndex> = Arc::new(InMemoryVectorIndex::new());
    let config = RagConfig::builder().chunk_size(60).chunk_overlap(0).n_results(2).build().unwrap();
    pipeline(config.clone(), embedder.clone(), index.clone())
        .ingest(&[
            Document::new("databricks.txt", "Databricks raised new funding for its data platform"),
            Document::new("writers.txt", "Television writers worry about AI replacing jobs"),
            Document::new("weather.txt", "Heavy rain is expected across the coast tomorrow"),
        ])
        .await
        .unwrap();

    let retrieval = RetrievalService::from_config(embedder, index, &config).unwrap();
    let result = retrieval.retrieve("databricks funding platform").await.unwrap();

    assert_eq!(result.len(), 2);
    assert!(result.chunks[0].starts_with("Databricks"));
    assert_eq!(retrieval.retrieve_n("rain", 1).await.unwrap().len(), 1);
    assert!(retrieval.retrieve_n("rain", 10).await.unwrap().len() <= 3);
    assert!(matches!(retrieval.retrieve_n("rain", 0).await, Err(RagError::InvalidConfig(_))));
}

#[tokio::test]
async fn index_query_failure_reaches_the_caller() {
    let embedder: Arc<dyn EmbeddingClient> = Arc::new(HashEmbeddingClient::default());
    let index: Arc<dyn VectorIndex> = Arc::new(UnsearchableIndex::default());
    let retrieval = RetrievalService::new(embedder, index, 2).unwrap();

    let err = retrieval.retrieve("anything").await.unwrap_err();

    match err {
        RagError::IndexUnavailable { backend, message } => {
            assert_eq!(backend, "unsearchable");
            assert_eq!(message, "offline");
        }
        other => panic!("expected IndexUnavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn question_embedding_failure_reaches_the_caller() {
    let embedder: Arc<dyn EmbeddingClient> =
        Arc::new(QuestionFailingEmbedder { inner: HashEmbeddingClient::default() });
    let index: Arc<dyn VectorIndex> = Arc::new(InMemoryVectorIndex::new());
    pipeline(RagConfig::default(), embedder.clone(), index.clone())
        .ingest(&[Document::new("a.txt", "Databricks is a data company.")])
        .await
        .unwrap();
    let retrieval = RetrievalService::new(embedder, index.clone(), 2).unwrap();

    let err = retrieval.retrieve_scored("was there an outage?", 2).await.unwrap_err();

    match err {
        RagError::EmbeddingUnavailable { provider, message } => {
            assert_eq!(provider, "question-failing");
            assert_eq!(message, "connection reset");
        }
        other => panic!("expected EmbeddingUnavailable, got {other:?}"),
    }
    assert!(matches!(
        retrieval.retrieve("outage report").await,
        Err(RagError::EmbeddingUnavailable { .. })
    ));
    assert_eq!(index.count().await.unwrap(), 1);
}

#[tokio::test]
async fn empty_index_still_produces_an_answer() {
    let embedder: Arc<dyn EmbeddingClient> = Arc::new(HashEmbeddingClient::default());
    let index: Arc<dyn VectorIndex> = Arc::new(InMemoryVectorIndex::new());
    let retrieval = RetrievalService::new(embedder, index, 2).unwrap();
    let model = Arc::new(MockLanguageModel::extractive());
    let synthesizer = AnswerSynthesizer::new(model.clone());

    let context = retrieval.retrieve("unrelated question").await.unwrap();
    assert!(context.is_empty());

    let answer = synthesizer.synthesize("unrelated question", &context.chunks).await.unwrap();

    assert_eq!(answer.text, "I don't know.");
    let calls = model.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].0.contains(NO_CONTEXT_MESSAGE));
    assert_eq!(calls[0].1, "unrelated question");
}

#[tokio::test]
async fn answer_combines_retrieval_and_synthesis() {
    let embedder: Arc<dyn EmbeddingClient> = Arc::new(HashEmbeddingClient::default());
    let index: Arc<dyn VectorIndex> = Arc::new(InMemoryVectorIndex::new());
    pipeline(RagConfig::default(), embedder.clone(), index.clone())
        .ingest(&[Document::new("a.txt", "Databricks is a data company.")])
        .await
        .unwrap();
    let retrieval = RetrievalService::new(embedder, index, 2).unwrap();
    let synthesizer = AnswerSynthesizer::new(Arc::new(MockLanguageModel::extractive()));

    let answer = synthesizer.answer("tell me about databricks", &retrieval).await.unwrap();

    assert_eq!(answer.text, "Databricks is a data company.");
}

#[tokio::test]
async fn generation_failure_is_surfaced() {
    let synthesizer = AnswerSynthesizer::new(Arc::new(MockLanguageModel::failing("quota")));

    let err = synthesizer.synthesize("q", &["context"]).await.unwrap_err();

    assert!(matches!(err, RagError::GenerationFailure { .. }));
}
